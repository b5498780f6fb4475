use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tempfile::NamedTempFile;
use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, warn};

use crate::error::ShellError;

pub const DEFAULT_SHELL: &str = "/bin/sh";

pub fn resolve_shell(configured: Option<String>) -> String {
    configured
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

pub fn create_temp_kubeconfig(payload: &str) -> Result<NamedTempFile, ShellError> {
    let mut file = tempfile::Builder::new()
        .prefix("kubeconfig-")
        .suffix(".yaml")
        .tempfile()
        .map_err(ShellError::TempFile)?;
    restrict_permissions(file.path()).map_err(ShellError::TempFile)?;
    file.write_all(payload.as_bytes())
        .and_then(|()| file.flush())
        .map_err(ShellError::TempFile)?;
    Ok(file)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Runs `shell` with `KUBECONFIG` pointing at a temp copy of `payload` and
/// returns the temp path, which no longer exists by the time this returns.
pub async fn launch(payload: &str, shell: &str, out: &mut dyn Write) -> Result<PathBuf, ShellError> {
    let kubeconfig = create_temp_kubeconfig(payload)?;
    let path = kubeconfig.path().to_path_buf();

    let _ = writeln!(out, "\nStarting temporary shell with KUBECONFIG={}", path.display());
    let _ = writeln!(out, "Exit the shell to clean up the temporary kubeconfig");
    let _ = writeln!(out);
    let _ = out.flush();

    let result = run_shell(shell, &path).await;

    if let Err(error) = kubeconfig.close() {
        warn!("failed to remove temporary kubeconfig {}: {error}", path.display());
    }

    match result? {
        status if status.success() => Ok(path),
        status => Err(ShellError::Exit(status)),
    }
}

async fn run_shell(shell: &str, kubeconfig: &Path) -> Result<ExitStatus, ShellError> {
    let spawn_error = |source: std::io::Error| ShellError::Spawn {
        shell: shell.to_string(),
        source,
    };

    let mut child = TokioCommand::new(shell)
        .env("KUBECONFIG", kubeconfig)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_error)?;
    debug!("spawned {shell} pid={:?}", child.id());

    wait_through_signals(&mut child).await.map_err(spawn_error)
}

// The terminal delivers interrupts to the child as well; the parent keeps
// waiting so the temp file is always removed.
#[cfg(unix)]
async fn wait_through_signals(child: &mut Child) -> std::io::Result<ExitStatus> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            status = child.wait() => return status,
            _ = interrupt.recv() => debug!("SIGINT received while shell is running"),
            _ = terminate.recv() => debug!("SIGTERM received while shell is running"),
            _ = hangup.recv() => debug!("SIGHUP received while shell is running"),
        }
    }
}

#[cfg(not(unix))]
async fn wait_through_signals(child: &mut Child) -> std::io::Result<ExitStatus> {
    loop {
        tokio::select! {
            status = child.wait() => return status,
            _ = tokio::signal::ctrl_c() => debug!("interrupt received while shell is running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_defaults_to_posix_sh() {
        assert_eq!(resolve_shell(None), "/bin/sh");
        assert_eq!(resolve_shell(Some("  ".into())), "/bin/sh");
        assert_eq!(resolve_shell(Some("/bin/zsh".into())), "/bin/zsh");
    }

    #[test]
    fn temp_kubeconfig_is_private_and_scoped() {
        let file = create_temp_kubeconfig("apiVersion: v1\n").unwrap();
        let path = file.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("kubeconfig-"));
        assert!(name.ends_with(".yaml"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "apiVersion: v1\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(file);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // Both outcomes live in one test so only one child is forked at a time.
    #[cfg(unix)]
    #[tokio::test]
    async fn temp_file_is_removed_after_any_shell_exit() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("seen");
        let ok_shell = write_script(
            dir.path(),
            "ok-shell",
            &format!("cat \"$KUBECONFIG\" > '{}'", seen.display()),
        );
        let failed_seen = dir.path().join("failed-seen");
        let failing_shell = write_script(
            dir.path(),
            "failing-shell",
            &format!("printf %s \"$KUBECONFIG\" > '{}'\nexit 3", failed_seen.display()),
        );

        let mut out = Vec::new();
        let path = launch("payload", ok_shell.to_str().unwrap(), &mut out)
            .await
            .unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&seen).unwrap(), "payload");
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains(&format!("KUBECONFIG={}", path.display())));

        let mut out = Vec::new();
        let err = launch("payload", failing_shell.to_str().unwrap(), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Exit(status) if status.code() == Some(3)));
        let failed_path = PathBuf::from(std::fs::read_to_string(&failed_seen).unwrap());
        assert!(failed_path.starts_with(std::env::temp_dir()));
        assert!(!failed_path.exists());
    }

    #[tokio::test]
    async fn missing_shell_is_a_spawn_error() {
        let mut out = Vec::new();
        let err = launch("payload", "/nonexistent/ikube-shell", &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Spawn { .. }));
    }
}
