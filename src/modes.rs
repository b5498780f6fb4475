use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::SelectMode;
use crate::auth::Prompter;
use crate::config::InstallPaths;
use crate::error::{Failure, ShellError};
use crate::infisical::SecretsGateway;
use crate::kubeconfig;
use crate::model::StoredSecret;
use crate::picker::Picker;
use crate::select::{self, Selection};
use crate::shell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored { cluster: String, updated: bool },
    Installed { cluster: String, path: PathBuf },
    ShellClosed { cluster: String },
    Deleted { deleted: Vec<String>, failed: Vec<String> },
    NoSecrets,
    NoMatches,
    Cancelled,
    NothingSelected,
    Declined,
}

pub struct SelectOptions<'a> {
    pub filter: &'a str,
    pub ephemeral: bool,
    pub shell: &'a str,
    pub home: Option<&'a Path>,
}

pub struct Session<'a> {
    gateway: &'a dyn SecretsGateway,
    out: &'a mut dyn Write,
    verbose: bool,
}

impl<'a> Session<'a> {
    pub fn new(gateway: &'a dyn SecretsGateway, out: &'a mut dyn Write, verbose: bool) -> Self {
        Self {
            gateway,
            out,
            verbose,
        }
    }

    pub async fn store(&mut self, input: &str) -> Result<Outcome, Failure> {
        if input.trim().is_empty() {
            return Err(Failure::new("Error: Empty kubeconfig received"));
        }

        let config = kubeconfig::parse(input)
            .map_err(|e| Failure::with_detail("Error: Invalid kubeconfig format", e))?;
        let target = kubeconfig::validate(&config)
            .map_err(|e| Failure::new(format!("Error: Invalid kubeconfig: {e}")))?;
        debug!("validated kubeconfig for cluster {}", target.name);

        let existing = self
            .gateway
            .list()
            .await
            .map_err(|e| Failure::with_detail("Failed to check existing secrets", e))?;

        let updated = existing.iter().any(|secret| secret.key == target.name);
        if updated {
            self.gateway
                .update(&target.name, input)
                .await
                .map_err(|e| Failure::with_detail("Failed to update secret", e))?;
            self.say(format_args!(
                "Successfully updated kubeconfig for cluster: {}",
                target.name
            ));
        } else {
            self.gateway
                .create(&target.name, input, &target.comment())
                .await
                .map_err(|e| Failure::with_detail("Failed to store secret", e))?;
            self.say(format_args!(
                "Successfully stored kubeconfig for cluster: {}",
                target.name
            ));
        }
        info!(cluster = %target.name, updated, "kubeconfig stored");

        Ok(Outcome::Stored {
            cluster: target.name,
            updated,
        })
    }

    pub async fn select(
        &mut self,
        picker: &mut dyn Picker,
        options: &SelectOptions<'_>,
    ) -> Result<Outcome, Failure> {
        let secrets = self.fetch().await?;
        let selection = select::select(secrets, options.filter, SelectMode::Single, picker)
            .await
            .map_err(|e| Failure::with_detail("Error during selection", e))?;

        let chosen = match self.settle(selection, options.filter) {
            Ok(chosen) => chosen,
            Err(outcome) => return Ok(outcome),
        };
        let Some(secret) = chosen.into_iter().next() else {
            return Ok(Outcome::NothingSelected);
        };

        if options.ephemeral {
            shell::launch(&secret.value, options.shell, &mut *self.out)
                .await
                .map_err(|e| match e {
                    ShellError::TempFile(_) => {
                        Failure::with_detail("Error creating temporary kubeconfig", e)
                    }
                    _ => Failure::with_detail("Error launching shell", e),
                })?;
            return Ok(Outcome::ShellClosed {
                cluster: secret.key,
            });
        }

        let home = options
            .home
            .ok_or_else(|| Failure::new("Error getting home directory"))?;
        let paths = InstallPaths::under(home);
        install(&paths, &secret.value)?;
        self.say(format_args!(
            "Successfully configured kubeconfig for cluster: {}",
            secret.key
        ));

        Ok(Outcome::Installed {
            cluster: secret.key,
            path: paths.file,
        })
    }

    /// Multi-selects stored kubeconfigs and deletes them after confirmation.
    /// Individual delete failures are reported and skipped.
    pub async fn delete(
        &mut self,
        picker: &mut dyn Picker,
        confirm: &mut dyn Prompter,
        filter: &str,
    ) -> Result<Outcome, Failure> {
        let secrets = self.fetch().await?;
        let selection = select::select(secrets, filter, SelectMode::Multi, picker)
            .await
            .map_err(|e| Failure::with_detail("Error during selection", e))?;

        let chosen = match self.settle(selection, filter) {
            Ok(chosen) => chosen,
            Err(outcome) => return Ok(outcome),
        };
        if chosen.is_empty() {
            self.say("No kubeconfigs selected for deletion");
            return Ok(Outcome::NothingSelected);
        }

        self.say("\nSelected kubeconfigs for deletion:");
        for secret in &chosen {
            self.say(format_args!("- {}", secret.key));
        }
        let _ = self.out.flush();

        // An unreadable answer counts as "no".
        let answer = confirm
            .ask("Are you sure you want to delete these kubeconfigs? [y/N]", false)
            .unwrap_or_default();
        if !answer.trim().eq_ignore_ascii_case("y") {
            self.say("Deletion cancelled");
            return Ok(Outcome::Declined);
        }

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for secret in chosen {
            match self.gateway.delete(&secret.key).await {
                Ok(()) => {
                    self.say(format_args!("Successfully deleted kubeconfig: {}", secret.key));
                    deleted.push(secret.key);
                }
                Err(error) => {
                    if self.verbose {
                        self.say(format_args!(
                            "Failed to delete kubeconfig {}: {error}",
                            secret.key
                        ));
                    } else {
                        self.say(format_args!("Failed to delete kubeconfig {}", secret.key));
                    }
                    failed.push(secret.key);
                }
            }
        }

        Ok(Outcome::Deleted { deleted, failed })
    }

    async fn fetch(&mut self) -> Result<Vec<StoredSecret>, Failure> {
        self.gateway
            .list()
            .await
            .map_err(|e| Failure::with_detail("Failed to retrieve secrets", e))
    }

    // Reports the non-error endings; `Ok` carries what was chosen.
    fn settle(&mut self, selection: Selection, filter: &str) -> Result<Vec<StoredSecret>, Outcome> {
        match selection {
            Selection::NoSecrets => {
                self.say("No kubeconfigs found");
                Err(Outcome::NoSecrets)
            }
            Selection::NoMatches => {
                self.say(format_args!("No kubeconfigs found matching filter: {filter}"));
                Err(Outcome::NoMatches)
            }
            Selection::Cancelled => {
                self.say("Selection cancelled");
                Err(Outcome::Cancelled)
            }
            Selection::Chosen { secrets, auto } => {
                if auto && let Some(secret) = secrets.first() {
                    self.say(format_args!("Using only available kubeconfig: {}", secret.key));
                }
                Ok(secrets)
            }
        }
    }

    fn say(&mut self, line: impl Display) {
        let _ = writeln!(self.out, "{line}");
    }
}

pub fn install(paths: &InstallPaths, payload: &str) -> Result<(), Failure> {
    let mut dir = fs::DirBuilder::new();
    dir.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        dir.mode(0o755);
    }
    dir.create(&paths.dir)
        .map_err(|e| Failure::with_detail("Error creating .kube directory", e))?;

    let writing = |e: std::io::Error| Failure::with_detail("Error writing kubeconfig", e);
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&paths.file).map_err(writing)?;
    file.write_all(payload.as_bytes()).map_err(writing)?;

    // An existing file keeps its old mode unless reset.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&paths.file, fs::Permissions::from_mode(0o600)).map_err(writing)?;
    }
    debug!("installed kubeconfig at {}", paths.file.display());
    Ok(())
}
