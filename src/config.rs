use std::path::{Path, PathBuf};

use crate::auth::EnvCredentials;
use crate::cli::CliArgs;
use crate::error::Failure;
use crate::shell;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub verbose: bool,
    pub ephemeral: bool,
    pub delete: bool,
    pub filter: String,
    pub project_id: String,
    pub server: String,
    pub shell: String,
    pub home: Option<PathBuf>,
    pub credentials: EnvCredentials,
}

impl AppConfig {
    pub fn from_env(args: &CliArgs) -> Result<Self, Failure> {
        Self::load(args, |name| std::env::var(name).ok(), dirs::home_dir())
    }

    pub fn load(
        args: &CliArgs,
        var: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self, Failure> {
        let project_id = var("INFISICAL_PROJECT_ID")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Failure::new("Error: INFISICAL_PROJECT_ID environment variable is not set")
            })?;

        Ok(Self {
            verbose: args.verbose,
            ephemeral: args.ephemeral,
            delete: args.delete,
            filter: args.filter(),
            project_id,
            server: args.server.clone(),
            shell: shell::resolve_shell(var("SHELL")),
            home,
            credentials: EnvCredentials {
                client_id: var("INFISICAL_CLIENT_ID"),
                client_secret: var("INFISICAL_CLIENT_SECRET"),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub dir: PathBuf,
    pub file: PathBuf,
}

impl InstallPaths {
    pub fn under(home: &Path) -> Self {
        let dir = home.join(".kube");
        let file = dir.join("config");
        Self { dir, file }
    }
}
