use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "ikube",
    version,
    about = "Store, install and delete kubeconfigs kept in Infisical.",
    long_about = "Store, install and delete kubeconfigs kept in Infisical.\n\n\
Pipe a kubeconfig on stdin to store it under its current cluster name \
(`cat config | ikube`). Without piped input, pick a stored kubeconfig and \
install it to ~/.kube/config, or open it in a temporary shell with -l."
)]
pub struct CliArgs {
    /// Show full error details
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Load the kubeconfig in a temporary shell instead of installing it
    #[arg(short = 'l')]
    pub ephemeral: bool,

    /// Delete stored kubeconfig(s)
    #[arg(short = 'd')]
    pub delete: bool,

    /// Infisical host or URL
    #[arg(long, env = "INFISICAL_SERVER", default_value = "app.infisical.com")]
    pub server: String,

    /// tracing filter (for example: warn,debug,trace)
    #[arg(long, default_value = "warn")]
    pub log_filter: String,

    /// Case-insensitive substring matched against stored cluster names
    pub filter: Option<String>,
}

impl CliArgs {
    pub fn filter(&self) -> String {
        self.filter
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default()
    }
}
