use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("keystore unavailable: {0}")]
    Unavailable(String),

    #[error("keystore access failed for '{key}': {message}")]
    Access { key: String, message: String },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("credentials rejected by secrets service ({status}): {message}")]
    CredentialRejected { status: u16, message: String },

    #[error("secrets service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response from secrets service: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, Self::CredentialRejected { .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Yaml(#[from] kube::config::KubeconfigError),

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rule 1: no contexts found in kubeconfig")]
    NoContexts,

    #[error("rule 1: no clusters found in kubeconfig")]
    NoClusters,

    #[error("rule 2: no current-context set in kubeconfig")]
    NoCurrentContext,

    #[error("rule 2: current-context '{0}' not found in contexts")]
    UnknownContext(String),

    #[error("rule 3: cluster '{cluster}' referenced by context '{context}' not found in clusters")]
    UnknownCluster { cluster: String, context: String },

    #[error("rule 3: cluster '{0}' has no server URL specified")]
    MissingServer(String),

    #[error("rule 4: no user specified in context '{0}'")]
    NoUser(String),

    #[error("rule 4: user '{user}' referenced by context '{context}' not found in users")]
    UnknownUser { user: String, context: String },

    #[error("rule 5: no authentication method specified for user '{0}'")]
    NoAuthMaterial(String),
}

impl ValidationError {
    pub fn rule(&self) -> u8 {
        match self {
            Self::NoContexts | Self::NoClusters => 1,
            Self::NoCurrentContext | Self::UnknownContext(_) => 2,
            Self::UnknownCluster { .. } | Self::MissingServer(_) => 3,
            Self::NoUser(_) | Self::UnknownUser { .. } => 4,
            Self::NoAuthMaterial(_) => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to get credentials: {0}")]
    Credentials(String),

    #[error("authentication failed")]
    Rejected(#[source] GatewayError),

    #[error("authentication failed with new credentials")]
    RejectedAfterRetry(#[source] GatewayError),

    #[error("authentication failed")]
    Gateway(#[source] GatewayError),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("error creating temporary kubeconfig: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("error launching shell '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error running shell: exited with {0}")]
    Exit(std::process::ExitStatus),
}

#[derive(Debug, Error)]
pub enum PickerError {
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("terminal event stream closed")]
    StreamClosed,
}

#[derive(Debug)]
pub struct Failure {
    summary: String,
    detail: Option<String>,
}

impl Failure {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn with_detail(summary: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self {
            summary: summary.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn from_chain(summary: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::with_detail(summary, compact_error(error))
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn render(&self, verbose: bool) -> String {
        match (&self.detail, verbose) {
            (Some(detail), true) => format!("{}: {detail}", self.summary),
            _ => self.summary.clone(),
        }
    }
}

pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn every_validation_variant_names_a_rule() {
        let cases = [
            (ValidationError::NoContexts, 1),
            (ValidationError::NoClusters, 1),
            (ValidationError::NoCurrentContext, 2),
            (ValidationError::UnknownContext("x".into()), 2),
            (
                ValidationError::UnknownCluster {
                    cluster: "c".into(),
                    context: "x".into(),
                },
                3,
            ),
            (ValidationError::MissingServer("c".into()), 3),
            (ValidationError::NoUser("x".into()), 4),
            (
                ValidationError::UnknownUser {
                    user: "u".into(),
                    context: "x".into(),
                },
                4,
            ),
            (ValidationError::NoAuthMaterial("u".into()), 5),
        ];
        for (error, rule) in cases {
            assert_eq!(error.rule(), rule);
            assert!(error.to_string().starts_with(&format!("rule {rule}:")));
        }
    }

    #[test]
    fn failure_hides_detail_unless_verbose() {
        let failure = Failure::with_detail("Failed to retrieve secrets", "connection refused");
        assert_eq!(failure.render(false), "Failed to retrieve secrets");
        assert_eq!(
            failure.render(true),
            "Failed to retrieve secrets: connection refused"
        );
        assert_eq!(Failure::new("plain").render(true), "plain");
    }

    #[test]
    fn compact_error_keeps_three_causes() {
        let error = Err::<(), _>(anyhow::anyhow!("root"))
            .context("middle")
            .context("upper")
            .context("top")
            .unwrap_err();
        assert_eq!(
            compact_error(&error),
            "top; caused by: upper; caused by: middle"
        );
    }

    #[test]
    fn only_rejections_are_flagged() {
        let rejected = GatewayError::CredentialRejected {
            status: 401,
            message: "bad".into(),
        };
        assert!(rejected.is_credential_rejected());
        assert!(!GatewayError::Transport("dns".into()).is_credential_rejected());
    }
}
