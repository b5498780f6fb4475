use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Provenance {
    Env,
    Keystore,
    Prompt,
}

impl Provenance {
    pub fn title(self) -> &'static str {
        match self {
            Self::Env => "environment",
            Self::Keystore => "keystore",
            Self::Prompt => "prompt",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub provenance: Provenance,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            provenance,
        }
    }
}

// Keep the secret out of logs and panics.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("provenance", &self.provenance)
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct StoredSecret {
    pub key: String,
    pub value: String,
    pub comment: String,
}

impl StoredSecret {
    pub fn new(key: impl Into<String>, value: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    Store,
    Select,
    Delete,
}

impl Mode {
    pub fn resolve(delete: bool, stdin_is_terminal: bool) -> Self {
        if delete {
            Self::Delete
        } else if !stdin_is_terminal {
            Self::Store
        } else {
            Self::Select
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_flag_overrides_piped_stdin() {
        assert_eq!(Mode::resolve(true, false), Mode::Delete);
        assert_eq!(Mode::resolve(true, true), Mode::Delete);
    }

    #[test]
    fn piped_stdin_selects_store_mode() {
        assert_eq!(Mode::resolve(false, false), Mode::Store);
        assert_eq!(Mode::resolve(false, true), Mode::Select);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("id", "hunter2", Provenance::Prompt);
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("id"));
        assert!(!rendered.contains("hunter2"));
    }
}
