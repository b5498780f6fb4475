use std::io::Write;

use anyhow::Result;
use dialoguer::{Input, Password};
use tracing::{debug, warn};

use crate::error::{AuthError, GatewayError};
use crate::infisical::Authenticator;
use crate::keystore::{self, CLIENT_ID_KEY, CLIENT_SECRET_KEY, CredentialStore};
use crate::model::{Credentials, Provenance};

#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

pub trait Prompter {
    fn ask(&mut self, label: &str, hidden: bool) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str, hidden: bool) -> Result<String> {
        let value = if hidden {
            Password::new()
                .with_prompt(label)
                .allow_empty_password(true)
                .interact()?
        } else {
            Input::<String>::new()
                .with_prompt(label)
                .allow_empty(true)
                .interact_text()?
        };
        Ok(value)
    }
}

pub struct CredentialManager<'a> {
    env: EnvCredentials,
    store: &'a dyn CredentialStore,
    prompter: &'a mut dyn Prompter,
    out: &'a mut dyn Write,
    verbose: bool,
}

impl<'a> CredentialManager<'a> {
    pub fn new(
        env: EnvCredentials,
        store: &'a dyn CredentialStore,
        prompter: &'a mut dyn Prompter,
        out: &'a mut dyn Write,
        verbose: bool,
    ) -> Self {
        Self {
            env,
            store,
            prompter,
            out,
            verbose,
        }
    }

    pub fn acquire(&mut self, force_prompt: bool) -> Result<Credentials, AuthError> {
        if !force_prompt {
            let mut client_id = filled(self.env.client_id.clone());
            let mut client_secret = filled(self.env.client_secret.clone());
            if let (Some(id), Some(secret)) = (&client_id, &client_secret) {
                return Ok(Credentials::new(id, secret, Provenance::Env));
            }

            if client_id.is_none() {
                client_id = filled(self.keystore_get(CLIENT_ID_KEY, "client ID")?);
            }
            if client_secret.is_none() {
                client_secret = filled(self.keystore_get(CLIENT_SECRET_KEY, "client secret")?);
            }
            if let (Some(id), Some(secret)) = (client_id, client_secret) {
                return Ok(Credentials::new(id, secret, Provenance::Keystore));
            }
            debug!("no complete credential pair in environment or keystore");
        }

        self.prompt()
    }

    fn keystore_get(&self, key: &str, label: &str) -> Result<Option<String>, AuthError> {
        self.store.get(key).map_err(|e| {
            AuthError::Credentials(format!("failed to get {label} from keyring: {e}"))
        })
    }

    fn prompt(&mut self) -> Result<Credentials, AuthError> {
        let client_id = self
            .prompter
            .ask("Enter Infisical Client ID", false)
            .map_err(|e| AuthError::Credentials(format!("failed to read client ID: {e:#}")))?;
        let client_secret = self
            .prompter
            .ask("Enter Infisical Client Secret", true)
            .map_err(|e| AuthError::Credentials(format!("failed to read client secret: {e:#}")))?;
        Ok(Credentials::new(
            client_id.trim_end(),
            client_secret.trim_end(),
            Provenance::Prompt,
        ))
    }

    /// Acquires credentials and logs in, calling the authenticator at most
    /// twice. Only rejected keystore material earns the second attempt.
    pub async fn authenticate<A: Authenticator>(
        &mut self,
        authenticator: &A,
    ) -> Result<A::Handle, AuthError> {
        let credentials = self.acquire(false)?;
        let error = match authenticator.authenticate(&credentials).await {
            Ok(handle) => {
                self.persist(&credentials);
                return Ok(handle);
            }
            Err(error) => error,
        };

        if credentials.provenance != Provenance::Keystore || !error.is_credential_rejected() {
            return Err(terminal_error(error, AuthError::Rejected));
        }

        self.notice("Stored credentials are invalid", &error);
        if let Err(error) = keystore::clear_pair(self.store) {
            warn!("failed to clear stored credentials: {error}");
            self.notice("Warning: Failed to clear stored credentials", &error);
        }

        let credentials = self.acquire(true)?;
        match authenticator.authenticate(&credentials).await {
            Ok(handle) => {
                self.persist(&credentials);
                Ok(handle)
            }
            Err(error) => Err(terminal_error(error, AuthError::RejectedAfterRetry)),
        }
    }

    // Env material is never written back; keystore material is already there.
    fn persist(&mut self, credentials: &Credentials) {
        if credentials.provenance != Provenance::Prompt {
            return;
        }
        if let Err(error) =
            keystore::store_pair(self.store, &credentials.client_id, &credentials.client_secret)
        {
            warn!("failed to persist credentials: {error}");
            self.notice("Warning: Failed to store credentials", &error);
        }
    }

    fn notice(&mut self, summary: &str, detail: &dyn std::fmt::Display) {
        let _ = if self.verbose {
            writeln!(self.out, "{summary}: {detail}")
        } else {
            writeln!(self.out, "{summary}")
        };
    }
}

fn terminal_error(error: GatewayError, rejected: fn(GatewayError) -> AuthError) -> AuthError {
    if error.is_credential_rejected() {
        rejected(error)
    } else {
        AuthError::Gateway(error)
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
