use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::model::{Credentials, StoredSecret};

pub const ENVIRONMENT: &str = "config";
pub const SECRET_PATH: &str = "/";
const REFRESH_MARGIN: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// Callers read before writing to pick between `create` and `update`.
#[async_trait]
pub trait SecretsGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<StoredSecret>, GatewayError>;
    async fn create(&self, key: &str, value: &str, comment: &str) -> Result<(), GatewayError>;
    async fn update(&self, key: &str, value: &str) -> Result<(), GatewayError>;
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    type Handle: SecretsGateway;

    async fn authenticate(&self, credentials: &Credentials) -> Result<Self::Handle, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct InfisicalConnector {
    http: Client,
    site: String,
    project_id: String,
}

impl InfisicalConnector {
    pub fn new(server: &str, project_id: impl Into<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ikube/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            site: site_url(server),
            project_id: project_id.into(),
        })
    }
}

#[async_trait]
impl Authenticator for InfisicalConnector {
    type Handle = InfisicalClient;

    async fn authenticate(&self, credentials: &Credentials) -> Result<InfisicalClient, GatewayError> {
        let token = login(&self.http, &self.site, credentials).await?;
        info!(
            "authenticated against {} using {} credentials",
            self.site, credentials.provenance
        );
        Ok(InfisicalClient {
            http: self.http.clone(),
            site: self.site.clone(),
            project_id: self.project_id.clone(),
            credentials: credentials.clone(),
            token: Mutex::new(token),
        })
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn needs_refresh(&self, now: Instant) -> bool {
        self.expires_at.saturating_duration_since(now) <= REFRESH_MARGIN
    }
}

pub struct InfisicalClient {
    http: Client,
    site: String,
    project_id: String,
    credentials: Credentials,
    token: Mutex<AccessToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    secrets: Vec<RawSecret>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecret {
    secret_key: String,
    #[serde(default)]
    secret_value: String,
    #[serde(default)]
    secret_comment: Option<String>,
}

impl From<RawSecret> for StoredSecret {
    fn from(raw: RawSecret) -> Self {
        StoredSecret::new(
            raw.secret_key,
            raw.secret_value,
            raw.secret_comment.unwrap_or_default(),
        )
    }
}

fn default_expires_in() -> u64 {
    7_200
}

async fn login(
    http: &Client,
    site: &str,
    credentials: &Credentials,
) -> Result<AccessToken, GatewayError> {
    let response = http
        .post(format!("{site}/api/v1/auth/universal-auth/login"))
        .json(&json!({
            "clientId": credentials.client_id,
            "clientSecret": credentials.client_secret,
        }))
        .send()
        .await?;

    let status = response.status();
    debug!("universal-auth login status={status}");
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_login_failure(status, &body));
    }

    let parsed: LoginResponse = response.json().await?;
    Ok(AccessToken {
        value: parsed.access_token,
        expires_at: expiry_after(Instant::now(), parsed.expires_in),
    })
}

fn expiry_after(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in.min(MAX_TOKEN_LIFETIME.as_secs()));
    now.checked_add(lifetime).unwrap_or(now)
}

impl InfisicalClient {
    async fn bearer(&self) -> Result<String, GatewayError> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(Instant::now()) {
            debug!("access token near expiry, logging in again");
            *token = login(&self.http, &self.site, &self.credentials).await?;
        }
        Ok(token.value.clone())
    }

    fn scope_body(&self) -> serde_json::Value {
        json!({
            "workspaceId": self.project_id,
            "environment": ENVIRONMENT,
            "secretPath": SECRET_PATH,
            "type": "shared",
        })
    }
}

#[async_trait]
impl SecretsGateway for InfisicalClient {
    async fn list(&self) -> Result<Vec<StoredSecret>, GatewayError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/api/v3/secrets/raw", self.site))
            .bearer_auth(bearer)
            .query(&[
                ("workspaceId", self.project_id.as_str()),
                ("environment", ENVIRONMENT),
                ("secretPath", SECRET_PATH),
                ("expandSecretReferences", "false"),
            ])
            .send()
            .await?;
        let parsed: ListResponse = ensure_success(response).await?.json().await?;
        debug!("listed {} secrets", parsed.secrets.len());
        Ok(parsed.secrets.into_iter().map(StoredSecret::from).collect())
    }

    async fn create(&self, key: &str, value: &str, comment: &str) -> Result<(), GatewayError> {
        let bearer = self.bearer().await?;
        let mut body = self.scope_body();
        body["secretValue"] = json!(value);
        body["secretComment"] = json!(comment);
        let response = self
            .http
            .post(secret_url(&self.site, key))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let bearer = self.bearer().await?;
        let mut body = self.scope_body();
        body["secretValue"] = json!(value);
        let response = self
            .http
            .patch(secret_url(&self.site, key))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .delete(secret_url(&self.site, key))
            .bearer_auth(bearer)
            .json(&self.scope_body())
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

pub fn site_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{server}")
    }
}

fn secret_url(site: &str, key: &str) -> String {
    format!("{site}/api/v3/secrets/raw/{}", urlencoding::encode(key))
}

fn classify_login_failure(status: StatusCode, body: &str) -> GatewayError {
    let message = error_message(body);
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND => GatewayError::CredentialRejected {
            status: status.as_u16(),
            message,
        },
        _ => GatewayError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
