//! Secrets Manager backend for `sm://` references

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use awsenv_secrets::{BackendError, SecretStore};

/// Fetches secrets with `GetSecretValue`.
///
/// String secrets are returned as-is. Binary secrets are returned as UTF-8
/// text; the SDK has already removed the transport base64 encoding.
#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    /// Wrap an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Choose the payload of a `GetSecretValue` response.
fn secret_payload(
    secret_string: Option<&str>,
    secret_binary: Option<&[u8]>,
) -> Result<String, BackendError> {
    if let Some(value) = secret_string {
        return Ok(value.to_string());
    }
    let bytes = secret_binary.ok_or(BackendError::MissingValue {
        field: "SecretString or SecretBinary",
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| BackendError::InvalidUtf8)
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn fetch_secret(&self, locator: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(locator)
            .send()
            .await
            .map_err(|e| BackendError::request(DisplayErrorContext(&e).to_string()))?;

        secret_payload(
            response.secret_string(),
            response.secret_binary().map(|blob| blob.as_ref()),
        )
    }
}
