//! SSM Parameter Store backend for `ssm://` references

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use awsenv_secrets::{BackendError, ParameterStore};

/// Fetches parameters with `GetParameter`, always decrypting `SecureString`s.
#[derive(Debug, Clone)]
pub struct ParameterStoreClient {
    client: Client,
}

impl ParameterStoreClient {
    /// Wrap an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for ParameterStoreClient {
    async fn fetch_parameter(&self, locator: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .get_parameter()
            .name(locator)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| BackendError::request(DisplayErrorContext(&e).to_string()))?;

        response
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or(BackendError::MissingValue {
                field: "parameter value",
            })
    }
}
