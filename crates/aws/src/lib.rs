//! AWS backends for awsenv
//!
//! Implements the awsenv-secrets capability traits on top of the AWS SDK:
//! - [`SecretsManagerStore`] - `sm://` references via `GetSecretValue`
//! - [`ParameterStoreClient`] - `ssm://` references via `GetParameter`
//! - [`KmsDecrypter`] - `kms://` references via `Decrypt`
//!
//! [`load_backends`] determines the region, builds one shared SDK
//! configuration and returns the three clients bundled as [`Backends`].

mod kms;
mod parameter_store;
pub mod region;
mod secrets_manager;

pub use kms::KmsDecrypter;
pub use parameter_store::ParameterStoreClient;
pub use region::{RegionSource, resolve_region};
pub use secrets_manager::SecretsManagerStore;

use awsenv_secrets::Backends;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while setting up the AWS backends
#[derive(Debug, Error)]
pub enum AwsError {
    /// No region from the flag, the environment or instance metadata
    #[error(
        "'AWS_REGION' or 'AWS_DEFAULT_REGION' must be set when EC2 metadata is unavailable"
    )]
    NoRegion,
}

/// Settings for building the AWS clients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    /// Region override taking precedence over the environment
    pub region: Option<String>,
}

impl AwsSettings {
    /// Settings with an explicit region override.
    #[must_use]
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
        }
    }
}

/// Build the Secrets Manager, Parameter Store and KMS clients.
///
/// Credentials are resolved lazily by the SDK on the first call, so this
/// performs no request other than a possible instance metadata region lookup.
///
/// # Errors
///
/// Returns [`AwsError::NoRegion`] when no region can be determined.
pub async fn load_backends(settings: &AwsSettings) -> Result<Backends, AwsError> {
    let (region, source) = resolve_region(settings.region.as_deref()).await?;
    tracing::debug!(region = %region, source = ?source, "Using AWS region");

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await;

    Ok(Backends::new(
        Arc::new(SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(
            &config,
        ))),
        Arc::new(ParameterStoreClient::new(aws_sdk_ssm::Client::new(&config))),
        Arc::new(KmsDecrypter::new(aws_sdk_kms::Client::new(&config))),
    ))
}
