//! Backend capabilities
//!
//! Each secret source is reached through a trait with exactly one operation:
//!
//! - [`SecretStore`] - key/value secret store (Secrets Manager)
//! - [`ParameterStore`] - hierarchical parameters (SSM Parameter Store)
//! - [`Decrypter`] - envelope decryption (KMS)
//!
//! Transport concerns such as timeouts and retries belong to the
//! implementations. [`InMemoryBackend`] implements all three without any
//! network access.

mod memory;

pub use memory::InMemoryBackend;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a backend capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request to the backend failed
    #[error("{message}")]
    Request {
        /// Transport or service error message
        message: String,
    },

    /// The backend answered without the expected value
    #[error("response contained no {field}")]
    MissingValue {
        /// The missing response field
        field: &'static str,
    },

    /// The payload is not valid UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

impl BackendError {
    /// Create a request error from any displayable error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }
}

/// Fetch a secret payload by ID.
///
/// An empty payload is a valid secret, not an error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the secret identified by `locator`.
    async fn fetch_secret(&self, locator: &str) -> Result<String, BackendError>;
}

/// Fetch a parameter value by path, always decrypted.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the parameter at `locator`.
    async fn fetch_parameter(&self, locator: &str) -> Result<String, BackendError>;
}

/// Decrypt raw ciphertext bytes to a plaintext payload.
#[async_trait]
pub trait Decrypter: Send + Sync {
    /// Decrypt `ciphertext` (already base64-decoded).
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<String, BackendError>;
}

/// The three capabilities used by the [`Resolver`](crate::Resolver).
#[derive(Clone)]
pub struct Backends {
    /// Secrets Manager capability
    pub secrets: Arc<dyn SecretStore>,
    /// Parameter Store capability
    pub parameters: Arc<dyn ParameterStore>,
    /// KMS capability
    pub kms: Arc<dyn Decrypter>,
}

impl Backends {
    /// Bundle three capability implementations.
    #[must_use]
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        parameters: Arc<dyn ParameterStore>,
        kms: Arc<dyn Decrypter>,
    ) -> Self {
        Self {
            secrets,
            parameters,
            kms,
        }
    }

    /// Use a single value implementing all three capabilities.
    #[must_use]
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: SecretStore + ParameterStore + Decrypter + 'static,
    {
        Self {
            secrets: backend.clone(),
            parameters: backend.clone(),
            kms: backend,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
