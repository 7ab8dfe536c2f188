//! In-memory backend

use super::{BackendError, Decrypter, ParameterStore, SecretStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves secrets, parameters and decryptions from fixed maps.
///
/// Every capability counts its calls so callers can assert which backend
/// was reached. Unknown locators fail with a `ResourceNotFoundException`
/// style [`BackendError::Request`].
///
/// ```ignore
/// let backend = InMemoryBackend::new()
///     .with_secret("/s", "sm-test")
///     .with_parameter("/p", "ssm-test");
/// let backends = Backends::from_shared(Arc::new(backend));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    secrets: HashMap<String, Result<String, BackendError>>,
    parameters: HashMap<String, Result<String, BackendError>>,
    ciphertexts: HashMap<Vec<u8>, Result<String, BackendError>>,
    secret_calls: AtomicUsize,
    parameter_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for the secret `id`.
    #[must_use]
    pub fn with_secret(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(id.into(), Ok(value.into()));
        self
    }

    /// Serve `value` for the parameter at `path`.
    #[must_use]
    pub fn with_parameter(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(path.into(), Ok(value.into()));
        self
    }

    /// Decrypt `ciphertext` to `plaintext`.
    #[must_use]
    pub fn with_ciphertext(
        mut self,
        ciphertext: impl Into<Vec<u8>>,
        plaintext: impl Into<String>,
    ) -> Self {
        self.ciphertexts
            .insert(ciphertext.into(), Ok(plaintext.into()));
        self
    }

    /// Fail every fetch of the secret `id` with `error`.
    #[must_use]
    pub fn with_secret_error(mut self, id: impl Into<String>, error: BackendError) -> Self {
        self.secrets.insert(id.into(), Err(error));
        self
    }

    /// Fail every fetch of the parameter at `path` with `error`.
    #[must_use]
    pub fn with_parameter_error(mut self, path: impl Into<String>, error: BackendError) -> Self {
        self.parameters.insert(path.into(), Err(error));
        self
    }

    /// Number of [`SecretStore::fetch_secret`] calls so far.
    #[must_use]
    pub fn secret_calls(&self) -> usize {
        self.secret_calls.load(Ordering::SeqCst)
    }

    /// Number of [`ParameterStore::fetch_parameter`] calls so far.
    #[must_use]
    pub fn parameter_calls(&self) -> usize {
        self.parameter_calls.load(Ordering::SeqCst)
    }

    /// Number of [`Decrypter::decrypt`] calls so far.
    #[must_use]
    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn not_found(what: &str, locator: &str) -> BackendError {
        BackendError::request(format!(
            "ResourceNotFoundException: {what} {locator:?} not found"
        ))
    }
}

#[async_trait]
impl SecretStore for InMemoryBackend {
    async fn fetch_secret(&self, locator: &str) -> Result<String, BackendError> {
        self.secret_calls.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .get(locator)
            .cloned()
            .unwrap_or_else(|| Err(Self::not_found("secret", locator)))
    }
}

#[async_trait]
impl ParameterStore for InMemoryBackend {
    async fn fetch_parameter(&self, locator: &str) -> Result<String, BackendError> {
        self.parameter_calls.fetch_add(1, Ordering::SeqCst);
        self.parameters
            .get(locator)
            .cloned()
            .unwrap_or_else(|| Err(Self::not_found("parameter", locator)))
    }
}

#[async_trait]
impl Decrypter for InMemoryBackend {
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<String, BackendError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.ciphertexts
            .get(ciphertext)
            .cloned()
            .unwrap_or_else(|| Err(BackendError::request("InvalidCiphertextException")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_configured_values_and_counts_calls() {
        let backend = InMemoryBackend::new()
            .with_secret("id", "s")
            .with_parameter("/p", "p")
            .with_ciphertext(b"<encrypted>".to_vec(), "k");

        assert_eq!(backend.fetch_secret("id").await.unwrap(), "s");
        assert_eq!(backend.fetch_parameter("/p").await.unwrap(), "p");
        assert_eq!(backend.decrypt(b"<encrypted>").await.unwrap(), "k");

        assert_eq!(backend.secret_calls(), 1);
        assert_eq!(backend.parameter_calls(), 1);
        assert_eq!(backend.decrypt_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_locators_fail() {
        let backend = InMemoryBackend::new();
        let err = backend.fetch_secret("missing").await.unwrap_err();
        assert!(err.to_string().contains("ResourceNotFoundException"));
        assert!(backend.decrypt(b"junk").await.is_err());
    }

    #[tokio::test]
    async fn injected_errors_are_returned() {
        let backend = InMemoryBackend::new()
            .with_parameter_error("/p", BackendError::MissingValue { field: "value" });
        assert_eq!(
            backend.fetch_parameter("/p").await,
            Err(BackendError::MissingValue { field: "value" })
        );
    }
}
