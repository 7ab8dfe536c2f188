//! KMS backend for `kms://` references

use async_trait::async_trait;
use aws_sdk_kms::Client;
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use awsenv_secrets::{BackendError, Decrypter};

/// Decrypts ciphertext blobs with `Decrypt`.
///
/// The key is taken from the ciphertext metadata, so no key ID is needed.
#[derive(Debug, Clone)]
pub struct KmsDecrypter {
    client: Client,
}

impl KmsDecrypter {
    /// Wrap an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Decrypter for KmsDecrypter {
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<String, BackendError> {
        let response = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| BackendError::request(DisplayErrorContext(&e).to_string()))?;

        let plaintext = response.plaintext().ok_or(BackendError::MissingValue {
            field: "plaintext",
        })?;
        String::from_utf8(plaintext.as_ref().to_vec()).map_err(|_| BackendError::InvalidUtf8)
    }
}
