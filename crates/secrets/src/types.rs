//! In-memory handling of resolved values

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A value fetched from a backend.
///
/// The buffer is zeroed on drop and both `Debug` and `Display` print
/// `[REDACTED]`, so a [`ResolutionResult`](crate::ResolutionResult) can be
/// logged safely. Only [`SecureSecret::expose`] yields the plaintext.
#[derive(Clone)]
pub struct SecureSecret(SecretString);

impl SecureSecret {
    /// Take ownership of a resolved value.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(SecretString::from(value))
    }

    /// The plaintext, for writing into an environment block.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Byte length of the value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Whether the backend returned an empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
