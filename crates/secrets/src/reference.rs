//! Secret reference syntax
//!
//! A reference is an environment value of the form `<prefix><locator>[#<key>]`.
//! `#` is not a legal character in Secrets Manager names, parameter paths or
//! the base64 alphabet, so its presence always selects a field of a JSON
//! (multi-value) secret.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter between a reference path and the sub-key of a multi-value secret
pub const SUB_KEY_DELIMITER: char = '#';

/// The secret backend a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// AWS Secrets Manager (`sm://`)
    SecretsManager,
    /// AWS SSM Parameter Store (`ssm://`)
    ParameterStore,
    /// AWS KMS decrypt (`kms://`)
    Kms,
}

/// Recognised prefixes, tested in order. The first match wins.
pub const PREFIXES: [(&str, BackendKind); 3] = [
    ("sm://", BackendKind::SecretsManager),
    ("ssm://", BackendKind::ParameterStore),
    ("kms://", BackendKind::Kms),
];

impl BackendKind {
    /// The reference prefix selecting this backend.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::SecretsManager => "sm://",
            Self::ParameterStore => "ssm://",
            Self::Kms => "kms://",
        }
    }

    /// Human readable backend name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SecretsManager => "secrets manager",
            Self::ParameterStore => "parameter store",
            Self::Kms => "kms",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed secret reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    /// Backend selected by the prefix
    pub backend: BackendKind,
    /// Secret ID, parameter path or base64 ciphertext (prefix removed)
    pub locator: String,
    /// Field to project out of a JSON object payload
    pub sub_key: Option<String>,
}

impl SecretReference {
    /// Parse a raw environment value.
    ///
    /// Returns `None` for plain values, which are left untouched.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (path, sub_key) = match raw.split_once(SUB_KEY_DELIMITER) {
            Some((path, key)) => (path, Some(key)),
            None => (raw, None),
        };

        PREFIXES.iter().find_map(|(prefix, backend)| {
            path.strip_prefix(prefix).map(|locator| Self {
                backend: *backend,
                locator: locator.to_string(),
                sub_key: sub_key.map(str::to_string),
            })
        })
    }

    /// Check that the reference can be sent to a backend.
    ///
    /// # Errors
    ///
    /// Returns the reason when the locator or the sub-key is empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.locator.is_empty() {
            return Err(format!("empty locator after '{}'", self.backend.prefix()));
        }
        if self.sub_key.as_deref() == Some("") {
            return Err(format!("empty key after '{SUB_KEY_DELIMITER}'"));
        }
        Ok(())
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.backend.prefix(), self.locator)?;
        if let Some(key) = &self.sub_key {
            write!(f, "{SUB_KEY_DELIMITER}{key}")?;
        }
        Ok(())
    }
}
