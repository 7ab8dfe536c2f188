//! Writing resolved secrets into an environment
//!
//! [`apply`] is the single step that commits a [`ResolutionResult`]. The
//! target is an [`EnvironmentSink`]: either the live process environment or
//! an owned environment block handed to a child process.

use crate::{EnvironmentSnapshot, ResolutionError, ResolutionResult};
use indexmap::IndexMap;
use thiserror::Error;

/// Why a name/value pair could not be written
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    /// Name is empty or contains `=` or NUL
    #[error("invalid environment variable name {name:?}")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// Value contains a NUL byte
    #[error("value contains a NUL byte")]
    InvalidValue,
}

/// Destination for resolved name/value pairs.
pub trait EnvironmentSink {
    /// Write one variable.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the pair cannot be represented in an
    /// environment block.
    fn set(&mut self, name: &str, value: &str) -> Result<(), WriteError>;
}

fn validate(name: &str, value: &str) -> Result<(), WriteError> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return Err(WriteError::InvalidName {
            name: name.to_string(),
        });
    }
    if value.contains('\0') {
        return Err(WriteError::InvalidValue);
    }
    Ok(())
}

/// Write every resolved secret into `sink`.
///
/// A failed write is recorded on `result` as
/// [`ResolutionError::EnvironmentWriteFailed`] and the remaining names are
/// still written. Returns the number of variables written.
pub fn apply<S: EnvironmentSink + ?Sized>(sink: &mut S, result: &mut ResolutionResult) -> usize {
    let mut failures = Vec::new();
    let mut written = 0;

    for (name, secret) in result.secrets() {
        match sink.set(name, secret.expose()) {
            Ok(()) => {
                tracing::trace!(
                    variable = %name,
                    bytes = secret.len(),
                    "Set environment variable"
                );
                written += 1;
            }
            Err(source) => {
                tracing::warn!(
                    variable = %name,
                    error = %source,
                    "Failed to set environment variable"
                );
                failures.push(ResolutionError::EnvironmentWriteFailed {
                    name: name.clone(),
                    source,
                });
            }
        }
    }

    for failure in failures {
        result.push_error(failure);
    }
    tracing::debug!(written, "Applied resolved secrets");
    written
}

/// The environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    /// Create a sink writing to the process environment.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EnvironmentSink for ProcessEnvironment {
    #[allow(unsafe_code)]
    fn set(&mut self, name: &str, value: &str) -> Result<(), WriteError> {
        validate(name, value)?;
        // SAFETY: callers apply before spawning threads that read the environment
        unsafe { std::env::set_var(name, value) };
        Ok(())
    }
}

/// An owned environment block for a child process.
///
/// Seeded from the snapshot, so plain variables are inherited as-is and
/// resolved secrets replace their references.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandEnvironment {
    vars: IndexMap<String, String>,
}

impl CommandEnvironment {
    /// Start from the captured environment, last duplicate winning.
    #[must_use]
    pub fn from_snapshot(snapshot: &EnvironmentSnapshot) -> Self {
        let vars = snapshot
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self { vars }
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over the variables in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Take the variables out of the block.
    #[must_use]
    pub fn into_vars(self) -> IndexMap<String, String> {
        self.vars
    }
}

impl EnvironmentSink for CommandEnvironment {
    fn set(&mut self, name: &str, value: &str) -> Result<(), WriteError> {
        validate(name, value)?;
        self.vars.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backends, InMemoryBackend, Resolver};
    use std::sync::Arc;

    async fn resolve(backend: InMemoryBackend, snapshot: &EnvironmentSnapshot) -> ResolutionResult {
        Resolver::new(Backends::from_shared(Arc::new(backend)))
            .resolve(snapshot)
            .await
    }

    #[test]
    fn validate_rejects_bad_pairs() {
        assert!(validate("OK", "value").is_ok());
        assert!(validate("", "v").is_err());
        assert!(validate("A=B", "v").is_err());
        assert!(validate("A\0", "v").is_err());
        assert_eq!(validate("A", "v\0"), Err(WriteError::InvalidValue));
    }

    #[tokio::test]
    async fn command_environment_gets_resolved_values() {
        let snapshot = EnvironmentSnapshot::from_pairs([("HOME", "/root"), ("TOKEN", "sm://t")]);
        let mut result = resolve(InMemoryBackend::new().with_secret("t", "abc"), &snapshot).await;

        let mut env = CommandEnvironment::from_snapshot(&snapshot);
        let written = apply(&mut env, &mut result);

        assert_eq!(written, 1);
        assert_eq!(env.get("HOME"), Some("/root"));
        assert_eq!(env.get("TOKEN"), Some("abc"));
        assert!(!result.has_errors());
        assert_eq!(env.clone().into_vars(), result.environment());
    }

    #[tokio::test]
    async fn write_failure_does_not_block_other_names() {
        let snapshot =
            EnvironmentSnapshot::from_pairs([("A", "sm://a"), ("B", "sm://b"), ("C", "sm://c")]);
        let backend = InMemoryBackend::new()
            .with_secret("a", "1")
            .with_secret("b", "bad\0value")
            .with_secret("c", "3");
        let mut result = resolve(backend, &snapshot).await;

        let mut env = CommandEnvironment::from_snapshot(&snapshot);
        let written = apply(&mut env, &mut result);

        assert_eq!(written, 2);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("sm://b"));
        assert_eq!(env.get("C"), Some("3"));
        assert!(matches!(
            result.errors(),
            [ResolutionError::EnvironmentWriteFailed { name, source: WriteError::InvalidValue }]
                if name == "B"
        ));
    }

    #[tokio::test]
    async fn process_environment_is_updated() {
        let snapshot = EnvironmentSnapshot::from_pairs([("AWSENV_APPLY_TEST", "ssm:///x")]);
        let mut result = resolve(InMemoryBackend::new().with_parameter("/x", "applied"), &snapshot)
            .await;

        temp_env::with_var("AWSENV_APPLY_TEST", Some("ssm:///x"), || {
            let written = apply(&mut ProcessEnvironment::new(), &mut result);
            assert_eq!(written, 1);
            assert_eq!(
                std::env::var("AWSENV_APPLY_TEST").as_deref(),
                Ok("applied")
            );
        });
    }
}
