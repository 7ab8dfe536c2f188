//! Secret reference resolution for awsenv
//!
//! Environment variables may hold *references* to secrets instead of the
//! secrets themselves:
//!
//! | Reference                      | Backend                   |
//! |--------------------------------|---------------------------|
//! | `sm://<secret-id>[#<key>]`     | Secrets Manager           |
//! | `ssm://<parameter>[#<key>]`    | SSM Parameter Store       |
//! | `kms://<base64-ciphertext>`    | KMS decrypt               |
//!
//! This crate turns a snapshot of the process environment into the resolved
//! environment. Backends are reached through three narrow capability traits
//! ([`SecretStore`], [`ParameterStore`], [`Decrypter`]) so the resolution
//! logic never depends on a transport SDK.
//!
//! # Example
//!
//! ```ignore
//! use awsenv_secrets::{CommandEnvironment, EnvironmentSnapshot, ErrorPolicy, Resolver, apply};
//!
//! let snapshot = EnvironmentSnapshot::capture();
//! let mut result = Resolver::new(backends).resolve(&snapshot).await;
//!
//! let mut env = CommandEnvironment::from_snapshot(&snapshot);
//! apply(&mut env, &mut result);
//!
//! ErrorPolicy::Fail.check(&result)?;
//! ```
//!
//! Resolution never stops at the first failing variable. Every error is
//! collected in the [`ResolutionResult`] and the caller decides what to do
//! with them through an [`ErrorPolicy`].

mod apply;
pub mod backend;
mod policy;
pub mod reference;
mod resolver;
mod snapshot;
mod types;

pub use apply::{CommandEnvironment, EnvironmentSink, ProcessEnvironment, WriteError, apply};
pub use backend::{
    BackendError, Backends, Decrypter, InMemoryBackend, ParameterStore, SecretStore,
};
pub use policy::{ErrorPolicy, ResolutionFailed};
pub use reference::{BackendKind, SecretReference};
pub use resolver::{DEFAULT_CONCURRENCY, ResolutionResult, Resolver};
pub use snapshot::EnvironmentSnapshot;
pub use types::SecureSecret;

use thiserror::Error;

/// Per-variable failure recorded during resolution or while applying results.
///
/// Every variant carries the name of the environment variable it belongs to.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The backend call for the variable failed
    #[error("failed to get secret from {backend}: {name:?}: {source}")]
    BackendCallFailed {
        /// Variable name
        name: String,
        /// Backend that was called
        backend: BackendKind,
        /// Underlying backend error
        #[source]
        source: BackendError,
    },

    /// A sub-key was requested but the payload is not a JSON object of strings
    #[error("failed to unmarshal multi-value secret: {name:?}: {message}")]
    MultiValueDecodeFailed {
        /// Variable name
        name: String,
        /// Decoder message
        message: String,
    },

    /// The payload decoded but does not contain the requested sub-key
    #[error("failed to get multi-value secret with key ({key:?}): {name:?}")]
    SubKeyMissing {
        /// Variable name
        name: String,
        /// The requested sub-key
        key: String,
    },

    /// The value carries a backend prefix but cannot be used as a reference
    #[error("malformed secret reference in {name:?}: {reason}")]
    MalformedReference {
        /// Variable name
        name: String,
        /// Why the reference was rejected
        reason: String,
    },

    /// The resolved value could not be written to the environment
    #[error("failed to set environment variable: {name:?}: {source}")]
    EnvironmentWriteFailed {
        /// Variable name
        name: String,
        /// Underlying write error
        #[source]
        source: WriteError,
    },
}

impl ResolutionError {
    /// Name of the environment variable this error belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::BackendCallFailed { name, .. }
            | Self::MultiValueDecodeFailed { name, .. }
            | Self::SubKeyMissing { name, .. }
            | Self::MalformedReference { name, .. }
            | Self::EnvironmentWriteFailed { name, .. } => name,
        }
    }

    /// Short machine-readable tag for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BackendCallFailed { .. } => "backend_call_failed",
            Self::MultiValueDecodeFailed { .. } => "multi_value_decode_failed",
            Self::SubKeyMissing { .. } => "sub_key_missing",
            Self::MalformedReference { .. } => "malformed_reference",
            Self::EnvironmentWriteFailed { .. } => "environment_write_failed",
        }
    }
}
