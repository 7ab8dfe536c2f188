//! Resolution of a whole environment snapshot
//!
//! Every variable is resolved independently. A failing variable records a
//! [`ResolutionError`] and the pass continues with the next one; the caller
//! decides afterwards whether any error is fatal.

use crate::backend::Backends;
use crate::reference::{BackendKind, SecretReference};
use crate::{EnvironmentSnapshot, ResolutionError, SecureSecret};
use base64::Engine;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Default number of backend calls in flight at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Resolves secret references found in an [`EnvironmentSnapshot`].
#[derive(Debug, Clone)]
pub struct Resolver {
    backends: Backends,
    concurrency: usize,
}

impl Resolver {
    /// Create a resolver over the given backends.
    #[must_use]
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of concurrent backend calls (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve every secret reference in `snapshot`.
    ///
    /// Backend calls run concurrently, but outcomes are merged in snapshot
    /// order so the last pair wins for duplicate names.
    #[tracing::instrument(
        name = "resolve_environment",
        skip_all,
        fields(variables = snapshot.len())
    )]
    pub async fn resolve(&self, snapshot: &EnvironmentSnapshot) -> ResolutionResult {
        let outcomes: Vec<_> = stream::iter(snapshot.iter())
            .map(|(name, raw)| async move {
                let outcome = match SecretReference::parse(raw) {
                    Some(reference) => Some(self.resolve_reference(name, &reference).await),
                    None => None,
                };
                (name, raw, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = ResolutionResult::default();
        for (name, raw, outcome) in outcomes {
            result.raw.insert(name.to_string(), raw.to_string());
            // a later duplicate replaces whatever an earlier one resolved to
            result.secrets.shift_remove(name);
            match outcome {
                None => {}
                Some(Ok(value)) => {
                    result
                        .secrets
                        .insert(name.to_string(), SecureSecret::new(value));
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        variable = %name,
                        kind = err.kind(),
                        error = %err,
                        "Failed to resolve secret"
                    );
                    result.errors.push(err);
                }
            }
        }

        tracing::info!(
            resolved = result.secrets.len(),
            errors = result.errors.len(),
            "Resolved environment"
        );
        result
    }

    async fn resolve_reference(
        &self,
        name: &str,
        reference: &SecretReference,
    ) -> Result<String, ResolutionError> {
        reference
            .validate()
            .map_err(|reason| ResolutionError::MalformedReference {
                name: name.to_string(),
                reason,
            })?;

        let payload = self.fetch(name, reference).await?;

        match &reference.sub_key {
            Some(key) => project_sub_key(name, &payload, key),
            None => Ok(payload),
        }
    }

    async fn fetch(
        &self,
        name: &str,
        reference: &SecretReference,
    ) -> Result<String, ResolutionError> {
        let backend = reference.backend;
        tracing::debug!(variable = %name, backend = %backend, "Fetching secret");

        let fetched = match backend {
            BackendKind::SecretsManager => {
                self.backends
                    .secrets
                    .fetch_secret(&reference.locator)
                    .await
            }
            BackendKind::ParameterStore => {
                self.backends
                    .parameters
                    .fetch_parameter(&reference.locator)
                    .await
            }
            BackendKind::Kms => {
                let ciphertext = decode_ciphertext(name, &reference.locator)?;
                self.backends.kms.decrypt(&ciphertext).await
            }
        };

        fetched.map_err(|source| ResolutionError::BackendCallFailed {
            name: name.to_string(),
            backend,
            source,
        })
    }
}

fn decode_ciphertext(name: &str, locator: &str) -> Result<Vec<u8>, ResolutionError> {
    base64::engine::general_purpose::STANDARD
        .decode(locator)
        .map_err(|e| ResolutionError::MalformedReference {
            name: name.to_string(),
            reason: format!("invalid base64 ciphertext: {e}"),
        })
}

/// Select `key` from a payload holding a JSON object of strings.
fn project_sub_key(name: &str, payload: &str, key: &str) -> Result<String, ResolutionError> {
    // null payload reads as an empty object, a null field as an empty string.
    // serde_json messages can quote payload content, so only the position is kept
    let fields: Option<HashMap<String, Option<String>>> =
        serde_json::from_str(payload).map_err(|e| ResolutionError::MultiValueDecodeFailed {
            name: name.to_string(),
            message: format!(
                "{:?} error at line {} column {}",
                e.classify(),
                e.line(),
                e.column()
            ),
        })?;

    fields
        .and_then(|mut fields| fields.remove(key))
        .map(Option::unwrap_or_default)
        .ok_or_else(|| ResolutionError::SubKeyMissing {
            name: name.to_string(),
            key: key.to_string(),
        })
}

/// Outcome of resolving one snapshot.
///
/// Holds the successfully resolved secrets and every per-variable error.
#[derive(Debug, Default)]
pub struct ResolutionResult {
    raw: IndexMap<String, String>,
    secrets: IndexMap<String, SecureSecret>,
    errors: Vec<ResolutionError>,
}

impl ResolutionResult {
    /// Backend-derived values by variable name, in snapshot order.
    #[must_use]
    pub fn secrets(&self) -> &IndexMap<String, SecureSecret> {
        &self.secrets
    }

    /// The complete resolved environment.
    ///
    /// Plain values are unchanged, resolved references are replaced, and
    /// references that failed keep their raw value.
    #[must_use]
    pub fn environment(&self) -> IndexMap<String, String> {
        let mut environment = self.raw.clone();
        for (name, secret) in &self.secrets {
            environment.insert(name.clone(), secret.expose().to_string());
        }
        environment
    }

    /// Every error recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[ResolutionError] {
        &self.errors
    }

    /// Number of errors recorded so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether any variable failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record an error produced after resolution (e.g. by [`apply`](crate::apply)).
    pub fn push_error(&mut self, error: ResolutionError) {
        self.errors.push(error);
    }

    /// Split into the secrets and the errors.
    #[must_use]
    pub fn into_parts(self) -> (IndexMap<String, SecureSecret>, Vec<ResolutionError>) {
        (self.secrets, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, InMemoryBackend};
    use std::sync::Arc;

    fn resolver(backend: &Arc<InMemoryBackend>) -> Resolver {
        Resolver::new(Backends::from_shared(backend.clone()))
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn value(result: &ResolutionResult, name: &str) -> Option<String> {
        result.secrets().get(name).map(|s| s.expose().to_string())
    }

    #[tokio::test]
    async fn plain_values_pass_through() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("TEST", "somevalue"),
            ("PATH", "/usr/bin:/bin"),
            ("COLOR", "red#blue"),
        ]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(result.secrets().is_empty());
        assert!(!result.has_errors());
        let env = result.environment();
        assert_eq!(env.len(), 3);
        for (name, raw) in snapshot.iter() {
            assert_eq!(env.get(name).map(String::as_str), Some(raw));
        }
        assert_eq!(backend.secret_calls(), 0);
        assert_eq!(backend.parameter_calls(), 0);
        assert_eq!(backend.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn resolves_all_three_backends() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_parameter("/p", "ssm-test")
                .with_secret("/s", "sm-test")
                .with_ciphertext(b"<encrypted>".to_vec(), "kms-test"),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("SSM", "ssm:///p".to_string()),
            ("SM", "sm:///s".to_string()),
            ("KMS", format!("kms://{}", b64(b"<encrypted>"))),
        ]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(!result.has_errors(), "{:?}", result.errors());
        assert_eq!(value(&result, "SSM").as_deref(), Some("ssm-test"));
        assert_eq!(value(&result, "SM").as_deref(), Some("sm-test"));
        assert_eq!(value(&result, "KMS").as_deref(), Some("kms-test"));
        assert_eq!(backend.secret_calls(), 1);
        assert_eq!(backend.parameter_calls(), 1);
        assert_eq!(backend.decrypt_calls(), 1);
    }

    #[tokio::test]
    async fn empty_payload_is_a_valid_secret() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("<secret-path>", "")
                .with_parameter("<parameter-path>", "")
                .with_ciphertext(b"c".to_vec(), ""),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("SM", "sm://<secret-path>".to_string()),
            ("SSM", "ssm://<parameter-path>".to_string()),
            ("KMS", format!("kms://{}", b64(b"c"))),
        ]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(!result.has_errors());
        for name in ["SM", "SSM", "KMS"] {
            assert_eq!(value(&result, name).as_deref(), Some(""), "{name}");
        }
    }

    #[tokio::test]
    async fn projects_sub_key_from_json_payload() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("/secret", r#"{"name":"admin","password":"secret"}"#),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([("TEST", "sm:///secret#password")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(!result.has_errors());
        assert_eq!(value(&result, "TEST").as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn missing_sub_key_is_reported() {
        let backend =
            Arc::new(InMemoryBackend::new().with_parameter("/db", r#"{"user":"admin"}"#));
        let snapshot = EnvironmentSnapshot::from_pairs([("DB_PASSWORD", "ssm:///db#password")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(result.secrets().is_empty());
        assert!(matches!(
            result.errors(),
            [ResolutionError::SubKeyMissing { name, key }]
                if name == "DB_PASSWORD" && key == "password"
        ));
        // the raw reference stays in the pass-through view
        assert_eq!(
            result.environment().get("DB_PASSWORD").map(String::as_str),
            Some("ssm:///db#password")
        );
    }

    #[tokio::test]
    async fn non_object_payload_fails_to_decode() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("plain", "hunter2")
                .with_secret("nested", r#"{"port":5432}"#),
        );
        let snapshot =
            EnvironmentSnapshot::from_pairs([("A", "sm://plain#key"), ("B", "sm://nested#port")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert_eq!(result.error_count(), 2);
        for err in result.errors() {
            assert!(matches!(err, ResolutionError::MultiValueDecodeFailed { .. }));
            assert!(!err.to_string().contains("hunter2"));
            assert!(!err.to_string().contains("5432"));
        }
    }

    #[tokio::test]
    async fn invalid_base64_never_calls_kms() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = EnvironmentSnapshot::from_pairs([("KMS", "kms://not base64!")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(matches!(
            result.errors(),
            [ResolutionError::MalformedReference { name, reason }]
                if name == "KMS" && reason.contains("base64")
        ));
        assert_eq!(backend.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn empty_locator_is_malformed() {
        let backend = Arc::new(InMemoryBackend::new());
        let snapshot = EnvironmentSnapshot::from_pairs([("A", "sm://"), ("B", "ssm://x#")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert_eq!(result.error_count(), 2);
        assert!(
            result
                .errors()
                .iter()
                .all(|e| matches!(e, ResolutionError::MalformedReference { .. }))
        );
        assert_eq!(backend.secret_calls(), 0);
        assert_eq!(backend.parameter_calls(), 0);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("a", "1")
                .with_secret_error("b", BackendError::request("AccessDeniedException"))
                .with_secret("c", "3")
                .with_parameter("d", "4"),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("A", "sm://a"),
            ("B", "sm://b"),
            ("C", "sm://c"),
            ("D", "ssm://d"),
        ]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert_eq!(result.secrets().len(), 3);
        assert_eq!(value(&result, "A").as_deref(), Some("1"));
        assert_eq!(value(&result, "C").as_deref(), Some("3"));
        assert_eq!(value(&result, "D").as_deref(), Some("4"));
        match result.errors() {
            [ResolutionError::BackendCallFailed { name, backend, source }] => {
                assert_eq!(name, "B");
                assert_eq!(*backend, BackendKind::SecretsManager);
                assert!(source.to_string().contains("AccessDeniedException"));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[tokio::test]
    async fn last_duplicate_wins() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("first", "one")
                .with_secret("second", "two"),
        );
        let snapshot =
            EnvironmentSnapshot::from_pairs([("TOKEN", "sm://first"), ("TOKEN", "sm://second")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert_eq!(result.secrets().len(), 1);
        assert_eq!(value(&result, "TOKEN").as_deref(), Some("two"));
        assert_eq!(backend.secret_calls(), 2);
    }

    #[tokio::test]
    async fn later_plain_duplicate_drops_earlier_secret() {
        let backend = Arc::new(InMemoryBackend::new().with_secret("first", "one"));
        let snapshot =
            EnvironmentSnapshot::from_pairs([("TOKEN", "sm://first"), ("TOKEN", "literal")]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert!(result.secrets().is_empty());
        assert_eq!(result.environment()["TOKEN"], "literal");
    }

    #[tokio::test]
    async fn order_is_kept_with_single_slot() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_parameter("z", "26")
                .with_parameter("a", "1"),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([("Z", "ssm://z"), ("A", "ssm://a")]);

        let result = resolver(&backend)
            .with_concurrency(0)
            .resolve(&snapshot)
            .await;

        let names: Vec<_> = result.secrets().keys().cloned().collect();
        assert_eq!(names, vec!["Z".to_string(), "A".to_string()]);
    }

    #[test]
    fn project_sub_key_selects_field() {
        let payload = r#"{"user":"admin","password":"s3cret"}"#;
        assert_eq!(project_sub_key("X", payload, "user").unwrap(), "admin");
        assert!(matches!(
            project_sub_key("X", payload, "missing"),
            Err(ResolutionError::SubKeyMissing { .. })
        ));
    }

    #[tokio::test]
    async fn null_fields_and_null_payload_are_accepted() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_secret("mixed", r#"{"a":null,"b":"x"}"#)
                .with_secret("nothing", "null"),
        );
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("A", "sm://mixed#a"),
            ("B", "sm://mixed#b"),
            ("N", "sm://nothing#k"),
        ]);

        let result = resolver(&backend).resolve(&snapshot).await;

        assert_eq!(value(&result, "A").as_deref(), Some(""));
        assert_eq!(value(&result, "B").as_deref(), Some("x"));
        assert!(value(&result, "N").is_none());
        match result.errors() {
            [ResolutionError::SubKeyMissing { name, key }] => {
                assert_eq!(name, "N");
                assert_eq!(key, "k");
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }
}
