//! Environment snapshot captured once per run

use std::ffi::OsString;

/// Ordered `(name, value)` pairs captured from the environment.
///
/// Names are not required to be unique. Each pair is resolved on its own
/// and duplicates are merged last-write-wins when results are written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pairs: Vec<(String, String)>,
}

impl EnvironmentSnapshot {
    /// Capture the current process environment.
    ///
    /// Entries that are not valid UTF-8 are skipped. They cannot hold a
    /// secret reference and stay untouched in the process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Build a snapshot from OS strings, skipping non UTF-8 entries.
    #[must_use]
    pub fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let pairs = pairs
            .into_iter()
            .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => Some((name, value)),
                (Ok(name), Err(_)) => {
                    tracing::debug!(variable = %name, "Skipping non UTF-8 environment value");
                    None
                }
                (Err(name), _) => {
                    tracing::debug!(variable = ?name, "Skipping non UTF-8 environment name");
                    None
                }
            })
            .collect();
        Self { pairs }
    }

    /// Build a snapshot from explicit pairs.
    #[must_use]
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect()
    }

    /// Iterate over the pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of captured pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(String, String)> for EnvironmentSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}
