//! What to do when some variables failed to resolve

use crate::ResolutionResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate failure returned by [`ErrorPolicy::check`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{count} errors occurred - check logs")]
pub struct ResolutionFailed {
    /// Number of per-variable errors
    pub count: usize,
}

/// Policy applied to the errors collected during a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Any error aborts the run before the target process is launched
    #[default]
    Fail,
    /// Errors are logged and the target is launched with what resolved
    Warn,
}

impl ErrorPolicy {
    /// Apply the policy to a finished result.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionFailed`] under [`ErrorPolicy::Fail`] when the
    /// result holds at least one error.
    pub fn check(self, result: &ResolutionResult) -> Result<(), ResolutionFailed> {
        let count = result.error_count();
        if count == 0 {
            return Ok(());
        }
        match self {
            Self::Fail => Err(ResolutionFailed { count }),
            Self::Warn => {
                tracing::warn!(errors = count, "Continuing with a partially resolved environment");
                Ok(())
            }
        }
    }
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "warn" => Ok(Self::Warn),
            _ => Err(format!("Unknown error policy: {s}")),
        }
    }
}
