//! Result of one module execution.

use serde::{Deserialize, Serialize};

/// Non-fatal result of [`Module::execute`](crate::Module::execute).
///
/// `InvalidPoint` means the parameter point is outside the module's domain
/// of validity (unphysical combination, failed convergence at that point).
/// The pipeline stops, the evaluation gets a likelihood of −∞ and the run
/// carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    InvalidPoint(String),
}

impl Outcome {
    /// Shorthand for [`Outcome::InvalidPoint`].
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPoint(reason.into())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::InvalidPoint(reason) => write!(f, "invalid point: {reason}"),
        }
    }
}
