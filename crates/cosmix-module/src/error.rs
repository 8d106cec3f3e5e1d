//! Module layer errors.
//!
//! Errors a module returns from `configure`, `execute` or `cleanup`.
//! An `Err` from `execute` is a fatal failure that aborts the run; an
//! unphysical point is not an error and is reported through
//! [`Outcome::InvalidPoint`](crate::Outcome::InvalidPoint) instead.
//!
//! # Error Code Convention
//!
//! All module errors use the `MODULE_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`MissingOption`](ModuleError::MissingOption) | `MODULE_MISSING_OPTION` | No |
//! | [`InvalidOption`](ModuleError::InvalidOption) | `MODULE_INVALID_OPTION` | No |
//! | [`Config`](ModuleError::Config) | `MODULE_CONFIG` | No |
//! | [`Block`](ModuleError::Block) | `MODULE_BLOCK` | No |
//! | [`Io`](ModuleError::Io) | `MODULE_IO` | No |
//! | [`ExecutionFailed`](ModuleError::ExecutionFailed) | `MODULE_EXECUTION_FAILED` | No |
//!
//! # Example
//!
//! ```
//! use cosmix_module::ModuleError;
//! use cosmix_types::ErrorCode;
//!
//! let err = ModuleError::missing("sn_like", "data_file");
//! assert_eq!(err.code(), "MODULE_MISSING_OPTION");
//! assert_eq!(err.to_string(), "missing option sn_like/data_file");
//! ```

use cosmix_block::BlockError;
use cosmix_types::ErrorCode;
use thiserror::Error;

/// Module layer error.
#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    /// A required option is absent from the module's section.
    #[error("missing option {section}/{key}")]
    MissingOption { section: String, key: String },

    /// An option is present but unusable.
    #[error("invalid option {section}/{key}: {reason}")]
    InvalidOption {
        section: String,
        key: String,
        reason: String,
    },

    /// The configuration is inconsistent as a whole.
    #[error("configuration error: {0}")]
    Config(String),

    /// A parameter store access failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// A file could not be read or written.
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    /// The computation itself failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl ModuleError {
    /// Shorthand for [`ModuleError::MissingOption`].
    #[must_use]
    pub fn missing(section: &str, key: &str) -> Self {
        Self::MissingOption {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    /// Shorthand for [`ModuleError::InvalidOption`].
    #[must_use]
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds [`ModuleError::Io`] from a path and an I/O error.
    #[must_use]
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl ErrorCode for ModuleError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingOption { .. } => "MODULE_MISSING_OPTION",
            Self::InvalidOption { .. } => "MODULE_INVALID_OPTION",
            Self::Config(_) => "MODULE_CONFIG",
            Self::Block(_) => "MODULE_BLOCK",
            Self::Io { .. } => "MODULE_IO",
            Self::ExecutionFailed(_) => "MODULE_EXECUTION_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        let errors = vec![
            ModuleError::missing("a", "b"),
            ModuleError::invalid("a", "b", "negative"),
            ModuleError::Config("bad".into()),
            ModuleError::Block(BlockError::NotFound {
                section: "a".into(),
                key: "b".into(),
                hint: String::new(),
            }),
            ModuleError::Io {
                path: "x".into(),
                message: "gone".into(),
            },
            ModuleError::ExecutionFailed("nan".into()),
        ];
        assert_error_codes(&errors, "MODULE_");
        assert!(errors.iter().all(|e| !e.is_recoverable()));
    }

    #[test]
    fn block_errors_convert() {
        fn read() -> Result<(), ModuleError> {
            Err(BlockError::NotFound {
                section: "distances".into(),
                key: "z".into(),
                hint: String::new(),
            })?;
            Ok(())
        }
        let err = read().unwrap_err();
        assert_eq!(err.code(), "MODULE_BLOCK");
        assert_eq!(err.to_string(), "no value at distances/z");
    }
}
