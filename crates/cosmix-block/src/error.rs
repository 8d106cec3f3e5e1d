//! Parameter store errors.
//!
//! All block errors use the `BLOCK_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`NotFound`](BlockError::NotFound) | `BLOCK_NOT_FOUND` | No |
//! | [`TypeConflict`](BlockError::TypeConflict) | `BLOCK_TYPE_CONFLICT` | No |
//! | [`WrongType`](BlockError::WrongType) | `BLOCK_WRONG_TYPE` | No |
//!
//! # Example
//!
//! ```
//! use cosmix_block::{BlockError, DataBlock};
//! use cosmix_types::ErrorCode;
//!
//! let block = DataBlock::new();
//! let err = block.get_real("cosmological_parameters", "omega_m").unwrap_err();
//! assert_eq!(err.code(), "BLOCK_NOT_FOUND");
//! ```

use crate::value::ValueKind;
use cosmix_types::ErrorCode;
use thiserror::Error;

/// Parameter store error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    /// No value at the address.
    ///
    /// `hint` names the modules that did write to the section, which is
    /// usually enough to spot a pipeline ordering mistake.
    #[error("no value at {section}/{key}{hint}")]
    NotFound {
        section: String,
        key: String,
        hint: String,
    },

    /// A write would change the type tag of an existing value.
    #[error("cannot store {attempted} at {section}/{key}: existing value is {existing}")]
    TypeConflict {
        section: String,
        key: String,
        existing: ValueKind,
        attempted: ValueKind,
    },

    /// A typed read found a value of another tag.
    #[error("value at {section}/{key} is {found}, expected {expected}")]
    WrongType {
        section: String,
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

impl BlockError {
    /// Returns `true` for [`BlockError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ErrorCode for BlockError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "BLOCK_NOT_FOUND",
            Self::TypeConflict { .. } => "BLOCK_TYPE_CONFLICT",
            Self::WrongType { .. } => "BLOCK_WRONG_TYPE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
