//! Unified error interface for cosmix.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so the run
//! driver, samplers and the CLI can report failures uniformly.
//!
//! # Example
//!
//! ```
//! use cosmix_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum SolverError {
//!     NoConvergence,
//!     BadGrid,
//! }
//!
//! impl ErrorCode for SolverError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NoConvergence => "SOLVER_NO_CONVERGENCE",
//!             Self::BadGrid => "SOLVER_BAD_GRID",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::NoConvergence)
//!     }
//! }
//!
//! assert_eq!(SolverError::BadGrid.code(), "SOLVER_BAD_GRID");
//! assert!(SolverError::NoConvergence.is_recoverable());
//! ```

/// Unified error code interface for cosmix errors.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"BLOCK_NOT_FOUND"`
/// - **Crate-prefixed**: `BLOCK_`, `MODULE_`, `CONFIG_`, `PIPELINE_`,
///   `SAMPLER_`, `OUTPUT_`, `RUN_`
/// - **Stable**: codes are part of the CLI contract (`[CODE] message`)
///
/// # Recoverability
///
/// An error is recoverable when the caller can reasonably carry on:
/// a missing external dataset can be skipped by a test harness, an
/// interrupted run can be resumed. Configuration errors and fatal module
/// failures are never recoverable.
pub trait ErrorCode {
    /// Stable machine-readable code, printed by the CLI as `[CODE]`.
    fn code(&self) -> &'static str;

    /// Whether a caller may skip or retry instead of aborting.
    fn is_recoverable(&self) -> bool;
}

/// Checks one error's code against the workspace conventions.
///
/// # Panics
///
/// If the code is empty, does not start with `prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// ```
/// use cosmix_types::{assert_error_code, ErrorCode};
///
/// struct MissingData;
///
/// impl ErrorCode for MissingData {
///     fn code(&self) -> &'static str { "DATA_MISSING" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&MissingData, "DATA_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "empty error code");
    assert!(
        code.starts_with(prefix),
        "error code {code} lacks the {prefix} prefix"
    );
    assert!(
        is_upper_snake_case(code),
        "error code {code} is not UPPER_SNAKE_CASE"
    );
}

/// [`assert_error_code`] over every listed variant.
///
/// ```
/// use cosmix_types::{assert_error_codes, ErrorCode};
///
/// enum GridError { Empty, Unsorted }
///
/// impl ErrorCode for GridError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Empty => "GRID_EMPTY",
///             Self::Unsorted => "GRID_UNSORTED",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[GridError::Empty, GridError::Unsorted], "GRID_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], prefix: &str) {
    errors.iter().for_each(|e| assert_error_code(e, prefix));
}

/// Non-empty words of `A-Z0-9` joined by single underscores.
fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && s.split('_').all(|word| {
            !word.is_empty()
                && word
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    enum DataError {
        MissingFile,
        Malformed,
    }

    impl ErrorCode for DataError {
        fn code(&self) -> &'static str {
            match self {
                Self::MissingFile => "DATA_MISSING_FILE",
                Self::Malformed => "DATA_MALFORMED",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::MissingFile)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(DataError::MissingFile.code(), "DATA_MISSING_FILE");
        assert!(DataError::MissingFile.is_recoverable());
        assert!(!DataError::Malformed.is_recoverable());
        assert_error_codes(&[DataError::MissingFile, DataError::Malformed], "DATA_");
    }

    #[test]
    #[should_panic(expected = "lacks the BLOCK_ prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&DataError::Malformed, "BLOCK_");
    }

    #[test]
    fn snake_case_words() {
        assert!(is_upper_snake_case("SAMPLER_INVALID_START"));
        assert!(is_upper_snake_case("OUTPUT_2D"));
        for bad in ["", "run_io", "_RUN", "RUN_", "RUN__IO", "RUN-IO"] {
            assert!(!is_upper_snake_case(bad), "{bad}");
        }
    }
}
