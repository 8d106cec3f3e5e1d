//! Output errors.

use cosmix_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Output writer error.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Writing or reading a file failed.
    #[error("output file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `[output] format` names no known writer.
    #[error("unknown output format '{0}' (expected text or none)")]
    UnknownFormat(String),

    /// `record` or `comment` before `begin`.
    #[error("output written before begin()")]
    NotStarted,

    /// A row has the wrong number of values.
    #[error("row has {got} values, expected {expected}")]
    RowWidth { expected: usize, got: usize },

    /// A chain file could not be parsed.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl OutputError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl ErrorCode for OutputError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "OUTPUT_IO",
            Self::UnknownFormat(_) => "OUTPUT_UNKNOWN_FORMAT",
            Self::NotStarted => "OUTPUT_NOT_STARTED",
            Self::RowWidth { .. } => "OUTPUT_ROW_WIDTH",
            Self::Parse { .. } => "OUTPUT_PARSE",
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
        assert_error_codes(
            &[
                OutputError::io("x", std::io::Error::other("disk full")),
                OutputError::UnknownFormat("fits".into()),
                OutputError::NotStarted,
                OutputError::RowWidth {
                    expected: 3,
                    got: 2,
                },
                OutputError::Parse {
                    path: "x".into(),
                    line: 1,
                    message: "bad".into(),
                },
            ],
            "OUTPUT_",
        );
    }
}
