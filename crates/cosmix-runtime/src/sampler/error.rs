//! Sampler errors.
//!
//! # Error Code Convention
//!
//! | Error | Code |
//! |-------|------|
//! | [`Unknown`](SamplerError::Unknown) | `SAMPLER_UNKNOWN` |
//! | [`Config`](SamplerError::Config) | `SAMPLER_CONFIG` |
//! | [`InvalidOption`](SamplerError::InvalidOption) | `SAMPLER_INVALID_OPTION` |
//! | [`NoVaryingParameters`](SamplerError::NoVaryingParameters) | `SAMPLER_NO_VARYING` |
//! | [`InvalidStart`](SamplerError::InvalidStart) | `SAMPLER_INVALID_START` |
//! | [`InvalidPoint`](SamplerError::InvalidPoint) | `SAMPLER_INVALID_POINT` |
//! | [`Pipeline`](SamplerError::Pipeline) | `SAMPLER_PIPELINE` |
//! | [`Output`](SamplerError::Output) | `SAMPLER_OUTPUT` |
//! | [`Checkpoint`](SamplerError::Checkpoint) | `SAMPLER_CHECKPOINT` |
//! | [`Cancelled`](SamplerError::Cancelled) | `SAMPLER_CANCELLED` |

use crate::config::ConfigError;
use crate::output::OutputError;
use crate::pipeline::PipelineError;
use cosmix_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Sampler error.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// `[runtime] sampler` names no known sampler.
    #[error("unknown sampler '{0}' (expected test, grid, metropolis or emcee)")]
    Unknown(String),

    /// A sampler option has the wrong type.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A sampler option is out of range.
    #[error("[{sampler}] {key}: {message}")]
    InvalidOption {
        sampler: &'static str,
        key: &'static str,
        message: String,
    },

    /// The sampler needs at least one varying parameter.
    #[error("sampler '{0}' needs at least one varying parameter")]
    NoVaryingParameters(&'static str),

    /// No valid starting point could be found.
    #[error("no valid starting point: {0}")]
    InvalidStart(String),

    /// The single evaluation was invalid and `fatal_errors` is set.
    #[error("invalid point: {0}")]
    InvalidPoint(String),

    /// A pipeline evaluation failed fatally.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Writing sampler output failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Reading or writing the resume file failed.
    #[error("checkpoint {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

impl SamplerError {
    pub(crate) fn invalid(sampler: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            sampler,
            key,
            message: message.into(),
        }
    }

    pub(crate) fn checkpoint(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Checkpoint {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl ErrorCode for SamplerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "SAMPLER_UNKNOWN",
            Self::Config(_) => "SAMPLER_CONFIG",
            Self::InvalidOption { .. } => "SAMPLER_INVALID_OPTION",
            Self::NoVaryingParameters(_) => "SAMPLER_NO_VARYING",
            Self::InvalidStart(_) => "SAMPLER_INVALID_START",
            Self::InvalidPoint(_) => "SAMPLER_INVALID_POINT",
            Self::Pipeline(_) => "SAMPLER_PIPELINE",
            Self::Output(_) => "SAMPLER_OUTPUT",
            Self::Checkpoint { .. } => "SAMPLER_CHECKPOINT",
            Self::Cancelled => "SAMPLER_CANCELLED",
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
                SamplerError::Unknown("nested".into()),
                SamplerError::Config(ConfigError::missing("grid", "nsample_dimension")),
                SamplerError::invalid("grid", "nsample_dimension", "must be positive"),
                SamplerError::NoVaryingParameters("grid"),
                SamplerError::InvalidStart("all walkers invalid".into()),
                SamplerError::InvalidPoint("bad".into()),
                SamplerError::Pipeline(PipelineError::NoModules),
                SamplerError::Output(OutputError::NotStarted),
                SamplerError::checkpoint("chain.txt.resume.json", "corrupt"),
                SamplerError::Cancelled,
            ],
            "SAMPLER_",
        );
    }
}
