//! Application-level error type.
//!
//! [`RunError`] collects every failure a run can end with. Wrapped errors
//! keep their own codes; the variants raised by the driver itself use the
//! `RUN_` prefix.

use cosmix_runtime::{ConfigError, OutputError, PipelineError, PoolError, SamplerError};
use cosmix_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Unified run error.
///
/// # Example
///
/// ```
/// use cosmix_app::RunError;
/// use cosmix_runtime::ConfigError;
/// use cosmix_types::ErrorCode;
///
/// let err: RunError = ConfigError::missing("pipeline", "modules").into();
/// assert_eq!(err.code(), "CONFIG_MISSING_OPTION");
/// assert!(err.is_configuration());
/// ```
#[derive(Debug, Error)]
pub enum RunError {
    /// Parameter file, overrides, values or priors were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The worker threads could not be started.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Building or evaluating the pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The sampler failed.
    #[error(transparent)]
    Sampler(SamplerError),

    /// Writing the chain failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A module needs a file that does not exist.
    #[error("module '{module}' needs {path}, which does not exist")]
    MissingDependency { module: String, path: PathBuf },

    /// Postprocessing could not summarise the chain.
    #[error("postprocess: {0}")]
    Postprocess(String),

    /// Filesystem failure outside the chain writer.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    /// Returns `true` for errors raised before any module executed.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Pipeline(e) => e.is_configuration(),
            Self::Sampler(e) => matches!(
                e,
                SamplerError::Unknown(_) | SamplerError::Config(_) | SamplerError::InvalidOption { .. }
            ),
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<SamplerError> for RunError {
    fn from(e: SamplerError) -> Self {
        match e {
            SamplerError::Cancelled => Self::Cancelled,
            SamplerError::Pipeline(e) => Self::Pipeline(e),
            other => Self::Sampler(other),
        }
    }
}

impl ErrorCode for RunError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.code(),
            Self::Pool(e) => e.code(),
            Self::Pipeline(e) => e.code(),
            Self::Sampler(e) => e.code(),
            Self::Output(e) => e.code(),
            Self::MissingDependency { .. } => "RUN_MISSING_DEPENDENCY",
            Self::Postprocess(_) => "RUN_POSTPROCESS",
            Self::Io { .. } => "RUN_IO",
            Self::Cancelled => "RUN_CANCELLED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingDependency { .. } => true,
            Self::Io { .. } => true,
            Self::Config(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::assert_error_codes;

    #[test]
    fn own_codes_follow_convention() {
        assert_error_codes(
            &[
                RunError::MissingDependency {
                    module: "sn".into(),
                    path: "data/sn.txt".into(),
                },
                RunError::Postprocess("no valid samples".into()),
                RunError::io("out", std::io::Error::other("disk full")),
                RunError::Cancelled,
            ],
            "RUN_",
        );
    }

    #[test]
    fn sampler_errors_unwrap() {
        assert!(matches!(RunError::from(SamplerError::Cancelled), RunError::Cancelled));
        let err = RunError::from(SamplerError::Pipeline(PipelineError::NoModules));
        assert_eq!(err.code(), "PIPELINE_NO_MODULES");
        assert!(err.is_configuration());
        let err = RunError::from(SamplerError::InvalidStart("x".into()));
        assert_eq!(err.code(), "SAMPLER_INVALID_START");
        assert!(!err.is_configuration());
    }

    #[test]
    fn missing_dependency_is_recoverable() {
        let err = RunError::MissingDependency {
            module: "sn".into(),
            path: "data/sn.txt".into(),
        };
        assert!(err.is_recoverable());
        assert!(!RunError::Cancelled.is_recoverable());
    }
}
