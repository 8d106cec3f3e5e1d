//! Pipeline errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Raised |
//! |-------|------|--------|
//! | [`Config`](PipelineError::Config) | `PIPELINE_CONFIG` | build |
//! | [`NoModules`](PipelineError::NoModules) | `PIPELINE_NO_MODULES` | build |
//! | [`UnknownModule`](PipelineError::UnknownModule) | `PIPELINE_UNKNOWN_MODULE` | build |
//! | [`Configure`](PipelineError::Configure) | `PIPELINE_CONFIGURE` | build |
//! | [`InvalidExtraOutput`](PipelineError::InvalidExtraOutput) | `PIPELINE_INVALID_EXTRA_OUTPUT` | build |
//! | [`Dimension`](PipelineError::Dimension) | `PIPELINE_DIMENSION` | evaluate |
//! | [`Block`](PipelineError::Block) | `PIPELINE_BLOCK` | evaluate |
//! | [`Module`](PipelineError::Module) | `PIPELINE_MODULE_FAILED` | evaluate |
//! | [`MissingLikelihood`](PipelineError::MissingLikelihood) | `PIPELINE_MISSING_LIKELIHOOD` | evaluate |
//! | [`ExtraOutput`](PipelineError::ExtraOutput) | `PIPELINE_EXTRA_OUTPUT` | evaluate |
//!
//! Build errors are configuration errors ([`PipelineError::is_configuration`]).
//! Evaluate errors are fatal and abort the run.

use crate::config::ConfigError;
use cosmix_block::BlockError;
use cosmix_module::ModuleError;
use cosmix_types::ErrorCode;
use thiserror::Error;

/// Pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A `[pipeline]` option is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `[pipeline] modules` is empty.
    #[error("no modules listed in [pipeline] modules")]
    NoModules,

    /// No registered implementation for a pipeline entry.
    #[error("module '{name}': unknown kind '{kind}'")]
    UnknownModule { name: String, kind: String },

    /// A module rejected its configuration.
    #[error("module '{module}' failed to configure: {source}")]
    Configure {
        module: String,
        #[source]
        source: ModuleError,
    },

    /// An `extra_output` entry is not `section/key` or `section/key#n`.
    #[error("invalid extra output '{0}': expected section/key or section/key#n")]
    InvalidExtraOutput(String),

    /// A point has the wrong number of coordinates.
    #[error("point has {got} coordinates, expected {expected}")]
    Dimension { expected: usize, got: usize },

    /// Writing parameters into the evaluation store failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// A module failed fatally during execution.
    #[error("module '{module}' failed: {source}")]
    Module {
        module: String,
        #[source]
        source: ModuleError,
    },

    /// A declared likelihood was not produced.
    #[error("likelihood '{name}' was not produced (expected likelihoods/{name}_like)")]
    MissingLikelihood { name: String },

    /// A declared extra output is missing or has the wrong shape.
    #[error("extra output {output}: {message}")]
    ExtraOutput { output: String, message: String },
}

impl PipelineError {
    /// Returns `true` for errors raised while building the pipeline.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::NoModules
                | Self::UnknownModule { .. }
                | Self::Configure { .. }
                | Self::InvalidExtraOutput(_)
        )
    }
}

impl ErrorCode for PipelineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "PIPELINE_CONFIG",
            Self::NoModules => "PIPELINE_NO_MODULES",
            Self::UnknownModule { .. } => "PIPELINE_UNKNOWN_MODULE",
            Self::Configure { .. } => "PIPELINE_CONFIGURE",
            Self::InvalidExtraOutput(_) => "PIPELINE_INVALID_EXTRA_OUTPUT",
            Self::Dimension { .. } => "PIPELINE_DIMENSION",
            Self::Block(_) => "PIPELINE_BLOCK",
            Self::Module { .. } => "PIPELINE_MODULE_FAILED",
            Self::MissingLikelihood { .. } => "PIPELINE_MISSING_LIKELIHOOD",
            Self::ExtraOutput { .. } => "PIPELINE_EXTRA_OUTPUT",
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
            PipelineError::Config(ConfigError::missing("pipeline", "modules")),
            PipelineError::NoModules,
            PipelineError::UnknownModule {
                name: "a".into(),
                kind: "b".into(),
            },
            PipelineError::Configure {
                module: "a".into(),
                source: ModuleError::Config("x".into()),
            },
            PipelineError::InvalidExtraOutput("x".into()),
            PipelineError::Dimension {
                expected: 2,
                got: 1,
            },
            PipelineError::Module {
                module: "a".into(),
                source: ModuleError::ExecutionFailed("x".into()),
            },
            PipelineError::MissingLikelihood { name: "bao".into() },
            PipelineError::ExtraOutput {
                output: "a/b".into(),
                message: "missing".into(),
            },
        ];
        assert_error_codes(&errors, "PIPELINE_");
        assert_eq!(errors.iter().filter(|e| e.is_configuration()).count(), 5);
    }

    #[test]
    fn configure_message_names_module() {
        let err = PipelineError::Configure {
            module: "consistency".into(),
            source: ModuleError::Config("h0 is derived".into()),
        };
        assert_eq!(
            err.to_string(),
            "module 'consistency' failed to configure: configuration error: h0 is derived"
        );
    }
}
