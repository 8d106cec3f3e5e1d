//! Configuration errors.
//!
//! Every configuration error is detected before any module executes and
//! none is recoverable: the run never starts.
//!
//! | Error | Code |
//! |-------|------|
//! | [`ReadFile`](ConfigError::ReadFile) | `CONFIG_READ_FILE` |
//! | [`ParseToml`](ConfigError::ParseToml) | `CONFIG_PARSE_TOML` |
//! | [`UnsupportedValue`](ConfigError::UnsupportedValue) | `CONFIG_UNSUPPORTED_VALUE` |
//! | [`InvalidEnvVar`](ConfigError::InvalidEnvVar) | `CONFIG_INVALID_ENV_VAR` |
//! | [`UnknownOption`](ConfigError::UnknownOption) | `CONFIG_UNKNOWN_OPTION` |
//! | [`InvalidOverride`](ConfigError::InvalidOverride) | `CONFIG_INVALID_OVERRIDE` |
//! | [`InvalidAssignment`](ConfigError::InvalidAssignment) | `CONFIG_INVALID_ASSIGNMENT` |
//! | [`UnknownParameter`](ConfigError::UnknownParameter) | `CONFIG_UNKNOWN_PARAMETER` |
//! | [`InvalidParameter`](ConfigError::InvalidParameter) | `CONFIG_INVALID_PARAMETER` |
//! | [`InvalidPrior`](ConfigError::InvalidPrior) | `CONFIG_INVALID_PRIOR` |
//! | [`MissingOption`](ConfigError::MissingOption) | `CONFIG_MISSING_OPTION` |
//! | [`InvalidOption`](ConfigError::InvalidOption) | `CONFIG_INVALID_OPTION` |

use cosmix_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A TOML value has no parameter store representation.
    #[error("unsupported value for {section}/{key}: {message}")]
    UnsupportedValue {
        section: String,
        key: String,
        message: String,
    },

    /// Invalid environment variable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    /// An override names an option that is not in the configuration.
    #[error("override of unknown option {section}/{key}")]
    UnknownOption { section: String, key: String },

    /// An override value cannot be parsed as the option's type.
    #[error("cannot override {section}/{key} with '{value}': expected {expected}")]
    InvalidOverride {
        section: String,
        key: String,
        value: String,
        expected: String,
    },

    /// An override or injection is not of the form `section.key=value`.
    #[error("invalid assignment '{0}': expected section.key=value")]
    InvalidAssignment(String),

    /// A variable injection names a parameter that is not declared.
    #[error("cannot set {section}/{key}: not a declared parameter")]
    UnknownParameter { section: String, key: String },

    /// A parameter declaration in the values file is malformed.
    #[error("invalid parameter {section}/{key}: {message}")]
    InvalidParameter {
        section: String,
        key: String,
        message: String,
    },

    /// A prior declaration is malformed.
    #[error("invalid prior for {section}/{key}: {message}")]
    InvalidPrior {
        section: String,
        key: String,
        message: String,
    },

    /// A required option is absent.
    #[error("missing option {section}/{key}")]
    MissingOption { section: String, key: String },

    /// An option is present but unusable.
    #[error("invalid option {section}/{key}: {message}")]
    InvalidOption {
        section: String,
        key: String,
        message: String,
    },
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        Self::MissingOption {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid_option(section: &str, key: &str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            section: section.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_parameter(section: &str, key: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            section: section.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_prior(section: &str, key: &str, message: impl Into<String>) -> Self {
        Self::InvalidPrior {
            section: section.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::UnsupportedValue { .. } => "CONFIG_UNSUPPORTED_VALUE",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
            Self::UnknownOption { .. } => "CONFIG_UNKNOWN_OPTION",
            Self::InvalidOverride { .. } => "CONFIG_INVALID_OVERRIDE",
            Self::InvalidAssignment(_) => "CONFIG_INVALID_ASSIGNMENT",
            Self::UnknownParameter { .. } => "CONFIG_UNKNOWN_PARAMETER",
            Self::InvalidParameter { .. } => "CONFIG_INVALID_PARAMETER",
            Self::InvalidPrior { .. } => "CONFIG_INVALID_PRIOR",
            Self::MissingOption { .. } => "CONFIG_MISSING_OPTION",
            Self::InvalidOption { .. } => "CONFIG_INVALID_OPTION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
