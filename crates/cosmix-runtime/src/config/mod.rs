//! Run configuration.
//!
//! # Architecture
//!
//! ```text
//! ConfigLoader.load()        →  Config (file + COSMIX_* env)
//!                                  │
//!                                  ▼
//! Resolver.resolve()         →  caller overrides
//!                               values / priors files → ParameterSpace
//!                               variable injections
//!                                  │
//!                                  ▼
//!                              Resolved { config, space }
//! ```
//!
//! The configuration is a [`DataBlock`] keyed by `(section, key)`, so
//! overrides use the same addressing as module outputs.

mod error;
mod loader;
mod resolver;

pub use error::ConfigError;
pub use loader::{
    apply_env_overrides, expand_vars, load_toml_file, parse_toml_document, ConfigLoader,
    ENV_PREFIX,
};
pub use resolver::{Assignment, ConfigResolver, Overrides, Resolved, Resolver, Variables};

use cosmix_block::{split_list, DataBlock, FromValue, Value, ValueKind};
use cosmix_module::resolve_against;
use std::path::{Path, PathBuf};

/// Resolved configuration store.
///
/// Read-only once the pipeline is built.
#[derive(Debug, Clone, Default)]
pub struct Config {
    block: DataBlock,
    source: Option<PathBuf>,
}

impl Config {
    #[must_use]
    pub fn new(block: DataBlock) -> Self {
        Self {
            block,
            source: None,
        }
    }

    /// Parses TOML text, without environment expansion.
    ///
    /// # Errors
    ///
    /// See [`parse_toml_document`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(parse_toml_document(content, Path::new("<inline>"), false)?))
    }

    /// Records the file the configuration came from.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Directory relative paths in the configuration resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Resolves a path option value against [`base_dir`](Self::base_dir).
    #[must_use]
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        resolve_against(self.base_dir(), raw)
    }

    pub fn block(&self) -> &DataBlock {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut DataBlock {
        &mut self.block
    }

    #[must_use]
    pub fn has(&self, section: &str, key: &str) -> bool {
        self.block.has(section, key)
    }

    /// Typed read with lenient string parsing; `None` if absent.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOption`] if present but not convertible.
    pub fn get<T: FromValue>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        let Ok(value) = self.block.get(section, key) else {
            return Ok(None);
        };
        if let Some(v) = T::from_value(value) {
            return Ok(Some(v));
        }
        if let Value::Str(text) = value {
            if T::KIND != ValueKind::Str {
                if let Some(v) = Value::parse_as(T::KIND, text).and_then(|p| T::from_value(&p)) {
                    return Ok(Some(v));
                }
            }
        }
        Err(ConfigError::invalid_option(
            section,
            key,
            format!("expected {}, found {}", T::KIND, value.kind()),
        ))
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_or<T: FromValue>(&self, section: &str, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(section, key)?.unwrap_or(default))
    }

    /// Required string option.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingOption`] if absent.
    pub fn require_str(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.get::<String>(section, key)?
            .ok_or_else(|| ConfigError::missing(section, key))
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_bool_or(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.get_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_int_or(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError> {
        self.get_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_real_or(&self, section: &str, key: &str, default: f64) -> Result<f64, ConfigError> {
        self.get_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_str_or(&self, section: &str, key: &str, default: &str) -> Result<String, ConfigError> {
        self.get_or(section, key, default.to_string())
    }

    /// A whitespace/comma-separated list option; empty if absent.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_list(&self, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .get::<String>(section, key)?
            .map(|s| split_list(&s).map(str::to_string).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::ErrorCode;

    #[test]
    fn lenient_reads() {
        let config = Config::from_toml_str(
            r#"
[runtime]
threads = "4"
resume = "T"
sampler = "grid"

[pipeline]
modules = "consistency, background  like"
"#,
        )
        .expect("parse");

        assert_eq!(config.get_int_or("runtime", "threads", 1).expect("threads"), 4);
        assert!(config.get_bool_or("runtime", "resume", false).expect("resume"));
        assert_eq!(config.get_int_or("runtime", "absent", 7).expect("default"), 7);
        assert_eq!(
            config.get_list("pipeline", "modules").expect("modules"),
            vec!["consistency", "background", "like"]
        );

        let err = config.get_int_or("runtime", "sampler", 1).expect_err("not int");
        assert_eq!(err.code(), "CONFIG_INVALID_OPTION");
        let err = config.require_str("output", "filename").expect_err("missing");
        assert_eq!(err.code(), "CONFIG_MISSING_OPTION");
    }

    #[test]
    fn base_dir_from_source() {
        let config = Config::default().with_source("/runs/demo/params.toml");
        assert_eq!(config.base_dir(), Some(Path::new("/runs/demo")));
        assert_eq!(config.resolve_path("values.toml"), PathBuf::from("/runs/demo/values.toml"));

        let bare = Config::default().with_source("params.toml");
        assert_eq!(bare.base_dir(), None);
    }
}
