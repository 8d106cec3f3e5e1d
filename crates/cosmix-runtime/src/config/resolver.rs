//! Override and variable-injection resolution.
//!
//! # Order
//!
//! ```text
//! Config (file + env)
//!    │  Overrides::apply         section.key=value, existing keys only,
//!    │                           parsed as the existing type
//!    ▼
//! values / priors files  →  ParameterSpace
//!    │  Variables::apply         section.key=value, declared parameters only
//!    ▼
//! Resolved { config, space }
//! ```

use super::{load_toml_file, Config, ConfigError};
use crate::space::ParameterSpace;
use cosmix_block::{DataBlock, Value};
use cosmix_types::{names, Address};
use std::str::FromStr;
use tracing::{debug, info};

/// A `section.key=value` assignment.
///
/// # Example
///
/// ```
/// use cosmix_runtime::config::Assignment;
///
/// let a: Assignment = "consistency.extra_relations=omega_x=omega_c+100".parse().unwrap();
/// assert_eq!(a.address.to_string(), "consistency/extra_relations");
/// assert_eq!(a.value, "omega_x=omega_c+100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub address: Address,
    pub value: String,
}

impl Assignment {
    #[must_use]
    pub fn new(section: &str, key: &str, value: impl Into<String>) -> Self {
        Self {
            address: Address::new(section, key),
            value: value.into(),
        }
    }
}

impl FromStr for Assignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, value) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidAssignment(s.to_string()))?;
        let address: Address = target
            .parse()
            .map_err(|_| ConfigError::InvalidAssignment(s.to_string()))?;
        Ok(Self {
            address,
            value: value.trim().to_string(),
        })
    }
}

/// Trait for applying configuration overrides.
///
/// Separates loading (file/env) from run-time overrides (CLI flags,
/// programmatic settings).
pub trait ConfigResolver {
    /// Applies overrides to the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an override cannot be applied.
    fn apply(&self, config: &mut Config) -> Result<(), ConfigError>;
}

/// Caller overrides of configuration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides(pub Vec<Assignment>);

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.0.push(Assignment::new(section, key, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Assignment> for Overrides {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ConfigResolver for Overrides {
    fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
        let block = config.block_mut();
        for a in &self.0 {
            let (section, key) = (a.address.section(), a.address.key());
            let Some(kind) = block.kind_of(section, key) else {
                return Err(ConfigError::UnknownOption {
                    section: section.to_string(),
                    key: key.to_string(),
                });
            };
            let value =
                Value::parse_as(kind, &a.value).ok_or_else(|| ConfigError::InvalidOverride {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: a.value.clone(),
                    expected: kind.to_string(),
                })?;
            info!(option = %a.address, value = %value, "Override applied");
            block.replace_any(section, key, value);
        }
        Ok(())
    }
}

/// Variable injections: declared parameters pinned to constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(pub Vec<Assignment>);

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.0.push(Assignment::new(section, key, value));
        self
    }

    /// Pins each named parameter in `space`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownParameter`] or [`ConfigError::InvalidOverride`].
    pub fn apply(&self, space: &mut ParameterSpace) -> Result<(), ConfigError> {
        for a in &self.0 {
            space.pin(&a.address, &a.value)?;
            info!(parameter = %a.address, value = %a.value, "Variable injected");
        }
        Ok(())
    }
}

impl FromIterator<Assignment> for Variables {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Fully resolved inputs of a run.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: Config,
    pub space: ParameterSpace,
}

/// Applies overrides, loads the parameter space and applies injections.
///
/// # Example
///
/// ```
/// use cosmix_runtime::config::{Config, Overrides, Resolver, Variables};
///
/// let config = Config::from_toml_str(r#"
/// [runtime]
/// sampler = "test"
/// "#).unwrap();
///
/// let resolved = Resolver::new(
///     Overrides::new().with("runtime", "sampler", "grid"),
///     Variables::new(),
/// )
/// .resolve(config)
/// .unwrap();
/// assert_eq!(resolved.config.block().get_str("runtime", "sampler").unwrap(), "grid");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    overrides: Overrides,
    variables: Variables,
}

impl Resolver {
    #[must_use]
    pub fn new(overrides: Overrides, variables: Variables) -> Self {
        Self {
            overrides,
            variables,
        }
    }

    /// Resolves `config` into a configuration and parameter space.
    ///
    /// The values file is `[pipeline] values`; the priors files are the
    /// space-separated `[pipeline] priors`. Both are optional. Paths are
    /// relative to the parameter file.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn resolve(&self, mut config: Config) -> Result<Resolved, ConfigError> {
        self.overrides.apply(&mut config)?;

        let mut space = match config.get::<String>(names::PIPELINE, "values")? {
            Some(raw) => {
                let path = config.resolve_path(&raw);
                debug!(path = %path.display(), "Loading values file");
                ParameterSpace::from_values(&load_toml_file(&path, true)?)?
            }
            None => ParameterSpace::default(),
        };

        for raw in config.get_list(names::PIPELINE, "priors")? {
            let path = config.resolve_path(&raw);
            debug!(path = %path.display(), "Loading priors file");
            space.apply_priors(&load_toml_file(&path, true)?)?;
        }

        self.variables.apply(&mut space)?;
        Ok(Resolved { config, space })
    }

    /// Resolves with an in-memory values block instead of a values file.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn resolve_with_values(
        &self,
        mut config: Config,
        values: &DataBlock,
    ) -> Result<Resolved, ConfigError> {
        self.overrides.apply(&mut config)?;
        let mut space = ParameterSpace::from_values(values)?;
        self.variables.apply(&mut space)?;
        Ok(Resolved { config, space })
    }
}
