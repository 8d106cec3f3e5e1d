//! Parameter file loader.
//!
//! # Load Order
//!
//! 1. The TOML parameter file (one table per section), with `${VAR}`
//!    references in string values expanded from the environment
//! 2. Environment overrides `COSMIX_<SECTION>__<KEY>` for keys the file
//!    already defines
//!
//! Caller overrides and variable injections are applied afterwards by the
//! [`Resolver`](super::Resolver).
//!
//! # TOML mapping
//!
//! | TOML | Stored as |
//! |------|-----------|
//! | integer | `Int` |
//! | float | `Real` |
//! | bool | `Bool` |
//! | string, datetime | `Str` |
//! | array of integers | `IntVec` |
//! | array of numbers | `RealVec` |
//! | array of strings | `Str`, space-joined |

use super::{Config, ConfigError};
use cosmix_block::{DataBlock, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "COSMIX_";

/// Parameter file loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use cosmix_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new("demos/params.toml")
///     .skip_env_vars() // deterministic, for tests
///     .load()?;
/// # Ok::<(), cosmix_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Parameter file path.
    path: PathBuf,

    /// Skip `${VAR}` expansion and `COSMIX_*` overrides.
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader for the given parameter file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skip_env: false,
        }
    }

    /// Skips environment variable expansion and overrides.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads the parameter file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override does not parse as the option's type.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut block = load_toml_file(&self.path, !self.skip_env)?;
        debug!(path = %self.path.display(), sections = block.sections().count(), "Loaded parameter file");

        if !self.skip_env {
            let applied = apply_env_overrides(&mut block, std::env::vars())?;
            if applied > 0 {
                debug!(count = applied, "Applied environment overrides");
            }
        }

        Ok(Config::new(block).with_source(&self.path))
    }
}

/// Reads a TOML file into a block, one section per table.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O or parse failure.
pub fn load_toml_file(path: &Path, expand_env: bool) -> Result<DataBlock, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    parse_toml_document(&content, path, expand_env)
}

/// Parses TOML text into a block.
///
/// `path` is only used in error messages.
///
/// # Errors
///
/// Returns [`ConfigError`] on parse failure or a value with no block
/// representation (nested tables, mixed arrays).
pub fn parse_toml_document(
    content: &str,
    path: &Path,
    expand_env: bool,
) -> Result<DataBlock, ConfigError> {
    let table: toml::Table = content
        .parse()
        .map_err(|e| ConfigError::parse_toml(path, e))?;

    let mut block = DataBlock::new();
    for (section, entries) in &table {
        let toml::Value::Table(entries) = entries else {
            return Err(ConfigError::UnsupportedValue {
                section: section.clone(),
                key: String::new(),
                message: "top-level keys must be tables (one per section)".into(),
            });
        };
        for (key, raw) in entries {
            let value = convert(section, key, raw, expand_env)?;
            block.replace_any(section, key, value);
        }
    }
    Ok(block)
}

fn convert(
    section: &str,
    key: &str,
    raw: &toml::Value,
    expand_env: bool,
) -> Result<Value, ConfigError> {
    let unsupported = |message: &str| ConfigError::UnsupportedValue {
        section: section.to_string(),
        key: key.to_string(),
        message: message.to_string(),
    };

    Ok(match raw {
        toml::Value::String(s) if expand_env => Value::Str(expand_vars(s, |n| std::env::var(n).ok())),
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Real(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::Str(d.to_string()),
        toml::Value::Table(_) => return Err(unsupported("nested tables are not supported")),
        toml::Value::Array(items) => {
            if items.iter().all(toml::Value::is_integer) {
                Value::IntVec(items.iter().filter_map(toml::Value::as_integer).collect())
            } else if items.iter().all(|v| v.is_integer() || v.is_float()) {
                Value::RealVec(
                    items
                        .iter()
                        .filter_map(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
                        .collect(),
                )
            } else if items.iter().all(toml::Value::is_str) {
                let joined = items
                    .iter()
                    .filter_map(toml::Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                if expand_env {
                    Value::Str(expand_vars(&joined, |n| std::env::var(n).ok()))
                } else {
                    Value::Str(joined)
                }
            } else {
                return Err(unsupported("arrays must hold only numbers or only strings"));
            }
        }
    })
}

/// Expands `${NAME}` references.
///
/// Unknown names are left as written.
pub fn expand_vars(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(v) => out.push_str(&v),
                    None => {
                        debug!(var = %name, "Environment variable not set, left unexpanded");
                        out.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Applies `COSMIX_<SECTION>__<KEY>` overrides to keys that already exist.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// [`ConfigError::InvalidEnvVar`] if a value does not parse as the existing
/// option's type.
pub fn apply_env_overrides(
    block: &mut DataBlock,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<usize, ConfigError> {
    let mut applied = 0;
    for (name, raw) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some((section, key)) = rest.split_once("__") else {
            continue;
        };
        let Some(kind) = block.kind_of(section, key) else {
            continue;
        };
        let value = Value::parse_as(kind, &raw)
            .ok_or_else(|| ConfigError::invalid_env_var(&name, format!("expected {kind}")))?;
        debug!(var = %name, "Environment override");
        block.replace_any(section, key, value);
        applied += 1;
    }
    Ok(applied)
}
