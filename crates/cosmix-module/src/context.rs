//! Configure-time view handed to a module.
//!
//! A [`ConfigureContext`] gives a module read access to the options of its
//! own section, write access to the pipeline's seed block, and the list of
//! parameters the sampler will vary or fix. Every option read is tracked so
//! the pipeline can warn about options nobody consumed (usually typos).
//!
//! Option readers are lenient about representation: a string option is
//! parsed into the requested type, so `nz = "100"` and `nz = 100` behave the
//! same.

use crate::error::ModuleError;
use cosmix_block::{DataBlock, FromValue, Value, ValueKind};
use cosmix_types::{normalize, Address};
use indexmap::IndexSet;
use std::path::{Path, PathBuf};

/// Option key selecting the implementation of a pipeline entry.
///
/// Always treated as read.
pub const KIND_OPTION: &str = "kind";

/// Configure-time context for one module.
///
/// # Example
///
/// ```
/// use cosmix_block::DataBlock;
/// use cosmix_module::ConfigureContext;
///
/// let mut config = DataBlock::new();
/// config.put("background", "zmax", 2.0).unwrap();
/// config.put("background", "nz", "50").unwrap();
/// config.put("background", "typo", 1_i64).unwrap();
///
/// let mut seed = DataBlock::new();
/// let mut ctx = ConfigureContext::new("background", &config, &mut seed, &[]);
///
/// assert_eq!(ctx.get_real_or("zmax", 3.0).unwrap(), 2.0);
/// assert_eq!(ctx.get_int("nz").unwrap(), 50);
/// assert_eq!(ctx.get_real_or("zmin", 0.0).unwrap(), 0.0);
/// assert_eq!(ctx.unread_options(), vec!["typo".to_string()]);
/// ```
pub struct ConfigureContext<'a> {
    section: String,
    config: &'a DataBlock,
    seed: &'a mut DataBlock,
    parameters: &'a [Address],
    base_dir: Option<PathBuf>,
    read: IndexSet<String>,
}

impl<'a> ConfigureContext<'a> {
    /// Creates a context for the module configured from `section`.
    pub fn new(
        section: &str,
        config: &'a DataBlock,
        seed: &'a mut DataBlock,
        parameters: &'a [Address],
    ) -> Self {
        let mut read = IndexSet::new();
        read.insert(KIND_OPTION.to_string());
        Self {
            section: normalize(section),
            config,
            seed,
            parameters,
            base_dir: None,
            read,
        }
    }

    /// Sets the directory relative paths are resolved against.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The module's section name.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Returns `true` if the option is set.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.config.has(&self.section, key)
    }

    /// Raw option value, marking it read.
    pub fn option(&mut self, key: &str) -> Option<&'a Value> {
        self.read.insert(normalize(key));
        self.config.get(&self.section, key).ok()
    }

    /// Required option of type `T`.
    ///
    /// # Errors
    ///
    /// [`ModuleError::MissingOption`] or [`ModuleError::InvalidOption`].
    pub fn get<T: FromValue>(&mut self, key: &str) -> Result<T, ModuleError> {
        match self.lookup(key)? {
            Some(v) => Ok(v),
            None => Err(ModuleError::missing(&self.section, key)),
        }
    }

    /// Optional option of type `T`.
    ///
    /// # Errors
    ///
    /// [`ModuleError::InvalidOption`] if set but not convertible.
    pub fn get_or<T: FromValue>(&mut self, key: &str, default: T) -> Result<T, ModuleError> {
        Ok(self.lookup(key)?.unwrap_or(default))
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_real(&mut self, key: &str) -> Result<f64, ModuleError> {
        self.get(key)
    }

    /// # Errors
    ///
    /// See [`get_or`](Self::get_or).
    pub fn get_real_or(&mut self, key: &str, default: f64) -> Result<f64, ModuleError> {
        self.get_or(key, default)
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_int(&mut self, key: &str) -> Result<i64, ModuleError> {
        self.get(key)
    }

    /// # Errors
    ///
    /// See [`get_or`](Self::get_or).
    pub fn get_int_or(&mut self, key: &str, default: i64) -> Result<i64, ModuleError> {
        self.get_or(key, default)
    }

    /// # Errors
    ///
    /// See [`get_or`](Self::get_or).
    pub fn get_bool_or(&mut self, key: &str, default: bool) -> Result<bool, ModuleError> {
        self.get_or(key, default)
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_str(&mut self, key: &str) -> Result<String, ModuleError> {
        self.get(key)
    }

    /// # Errors
    ///
    /// See [`get_or`](Self::get_or).
    pub fn get_str_or(&mut self, key: &str, default: &str) -> Result<String, ModuleError> {
        self.get_or(key, default.to_string())
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_real_vec(&mut self, key: &str) -> Result<Vec<f64>, ModuleError> {
        self.get(key)
    }

    /// Required path option, resolved against the base directory.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_path(&mut self, key: &str) -> Result<PathBuf, ModuleError> {
        let raw: String = self.get(key)?;
        Ok(self.resolve_path(&raw))
    }

    /// Resolves a relative path against the base directory.
    #[must_use]
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        resolve_against(self.base_dir.as_deref(), raw)
    }

    /// Publishes a value into the seed block, visible to every evaluation.
    ///
    /// # Errors
    ///
    /// [`ModuleError::Block`] on a type conflict with an existing value.
    pub fn publish(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), ModuleError> {
        self.seed.put(section, key, value)?;
        Ok(())
    }

    /// Addresses of every declared parameter (varying and fixed).
    #[must_use]
    pub fn parameters(&self) -> &[Address] {
        self.parameters
    }

    /// Returns `true` if `(section, key)` is a declared parameter.
    #[must_use]
    pub fn is_parameter(&self, section: &str, key: &str) -> bool {
        let addr = Address::new(section, key);
        self.parameters.contains(&addr)
    }

    /// Options of the section that were never read, in file order.
    #[must_use]
    pub fn unread_options(&self) -> Vec<String> {
        self.config
            .keys(&self.section)
            .filter(|k| !self.read.contains(*k))
            .map(str::to_string)
            .collect()
    }

    fn lookup<T: FromValue>(&mut self, key: &str) -> Result<Option<T>, ModuleError> {
        let Some(value) = self.option(key) else {
            return Ok(None);
        };

        if let Some(v) = T::from_value(value) {
            return Ok(Some(v));
        }

        // Strings parse leniently into the requested type.
        if let Value::Str(text) = value {
            if T::KIND != ValueKind::Str {
                if let Some(v) = Value::parse_as(T::KIND, text).and_then(|p| T::from_value(&p)) {
                    return Ok(Some(v));
                }
            }
        }

        Err(ModuleError::invalid(
            &self.section,
            key,
            format!("expected {}, found {}", T::KIND, describe(value)),
        ))
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("'{s}'"),
        other => format!("{} {other}", other.kind()),
    }
}

/// Resolves `raw` against `base` unless it is absolute.
#[must_use]
pub fn resolve_against(base: Option<&Path>, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::ErrorCode;

    fn config() -> DataBlock {
        let mut c = DataBlock::new();
        c.put("like", "kind", "gaussian_likelihood").expect("put");
        c.put("like", "data_file", "data/sn.txt").expect("put");
        c.put("like", "x", "0.1 0.2 0.3").expect("put");
        c.put("like", "sigma", 0.5).expect("put");
        c.put("like", "marginalise", "T").expect("put");
        c.put("like", "name", "lcdm").expect("put");
        c
    }

    #[test]
    fn lenient_string_parsing() {
        let config = config();
        let mut seed = DataBlock::new();
        let mut ctx = ConfigureContext::new("like", &config, &mut seed, &[]);

        assert_eq!(ctx.get_real_vec("x").expect("x"), vec![0.1, 0.2, 0.3]);
        assert!(ctx.get_bool_or("marginalise", false).expect("bool"));
        assert_eq!(ctx.get_real("sigma").expect("sigma"), 0.5);
    }

    #[test]
    fn missing_and_invalid() {
        let config = config();
        let mut seed = DataBlock::new();
        let mut ctx = ConfigureContext::new("like", &config, &mut seed, &[]);

        let err = ctx.get_real("absent").expect_err("missing");
        assert_eq!(err.code(), "MODULE_MISSING_OPTION");

        let err = ctx.get_real("name").expect_err("invalid");
        assert_eq!(err.code(), "MODULE_INVALID_OPTION");
        assert!(err.to_string().contains("'lcdm'"), "{err}");
    }

    #[test]
    fn tracks_unread_options() {
        let config = config();
        let mut seed = DataBlock::new();
        let mut ctx = ConfigureContext::new("like", &config, &mut seed, &[]);
        ctx.get_real("sigma").expect("sigma");
        ctx.get_str("name").expect("name");

        assert_eq!(
            ctx.unread_options(),
            vec!["data_file".to_string(), "x".to_string(), "marginalise".to_string()]
        );
    }

    #[test]
    fn paths_resolve_against_base() {
        let config = config();
        let mut seed = DataBlock::new();
        let mut ctx =
            ConfigureContext::new("like", &config, &mut seed, &[]).with_base_dir("/runs/demo");
        assert_eq!(
            ctx.get_path("data_file").expect("path"),
            PathBuf::from("/runs/demo/data/sn.txt")
        );
        assert_eq!(ctx.resolve_path("/abs/file"), PathBuf::from("/abs/file"));
    }

    #[test]
    fn publish_reaches_seed() {
        let config = config();
        let mut seed = DataBlock::new();
        {
            let mut ctx = ConfigureContext::new("like", &config, &mut seed, &[]);
            ctx.publish("data_vector", "like_n", 3_i64).expect("publish");
        }
        assert_eq!(seed.get_int("data_vector", "like_n").expect("n"), 3);
    }

    #[test]
    fn parameter_lookup() {
        let config = config();
        let mut seed = DataBlock::new();
        let params = vec![Address::new("cosmological_parameters", "h0")];
        let ctx = ConfigureContext::new("like", &config, &mut seed, &params);
        assert!(ctx.is_parameter("Cosmological_Parameters", "H0"));
        assert!(!ctx.is_parameter("cosmological_parameters", "omega_m"));
    }
}
