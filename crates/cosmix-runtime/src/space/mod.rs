//! Parameter space: which parameters vary, over what range, under what
//! prior, and which are held fixed.
//!
//! # Values file
//!
//! One table per section; each key declares a parameter:
//!
//! ```toml
//! [cosmological_parameters]
//! omega_m = [0.2, 0.3, 0.4]     # min, start, max: varying
//! h0      = [0.6, 0.8]          # min, max: varying, starts at the midpoint
//! omega_b = 0.04                # fixed
//! omega_c = "0.1 0.261 0.4"     # strings are split like lists
//! ```
//!
//! # Priors file
//!
//! Same layout, each key holding `uniform a b`, `gaussian mu sigma` or
//! `exponential beta`. Varying parameters without an explicit prior get a
//! uniform prior over their range.

mod prior;

pub use prior::Prior;

use crate::config::ConfigError;
use cosmix_block::{split_list, BlockError, DataBlock, Value};
use cosmix_types::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A sampled parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Varying {
    pub address: Address,
    pub min: f64,
    pub start: f64,
    pub max: f64,
    pub prior: Prior,
}

impl Varying {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn in_range(&self, x: f64) -> bool {
        (self.min..=self.max).contains(&x)
    }
}

/// A parameter held at a constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixed {
    pub address: Address,
    pub value: f64,
}

/// The declared parameters of a run.
///
/// # Example
///
/// ```
/// use cosmix_block::DataBlock;
/// use cosmix_runtime::space::ParameterSpace;
///
/// let mut values = DataBlock::new();
/// values.put("cosmological_parameters", "omega_m", vec![0.2, 0.3, 0.4]).unwrap();
/// values.put("cosmological_parameters", "omega_b", 0.04).unwrap();
///
/// let space = ParameterSpace::from_values(&values).unwrap();
/// assert_eq!(space.dim(), 1);
/// assert_eq!(space.start(), vec![0.3]);
/// assert!(!space.in_range(&[0.5]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    varying: Vec<Varying>,
    fixed: Vec<Fixed>,
}

impl ParameterSpace {
    /// Builds the space from a values block.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] for malformed declarations.
    pub fn from_values(values: &DataBlock) -> Result<Self, ConfigError> {
        let mut space = Self::default();
        for section in values.sections() {
            for (key, value) in values.entries(section) {
                space.declare(Address::new(section, key), value)?;
            }
        }
        debug!(
            varying = space.varying.len(),
            fixed = space.fixed.len(),
            "Parameter space built"
        );
        Ok(space)
    }

    /// Adds a varying parameter with a uniform prior over its range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless `min < max` and `start` is
    /// within the range.
    pub fn add_varying(
        &mut self,
        address: Address,
        min: f64,
        start: f64,
        max: f64,
    ) -> Result<(), ConfigError> {
        if !(min < max) || !(min..=max).contains(&start) {
            return Err(ConfigError::invalid_parameter(
                address.section(),
                address.key(),
                format!("expected min <= start <= max with min < max, got {min} {start} {max}"),
            ));
        }
        self.remove(&address);
        self.varying.push(Varying {
            address,
            min,
            start,
            max,
            prior: Prior::Uniform {
                lower: min,
                upper: max,
            },
        });
        Ok(())
    }

    /// Adds (or replaces) a fixed parameter.
    pub fn add_fixed(&mut self, address: Address, value: f64) {
        if let Some(f) = self.fixed.iter_mut().find(|f| f.address == address) {
            f.value = value;
            return;
        }
        self.remove(&address);
        self.fixed.push(Fixed { address, value });
    }

    fn declare(&mut self, address: Address, value: &Value) -> Result<(), ConfigError> {
        let invalid = |message: String| {
            ConfigError::invalid_parameter(address.section(), address.key(), message)
        };

        let numbers: Vec<f64> = match value {
            Value::Str(text) => split_list(text)
                .map(|t| t.parse::<f64>().map_err(|_| invalid(format!("'{t}' is not a number"))))
                .collect::<Result<_, _>>()?,
            other => other
                .as_real()
                .map(|x| vec![x])
                .or_else(|| other.as_real_vec())
                .ok_or_else(|| invalid(format!("expected numbers, found {}", other.kind())))?,
        };

        match *numbers.as_slice() {
            [value] => self.add_fixed(address, value),
            [min, max] if min == max => self.add_fixed(address, min),
            [min, max] => self.add_varying(address, min, 0.5 * (min + max), max)?,
            [min, start, max] if min == max => {
                if start != min {
                    return Err(invalid(format!("start {start} outside [{min}, {max}]")));
                }
                self.add_fixed(address, min);
            }
            [min, start, max] => self.add_varying(address, min, start, max)?,
            _ => {
                return Err(invalid(format!(
                    "expected 1 to 3 numbers, found {}",
                    numbers.len()
                )))
            }
        }
        Ok(())
    }

    /// Applies priors from a priors block.
    ///
    /// Priors on fixed or undeclared parameters are ignored.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPrior`] for malformed prior strings.
    pub fn apply_priors(&mut self, priors: &DataBlock) -> Result<(), ConfigError> {
        for section in priors.sections() {
            for (key, value) in priors.entries(section) {
                let address = Address::new(section, key);
                let text = value.to_string();
                let prior: Prior = text
                    .parse()
                    .map_err(|e: String| ConfigError::invalid_prior(section, key, e))?;

                match self.varying.iter_mut().find(|v| v.address == address) {
                    Some(v) => v.prior = prior,
                    None => debug!(parameter = %address, "Prior on non-varying parameter ignored"),
                }
            }
        }
        Ok(())
    }

    /// Pins a declared parameter to a constant.
    ///
    /// A varying parameter leaves the varying set; a fixed one gets the new
    /// value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownParameter`] if not declared,
    /// [`ConfigError::InvalidOverride`] if `text` is not a number.
    pub fn pin(&mut self, address: &Address, text: &str) -> Result<(), ConfigError> {
        if !self.contains(address) {
            return Err(ConfigError::UnknownParameter {
                section: address.section().to_string(),
                key: address.key().to_string(),
            });
        }
        let value: f64 = text.trim().parse().map_err(|_| ConfigError::InvalidOverride {
            section: address.section().to_string(),
            key: address.key().to_string(),
            value: text.to_string(),
            expected: "real".into(),
        })?;
        self.add_fixed(address.clone(), value);
        Ok(())
    }

    fn remove(&mut self, address: &Address) {
        self.varying.retain(|v| &v.address != address);
        self.fixed.retain(|f| &f.address != address);
    }

    pub fn varying(&self) -> &[Varying] {
        &self.varying
    }

    pub fn fixed(&self) -> &[Fixed] {
        &self.fixed
    }

    /// Number of varying parameters.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.varying.len()
    }

    /// Every declared address, varying first.
    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.varying
            .iter()
            .map(|v| v.address.clone())
            .chain(self.fixed.iter().map(|f| f.address.clone()))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.varying.iter().any(|v| &v.address == address)
            || self.fixed.iter().any(|f| &f.address == address)
    }

    #[must_use]
    pub fn is_varying(&self, address: &Address) -> bool {
        self.varying.iter().any(|v| &v.address == address)
    }

    /// Start point.
    #[must_use]
    pub fn start(&self) -> Vec<f64> {
        self.varying.iter().map(|v| v.start).collect()
    }

    /// Output column labels of the varying parameters.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.varying.iter().map(|v| v.address.column()).collect()
    }

    /// Returns `true` if every coordinate is within its range.
    #[must_use]
    pub fn in_range(&self, point: &[f64]) -> bool {
        point.len() == self.varying.len()
            && self.varying.iter().zip(point).all(|(v, &x)| v.in_range(x))
    }

    /// Log prior of a point, −∞ outside the ranges.
    #[must_use]
    pub fn log_prior(&self, point: &[f64]) -> f64 {
        if !self.in_range(point) {
            return f64::NEG_INFINITY;
        }
        self.varying
            .iter()
            .zip(point)
            .map(|(v, &x)| v.prior.log_pdf(x))
            .sum()
    }

    /// Writes the fixed parameters into `block`.
    ///
    /// # Errors
    ///
    /// [`BlockError::TypeConflict`] if an address already holds a non-real.
    pub fn write_fixed(&self, block: &mut DataBlock) -> Result<(), BlockError> {
        for f in &self.fixed {
            block.put(f.address.section(), f.address.key(), f.value)?;
        }
        Ok(())
    }

    /// Writes the varying parameters of `point` into `block`.
    ///
    /// # Errors
    ///
    /// [`BlockError::TypeConflict`] if an address already holds a non-real.
    pub fn write_point(&self, point: &[f64], block: &mut DataBlock) -> Result<(), BlockError> {
        for (v, &x) in self.varying.iter().zip(point) {
            block.put(v.address.section(), v.address.key(), x)?;
        }
        Ok(())
    }
}
