//! Completes the cosmological parameter set.
//!
//! Samplers usually vary a convenient subset (`omega_m`, `h0`, `ombh2`,
//! ...). This module derives the rest from a fixed table of relations,
//! applied repeatedly until none adds anything new. Values that are
//! over-specified must agree to within `tolerance`, otherwise the point
//! is invalid.
//!
//! Options:
//!
//! | key | default | meaning |
//! |-----|---------|---------|
//! | `tolerance` | `1e-3` | relative disagreement allowed for over-specified values |
//! | `extra_relations` | none | `name=expr, name=expr` user relations |
//! | `cosmomc_theta` | `F` | derive `h0` from `cosmomc_theta` (100 θ) |

use super::cosmo::theta_star;
use super::expr::{parse_relations, Relation};
use cosmix_block::DataBlock;
use cosmix_module::{ConfigureContext, Module, ModuleError, Outcome};
use cosmix_types::names::COSMOLOGICAL_PARAMETERS as CP;
use indexmap::IndexMap;
use tracing::debug;

const CORE_RELATIONS: &str = "\
    omega_m = omega_c + omega_b + omega_nu, \
    omega_c = omega_m - omega_b - omega_nu, \
    omega_b = omega_m - omega_c - omega_nu, \
    h0 = hubble / 100, \
    hubble = h0 * 100, \
    ombh2 = omega_b * h0^2, \
    omega_b = ombh2 / h0^2, \
    h0 = sqrt(ombh2 / omega_b), \
    omch2 = omega_c * h0^2, \
    omega_c = omch2 / h0^2, \
    h0 = sqrt(omch2 / omega_c), \
    omnuh2 = omega_nu * h0^2, \
    omega_nu = omnuh2 / h0^2, \
    ommh2 = omega_m * h0^2, \
    omega_m = ommh2 / h0^2, \
    h0 = sqrt(ommh2 / omega_m), \
    omega_lambda = 1 - omega_m - omega_k, \
    omega_k = 1 - omega_m - omega_lambda, \
    omega_m = 1 - omega_lambda - omega_k, \
    baryon_fraction = omega_b / omega_m, \
    omega_b = baryon_fraction * omega_m";

/// Values assumed when nothing else determines them.
const DEFAULTS: [(&str, f64); 2] = [("omega_nu", 0.0), ("omega_k", 0.0)];

/// Range searched when solving for `h0`.
const H0_BRACKET: (f64, f64) = (0.2, 1.5);

#[derive(Debug, Default)]
pub struct Consistency {
    relations: Vec<Relation>,
    tolerance: f64,
    from_theta: bool,
}

impl Consistency {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every relation whose inputs are known until nothing changes.
    ///
    /// Returns the first disagreement, if any.
    fn close(&self, known: &mut IndexMap<String, f64>) -> Option<String> {
        loop {
            let mut added = false;
            for relation in &self.relations {
                let lookup = |name: &str| known.get(name).copied();
                let Some(value) = relation.expr.eval(&lookup) else {
                    continue;
                };
                if !value.is_finite() {
                    continue;
                }
                match known.get(&relation.target) {
                    Some(&existing) => {
                        let scale = existing.abs().max(value.abs());
                        if (existing - value).abs() > self.tolerance * scale + 1e-12 {
                            return Some(format!(
                                "{} = {existing} disagrees with {value} derived from other parameters",
                                relation.target
                            ));
                        }
                    }
                    None => {
                        known.insert(relation.target.clone(), value);
                        added = true;
                    }
                }
            }
            if !added {
                return None;
            }
        }
    }

    /// Solves `θ(h0) = cosmomc_theta / 100` by bisection.
    ///
    /// The inner `Err` is a reason the point is invalid.
    fn h0_from_theta(&self, block: &DataBlock) -> Result<Result<f64, String>, ModuleError> {
        let target = block.get_real(CP, "cosmomc_theta")? / 100.0;
        let ombh2 = block.get_real(CP, "ombh2")?;
        let omch2 = block.get_real(CP, "omch2")?;
        let omnuh2 = block.get_real_or(CP, "omnuh2", 0.0)?;
        let omega_k = block.get_real_or(CP, "omega_k", 0.0)?;
        let w0 = block.get_real_or(CP, "w", -1.0)?;
        let wa = block.get_real_or(CP, "wa", 0.0)?;

        let residual = |h: f64| theta_star(h, ombh2, omch2, omnuh2, omega_k, w0, wa) - target;
        let (mut lo, mut hi) = H0_BRACKET;
        let (f_lo, f_hi) = (residual(lo), residual(hi));
        if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo.signum() == f_hi.signum() {
            return Ok(Err(format!(
                "cosmomc_theta = {} has no solution for h0 in [{lo}, {hi}]",
                target * 100.0
            )));
        }
        for _ in 0..60 {
            let mid = 0.5 * (lo + hi);
            if residual(mid).signum() == f_lo.signum() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(Ok(0.5 * (lo + hi)))
    }
}

impl Module for Consistency {
    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
        let section = ctx.section().to_string();
        self.tolerance = ctx.get_real_or("tolerance", 1e-3)?;
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(ModuleError::invalid(&section, "tolerance", "must be non-negative"));
        }
        self.from_theta = ctx.get_bool_or("cosmomc_theta", false)?;
        if self.from_theta {
            for key in ["h0", "hubble"] {
                if ctx.is_parameter(CP, key) {
                    return Err(ModuleError::Config(format!(
                        "{CP}/{key} is derived from cosmomc_theta and must not be specified directly"
                    )));
                }
            }
        }

        self.relations = parse_relations(CORE_RELATIONS)
            .map_err(|e| ModuleError::Config(e.to_string()))?;
        let extra = ctx.get_str_or("extra_relations", "")?;
        let extra = parse_relations(&extra)
            .map_err(|e| ModuleError::invalid(&section, "extra_relations", e.to_string()))?;
        debug!(extra = extra.len(), from_theta = self.from_theta, "consistency.configured");
        self.relations.extend(extra);
        Ok(())
    }

    fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
        if self.from_theta {
            match self.h0_from_theta(block)? {
                Ok(h0) => block.put(CP, "h0", h0)?,
                Err(reason) => return Ok(Outcome::invalid(reason)),
            }
        }

        let mut known: IndexMap<String, f64> = block
            .entries(CP)
            .filter_map(|(k, v)| v.as_real().map(|x| (k.to_string(), x)))
            .collect();
        let given = known.len();

        if let Some(reason) = self.close(&mut known) {
            return Ok(Outcome::invalid(reason));
        }
        let mut defaulted = false;
        for (name, value) in DEFAULTS {
            if !known.contains_key(name) {
                known.insert(name.to_string(), value);
                defaulted = true;
            }
        }
        if defaulted {
            if let Some(reason) = self.close(&mut known) {
                return Ok(Outcome::invalid(reason));
            }
        }

        for (name, value) in known.iter().skip(given) {
            block.put(CP, name, *value)?;
        }
        Ok(Outcome::Success)
    }
}
