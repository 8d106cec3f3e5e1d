//! Background expansion and distances on a redshift grid.
//!
//! Reads `h0`, `omega_m` and optionally `omega_k`, `omega_lambda`,
//! `omega_r`, `w`, `wa` from `cosmological_parameters`; writes to
//! `distances`:
//!
//! | key | unit |
//! |-----|------|
//! | `z` | |
//! | `h` | km/s/Mpc |
//! | `d_c`, `d_m`, `d_l`, `d_a` | Mpc |
//! | `mu` | mag (−∞ at z = 0) |
//! | `nz` | count |

use super::cosmo::{linspace, simpson, Cosmology};
use cosmix_block::DataBlock;
use cosmix_module::{ConfigureContext, Module, ModuleError, Outcome};
use cosmix_types::names::{COSMOLOGICAL_PARAMETERS as CP, DISTANCES};

/// Simpson sub-intervals between neighbouring grid points.
const SUBSTEPS: usize = 8;

#[derive(Debug, Clone)]
pub struct Background {
    z: Vec<f64>,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            z: linspace(0.0, 3.0, 301),
        }
    }
}

impl Background {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cosmology(block: &DataBlock) -> Result<Cosmology, ModuleError> {
        let h0 = block.get_real(CP, "h0")?;
        let omega_m = block.get_real(CP, "omega_m")?;
        let omega_k = block.get_real_or(CP, "omega_k", 0.0)?;
        let omega_r = block.get_real_or(CP, "omega_r", 0.0)?;
        let omega_de = block.get_real_or(CP, "omega_lambda", 1.0 - omega_m - omega_k - omega_r)?;
        Ok(Cosmology {
            h0,
            omega_m,
            omega_k,
            omega_de,
            omega_r,
            w0: block.get_real_or(CP, "w", -1.0)?,
            wa: block.get_real_or(CP, "wa", 0.0)?,
        })
    }
}

impl Module for Background {
    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
        let section = ctx.section().to_string();
        let zmin = ctx.get_real_or("zmin", 0.0)?;
        let zmax = ctx.get_real_or("zmax", 3.0)?;
        let nz = ctx.get_int_or("nz", 301)?;

        if zmin < 0.0 {
            return Err(ModuleError::invalid(&section, "zmin", "must be >= 0"));
        }
        if zmax <= zmin {
            return Err(ModuleError::invalid(&section, "zmax", "must exceed zmin"));
        }
        let nz = usize::try_from(nz)
            .ok()
            .filter(|n| *n >= 2)
            .ok_or_else(|| ModuleError::invalid(&section, "nz", "must be at least 2"))?;

        self.z = linspace(zmin, zmax, nz);
        Ok(())
    }

    fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
        let cosmo = Self::cosmology(block)?;
        if cosmo.h0.is_nan() || cosmo.h0 <= 0.0 {
            return Ok(Outcome::invalid(format!("h0 = {} is not positive", cosmo.h0)));
        }

        let mut e2 = Vec::with_capacity(self.z.len());
        for &z in &self.z {
            let value = cosmo.e2_of_z(z);
            if value.is_nan() || value <= 0.0 {
                return Ok(Outcome::invalid(format!("E^2(z) = {value} <= 0 at z = {z}")));
            }
            e2.push(value);
        }

        let dh = cosmo.hubble_distance();
        let inv_e = |z: f64| 1.0 / cosmo.e2_of_z(z).sqrt();
        let mut d_c = Vec::with_capacity(self.z.len());
        let mut running = simpson(inv_e, 0.0, self.z[0], SUBSTEPS) * dh;
        d_c.push(running);
        for pair in self.z.windows(2) {
            running += simpson(inv_e, pair[0], pair[1], SUBSTEPS) * dh;
            d_c.push(running);
        }
        if d_c.iter().any(|d| !d.is_finite()) {
            return Ok(Outcome::invalid("E^2(z) <= 0 between grid points"));
        }

        let d_m: Vec<f64> = d_c.iter().map(|&d| cosmo.transverse(d)).collect();
        let d_l: Vec<f64> = d_m.iter().zip(&self.z).map(|(d, z)| d * (1.0 + z)).collect();
        let d_a: Vec<f64> = d_m.iter().zip(&self.z).map(|(d, z)| d / (1.0 + z)).collect();
        let mu: Vec<f64> = d_l
            .iter()
            .map(|&d| if d > 0.0 { 5.0 * d.log10() + 25.0 } else { f64::NEG_INFINITY })
            .collect();
        let h: Vec<f64> = e2.iter().map(|e| 100.0 * cosmo.h0 * e.sqrt()).collect();

        block.put(DISTANCES, "z", self.z.clone())?;
        block.put(DISTANCES, "nz", self.z.len() as i64)?;
        block.put(DISTANCES, "h", h)?;
        block.put(DISTANCES, "d_c", d_c)?;
        block.put(DISTANCES, "d_m", d_m)?;
        block.put(DISTANCES, "d_l", d_l)?;
        block.put(DISTANCES, "d_a", d_a)?;
        block.put(DISTANCES, "mu", mu)?;
        Ok(Outcome::Success)
    }
}
