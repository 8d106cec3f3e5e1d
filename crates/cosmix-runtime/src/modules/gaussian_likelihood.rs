//! Diagonal Gaussian likelihood of a theory curve against data points.
//!
//! The theory is a pair of vectors in the block (`x_section/x_name`,
//! `y_section/y_name`), linearly interpolated at the data `x`. Data come
//! either inline (`x`, `y`, `sigma`; a scalar `sigma` applies to every
//! point) or from `data_file`, whitespace-separated `x y sigma` rows with
//! `#` comments.
//!
//! With `marginalize_offset = T` a constant shift of the theory is
//! marginalised analytically, as for the absolute magnitude of supernovae.
//!
//! Writes `likelihoods/<like_name>_like`, `data_vector/<like_name>_chi2`
//! and `data_vector/<like_name>_theory`.

use crate::config::Config;
use crate::registry::ModuleFactory;
use cosmix_block::{DataBlock, Value};
use cosmix_module::{resolve_against, ConfigureContext, Module, ModuleError, ModuleInfo, Outcome};
use cosmix_types::names::{self, DATA_VECTOR, DISTANCES, LIKELIHOODS};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const KIND: &str = "gaussian_likelihood";

#[derive(Debug, Clone, Default, PartialEq)]
struct Data {
    x: Vec<f64>,
    y: Vec<f64>,
    sigma: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct GaussianLikelihood {
    like_name: String,
    x_section: String,
    x_name: String,
    y_section: String,
    y_name: String,
    marginalize_offset: bool,
    include_norm: bool,
    data: Data,
}

impl GaussianLikelihood {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn chi2(&self, residuals: &[f64]) -> f64 {
        let weights = self.data.sigma.iter().map(|s| 1.0 / (s * s));
        let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
        for (r, w) in residuals.iter().zip(weights) {
            a += r * r * w;
            b += r * w;
            c += w;
        }
        if self.marginalize_offset {
            a - b * b / c
        } else {
            a
        }
    }

    fn norm(&self) -> f64 {
        if !self.include_norm {
            return 0.0;
        }
        -0.5 * self
            .data
            .sigma
            .iter()
            .map(|s| (2.0 * std::f64::consts::PI * s * s).ln())
            .sum::<f64>()
    }
}

impl Module for GaussianLikelihood {
    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
        let section = ctx.section().to_string();
        self.like_name = ctx.get_str_or("like_name", &section)?;
        self.x_section = ctx.get_str_or("x_section", DISTANCES)?;
        self.x_name = ctx.get_str_or("x_name", "z")?;
        self.y_section = ctx.get_str_or("y_section", DISTANCES)?;
        self.y_name = ctx.get_str_or("y_name", "mu")?;
        self.marginalize_offset = ctx.get_bool_or("marginalize_offset", false)?;
        self.include_norm = ctx.get_bool_or("include_norm", false)?;

        self.data = if ctx.has("data_file") {
            let path = ctx.get_path("data_file")?;
            load_data(&path)?
        } else {
            inline_data(ctx, &section)?
        };
        if self.data.x.is_empty() {
            return Err(ModuleError::invalid(&section, "x", "no data points"));
        }
        if self.data.sigma.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ModuleError::invalid(&section, "sigma", "must be positive"));
        }

        debug!(
            like = %self.like_name,
            points = self.data.x.len(),
            theory = %format!("{}/{}", self.y_section, self.y_name),
            "gaussian_likelihood.configured"
        );
        Ok(())
    }

    fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
        let theory_x = block.get_real_vec(&self.x_section, &self.x_name)?;
        let theory_y = block.get_real_vec(&self.y_section, &self.y_name)?;
        if theory_x.len() != theory_y.len() || theory_x.len() < 2 {
            return Err(ModuleError::ExecutionFailed(format!(
                "theory {}/{} and {}/{} must be equal-length vectors of at least two points",
                self.x_section, self.x_name, self.y_section, self.y_name
            )));
        }

        let mut theory = Vec::with_capacity(self.data.x.len());
        for &x in &self.data.x {
            let value = interpolate(&theory_x, &theory_y, x).ok_or_else(|| {
                ModuleError::ExecutionFailed(format!(
                    "data point {} = {x} is outside the theory range [{}, {}]",
                    self.x_name,
                    theory_x[0],
                    theory_x[theory_x.len() - 1]
                ))
            })?;
            theory.push(value);
        }
        if theory.iter().any(|t| !t.is_finite()) {
            return Ok(Outcome::invalid(format!(
                "non-finite theory {}/{} at a data point",
                self.y_section, self.y_name
            )));
        }

        let residuals: Vec<f64> = self.data.y.iter().zip(&theory).map(|(d, t)| d - t).collect();
        let chi2 = self.chi2(&residuals);
        let like = -0.5 * chi2 + self.norm();

        block.put(LIKELIHOODS, &names::like_key(&self.like_name), like)?;
        block.put(DATA_VECTOR, &format!("{}_chi2", self.like_name), chi2)?;
        block.put(DATA_VECTOR, &format!("{}_theory", self.like_name), theory)?;
        Ok(Outcome::Success)
    }
}

/// Linear interpolation; `None` outside `[xs[0], xs[n-1]]`.
///
/// `xs` must be increasing.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    let (first, last) = (*xs.first()?, *xs.last()?);
    if x < first || x > last {
        return None;
    }
    let i = xs.partition_point(|&v| v <= x).clamp(1, xs.len() - 1);
    let (x0, x1, y0, y1) = (xs[i - 1], xs[i], ys[i - 1], ys[i]);
    if x == x0 {
        return Some(y0);
    }
    if x == x1 {
        return Some(y1);
    }
    Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
}

fn inline_data(ctx: &mut ConfigureContext<'_>, section: &str) -> Result<Data, ModuleError> {
    let x = ctx.get_real_vec("x")?;
    let y = ctx.get_real_vec("y")?;
    let sigma = match ctx.option("sigma") {
        None => return Err(ModuleError::missing(section, "sigma")),
        Some(Value::Real(s)) => vec![*s; x.len()],
        Some(Value::Int(s)) => vec![*s as f64; x.len()],
        Some(_) => ctx.get_real_vec("sigma")?,
    };
    if y.len() != x.len() || sigma.len() != x.len() {
        return Err(ModuleError::invalid(
            section,
            "y",
            format!(
                "x, y and sigma lengths differ ({}, {}, {})",
                x.len(),
                y.len(),
                sigma.len()
            ),
        ));
    }
    Ok(Data { x, y, sigma })
}

fn load_data(path: &Path) -> Result<Data, ModuleError> {
    let text = std::fs::read_to_string(path).map_err(|e| ModuleError::io(path, &e))?;
    let mut data = Data::default();
    for (i, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ModuleError::Io {
                path: path.display().to_string(),
                message: format!("line {}: {e}", i + 1),
            })?;
        let [x, y, sigma] = fields[..] else {
            return Err(ModuleError::Io {
                path: path.display().to_string(),
                message: format!("line {}: expected 3 columns, found {}", i + 1, fields.len()),
            });
        };
        data.x.push(x);
        data.y.push(y);
        data.sigma.push(sigma);
    }
    Ok(data)
}

/// Factory that also reports the data file as an external dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct GaussianLikelihoodFactory;

impl ModuleFactory for GaussianLikelihoodFactory {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new(KIND, "diagonal Gaussian likelihood of a theory curve")
    }

    fn create(&self) -> Box<dyn Module> {
        Box::new(GaussianLikelihood::new())
    }

    fn required_files(&self, section: &str, config: &Config) -> Vec<PathBuf> {
        match config.get::<String>(section, "data_file") {
            Ok(Some(raw)) => vec![resolve_against(config.base_dir(), &raw)],
            _ => Vec::new(),
        }
    }
}
