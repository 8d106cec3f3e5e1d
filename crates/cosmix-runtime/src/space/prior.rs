//! One-dimensional priors.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Prior on a single varying parameter.
///
/// Priors are truncated to the parameter's range by
/// [`ParameterSpace::log_prior`](super::ParameterSpace::log_prior); the
/// truncated density is not renormalised.
///
/// # Example
///
/// ```
/// use cosmix_runtime::space::Prior;
///
/// let p: Prior = "gaussian 0.7 0.1".parse().unwrap();
/// assert!(p.log_pdf(0.7) > p.log_pdf(0.9));
///
/// let u: Prior = "uniform 0 2".parse().unwrap();
/// assert_eq!(u.log_pdf(1.0), -(2.0f64.ln()));
/// assert_eq!(u.log_pdf(3.0), f64::NEG_INFINITY);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prior {
    Uniform { lower: f64, upper: f64 },
    Gaussian { mean: f64, sigma: f64 },
    /// Exponential with scale `beta` on `x >= 0`.
    Exponential { beta: f64 },
}

impl Prior {
    /// Log density at `x`.
    #[must_use]
    pub fn log_pdf(&self, x: f64) -> f64 {
        match *self {
            Self::Uniform { lower, upper } => {
                if (lower..=upper).contains(&x) {
                    -(upper - lower).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Gaussian { mean, sigma } => {
                let z = (x - mean) / sigma;
                -0.5 * z * z - (sigma * (2.0 * PI).sqrt()).ln()
            }
            Self::Exponential { beta } => {
                if x < 0.0 {
                    f64::NEG_INFINITY
                } else {
                    -beta.ln() - x / beta
                }
            }
        }
    }

    fn validate(self) -> Result<Self, String> {
        match self {
            Self::Uniform { lower, upper } if !(lower < upper) => {
                Err(format!("uniform bounds must satisfy a < b, got {lower} {upper}"))
            }
            Self::Gaussian { sigma, .. } if !(sigma > 0.0) => {
                Err(format!("gaussian sigma must be positive, got {sigma}"))
            }
            Self::Exponential { beta } if !(beta > 0.0) => {
                Err(format!("exponential scale must be positive, got {beta}"))
            }
            ok => Ok(ok),
        }
    }
}

impl std::str::FromStr for Prior {
    type Err = String;

    /// Parses `uniform a b`, `gaussian mu sigma` or `exponential beta`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or("empty prior")?.to_ascii_lowercase();
        let args = parts
            .map(|t| t.parse::<f64>().map_err(|_| format!("'{t}' is not a number")))
            .collect::<Result<Vec<_>, _>>()?;

        let prior = match (name.as_str(), args.as_slice()) {
            ("uniform" | "flat", &[lower, upper]) => Self::Uniform { lower, upper },
            ("gaussian" | "normal" | "norm", &[mean, sigma]) => Self::Gaussian { mean, sigma },
            ("exponential" | "exp", &[beta]) => Self::Exponential { beta },
            ("uniform" | "flat" | "gaussian" | "normal" | "norm" | "exponential" | "exp", _) => {
                return Err(format!("wrong number of arguments for {name} prior"));
            }
            _ => return Err(format!("unknown prior type '{name}'")),
        };
        prior.validate()
    }
}

impl std::fmt::Display for Prior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform { lower, upper } => write!(f, "uniform {lower} {upper}"),
            Self::Gaussian { mean, sigma } => write!(f, "gaussian {mean} {sigma}"),
            Self::Exponential { beta } => write!(f, "exponential {beta}"),
        }
    }
}
