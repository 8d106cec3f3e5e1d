//! Evaluation results and extra outputs.

use super::PipelineError;
use cosmix_block::DataBlock;
use cosmix_module::Outcome;
use cosmix_types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Result of evaluating the pipeline at one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Varying parameter values.
    pub point: Vec<f64>,
    pub status: Outcome,
    /// Log prior.
    pub prior: f64,
    /// Total log likelihood, −∞ for an invalid point.
    pub like: f64,
    /// `prior + like`.
    pub post: f64,
    /// Extra outputs, NaN for an invalid point.
    pub derived: Vec<f64>,
}

impl Evaluation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status.is_success() && self.post.is_finite()
    }

    /// An evaluation rejected before or during the pipeline.
    #[must_use]
    pub fn invalid(point: &[f64], prior: f64, reason: impl Into<String>, n_derived: usize) -> Self {
        Self {
            point: point.to_vec(),
            status: Outcome::invalid(reason),
            prior,
            like: f64::NEG_INFINITY,
            post: f64::NEG_INFINITY,
            derived: vec![f64::NAN; n_derived],
        }
    }
}

/// A declared derived output: `section/key` (scalar) or `section/key#n`
/// (the first `n` elements of a vector).
///
/// ```
/// use cosmix_runtime::pipeline::ExtraOutput;
///
/// let e: ExtraOutput = "cosmological_parameters/sigma_8".parse().unwrap();
/// assert_eq!(e.columns(), vec!["cosmological_parameters--sigma_8"]);
///
/// let e: ExtraOutput = "data_vector/theory#2".parse().unwrap();
/// assert_eq!(e.columns(), vec!["data_vector--theory_0", "data_vector--theory_1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOutput {
    pub address: Address,
    /// Element count for vector outputs.
    pub count: Option<usize>,
}

impl ExtraOutput {
    /// Output column labels.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        match self.count {
            None => vec![self.address.column()],
            Some(n) => (0..n)
                .map(|i| format!("{}_{i}", self.address.column()))
                .collect(),
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.count.unwrap_or(1)
    }

    /// Reads the output values from an evaluated block.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ExtraOutput`] if missing, non-numeric or too short.
    pub fn collect(&self, block: &DataBlock, out: &mut Vec<f64>) -> Result<(), PipelineError> {
        let (section, key) = (self.address.section(), self.address.key());
        let err = |message: String| PipelineError::ExtraOutput {
            output: self.address.to_string(),
            message,
        };
        match self.count {
            None => out.push(block.get_real(section, key).map_err(|e| err(e.to_string()))?),
            Some(n) => {
                let v = block
                    .get_real_vec(section, key)
                    .map_err(|e| err(e.to_string()))?;
                if v.len() < n {
                    return Err(err(format!("has {} elements, expected at least {n}", v.len())));
                }
                out.extend_from_slice(&v[..n]);
            }
        }
        Ok(())
    }
}

impl FromStr for ExtraOutput {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidExtraOutput(s.to_string());
        let (target, count) = match s.split_once('#') {
            Some((t, n)) => {
                let n: usize = n.trim().parse().map_err(|_| invalid())?;
                if n == 0 {
                    return Err(invalid());
                }
                (t, Some(n))
            }
            None => (s, None),
        };
        let address: Address = target.parse().map_err(|_| invalid())?;
        Ok(Self { address, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors() {
        assert!("nosection".parse::<ExtraOutput>().is_err());
        assert!("a/b#x".parse::<ExtraOutput>().is_err());
        assert!("a/b#0".parse::<ExtraOutput>().is_err());
    }

    #[test]
    fn collect_scalar_and_vector() {
        let mut block = DataBlock::new();
        block.put("cosmological_parameters", "sigma_8", 0.8).expect("put");
        block.put("data_vector", "theory", vec![1.0, 2.0, 3.0]).expect("put");

        let mut out = Vec::new();
        "cosmological_parameters/sigma_8"
            .parse::<ExtraOutput>()
            .expect("parse")
            .collect(&block, &mut out)
            .expect("scalar");
        "data_vector/theory#2"
            .parse::<ExtraOutput>()
            .expect("parse")
            .collect(&block, &mut out)
            .expect("vector");
        assert_eq!(out, vec![0.8, 1.0, 2.0]);

        let err = "data_vector/theory#5"
            .parse::<ExtraOutput>()
            .expect("parse")
            .collect(&block, &mut out)
            .expect_err("short");
        assert!(err.to_string().contains("3 elements"));
    }

    #[test]
    fn invalid_evaluation_shape() {
        let e = Evaluation::invalid(&[0.3], -1.0, "bad", 2);
        assert!(!e.is_valid());
        assert_eq!(e.like, f64::NEG_INFINITY);
        assert_eq!(e.derived.len(), 2);
        assert!(e.derived.iter().all(|d| d.is_nan()));
    }
}
