//! Samplers.
//!
//! A [`Sampler`] proposes points and turns evaluations into
//! [`SampleRecord`]s, one batch per [`step`](Sampler::step). The driver
//! consumes batches through [`run`], which yields them lazily and stops
//! at the first error or cancellation:
//!
//! ```text
//! run(sampler, ctx) ── next() ── cancelled? ──► Err(Cancelled)
//!                         │
//!                         └─ sampler.step(ctx)
//!                               ├─ Some(batch) ──► Ok(batch)
//!                               ├─ None ──► sampler.finish() ──► end
//!                               └─ Err(e) ──► Err(e), end
//! ```
//!
//! Batches are evaluated through [`StepContext::evaluate`], which fans
//! the points out over the worker pool and returns evaluations in input
//! order.

mod emcee;
mod error;
mod grid;
mod metropolis;
mod single;

pub use emcee::{Checkpoint, EmceeSampler};
pub use error::SamplerError;
pub use grid::GridSampler;
pub use metropolis::MetropolisSampler;
pub use single::TestSampler;

use crate::config::Config;
use crate::pipeline::{Evaluation, Pipeline};
use crate::pool::{CancelToken, WorkerPool};
use cosmix_types::names;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub point: Vec<f64>,
    pub derived: Vec<f64>,
    pub prior: f64,
    pub like: f64,
    pub post: f64,
}

impl SampleRecord {
    /// Values in output column order.
    #[must_use]
    pub fn row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.point.len() + self.derived.len() + 3);
        row.extend_from_slice(&self.point);
        row.extend_from_slice(&self.derived);
        row.extend([self.prior, self.like, self.post]);
        row
    }
}

impl From<&Evaluation> for SampleRecord {
    fn from(e: &Evaluation) -> Self {
        Self {
            point: e.point.clone(),
            derived: e.derived.clone(),
            prior: e.prior,
            like: e.like,
            post: e.post,
        }
    }
}

/// Output column labels for `pipeline`.
#[must_use]
pub fn output_columns(pipeline: &Pipeline) -> Vec<String> {
    let mut columns = pipeline.space().columns();
    columns.extend(pipeline.extra_columns());
    columns.extend(["prior", "like", "post"].map(String::from));
    columns
}

/// What a sampler step can use.
pub struct StepContext<'a> {
    pub pipeline: &'a Pipeline,
    pub pool: &'a WorkerPool,
    pub cancel: &'a CancelToken,
}

impl<'a> StepContext<'a> {
    #[must_use]
    pub fn new(pipeline: &'a Pipeline, pool: &'a WorkerPool, cancel: &'a CancelToken) -> Self {
        Self {
            pipeline,
            pool,
            cancel,
        }
    }

    /// Evaluates `points` in parallel, results in input order.
    ///
    /// Points outside the parameter ranges are rejected without running
    /// the pipeline.
    ///
    /// # Errors
    ///
    /// [`SamplerError::Cancelled`] once the token is set, or the first
    /// fatal pipeline error.
    pub fn evaluate(&self, points: &[Vec<f64>]) -> Result<Vec<Evaluation>, SamplerError> {
        let pipeline = self.pipeline;
        let n_derived = pipeline.n_derived();
        self.pool.map(points, |point| {
            if self.cancel.is_cancelled() {
                return Err(SamplerError::Cancelled);
            }
            if !pipeline.space().in_range(point) {
                return Ok(Evaluation::invalid(
                    point,
                    f64::NEG_INFINITY,
                    "outside parameter range",
                    n_derived,
                ));
            }
            Ok(pipeline.evaluate(point)?)
        })
    }

    /// Evaluates a single point.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate).
    pub fn evaluate_one(&self, point: &[f64]) -> Result<Evaluation, SamplerError> {
        self.evaluate(&[point.to_vec()])?
            .pop()
            .ok_or(SamplerError::Cancelled)
    }
}

/// A sampling strategy.
pub trait Sampler: Send {
    /// Name used in `[runtime] sampler` and output metadata.
    fn name(&self) -> &'static str;

    /// Whether batch order must be preserved in the output.
    fn ordered(&self) -> bool {
        true
    }

    /// Whether this run continues an earlier one, so output is appended.
    fn resuming(&self) -> bool {
        false
    }

    /// Produces the next batch, or `None` when done.
    ///
    /// # Errors
    ///
    /// Fatal pipeline errors, cancellation or sampler-specific failures.
    fn step(&mut self, ctx: &StepContext<'_>) -> Result<Option<Vec<SampleRecord>>, SamplerError>;

    /// Called once after the last batch.
    ///
    /// # Errors
    ///
    /// Sampler-specific failures (for example writing a checkpoint).
    fn finish(&mut self, ctx: &StepContext<'_>) -> Result<(), SamplerError> {
        let _ = ctx;
        Ok(())
    }

    /// `key = value` pairs for the output header.
    fn metadata(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Lazy iterator over a sampler's batches.
pub struct SamplerRun<'s, 'c> {
    sampler: &'s mut dyn Sampler,
    ctx: StepContext<'c>,
    done: bool,
}

/// Drives `sampler` to completion as an iterator of batches.
pub fn run<'s, 'c>(sampler: &'s mut dyn Sampler, ctx: StepContext<'c>) -> SamplerRun<'s, 'c> {
    SamplerRun {
        sampler,
        ctx,
        done: false,
    }
}

impl Iterator for SamplerRun<'_, '_> {
    type Item = Result<Vec<SampleRecord>, SamplerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.ctx.cancel.is_cancelled() {
            self.done = true;
            return Some(Err(SamplerError::Cancelled));
        }
        match self.sampler.step(&self.ctx) {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                self.sampler.finish(&self.ctx).err().map(Err)
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Creates the sampler named by `[runtime] sampler` (default `test`).
///
/// `output` is the chain file, used by samplers that checkpoint next to it.
///
/// # Errors
///
/// [`SamplerError::Unknown`] or an option error from the sampler's section.
pub fn create_sampler(config: &Config, output: Option<&Path>) -> Result<Box<dyn Sampler>, SamplerError> {
    let name = config
        .get_str_or(names::RUNTIME, "sampler", "test")?
        .to_ascii_lowercase();
    debug!(sampler = %name, "Creating sampler");
    let sampler: Box<dyn Sampler> = match name.as_str() {
        "test" => Box::new(TestSampler::from_config(config)?),
        "grid" => Box::new(GridSampler::from_config(config)?),
        "metropolis" => Box::new(MetropolisSampler::from_config(config)?),
        "emcee" => Box::new(EmceeSampler::from_config(config, output)?),
        _ => return Err(SamplerError::Unknown(name)),
    };
    Ok(sampler)
}

/// Random generator for a sampler: seeded from `random_seed` when set,
/// otherwise from entropy. Returns the seed actually used.
fn seeded_rng(config: &Config, section: &str) -> Result<(ChaCha8Rng, u64), SamplerError> {
    let seed = match config.get::<i64>(section, "random_seed")? {
        Some(s) => s as u64,
        None => rand::random(),
    };
    Ok((ChaCha8Rng::seed_from_u64(seed), seed))
}

/// Reads a strictly positive integer option.
fn positive(
    config: &Config,
    sampler: &'static str,
    key: &'static str,
    default: i64,
) -> Result<usize, SamplerError> {
    let value = config.get_int_or(sampler, key, default)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| SamplerError::invalid(sampler, key, format!("must be positive, got {value}")))
}


#[cfg(test)]
mod tests {
    use super::testing::pipeline;
    use super::*;
    use cosmix_types::ErrorCode;

    #[test]
    fn columns_and_rows() {
        let (_, pipeline) = pipeline("extra_output = \"cosmological_parameters/y\"");
        assert_eq!(
            output_columns(&pipeline),
            vec![
                "cosmological_parameters--x",
                "cosmological_parameters--y",
                "prior",
                "like",
                "post"
            ]
        );
        let record = SampleRecord {
            point: vec![1.0],
            derived: vec![2.0],
            prior: -1.0,
            like: -0.5,
            post: -1.5,
        };
        assert_eq!(record.row(), vec![1.0, 2.0, -1.0, -0.5, -1.5]);
    }

    #[test]
    fn out_of_range_points_skip_the_pipeline() {
        let (_, pipeline) = pipeline("");
        let pool = WorkerPool::serial();
        let cancel = CancelToken::new();
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        let results = ctx.evaluate(&[vec![2.0], vec![7.0]]).expect("evaluate");
        assert!(results[0].is_valid());
        assert_eq!(results[0].like, 0.0);
        assert!(!results[1].is_valid());
        assert_eq!(results[1].prior, f64::NEG_INFINITY);
    }

    #[test]
    fn parallel_results_keep_order() {
        let (_, pipeline) = pipeline("");
        let pool = WorkerPool::new(4).expect("pool");
        let cancel = CancelToken::new();
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        let points: Vec<Vec<f64>> = (0..50).map(|i| vec![-5.0 + 0.2 * f64::from(i)]).collect();
        let results = ctx.evaluate(&points).expect("evaluate");
        for (p, e) in points.iter().zip(&results) {
            assert_eq!(&e.point, p);
        }
    }

    #[test]
    fn cancelled_context() {
        let (_, pipeline) = pipeline("");
        let pool = WorkerPool::serial();
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        let err = ctx.evaluate_one(&[1.0]).expect_err("cancelled");
        assert_eq!(err.code(), "SAMPLER_CANCELLED");
    }

    #[test]
    fn sampler_selection() {
        let config = Config::from_toml_str("[runtime]\nsampler = \"grid\"").expect("config");
        assert_eq!(create_sampler(&config, None).expect("grid").name(), "grid");

        let config = Config::default();
        assert_eq!(create_sampler(&config, None).expect("default").name(), "test");

        let config = Config::from_toml_str("[runtime]\nsampler = \"multinest\"").expect("config");
        let err = create_sampler(&config, None).err().expect("unknown");
        assert_eq!(err.code(), "SAMPLER_UNKNOWN");
    }
}
