//! Regular grid over the varying parameters.
//!
//! `nsample_dimension` points per dimension, `linspace(min, max, n)`,
//! visited in lexicographic order with the first parameter slowest.
//! Points are generated from their index, so the full grid is never held
//! in memory; `nstep` points are evaluated per batch.

use super::{positive, SampleRecord, Sampler, SamplerError, StepContext};
use crate::config::Config;
use crate::modules::cosmo::linspace;
use crate::space::ParameterSpace;
use tracing::{debug, info};

const NAME: &str = "grid";

#[derive(Debug, Clone)]
pub struct GridSampler {
    nsample: usize,
    nstep: usize,
    axes: Vec<Vec<f64>>,
    total: usize,
    next: usize,
}

impl GridSampler {
    /// Reads `[grid]`.
    ///
    /// # Errors
    ///
    /// [`SamplerError::InvalidOption`] for non-positive counts.
    pub fn from_config(config: &Config) -> Result<Self, SamplerError> {
        Ok(Self::new(
            positive(config, NAME, "nsample_dimension", 3)?,
            positive(config, NAME, "nstep", 64)?,
        ))
    }

    #[must_use]
    pub fn new(nsample: usize, nstep: usize) -> Self {
        Self {
            nsample,
            nstep,
            axes: Vec::new(),
            total: 0,
            next: 0,
        }
    }

    /// Total number of grid points, set on the first step.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    fn prepare(&mut self, space: &ParameterSpace) -> Result<(), SamplerError> {
        if space.dim() == 0 {
            return Err(SamplerError::NoVaryingParameters(NAME));
        }
        let dim = u32::try_from(space.dim()).unwrap_or(u32::MAX);
        self.total = self.nsample.checked_pow(dim).ok_or_else(|| {
            SamplerError::invalid(
                NAME,
                "nsample_dimension",
                format!("{}^{} grid points is too many", self.nsample, space.dim()),
            )
        })?;
        self.axes = space
            .varying()
            .iter()
            .map(|v| linspace(v.min, v.max, self.nsample))
            .collect();
        info!(points = self.total, dim = space.dim(), "grid.start");
        Ok(())
    }

    /// The point with lexicographic index `index`.
    fn point(&self, mut index: usize) -> Vec<f64> {
        let mut point = vec![0.0; self.axes.len()];
        for (d, axis) in self.axes.iter().enumerate().rev() {
            point[d] = axis[index % self.nsample];
            index /= self.nsample;
        }
        point
    }
}

impl Sampler for GridSampler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<Option<Vec<SampleRecord>>, SamplerError> {
        if self.axes.is_empty() {
            self.prepare(ctx.pipeline.space())?;
        }
        if self.next >= self.total {
            return Ok(None);
        }

        let end = (self.next + self.nstep).min(self.total);
        let points: Vec<Vec<f64>> = (self.next..end).map(|i| self.point(i)).collect();
        let evaluations = ctx.evaluate(&points)?;
        debug!(from = self.next, to = end, "grid.batch");
        self.next = end;

        Ok(Some(evaluations.iter().map(SampleRecord::from).collect()))
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("nsample_dimension".into(), self.nsample.to_string()),
            ("nstep".into(), self.nstep.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::pipeline_with;
    use super::super::{run, StepContext};
    use super::*;
    use crate::pool::{CancelToken, WorkerPool};
    use cosmix_types::ErrorCode;

    fn two_dim() -> crate::pipeline::Pipeline {
        pipeline_with(
            &[("x", vec![0.0, 1.0, 2.0]), ("z", vec![-1.0, 0.0, 1.0])],
            "",
        )
        .1
    }

    #[test]
    fn lexicographic_n_to_the_d() {
        let pipeline = two_dim();
        let (pool, cancel) = (WorkerPool::new(3).expect("pool"), CancelToken::new());
        let mut sampler = GridSampler::new(3, 4);

        let batches: Vec<Vec<SampleRecord>> =
            run(&mut sampler, StepContext::new(&pipeline, &pool, &cancel))
                .collect::<Result<_, _>>()
                .expect("run");
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 1]);

        let points: Vec<Vec<f64>> = batches.iter().flatten().map(|r| r.point.clone()).collect();
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], vec![0.0, -1.0]);
        assert_eq!(points[1], vec![0.0, 0.0]);
        assert_eq!(points[2], vec![0.0, 1.0]);
        assert_eq!(points[3], vec![1.0, -1.0]);
        assert_eq!(points[8], vec![2.0, 1.0]);
        assert_eq!(sampler.total(), 9);
    }

    #[test]
    fn invalid_points_are_recorded() {
        let (_, pipeline) = pipeline_with(&[("x", vec![3.0, 5.0])], "");
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let mut sampler = GridSampler::new(5, 100);
        let records: Vec<SampleRecord> =
            run(&mut sampler, StepContext::new(&pipeline, &pool, &cancel))
                .collect::<Result<Vec<_>, _>>()
                .expect("run")
                .concat();
        assert_eq!(records.len(), 5);
        let invalid = records.iter().filter(|r| r.like == f64::NEG_INFINITY).count();
        // x = 4.5 and 5.0
        assert_eq!(invalid, 2);
    }

    #[test]
    fn options_and_errors() {
        let config = Config::from_toml_str("[grid]\nnsample_dimension = 0").expect("config");
        let err = GridSampler::from_config(&config).expect_err("zero");
        assert_eq!(err.code(), "SAMPLER_INVALID_OPTION");

        let (_, pipeline) = pipeline_with(&[("x", vec![1.0])], "");
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let mut sampler = GridSampler::new(3, 4);
        let err = sampler
            .step(&StepContext::new(&pipeline, &pool, &cancel))
            .expect_err("no varying");
        assert_eq!(err.code(), "SAMPLER_NO_VARYING");
    }
}
