//! Single evaluation at the start point.
//!
//! Options in `[test]`: `save_dir` (write the evaluated block there) and
//! `fatal_errors` (an invalid start point fails the run).

use super::{SampleRecord, Sampler, SamplerError, StepContext};
use crate::config::Config;
use crate::output::save_block;
use crate::report::value_line;
use cosmix_module::Outcome;
use std::path::PathBuf;
use tracing::{info, warn};

const NAME: &str = "test";

#[derive(Debug, Default)]
pub struct TestSampler {
    save_dir: Option<PathBuf>,
    fatal_errors: bool,
    done: bool,
}

impl TestSampler {
    /// Reads `[test]`.
    ///
    /// # Errors
    ///
    /// [`SamplerError::Config`] on a mistyped option.
    pub fn from_config(config: &Config) -> Result<Self, SamplerError> {
        Ok(Self {
            save_dir: config
                .get::<String>(NAME, "save_dir")?
                .map(|dir| config.resolve_path(&dir)),
            fatal_errors: config.get_bool_or(NAME, "fatal_errors", false)?,
            done: false,
        })
    }
}

impl Sampler for TestSampler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<Option<Vec<SampleRecord>>, SamplerError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        if ctx.cancel.is_cancelled() {
            return Err(SamplerError::Cancelled);
        }

        let pipeline = ctx.pipeline;
        let start = pipeline.space().start();
        let (evaluation, block) = pipeline.evaluate_with_block(&start)?;

        let reporter = pipeline.reporter();
        reporter.line(&value_line("Prior", evaluation.prior));
        if evaluation.is_valid() {
            reporter.line(&value_line("Likelihood", evaluation.like));
            reporter.line(&value_line("Posterior", evaluation.post));
        }

        if let Some(dir) = &self.save_dir {
            save_block(&block, dir)?;
            info!(dir = %dir.display(), "Saved evaluated block");
        }

        if let Outcome::InvalidPoint(reason) = &evaluation.status {
            if self.fatal_errors {
                return Err(SamplerError::InvalidPoint(reason.clone()));
            }
            warn!(%reason, "Start point is invalid");
        }
        Ok(Some(vec![SampleRecord::from(&evaluation)]))
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![("fatal_errors".into(), self.fatal_errors.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{pipeline, pipeline_with};
    use super::super::{run, StepContext};
    use super::*;
    use crate::output::read_values;
    use crate::pool::{CancelToken, WorkerPool};
    use crate::report::BufferReporter;
    use cosmix_types::ErrorCode;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn reports_and_saves() {
        let temp = TempDir::new().expect("tempdir");
        let (config, pipeline) = pipeline(&format!(
            "[test]\nsave_dir = \"{}\"",
            temp.path().join("block").display()
        ));
        let reporter = BufferReporter::new();
        let pipeline = pipeline.with_reporter(Arc::new(reporter.clone()));
        let mut sampler = TestSampler::from_config(&config).expect("sampler");

        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let batches: Vec<_> = run(&mut sampler, StepContext::new(&pipeline, &pool, &cancel))
            .collect::<Result<_, _>>()
            .expect("run");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].like, -0.5);

        let prior = -(10.0_f64).ln();
        assert_eq!(
            reporter.lines(),
            vec![
                format!("Prior = {prior}"),
                "Likelihood = -0.5".to_string(),
                format!("Posterior = {}", prior - 0.5),
            ]
        );
        let values = read_values(&temp.path().join("block/cosmological_parameters/values.txt"))
            .expect("values");
        assert!(values.contains(&("x".to_string(), "1".to_string())));
        assert!(values.contains(&("y".to_string(), "2".to_string())));
    }

    #[test]
    fn idempotent() {
        let (config, pipeline) = pipeline("");
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let once = |pipeline: &crate::pipeline::Pipeline| {
            let mut sampler = TestSampler::from_config(&config).expect("sampler");
            run(&mut sampler, StepContext::new(pipeline, &pool, &cancel))
                .collect::<Result<Vec<_>, _>>()
                .expect("run")
        };
        assert_eq!(once(&pipeline), once(&pipeline));
    }

    #[test]
    fn invalid_start() {
        let (config, pipeline) =
            pipeline_with(&[("x", vec![-5.0, 4.5, 5.0]), ("y", vec![2.0])], "");
        let reporter = BufferReporter::new();
        let pipeline = pipeline.with_reporter(Arc::new(reporter.clone()));
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());

        let mut sampler = TestSampler::from_config(&config).expect("sampler");
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        let batch = sampler.step(&ctx).expect("step").expect("batch");
        assert_eq!(batch[0].like, f64::NEG_INFINITY);
        assert!(reporter.matching("Likelihood").is_empty());

        let mut sampler = TestSampler {
            fatal_errors: true,
            ..TestSampler::default()
        };
        let err = sampler.step(&ctx).expect_err("fatal");
        assert_eq!(err.code(), "SAMPLER_INVALID_POINT");
    }
}
