//! Gaussian random-walk Metropolis chain.
//!
//! Options in `[metropolis]`:
//!
//! | key | default | meaning |
//! |-----|---------|---------|
//! | `samples` | 1000 | chain length |
//! | `nsteps` | 100 | steps per output batch |
//! | `random_seed` | entropy | generator seed |
//! | `proposal_scale` | 0.1 | proposal width as a fraction of each range |
//! | `random_start` | `F` | start uniformly inside the ranges |
//!
//! The chain is inherently serial: proposals out of range or invalid are
//! rejected and the current state is recorded again.

use super::{positive, seeded_rng, SampleRecord, Sampler, SamplerError, StepContext};
use crate::config::Config;
use crate::pipeline::Evaluation;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, info};

const NAME: &str = "metropolis";

/// Attempts at drawing a valid random start.
const START_TRIES: usize = 100;

#[derive(Debug)]
pub struct MetropolisSampler {
    samples: usize,
    nsteps: usize,
    scale: f64,
    random_start: bool,
    seed: u64,
    rng: ChaCha8Rng,
    current: Option<Evaluation>,
    taken: usize,
    accepted: usize,
}

impl MetropolisSampler {
    /// Reads `[metropolis]`.
    ///
    /// # Errors
    ///
    /// [`SamplerError::InvalidOption`] for non-positive counts or scale.
    pub fn from_config(config: &Config) -> Result<Self, SamplerError> {
        let scale = config.get_real_or(NAME, "proposal_scale", 0.1)?;
        if scale.is_nan() || scale <= 0.0 {
            return Err(SamplerError::invalid(NAME, "proposal_scale", "must be positive"));
        }
        let (rng, seed) = seeded_rng(config, NAME)?;
        Ok(Self {
            samples: positive(config, NAME, "samples", 1000)?,
            nsteps: positive(config, NAME, "nsteps", 100)?,
            scale,
            random_start: config.get_bool_or(NAME, "random_start", false)?,
            seed,
            rng,
            current: None,
            taken: 0,
            accepted: 0,
        })
    }

    /// Fraction of proposals accepted so far.
    #[must_use]
    pub fn acceptance(&self) -> f64 {
        if self.taken == 0 {
            0.0
        } else {
            self.accepted as f64 / self.taken as f64
        }
    }

    fn start(&mut self, ctx: &StepContext<'_>) -> Result<Evaluation, SamplerError> {
        let space = ctx.pipeline.space();
        if space.dim() == 0 {
            return Err(SamplerError::NoVaryingParameters(NAME));
        }
        if !self.random_start {
            let e = ctx.evaluate_one(&space.start())?;
            return if e.is_valid() {
                Ok(e)
            } else {
                Err(SamplerError::InvalidStart(format!("{}", e.status)))
            };
        }
        for _ in 0..START_TRIES {
            let point: Vec<f64> = space
                .varying()
                .iter()
                .map(|v| self.rng.gen_range(v.min..=v.max))
                .collect();
            let e = ctx.evaluate_one(&point)?;
            if e.is_valid() {
                return Ok(e);
            }
        }
        Err(SamplerError::InvalidStart(format!(
            "{START_TRIES} random starts were all invalid"
        )))
    }

    fn propose(&mut self, from: &[f64], widths: &[f64]) -> Vec<f64> {
        from.iter()
            .zip(widths)
            .map(|(x, w)| {
                let n: f64 = StandardNormal.sample(&mut self.rng);
                x + self.scale * w * n
            })
            .collect()
    }
}

impl Sampler for MetropolisSampler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<Option<Vec<SampleRecord>>, SamplerError> {
        if self.taken >= self.samples {
            return Ok(None);
        }
        let mut current = match self.current.take() {
            Some(e) => e,
            None => {
                let e = self.start(ctx)?;
                info!(seed = self.seed, post = e.post, "metropolis.start");
                e
            }
        };
        let widths: Vec<f64> = ctx.pipeline.space().varying().iter().map(|v| v.width()).collect();

        let n = self.nsteps.min(self.samples - self.taken);
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            let proposal = self.propose(&current.point, &widths);
            let candidate = ctx.evaluate_one(&proposal)?;
            if candidate.is_valid() {
                let log_ratio = candidate.post - current.post;
                let u: f64 = self.rng.gen();
                if log_ratio >= 0.0 || u.ln() < log_ratio {
                    current = candidate;
                    self.accepted += 1;
                }
            }
            self.taken += 1;
            batch.push(SampleRecord::from(&current));
        }
        debug!(taken = self.taken, acceptance = self.acceptance(), "metropolis.batch");
        self.current = Some(current);
        Ok(Some(batch))
    }

    fn finish(&mut self, _ctx: &StepContext<'_>) -> Result<(), SamplerError> {
        info!(samples = self.taken, acceptance = self.acceptance(), "metropolis.done");
        Ok(())
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("samples".into(), self.samples.to_string()),
            ("proposal_scale".into(), self.scale.to_string()),
            ("random_seed".into(), self.seed.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::pipeline;
    use super::super::{run, StepContext};
    use super::*;
    use crate::pool::{CancelToken, WorkerPool};
    use cosmix_types::ErrorCode;

    fn chain(extra: &str) -> (Vec<SampleRecord>, MetropolisSampler) {
        let (config, pipeline) = pipeline(&format!(
            "[metropolis]\nsamples = 2000\nnsteps = 500\nrandom_seed = 7\n{extra}"
        ));
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let mut sampler = MetropolisSampler::from_config(&config).expect("sampler");
        let batches = run(&mut sampler, StepContext::new(&pipeline, &pool, &cancel))
            .collect::<Result<Vec<_>, _>>()
            .expect("run");
        assert_eq!(batches.len(), 4);
        (batches.concat(), sampler)
    }

    #[test]
    fn samples_the_target() {
        let (records, sampler) = chain("proposal_scale = 0.2");
        assert_eq!(records.len(), 2000);
        assert!(records.iter().all(|r| r.like.is_finite()));

        // Target is N(2, 1) truncated to x <= 4.
        let burned = &records[500..];
        let mean = burned.iter().map(|r| r.point[0]).sum::<f64>() / burned.len() as f64;
        assert!((mean - 1.9).abs() < 0.4, "mean = {mean}");
        let acc = sampler.acceptance();
        assert!(acc > 0.2 && acc < 0.95, "acceptance = {acc}");
    }

    #[test]
    fn seeded_chains_repeat() {
        let (a, _) = chain("");
        let (b, _) = chain("");
        assert_eq!(a, b);
    }

    #[test]
    fn random_start_inside_ranges() {
        let (records, _) = chain("random_start = true");
        assert!(records.iter().all(|r| (-5.0..=4.0).contains(&r.point[0])));
    }

    #[test]
    fn bad_scale() {
        let config = Config::from_toml_str("[metropolis]\nproposal_scale = 0").expect("config");
        let err = MetropolisSampler::from_config(&config).expect_err("scale");
        assert_eq!(err.code(), "SAMPLER_INVALID_OPTION");
    }
}
