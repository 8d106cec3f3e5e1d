//! Affine-invariant ensemble sampler (stretch move).
//!
//! Options in `[emcee]`:
//!
//! | key | default | meaning |
//! |-----|---------|---------|
//! | `walkers` | `2·dim + 2` | ensemble size, even and at least `2·dim` |
//! | `samples` | 100 | ensemble steps |
//! | `nsteps` | 10 | ensemble steps per output batch |
//! | `random_seed` | entropy | generator seed |
//! | `stretch` | 2.0 | stretch scale `a` |
//! | `start_spread` | 0.01 | initial ball radius as a fraction of each range |
//! | `resume` | `F` | continue from `<output>.resume.json` |
//!
//! Each ensemble step updates the two halves of the ensemble in turn, each
//! half moving against the other, so the proposals of a half are
//! independent and are evaluated in parallel. Every walker is recorded
//! after every ensemble step.
//!
//! After each batch the walker positions are written to the checkpoint
//! next to the chain file. A resumed run re-evaluates those positions and
//! reseeds its generator from `seed + steps_done`.

use super::{positive, seeded_rng, SampleRecord, Sampler, SamplerError, StepContext};
use crate::config::Config;
use crate::pipeline::Evaluation;
use crate::space::ParameterSpace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const NAME: &str = "emcee";

/// Redraws allowed per walker when building the initial ball.
const START_TRIES: usize = 1000;

/// Resume state written after each batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub seed: u64,
    pub steps_done: usize,
    /// Walker positions, one point per walker.
    pub walkers: Vec<Vec<f64>>,
}

impl Checkpoint {
    /// The checkpoint file belonging to chain file `output`.
    #[must_use]
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_owned();
        name.push(".resume.json");
        PathBuf::from(name)
    }

    /// # Errors
    ///
    /// [`SamplerError::Checkpoint`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SamplerError> {
        let text = fs::read_to_string(path).map_err(|e| SamplerError::checkpoint(path, e))?;
        serde_json::from_str(&text).map_err(|e| SamplerError::checkpoint(path, e))
    }

    /// Writes through a temporary file so a crash never leaves a torn file.
    ///
    /// # Errors
    ///
    /// [`SamplerError::Checkpoint`] on any I/O failure.
    pub fn save(&self, path: &Path) -> Result<(), SamplerError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| SamplerError::checkpoint(path, e))?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(|e| SamplerError::checkpoint(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| SamplerError::checkpoint(path, e))
    }
}

#[derive(Debug)]
pub struct EmceeSampler {
    walkers: Option<usize>,
    samples: usize,
    nsteps: usize,
    stretch: f64,
    spread: f64,
    seed: u64,
    rng: ChaCha8Rng,
    checkpoint_path: Option<PathBuf>,
    resumed: Option<Checkpoint>,
    ensemble: Vec<Evaluation>,
    steps_done: usize,
    proposed: usize,
    accepted: usize,
}

impl EmceeSampler {
    /// Reads `[emcee]`. With `resume` set and an existing checkpoint next
    /// to `output`, the run continues from it.
    ///
    /// # Errors
    ///
    /// [`SamplerError::InvalidOption`] for bad counts or scales,
    /// [`SamplerError::Checkpoint`] for an unreadable checkpoint.
    pub fn from_config(config: &Config, output: Option<&Path>) -> Result<Self, SamplerError> {
        let walkers = match config.get::<i64>(NAME, "walkers")? {
            None => None,
            Some(_) => Some(positive(config, NAME, "walkers", 0)?),
        };
        let stretch = config.get_real_or(NAME, "stretch", 2.0)?;
        if stretch.is_nan() || stretch <= 1.0 {
            return Err(SamplerError::invalid(NAME, "stretch", "must be greater than 1"));
        }
        let spread = config.get_real_or(NAME, "start_spread", 0.01)?;
        if spread.is_nan() || spread <= 0.0 {
            return Err(SamplerError::invalid(NAME, "start_spread", "must be positive"));
        }

        let checkpoint_path = output.map(Checkpoint::path_for);
        let resumed = match &checkpoint_path {
            Some(path) if config.get_bool_or(NAME, "resume", false)? && path.exists() => {
                Some(Checkpoint::load(path)?)
            }
            _ => None,
        };
        let (rng, seed) = match &resumed {
            Some(cp) => (
                ChaCha8Rng::seed_from_u64(cp.seed.wrapping_add(cp.steps_done as u64)),
                cp.seed,
            ),
            None => seeded_rng(config, NAME)?,
        };

        Ok(Self {
            walkers,
            samples: positive(config, NAME, "samples", 100)?,
            nsteps: positive(config, NAME, "nsteps", 10)?,
            stretch,
            spread,
            seed,
            rng,
            checkpoint_path,
            steps_done: resumed.as_ref().map_or(0, |cp| cp.steps_done),
            resumed,
            ensemble: Vec::new(),
            proposed: 0,
            accepted: 0,
        })
    }

    /// Ensemble steps completed, including those of a resumed run.
    #[must_use]
    pub fn steps_done(&self) -> usize {
        self.steps_done
    }

    /// Fraction of stretch moves accepted in this run.
    #[must_use]
    pub fn acceptance(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    fn walker_count(&self, dim: usize) -> Result<usize, SamplerError> {
        let n = self.walkers.unwrap_or(2 * dim + 2);
        if n % 2 != 0 || n < 2 * dim {
            return Err(SamplerError::invalid(
                NAME,
                "walkers",
                format!("must be even and at least {}, got {n}", 2 * dim),
            ));
        }
        Ok(n)
    }

    /// A ball of points around the start, each coordinate redrawn until it
    /// falls inside its range.
    fn initial_ball(&mut self, space: &ParameterSpace, n: usize) -> Result<Vec<Vec<f64>>, SamplerError> {
        let start = space.start();
        let mut ball = Vec::with_capacity(n);
        for _ in 0..n {
            let mut point = Vec::with_capacity(start.len());
            for (x0, v) in start.iter().zip(space.varying()) {
                let sigma = self.spread * v.width();
                let x = (0..START_TRIES)
                    .map(|_| {
                        let g: f64 = StandardNormal.sample(&mut self.rng);
                        x0 + sigma * g
                    })
                    .find(|x| v.in_range(*x))
                    .ok_or_else(|| {
                        SamplerError::InvalidStart(format!(
                            "could not place a walker inside the range of {}",
                            v.address
                        ))
                    })?;
                point.push(x);
            }
            ball.push(point);
        }
        Ok(ball)
    }

    fn initialize(&mut self, ctx: &StepContext<'_>) -> Result<(), SamplerError> {
        let space = ctx.pipeline.space();
        if space.dim() == 0 {
            return Err(SamplerError::NoVaryingParameters(NAME));
        }
        let points = match self.resumed.take() {
            Some(cp) => {
                let n = self.walker_count(space.dim())?;
                if cp.walkers.len() != n || cp.walkers.iter().any(|w| w.len() != space.dim()) {
                    return Err(SamplerError::checkpoint(
                        self.checkpoint_path.clone().unwrap_or_default(),
                        format!("expected {n} walkers of {} parameters", space.dim()),
                    ));
                }
                info!(steps_done = cp.steps_done, walkers = cp.walkers.len(), "emcee.resume");
                cp.walkers
            }
            None => {
                let n = self.walker_count(space.dim())?;
                self.initial_ball(space, n)?
            }
        };

        let ensemble = ctx.evaluate(&points)?;
        if let Some(bad) = ensemble.iter().position(|e| !e.is_valid()) {
            return Err(SamplerError::InvalidStart(format!(
                "walker {bad} is invalid: {}",
                ensemble[bad].status
            )));
        }
        info!(walkers = ensemble.len(), seed = self.seed, "emcee.start");
        self.ensemble = ensemble;
        Ok(())
    }

    /// Moves the walkers in `half` against the complementary half.
    fn move_half(&mut self, ctx: &StepContext<'_>, half: usize) -> Result<(), SamplerError> {
        let n = self.ensemble.len();
        let m = n / 2;
        let (own, other) = if half == 0 { (0..m, m..n) } else { (m..n, 0..m) };
        let dim = self.ensemble[0].point.len();
        let a = self.stretch;

        let mut zs = Vec::with_capacity(m);
        let mut proposals = Vec::with_capacity(m);
        for k in own.clone() {
            let j = self.rng.gen_range(other.clone());
            let u: f64 = self.rng.gen();
            let z = ((a - 1.0) * u + 1.0).powi(2) / a;
            let (xk, xj) = (&self.ensemble[k].point, &self.ensemble[j].point);
            proposals.push(
                xk.iter()
                    .zip(xj)
                    .map(|(xk, xj)| xj + z * (xk - xj))
                    .collect::<Vec<f64>>(),
            );
            zs.push(z);
        }

        let candidates = ctx.evaluate(&proposals)?;
        for ((k, candidate), z) in own.zip(candidates).zip(zs) {
            self.proposed += 1;
            if !candidate.is_valid() {
                continue;
            }
            let log_q = (dim as f64 - 1.0) * z.ln() + candidate.post - self.ensemble[k].post;
            let u: f64 = self.rng.gen();
            if log_q >= 0.0 || u.ln() < log_q {
                self.ensemble[k] = candidate;
                self.accepted += 1;
            }
        }
        Ok(())
    }

    fn save_checkpoint(&self) -> Result<(), SamplerError> {
        let Some(path) = &self.checkpoint_path else {
            return Ok(());
        };
        Checkpoint {
            seed: self.seed,
            steps_done: self.steps_done,
            walkers: self.ensemble.iter().map(|e| e.point.clone()).collect(),
        }
        .save(path)
    }
}

impl Sampler for EmceeSampler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn resuming(&self) -> bool {
        self.steps_done > 0
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<Option<Vec<SampleRecord>>, SamplerError> {
        if self.steps_done >= self.samples {
            return Ok(None);
        }
        if self.ensemble.is_empty() {
            self.initialize(ctx)?;
        }

        let n = self.nsteps.min(self.samples - self.steps_done);
        let mut batch = Vec::with_capacity(n * self.ensemble.len());
        for _ in 0..n {
            self.move_half(ctx, 0)?;
            self.move_half(ctx, 1)?;
            self.steps_done += 1;
            batch.extend(self.ensemble.iter().map(SampleRecord::from));
        }
        debug!(steps_done = self.steps_done, acceptance = self.acceptance(), "emcee.batch");
        self.save_checkpoint()?;
        Ok(Some(batch))
    }

    fn finish(&mut self, _ctx: &StepContext<'_>) -> Result<(), SamplerError> {
        info!(steps = self.steps_done, acceptance = self.acceptance(), "emcee.done");
        Ok(())
    }

    fn metadata(&self) -> Vec<(String, String)> {
        let mut meta = vec![
            ("samples".into(), self.samples.to_string()),
            ("stretch".into(), self.stretch.to_string()),
            ("random_seed".into(), self.seed.to_string()),
        ];
        if let Some(n) = self.walkers {
            meta.push(("walkers".into(), n.to_string()));
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{pipeline, pipeline_with};
    use super::super::{run, StepContext};
    use super::*;
    use crate::pool::{CancelToken, WorkerPool};
    use cosmix_types::ErrorCode;
    use tempfile::TempDir;

    const OPTIONS: &str = "[emcee]\nwalkers = 8\nsamples = 200\nnsteps = 50\nrandom_seed = 11\n";

    fn records(sampler: &mut EmceeSampler, pipeline: &crate::pipeline::Pipeline) -> Vec<SampleRecord> {
        let (pool, cancel) = (WorkerPool::new(2).expect("pool"), CancelToken::new());
        run(sampler, StepContext::new(pipeline, &pool, &cancel))
            .collect::<Result<Vec<_>, _>>()
            .expect("run")
            .concat()
    }

    #[test]
    fn ensemble_samples_the_target() {
        let (config, pipeline) = pipeline(OPTIONS);
        let mut sampler = EmceeSampler::from_config(&config, None).expect("sampler");
        let records = records(&mut sampler, &pipeline);
        assert_eq!(records.len(), 200 * 8);
        assert!(records.iter().all(|r| r.post.is_finite()));

        let burned = &records[records.len() / 2..];
        let mean = burned.iter().map(|r| r.point[0]).sum::<f64>() / burned.len() as f64;
        assert!((mean - 1.9).abs() < 0.4, "mean = {mean}");
        assert!(sampler.acceptance() > 0.1);
    }

    #[test]
    fn seeded_runs_repeat_across_pool_sizes() {
        let (config, pipeline) = pipeline(OPTIONS);
        let a = records(&mut EmceeSampler::from_config(&config, None).expect("a"), &pipeline);

        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let mut sampler = EmceeSampler::from_config(&config, None).expect("b");
        let b = run(&mut sampler, StepContext::new(&pipeline, &pool, &cancel))
            .collect::<Result<Vec<_>, _>>()
            .expect("run")
            .concat();
        assert_eq!(a, b);
    }

    #[test]
    fn checkpoint_and_resume() {
        let temp = TempDir::new().expect("tempdir");
        let chain = temp.path().join("chain.txt");

        let (config, pipeline) = pipeline("[emcee]\nwalkers = 4\nsamples = 6\nnsteps = 3\nrandom_seed = 5\n");
        let mut first = EmceeSampler::from_config(&config, Some(&chain)).expect("first");
        assert!(!first.resuming());
        assert_eq!(records(&mut first, &pipeline).len(), 24);

        let checkpoint = Checkpoint::load(&Checkpoint::path_for(&chain)).expect("checkpoint");
        assert_eq!(checkpoint.steps_done, 6);
        assert_eq!(checkpoint.seed, 5);
        assert_eq!(checkpoint.walkers.len(), 4);

        let (config, pipeline) = pipeline_with(
            &[("x", vec![-5.0, 1.0, 5.0]), ("y", vec![2.0])],
            "[emcee]\nwalkers = 4\nsamples = 10\nnsteps = 3\nresume = true\n",
        );
        let mut second = EmceeSampler::from_config(&config, Some(&chain)).expect("second");
        assert!(second.resuming());
        assert_eq!(second.steps_done(), 6);
        let more = records(&mut second, &pipeline);
        assert_eq!(more.len(), 4 * 4);
        assert_eq!(
            Checkpoint::load(&Checkpoint::path_for(&chain)).expect("updated").steps_done,
            10
        );
    }

    #[test]
    fn resume_without_checkpoint_starts_fresh() {
        let temp = TempDir::new().expect("tempdir");
        let (config, _) = pipeline("[emcee]\nresume = true\n");
        let sampler = EmceeSampler::from_config(&config, Some(&temp.path().join("c.txt"))).expect("sampler");
        assert!(!sampler.resuming());
    }

    #[test]
    fn option_errors() {
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());

        let (config, pipeline) = pipeline("[emcee]\nwalkers = 3\n");
        let mut sampler = EmceeSampler::from_config(&config, None).expect("sampler");
        let err = sampler
            .step(&StepContext::new(&pipeline, &pool, &cancel))
            .expect_err("odd walkers");
        assert_eq!(err.code(), "SAMPLER_INVALID_OPTION");

        let config = Config::from_toml_str("[emcee]\nstretch = 1.0").expect("config");
        let err = EmceeSampler::from_config(&config, None).expect_err("stretch");
        assert_eq!(err.code(), "SAMPLER_INVALID_OPTION");
    }

    #[test]
    fn invalid_start_ball() {
        let (config, pipeline) =
            pipeline_with(&[("x", vec![-5.0, 4.5, 5.0]), ("y", vec![2.0])], OPTIONS);
        let (pool, cancel) = (WorkerPool::serial(), CancelToken::new());
        let mut sampler = EmceeSampler::from_config(&config, None).expect("sampler");
        let err = sampler
            .step(&StepContext::new(&pipeline, &pool, &cancel))
            .expect_err("invalid");
        assert_eq!(err.code(), "SAMPLER_INVALID_START");
    }
}
