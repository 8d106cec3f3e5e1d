//! The pipeline: ordered, configured modules plus the parameter space.
//!
//! # Lifecycle
//!
//! ```text
//! Pipeline::build(config, space, registry)
//!   ├─ for each [pipeline] modules entry, in order:
//!   │     kind = <entry>.kind (default: entry name) → registry
//!   │     module.configure(ctx)      ── Err → cleanup configured (reverse)
//!   │                                       → PipelineError::Configure
//!   └─ seed block = fixed parameters + configure-time publications
//!
//! Pipeline::evaluate(point)           (any thread, any number of times)
//!   ├─ block = seed.clone() + point
//!   ├─ modules execute in order       ── InvalidPoint → like = -inf
//!   │                                 ── Err → PipelineError::Module
//!   └─ like = Σ likelihoods/<name>_like, derived = extra outputs
//!
//! Pipeline::cleanup()                 (once; reverse order; also on drop)
//! ```

mod error;
mod evaluation;

pub use error::PipelineError;
pub use evaluation::{Evaluation, ExtraOutput};

use crate::config::Config;
use crate::registry::ModuleRegistry;
use crate::report::{value_line, NullReporter, Reporter};
use crate::space::ParameterSpace;
use cosmix_block::DataBlock;
use cosmix_module::{ConfigureContext, Module, Outcome};
use cosmix_types::{names, Address, ModuleId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// `[pipeline]` switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Suppress per-evaluation `Likelihood =` lines.
    pub quiet: bool,
    /// Log the write log of failed or invalid evaluations.
    pub debug: bool,
    /// Log per-module execution times.
    pub timing: bool,
}

impl PipelineOptions {
    /// Reads the switches from `[pipeline]`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] if a switch is not a boolean.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            quiet: config.get_bool_or(names::PIPELINE, "quiet", false)?,
            debug: config.get_bool_or(names::PIPELINE, "debug", false)?,
            timing: config.get_bool_or(names::PIPELINE, "timing", false)?,
        })
    }
}

struct Stage {
    id: ModuleId,
    module: Box<dyn Module>,
}

/// A configured pipeline.
pub struct Pipeline {
    stages: Vec<Stage>,
    space: ParameterSpace,
    seed: DataBlock,
    likelihoods: Option<Vec<String>>,
    extra_outputs: Vec<ExtraOutput>,
    options: PipelineOptions,
    reporter: Arc<dyn Reporter>,
    cleaned_up: bool,
}

impl Pipeline {
    /// Builds and configures the pipeline described by `[pipeline]`.
    ///
    /// # Errors
    ///
    /// A configuration-class [`PipelineError`]; modules configured before
    /// the failure have been cleaned up.
    pub fn build(
        config: &Config,
        space: ParameterSpace,
        registry: &ModuleRegistry,
    ) -> Result<Self, PipelineError> {
        let entries = config.get_list(names::PIPELINE, "modules")?;
        if entries.is_empty() {
            return Err(PipelineError::NoModules);
        }

        let options = PipelineOptions::from_config(config)?;
        let likelihoods = if config.has(names::PIPELINE, "likelihoods") {
            Some(config.get_list(names::PIPELINE, "likelihoods")?)
        } else {
            None
        };
        let extra_outputs = config
            .get_list(names::PIPELINE, "extra_output")?
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<ExtraOutput>, _>>()?;

        let mut seed = DataBlock::new();
        space.write_fixed(&mut seed)?;
        let parameters: Vec<Address> = space.addresses();

        let mut stages: Vec<Stage> = Vec::with_capacity(entries.len());
        for name in &entries {
            match configure_stage(name, config, registry, &mut seed, &parameters) {
                Ok(stage) => stages.push(stage),
                Err(e) => {
                    cleanup_stages(&mut stages);
                    return Err(e);
                }
            }
        }
        seed.set_writer(None);

        info!(
            modules = %entries.join(" "),
            varying = space.dim(),
            fixed = space.fixed().len(),
            "pipeline.built"
        );

        Ok(Self {
            stages,
            space,
            seed,
            likelihoods,
            extra_outputs,
            options,
            reporter: Arc::new(NullReporter),
            cleaned_up: false,
        })
    }

    /// Sets the reporting stream for `Likelihood =` lines.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// The block every evaluation starts from.
    pub fn seed(&self) -> &DataBlock {
        &self.seed
    }

    /// Module ids in execution order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.stages.iter().map(|s| &s.id)
    }

    pub fn extra_outputs(&self) -> &[ExtraOutput] {
        &self.extra_outputs
    }

    /// Labels of the extra output columns.
    #[must_use]
    pub fn extra_columns(&self) -> Vec<String> {
        self.extra_outputs.iter().flat_map(ExtraOutput::columns).collect()
    }

    /// Number of extra output values per evaluation.
    #[must_use]
    pub fn n_derived(&self) -> usize {
        self.extra_outputs.iter().map(ExtraOutput::width).sum()
    }

    /// Evaluates at `point`, reporting the likelihood unless `quiet`.
    ///
    /// # Errors
    ///
    /// A fatal [`PipelineError`]. Invalid points are not errors.
    pub fn evaluate(&self, point: &[f64]) -> Result<Evaluation, PipelineError> {
        let (evaluation, _) = self.run(point)?;
        if evaluation.is_valid() && !self.options.quiet {
            self.reporter.line(&value_line("Likelihood", evaluation.like));
        }
        Ok(evaluation)
    }

    /// Evaluates at `point` and returns the final block. Never reports.
    ///
    /// # Errors
    ///
    /// A fatal [`PipelineError`].
    pub fn evaluate_with_block(
        &self,
        point: &[f64],
    ) -> Result<(Evaluation, DataBlock), PipelineError> {
        self.run(point)
    }

    fn run(&self, point: &[f64]) -> Result<(Evaluation, DataBlock), PipelineError> {
        if point.len() != self.space.dim() {
            return Err(PipelineError::Dimension {
                expected: self.space.dim(),
                got: point.len(),
            });
        }

        let prior = self.space.log_prior(point);
        let mut block = DataBlock::seeded_from(&self.seed);
        self.space.write_point(point, &mut block)?;

        for stage in &self.stages {
            block.set_writer(Some(&stage.id.name));
            let start = Instant::now();
            let result = stage.module.execute(&mut block);
            if self.options.timing {
                debug!(
                    module = %stage.id.name,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "module.timing"
                );
            }

            match result {
                Ok(Outcome::Success) => {}
                Ok(Outcome::InvalidPoint(reason)) => {
                    debug!(module = %stage.id.name, %reason, "Invalid point");
                    if self.options.debug {
                        dump_write_log(&block);
                    }
                    block.set_writer(None);
                    let reason = format!("{}: {reason}", stage.id.name);
                    let evaluation = Evaluation::invalid(point, prior, reason, self.n_derived());
                    return Ok((evaluation, block));
                }
                Err(source) => {
                    if self.options.debug {
                        dump_write_log(&block);
                    }
                    return Err(PipelineError::Module {
                        module: stage.id.name.clone(),
                        source,
                    });
                }
            }
        }
        block.set_writer(None);

        let like = self.total_likelihood(&block)?;
        if like.is_nan() {
            let evaluation =
                Evaluation::invalid(point, prior, "likelihood is NaN", self.n_derived());
            return Ok((evaluation, block));
        }

        let mut derived = Vec::with_capacity(self.n_derived());
        for extra in &self.extra_outputs {
            extra.collect(&block, &mut derived)?;
        }

        let evaluation = Evaluation {
            point: point.to_vec(),
            status: Outcome::Success,
            prior,
            like,
            post: prior + like,
            derived,
        };
        Ok((evaluation, block))
    }

    fn total_likelihood(&self, block: &DataBlock) -> Result<f64, PipelineError> {
        match &self.likelihoods {
            Some(declared) => declared.iter().try_fold(0.0, |sum, name| {
                block
                    .get_real(names::LIKELIHOODS, &names::like_key(name))
                    .map(|l| sum + l)
                    .map_err(|_| PipelineError::MissingLikelihood { name: name.clone() })
            }),
            None => Ok(block
                .entries(names::LIKELIHOODS)
                .filter(|(k, _)| k.ends_with(names::LIKE_SUFFIX))
                .filter_map(|(_, v)| v.as_real())
                .sum()),
        }
    }

    /// Cleans up every module in reverse order.
    ///
    /// Cleanup errors are logged. Subsequent calls do nothing.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        cleanup_stages(&mut self.stages);
        self.cleaned_up = true;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("modules", &self.stages.iter().map(|s| s.id.fqn()).collect::<Vec<_>>())
            .field("dim", &self.space.dim())
            .field("options", &self.options)
            .finish()
    }
}

fn configure_stage(
    name: &str,
    config: &Config,
    registry: &ModuleRegistry,
    seed: &mut DataBlock,
    parameters: &[Address],
) -> Result<Stage, PipelineError> {
    let kind = config.get_str_or(name, cosmix_module::KIND_OPTION, name)?;
    let factory = registry
        .get(&kind)
        .ok_or_else(|| PipelineError::UnknownModule {
            name: name.to_string(),
            kind: kind.clone(),
        })?;
    let id = ModuleId::new(name, kind);
    let mut module = factory.create();

    seed.set_writer(Some(name));
    let mut ctx = ConfigureContext::new(name, config.block(), seed, parameters);
    if let Some(dir) = config.base_dir() {
        ctx = ctx.with_base_dir(dir);
    }

    if let Err(source) = module.configure(&mut ctx) {
        // The failed module never finished configuring; nothing to clean up.
        return Err(PipelineError::Configure {
            module: name.to_string(),
            source,
        });
    }

    for option in ctx.unread_options() {
        warn!(module = %name, option = %option, "Option was never read; check for typos");
    }
    debug!(module = %id.fqn(), "module.configured");
    Ok(Stage { id, module })
}

fn cleanup_stages(stages: &mut Vec<Stage>) {
    while let Some(mut stage) = stages.pop() {
        if let Err(e) = stage.module.cleanup() {
            warn!(module = %stage.id.name, error = %e, "Cleanup failed");
        } else {
            debug!(module = %stage.id.name, "module.cleaned_up");
        }
    }
}

fn dump_write_log(block: &DataBlock) {
    for record in block.write_log() {
        debug!(
            writer = record.writer.as_deref().unwrap_or("pipeline"),
            address = %record.address,
            op = ?record.op,
            "write"
        );
    }
}
