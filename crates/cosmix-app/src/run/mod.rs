//! The run driver.
//!
//! ```text
//! ConfigLoader::load        file + ${VAR} + COSMIX_SECTION__KEY
//!   → Resolver::resolve     overrides, values/priors, injections
//!   → required files        MissingDependency before anything runs
//!   → create_sampler        sampler options validated
//!   → Pipeline::build       modules configured in order
//!   → writer.begin(columns, metadata)
//!   → for batch in run(sampler, ctx): writer.record(row)...
//!   → pipeline.cleanup(), writer.finalize()   (also on error or cancel)
//! ```

mod builder;

pub use builder::RunBuilder;

use crate::RunError;
use cosmix_runtime::config::Resolver;
use cosmix_runtime::output::{create_output, output_path, OutputWriter};
use cosmix_runtime::sampler::run;
use cosmix_runtime::{
    create_sampler, output_columns, Config, ConfigError, ConfigLoader, ModuleRegistry, Overrides,
    Pipeline, SampleRecord, StepContext, Variables, WorkerPool,
};
use cosmix_types::{names, RunId};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub sampler: String,
    /// Records written, valid or not.
    pub samples: usize,
    /// Records with a finite posterior.
    pub valid: usize,
    /// Record with the highest posterior.
    pub best: Option<SampleRecord>,
    pub columns: Vec<String>,
    /// Chain file, if one was written.
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Runs `params` with the builtin modules, reporting to stdout.
///
/// # Errors
///
/// See [`RunBuilder::run`].
pub fn run_cosmix(
    params: impl Into<PathBuf>,
    overrides: Overrides,
    variables: Variables,
) -> Result<RunSummary, RunError> {
    RunBuilder::new(params)
        .overrides(overrides)
        .variables(variables)
        .run()
}

/// Fails with [`RunError::MissingDependency`] if a module's data file is
/// absent.
fn check_dependencies(config: &Config, registry: &ModuleRegistry) -> Result<(), RunError> {
    for name in config.get_list(names::PIPELINE, "modules")? {
        let kind = config.get_str_or(&name, cosmix_module::KIND_OPTION, &name)?;
        let Some(factory) = registry.get(&kind) else {
            continue;
        };
        for path in factory.required_files(&name, config) {
            if !path.exists() {
                return Err(RunError::MissingDependency { module: name, path });
            }
        }
    }
    Ok(())
}

fn thread_count(config: &Config, requested: Option<usize>) -> Result<usize, ConfigError> {
    if let Some(n) = requested {
        return Ok(n.max(1));
    }
    let n = config.get_int_or(names::RUNTIME, "threads", 1)?;
    usize::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::invalid_option(names::RUNTIME, "threads", format!("must be positive, got {n}")))
}

fn header(run_id: RunId, sampler: &str, params: &Path, extra: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut meta = vec![
        ("sampler".to_string(), sampler.to_string()),
        ("run_id".to_string(), run_id.to_string()),
        ("params".to_string(), params.display().to_string()),
        ("timestamp".to_string(), chrono::Utc::now().to_rfc3339()),
    ];
    meta.extend(extra);
    meta
}

pub(crate) fn execute(builder: RunBuilder) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let run_id = RunId::new();
    let RunBuilder {
        params,
        overrides,
        variables,
        registry,
        reporter,
        cancel,
        threads,
        skip_env,
        output,
    } = builder;

    let loader = ConfigLoader::new(&params);
    let loader = if skip_env { loader.skip_env_vars() } else { loader };
    let resolved = Resolver::new(overrides, variables).resolve(loader.load()?)?;
    let config = resolved.config;

    check_dependencies(&config, &registry)?;
    let pool = WorkerPool::new(thread_count(&config, threads)?)?;
    let chain_path = output_path(&config)?;
    let mut sampler = create_sampler(&config, chain_path.as_deref())?;
    let mut pipeline = Pipeline::build(&config, resolved.space, &registry)?.with_reporter(reporter);

    let mut writer: Box<dyn OutputWriter> = match output {
        Some(w) => w,
        None => create_output(&config, sampler.resuming())?,
    };
    let columns = output_columns(&pipeline);
    writer.begin(&columns, &header(run_id, sampler.name(), &params, sampler.metadata()))?;
    info!(
        %run_id,
        sampler = sampler.name(),
        dim = pipeline.space().dim(),
        threads = pool.threads(),
        "run.start"
    );

    let mut samples = 0;
    let mut valid = 0;
    let mut best: Option<SampleRecord> = None;
    let mut failure: Option<RunError> = None;
    {
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        for batch in run(sampler.as_mut(), ctx) {
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };
            for record in batch {
                if let Err(e) = writer.record(&record.row()) {
                    failure = Some(e.into());
                    break;
                }
                samples += 1;
                if record.post.is_finite() {
                    valid += 1;
                    if best.as_ref().map_or(true, |b| record.post > b.post) {
                        best = Some(record);
                    }
                }
            }
            if failure.is_some() {
                break;
            }
            debug!(samples, "run.batch");
        }
    }

    pipeline.cleanup();
    let closed = writer
        .comment(&format!("n_samples = {samples}"))
        .and_then(|()| writer.finalize());

    if let Some(e) = failure {
        warn!(%run_id, samples, error = %e, "run.aborted");
        if let Err(close) = closed {
            warn!(error = %close, "Chain file not closed cleanly");
        }
        return Err(e);
    }
    closed?;

    let elapsed = started.elapsed();
    info!(%run_id, samples, valid, elapsed_ms = elapsed.as_millis() as u64, "run.done");
    Ok(RunSummary {
        run_id,
        sampler: sampler.name().to_string(),
        samples,
        valid,
        best,
        columns,
        output: chain_path,
        elapsed,
    })
}
