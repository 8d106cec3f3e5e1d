//! Builder for a run.

use super::{execute, RunSummary};
use crate::RunError;
use cosmix_runtime::output::OutputWriter;
use cosmix_runtime::{CancelToken, ModuleRegistry, Overrides, Reporter, StdoutReporter, Variables};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builder for one run of a parameter file.
///
/// Everything but the parameter file is optional: the builtin module
/// registry, stdout reporting, a fresh cancel token, `[runtime] threads`
/// and the `[output]` writer are used by default.
///
/// # Example
///
/// ```no_run
/// use cosmix_app::RunBuilder;
/// use cosmix_runtime::{Overrides, Variables};
///
/// let summary = RunBuilder::new("demos/params.toml")
///     .overrides(Overrides::new().with("runtime", "sampler", "grid"))
///     .variables(Variables::new().with("cosmological_parameters", "h0", "0.7"))
///     .threads(4)
///     .run()?;
/// println!("{} samples", summary.samples);
/// # Ok::<(), cosmix_app::RunError>(())
/// ```
pub struct RunBuilder {
    pub(super) params: PathBuf,
    pub(super) overrides: Overrides,
    pub(super) variables: Variables,
    pub(super) registry: ModuleRegistry,
    pub(super) reporter: Arc<dyn Reporter>,
    pub(super) cancel: CancelToken,
    pub(super) threads: Option<usize>,
    pub(super) skip_env: bool,
    pub(super) output: Option<Box<dyn OutputWriter>>,
}

impl RunBuilder {
    /// Creates a builder for the given parameter file.
    #[must_use]
    pub fn new(params: impl Into<PathBuf>) -> Self {
        Self {
            params: params.into(),
            overrides: Overrides::new(),
            variables: Variables::new(),
            registry: ModuleRegistry::with_builtins(),
            reporter: Arc::new(StdoutReporter),
            cancel: CancelToken::new(),
            threads: None,
            skip_env: false,
            output: None,
        }
    }

    pub fn params(&self) -> &Path {
        &self.params
    }

    /// Option overrides (`section.key=value`).
    #[must_use]
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Parameter injections (`section.key=value`).
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Replaces the module registry.
    #[must_use]
    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the reporting stream.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Shares a cancel token with the caller (for example a signal handler).
    #[must_use]
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Worker threads, taking precedence over `[runtime] threads`.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Skips `${VAR}` expansion and `COSMIX_*` overrides.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Writes samples to `output` instead of the `[output]` writer.
    #[must_use]
    pub fn output(mut self, output: Box<dyn OutputWriter>) -> Self {
        self.output = Some(output);
        self
    }

    /// Runs to completion.
    ///
    /// # Errors
    ///
    /// See [`RunError`]. Configuration errors are returned before any
    /// module executes.
    pub fn run(self) -> Result<RunSummary, RunError> {
        execute(self)
    }
}

impl std::fmt::Debug for RunBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunBuilder")
            .field("params", &self.params)
            .field("overrides", &self.overrides)
            .field("variables", &self.variables)
            .field("registry", &self.registry)
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}
