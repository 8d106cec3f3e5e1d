//! The module lifecycle contract.
//!
//! A module is one stage of a pipeline. It is configured once from its own
//! configuration section, executed once per evaluation against a fresh
//! parameter store, and cleaned up once at teardown.
//!
//! ```text
//!            configure(ctx)            (once, in pipeline order)
//!                 │
//!                 ▼
//!    ┌──► execute(&self, block) ──┐    (once per evaluation,
//!    └────────────────────────────┘     possibly on many threads)
//!                 │
//!                 ▼
//!             cleanup()                (once, reverse pipeline order)
//! ```
//!
//! # Example
//!
//! ```
//! use cosmix_block::DataBlock;
//! use cosmix_module::{ConfigureContext, Module, ModuleError, Outcome};
//!
//! struct Growth {
//!     gamma: f64,
//! }
//!
//! impl Module for Growth {
//!     fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
//!         self.gamma = ctx.get_real_or("gamma", 0.55)?;
//!         Ok(())
//!     }
//!
//!     fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
//!         let omega_m = block.get_real("cosmological_parameters", "omega_m")?;
//!         if omega_m <= 0.0 {
//!             return Ok(Outcome::invalid("omega_m must be positive"));
//!         }
//!         block.put("growth", "f0", omega_m.powf(self.gamma))?;
//!         Ok(Outcome::Success)
//!     }
//! }
//! ```

use crate::context::ConfigureContext;
use crate::error::ModuleError;
use crate::outcome::Outcome;
use cosmix_block::DataBlock;
use serde::{Deserialize, Serialize};

/// One stage of a pipeline.
///
/// `execute` takes `&self`: configure-time state is shared read-only by all
/// workers evaluating points in parallel. A module that needs mutable
/// scratch space must use interior mutability.
///
/// # Errors
///
/// | Method | `Err` means |
/// |--------|-------------|
/// | `configure` | configuration error, the pipeline is not built |
/// | `execute` | fatal failure, the run aborts |
/// | `cleanup` | logged and otherwise ignored |
pub trait Module: Send + Sync {
    /// Reads options and prepares state.
    ///
    /// Default: reads nothing.
    fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
        let _ = ctx;
        Ok(())
    }

    /// Computes this stage for one parameter point.
    fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError>;

    /// Releases resources.
    fn cleanup(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Static description of a module implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Registered implementation name (the `kind` option).
    pub kind: String,
    /// One-line description.
    pub summary: String,
}

impl ModuleInfo {
    #[must_use]
    pub fn new(kind: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            summary: summary.into(),
        }
    }
}

type ExecuteFn = dyn Fn(&mut DataBlock) -> Result<Outcome, ModuleError> + Send + Sync;

/// A module built from a closure, with no configuration.
///
/// ```
/// use cosmix_block::DataBlock;
/// use cosmix_module::{FnModule, Module, Outcome};
///
/// let m = FnModule::new(|block: &mut DataBlock| {
///     block.put("likelihoods", "flat_like", 0.0)?;
///     Ok(Outcome::Success)
/// });
/// let mut block = DataBlock::new();
/// assert!(m.execute(&mut block).unwrap().is_success());
/// ```
pub struct FnModule {
    f: Box<ExecuteFn>,
}

impl FnModule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut DataBlock) -> Result<Outcome, ModuleError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl Module for FnModule {
    fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
        (self.f)(block)
    }
}

impl std::fmt::Debug for FnModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModule").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingModule {
        calls: AtomicUsize,
        cleaned: bool,
    }

    impl Module for CountingModule {
        fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            block.put("counter", "n", n as i64)?;
            Ok(Outcome::Success)
        }

        fn cleanup(&mut self) -> Result<(), ModuleError> {
            self.cleaned = true;
            Ok(())
        }
    }

    #[test]
    fn default_configure_is_noop() {
        let mut m = CountingModule {
            calls: AtomicUsize::new(0),
            cleaned: false,
        };
        let config = DataBlock::new();
        let mut seed = DataBlock::new();
        let mut ctx = ConfigureContext::new("counter", &config, &mut seed, &[]);
        m.configure(&mut ctx).expect("configure");
        assert!(seed.is_empty());
    }

    #[test]
    fn execute_through_shared_reference() {
        let m = Arc::new(CountingModule {
            calls: AtomicUsize::new(0),
            cleaned: false,
        });
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    let mut block = DataBlock::new();
                    m.execute(&mut block).expect("execute")
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().expect("join").is_success());
        }
        assert_eq!(m.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn cleanup_runs() {
        let mut m = CountingModule {
            calls: AtomicUsize::new(0),
            cleaned: false,
        };
        m.cleanup().expect("cleanup");
        assert!(m.cleaned);
    }

    #[test]
    fn boxed_modules_are_object_safe() {
        let modules: Vec<Box<dyn Module>> = vec![
            Box::new(FnModule::new(|_| Ok(Outcome::Success))),
            Box::new(FnModule::new(|_| Ok(Outcome::invalid("nope")))),
        ];
        let mut block = DataBlock::new();
        let outcomes: Vec<_> = modules
            .iter()
            .map(|m| m.execute(&mut block).expect("execute"))
            .collect();
        assert_eq!(outcomes[1], Outcome::invalid("nope"));
    }
}
