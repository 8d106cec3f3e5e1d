//! Test harness for [`Module`] implementations.
//!
//! Runs a module through its lifecycle without building a pipeline: options
//! are set directly on the harness, the seed block produced by `configure`
//! is kept, and every `execute` is logged with its outcome and duration.
//!
//! # Example
//!
//! ```
//! use cosmix_block::DataBlock;
//! use cosmix_module::testing::ModuleTestHarness;
//! use cosmix_module::{ConfigureContext, Module, ModuleError, Outcome};
//!
//! struct Scale {
//!     factor: f64,
//! }
//!
//! impl Module for Scale {
//!     fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
//!         self.factor = ctx.get_real("factor")?;
//!         Ok(())
//!     }
//!
//!     fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
//!         let x = block.get_real("in", "x")?;
//!         block.put("out", "y", x * self.factor)?;
//!         Ok(Outcome::Success)
//!     }
//! }
//!
//! let mut harness = ModuleTestHarness::new("scale", Scale { factor: 0.0 })
//!     .with_option("factor", 2.0);
//! harness.configure().unwrap();
//!
//! let mut block = harness.block();
//! block.put("in", "x", 1.5).unwrap();
//! assert!(harness.execute(&mut block).unwrap().is_success());
//! assert_eq!(block.get_real("out", "y").unwrap(), 3.0);
//! assert_eq!(harness.execute_log().len(), 1);
//! ```

use crate::context::ConfigureContext;
use crate::error::ModuleError;
use crate::module::Module;
use crate::outcome::Outcome;
use cosmix_block::{DataBlock, Value};
use cosmix_types::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Record of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRecord {
    /// `"success"`, `"invalid point: ..."` or the error message.
    pub result: String,
    /// Whether the call returned `Err`.
    pub fatal: bool,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
}

/// Lifecycle harness for a single module.
pub struct ModuleTestHarness<M: Module> {
    name: String,
    module: M,
    config: DataBlock,
    seed: DataBlock,
    parameters: Vec<Address>,
    base_dir: Option<PathBuf>,
    unread: Vec<String>,
    execute_log: Vec<ExecuteRecord>,
}

impl<M: Module> ModuleTestHarness<M> {
    /// Wraps `module`, configured from section `name`.
    pub fn new(name: &str, module: M) -> Self {
        Self {
            name: name.to_string(),
            module,
            config: DataBlock::new(),
            seed: DataBlock::new(),
            parameters: Vec::new(),
            base_dir: None,
            unread: Vec::new(),
            execute_log: Vec::new(),
        }
    }

    /// Sets an option in the module's section.
    ///
    /// Later calls replace earlier ones whatever their type.
    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.replace_any(&self.name, key, value);
        self
    }

    /// Declares a pipeline parameter visible to `configure`.
    #[must_use]
    pub fn with_parameter(mut self, section: &str, key: &str) -> Self {
        self.parameters.push(Address::new(section, key));
        self
    }

    /// Sets the directory relative paths resolve against.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut M {
        &mut self.module
    }

    /// Calls `configure` with the harness options.
    ///
    /// # Errors
    ///
    /// Returns the module's configuration error.
    pub fn configure(&mut self) -> Result<(), ModuleError> {
        let mut ctx =
            ConfigureContext::new(&self.name, &self.config, &mut self.seed, &self.parameters);
        if let Some(dir) = &self.base_dir {
            ctx = ctx.with_base_dir(dir.clone());
        }
        let result = self.module.configure(&mut ctx);
        self.unread = ctx.unread_options();
        result
    }

    /// Options the last `configure` did not read.
    pub fn unread_options(&self) -> &[String] {
        &self.unread
    }

    /// The seed block after `configure`.
    pub fn seed(&self) -> &DataBlock {
        &self.seed
    }

    /// A fresh evaluation block seeded like the pipeline would.
    pub fn block(&self) -> DataBlock {
        let mut block = DataBlock::seeded_from(&self.seed);
        block.set_writer(Some(&self.name));
        block
    }

    /// Calls `execute` and logs the result.
    ///
    /// # Errors
    ///
    /// Returns the module's fatal error.
    pub fn execute(&mut self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
        let start = Instant::now();
        let result = self.module.execute(block);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        self.execute_log.push(ExecuteRecord {
            result: match &result {
                Ok(outcome) => outcome.to_string(),
                Err(e) => e.to_string(),
            },
            fatal: result.is_err(),
            elapsed_ms,
        });

        result
    }

    /// Calls `cleanup`.
    ///
    /// # Errors
    ///
    /// Returns the module's cleanup error.
    pub fn cleanup(&mut self) -> Result<(), ModuleError> {
        self.module.cleanup()
    }

    pub fn execute_log(&self) -> &[ExecuteRecord] {
        &self.execute_log
    }

    pub fn clear_logs(&mut self) {
        self.execute_log.clear();
    }
}
