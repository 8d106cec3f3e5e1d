//! cosmix application layer.
//!
//! This crate provides:
//!
//! - **Run driver**: [`RunBuilder`] and [`run_cosmix`]
//! - **RunError**: unified application-level error type
//! - **Postprocessing**: [`Postprocessor`] chain summaries
//! - **Re-exports**: convenient access to the lower crates
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Module Contract                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-types, cosmix-block, cosmix-module                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-runtime (config, pipeline, sampler, output)         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Application Layer  ◄── HERE                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-app (run driver + RunError + postprocess)           │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Frontend Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-cli (uses RunError → anyhow/eprintln)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling Strategy
//!
//! ```text
//! Internal Errors (ConfigError, PipelineError, SamplerError, ...)
//!                    ↓ From impl
//!               RunError (this crate)
//!                    ↓ [CODE] message
//!               CLI output
//! ```

mod error;
mod postprocess;
mod run;

pub use error::RunError;
pub use postprocess::{ParameterSummary, Postprocessor};
pub use run::{run_cosmix, RunBuilder, RunSummary};

pub use cosmix_block::{DataBlock, Value};
pub use cosmix_module::{ConfigureContext, FnModule, Module, ModuleError, Outcome};
pub use cosmix_types::{Address, ErrorCode, RunId};

pub use cosmix_runtime::{
    BufferReporter, CancelToken, Config, ConfigError, ModuleRegistry, NullReporter, Overrides,
    PipelineError, Reporter, SampleRecord, SamplerError, StdoutReporter, Variables,
};
pub use cosmix_runtime::output::{MemoryOutput, OutputWriter};
