//! cosmix runtime: configuration, parameter space, pipeline engine,
//! samplers and output.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Module Contract                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-types  : Address, section names, ErrorCode          │
//! │  cosmix-block  : DataBlock, Value                           │
//! │  cosmix-module : Module trait, ConfigureContext, Outcome    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config/   : Config, ConfigLoader, ConfigResolver           │
//! │  space/    : ParameterSpace, Prior                          │
//! │  pipeline/ : Pipeline, Evaluation, ExtraOutput              │
//! │  sampler/  : Sampler, test / grid / metropolis / emcee      │
//! │  output/   : OutputWriter, TextOutput, save_block           │
//! │  modules/  : consistency, background, gaussian_likelihood   │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  (cosmix-app: run driver, postprocessing, RunError)         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Frontend Layer                             │
//! │  (cosmix-cli)                                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`config`]
//!
//! - [`Config`](config::Config): the parameter file as a typed block
//! - [`ConfigLoader`](config::ConfigLoader): file, `${VAR}` expansion,
//!   `COSMIX_SECTION__KEY` environment overrides
//! - [`ConfigResolver`](config::ConfigResolver): command-line overrides
//!   and value pins
//!
//! ## [`space`]
//!
//! - [`ParameterSpace`](space::ParameterSpace): varying and fixed
//!   parameters, ranges, start point, log prior
//!
//! ## [`pipeline`]
//!
//! - [`Pipeline`](pipeline::Pipeline): configured modules evaluated in
//!   order on a fresh block per point
//!
//! ## [`sampler`]
//!
//! - [`Sampler`](sampler::Sampler): batch-at-a-time sampling strategy
//! - [`run`](sampler::run): lazy batch iterator with cancellation
//!
//! ## [`output`]
//!
//! - [`OutputWriter`](output::OutputWriter): chain sink
//! - [`save_block`](output::save_block): one block as a directory tree
//!
//! Supporting pieces: [`pool`] (rayon worker pool, cancel token),
//! [`report`] (user-facing result lines) and [`registry`] (module kinds).

pub mod config;
pub mod modules;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod report;
pub mod sampler;
pub mod space;

pub use config::{Config, ConfigError, ConfigLoader, ConfigResolver, Overrides, Variables};
pub use output::{create_output, output_path, OutputError, OutputWriter};
pub use pipeline::{Evaluation, Pipeline, PipelineError};
pub use pool::{CancelToken, PoolError, WorkerPool};
pub use registry::{ModuleFactory, ModuleRegistry};
pub use report::{BufferReporter, NullReporter, Reporter, StdoutReporter};
pub use sampler::{create_sampler, output_columns, SampleRecord, Sampler, SamplerError, StepContext};
pub use space::ParameterSpace;
