//! Module contract for cosmix pipelines.
//!
//! A pipeline is an ordered list of [`Module`]s. Each module reads what
//! earlier modules wrote into the shared [`DataBlock`](cosmix_block::DataBlock)
//! and writes its own results for later ones. Modules do not know about each
//! other, samplers, or output formats.
//!
//! | Type | Role |
//! |------|------|
//! | [`Module`] | lifecycle trait: configure / execute / cleanup |
//! | [`ConfigureContext`] | configure-time options, seed block, declared parameters |
//! | [`Outcome`] | success or invalid point |
//! | [`ModuleError`] | fatal failures |
//! | [`testing::ModuleTestHarness`] | lifecycle harness for unit tests |

mod context;
mod error;
mod module;
mod outcome;
pub mod testing;

pub use context::{resolve_against, ConfigureContext, KIND_OPTION};
pub use error::ModuleError;
pub use module::{FnModule, Module, ModuleInfo};
pub use outcome::Outcome;
