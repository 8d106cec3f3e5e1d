//! Core types for cosmix.
//!
//! This crate provides the foundational vocabulary shared by every other
//! crate in the workspace.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Module SDK Layer                          │
//! │  (safe for module authors to depend on)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-types   : Address, ids, ErrorCode       ◄── HERE     │
//! │  cosmix-block   : DataBlock (parameter store)               │
//! │  cosmix-module  : Module trait, Outcome                     │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-runtime : config, pipeline, samplers, output        │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application / Frontend                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cosmix-app     : run driver, postprocessing                │
//! │  cosmix-cli     : `cosmix` binary                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cosmix_types::{names, Address, ModuleId};
//!
//! let omega_m = Address::new(names::COSMOLOGICAL_PARAMETERS, "omega_m");
//! assert_eq!(omega_m.column(), "cosmological_parameters--omega_m");
//!
//! let id = ModuleId::builtin("consistency");
//! assert_eq!(id.fqn(), "consistency::consistency");
//! ```

mod address;
mod error;
mod id;
pub mod names;

pub use address::{normalize, Address, AddressParseError};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ModuleId, RunId};
