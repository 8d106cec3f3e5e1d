//! Parameter store for cosmix pipelines.
//!
//! A [`DataBlock`] carries every value a pipeline evaluation reads or
//! writes, addressed by `(section, key)`. Values are tagged ([`Value`]) and
//! the tag of a stored value is fixed unless the caller explicitly replaces
//! it.

mod block;
mod error;
mod value;

pub use block::{DataBlock, WriteOp, WriteRecord};
pub use error::BlockError;
pub use value::{parse_bool, split_list, FromValue, Value, ValueKind};
