//! Builtin modules.
//!
//! | kind | reads | writes |
//! |------|-------|--------|
//! | `consistency` | `cosmological_parameters` | `cosmological_parameters` |
//! | `background` | `cosmological_parameters` | `distances` |
//! | `gaussian_likelihood` | any theory vector | `likelihoods`, `data_vector` |

mod background;
mod consistency;
pub mod cosmo;
pub mod expr;
mod gaussian_likelihood;

pub use background::Background;
pub use consistency::Consistency;
pub use gaussian_likelihood::{GaussianLikelihood, GaussianLikelihoodFactory};

use crate::registry::ModuleRegistry;

/// Registers every builtin kind.
pub fn register_builtins(registry: &mut ModuleRegistry) {
    registry.register_fn(
        "consistency",
        "derives the full cosmological parameter set",
        || Box::new(Consistency::new()),
    );
    registry.register_fn(
        "background",
        "background expansion and distances on a redshift grid",
        || Box::new(Background::new()),
    );
    registry.register(GaussianLikelihoodFactory);
}
