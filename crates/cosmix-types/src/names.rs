//! Well-known section names.
//!
//! Modules written by different authors agree on where to find each
//! other's outputs through these names.

/// Cosmological parameters (`omega_m`, `h0`, ...).
pub const COSMOLOGICAL_PARAMETERS: &str = "cosmological_parameters";

/// Background distances on a redshift grid.
pub const DISTANCES: &str = "distances";

/// Per-likelihood log-likelihood values, keys end in [`LIKE_SUFFIX`].
pub const LIKELIHOODS: &str = "likelihoods";

/// Data vectors, chi-squared values and other likelihood by-products.
pub const DATA_VECTOR: &str = "data_vector";

/// Run-level options.
pub const RUNTIME: &str = "runtime";

/// Pipeline options.
pub const PIPELINE: &str = "pipeline";

/// Output options.
pub const OUTPUT: &str = "output";

/// Suffix of log-likelihood keys in [`LIKELIHOODS`].
pub const LIKE_SUFFIX: &str = "_like";

/// Returns the likelihood key for `name` (`"bao"` → `"bao_like"`).
#[must_use]
pub fn like_key(name: &str) -> String {
    format!("{}{}", name.to_ascii_lowercase(), LIKE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_key_appends_suffix() {
        assert_eq!(like_key("BAO"), "bao_like");
    }
}
