//! `(section, key)` addressing.
//!
//! Every value in the system, whether a configuration option, a sampled
//! parameter or a module output, is addressed by a section name and a key
//! name. Both are case-insensitive and stored lower-cased.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Address of a value: `section` × `key`.
///
/// # Example
///
/// ```
/// use cosmix_types::Address;
///
/// let a = Address::new("Cosmological_Parameters", "Omega_M");
/// assert_eq!(a.section(), "cosmological_parameters");
/// assert_eq!(a.key(), "omega_m");
/// assert_eq!(a.to_string(), "cosmological_parameters/omega_m");
///
/// let b: Address = "cosmological_parameters.omega_m".parse().unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    section: String,
    key: String,
}

impl Address {
    /// Creates an address, normalising both parts to lower case.
    #[must_use]
    pub fn new(section: impl AsRef<str>, key: impl AsRef<str>) -> Self {
        Self {
            section: normalize(section.as_ref()),
            key: normalize(key.as_ref()),
        }
    }

    /// Section name.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Key name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Column label used by chain files: `section--key`.
    #[must_use]
    pub fn column(&self) -> String {
        format!("{}--{}", self.section, self.key)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.section, self.key)
    }
}

/// Error parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address '{0}': expected 'section/key' or 'section.key'")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    /// Accepts `section/key`, `section--key` or `section.key`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .split_once('/')
            .or_else(|| s.split_once("--"))
            .or_else(|| s.split_once('.'));

        match split {
            Some((section, key)) if !section.trim().is_empty() && !key.trim().is_empty() => {
                Ok(Self::new(section.trim(), key.trim()))
            }
            _ => Err(AddressParseError(s.to_string())),
        }
    }
}

/// Normalises a section or key name.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_separators() {
        let expected = Address::new("a", "b");
        assert_eq!("a/b".parse::<Address>().unwrap(), expected);
        assert_eq!("a--b".parse::<Address>().unwrap(), expected);
        assert_eq!("a.b".parse::<Address>().unwrap(), expected);
        assert_eq!(" A / B ".parse::<Address>().unwrap(), expected);
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!("nokey".parse::<Address>().is_err());
        assert!("/key".parse::<Address>().is_err());
        assert!("section/".parse::<Address>().is_err());
    }

    #[test]
    fn column_label() {
        let a = Address::new("cosmological_parameters", "omega_m");
        assert_eq!(a.column(), "cosmological_parameters--omega_m");
    }

    #[test]
    fn ordering_is_section_then_key() {
        let mut v = vec![Address::new("b", "a"), Address::new("a", "z"), Address::new("a", "b")];
        v.sort();
        assert_eq!(v[0], Address::new("a", "b"));
        assert_eq!(v[2], Address::new("b", "a"));
    }
}
