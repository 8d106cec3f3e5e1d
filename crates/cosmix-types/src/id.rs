//! Identifier types for cosmix.
//!
//! Run identifiers are random (one per invocation of the run driver);
//! module identifiers are deterministic so the same pipeline configuration
//! produces the same ids across processes, which keeps chain metadata
//! comparable between resumed runs.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Namespace UUID for deterministic UUID v5 generation.
const COSMIX_NAMESPACE: Uuid = uuid!("3b1f6a52-7c0e-4d8b-9a63-2f54c1e0d9a7");

/// Identifier of a configured pipeline module.
///
/// `name` is the pipeline entry (the configuration section the module reads)
/// and `kind` is the registered implementation. The UUID is derived from
/// both, so two pipelines that instantiate the same implementation under the
/// same section name agree on the id.
///
/// # Example
///
/// ```
/// use cosmix_types::ModuleId;
///
/// let a = ModuleId::new("sn_like", "gaussian_likelihood");
/// let b = ModuleId::new("sn_like", "gaussian_likelihood");
/// assert_eq!(a, b);
/// assert_eq!(a.fqn(), "gaussian_likelihood::sn_like");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    /// Deterministic identifier.
    pub uuid: Uuid,
    /// Pipeline entry / configuration section name.
    pub name: String,
    /// Registered implementation name.
    pub kind: String,
}

impl ModuleId {
    /// Creates a module id for `name` implemented by `kind`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        let name = name.into();
        let kind = kind.into();
        Self {
            uuid: Uuid::new_v5(&COSMIX_NAMESPACE, format!("{kind}:{name}").as_bytes()),
            name,
            kind,
        }
    }

    /// Creates an id whose implementation shares the section name.
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }

    /// Returns `kind::name`.
    #[must_use]
    pub fn fqn(&self) -> String {
        format!("{}::{}", self.kind, self.name)
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.kind, self.name)
    }
}

/// Identifier of one run of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_deterministic() {
        let a = ModuleId::new("consistency", "consistency");
        let b = ModuleId::builtin("consistency");
        assert_eq!(a, b);
        assert_eq!(a.uuid, b.uuid);
    }

    #[test]
    fn module_id_depends_on_kind() {
        let a = ModuleId::new("like", "gaussian_likelihood");
        let b = ModuleId::new("like", "background");
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn run_ids_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn module_id_serde_roundtrip() {
        let id = ModuleId::new("sn", "gaussian_likelihood");
        let json = serde_json::to_string(&id).expect("serialize ModuleId");
        let back: ModuleId = serde_json::from_str(&json).expect("deserialize ModuleId");
        assert_eq!(id, back);
    }
}
