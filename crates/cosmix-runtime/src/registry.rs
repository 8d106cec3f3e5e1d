//! Module registry.
//!
//! A pipeline entry names a configuration section; the section's `kind`
//! option (defaulting to the section name) selects a registered
//! implementation. The registry maps kinds to factories.

use crate::config::Config;
use cosmix_module::{Module, ModuleInfo};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Creates module instances of one kind.
pub trait ModuleFactory: Send + Sync {
    /// Static description.
    fn info(&self) -> ModuleInfo;

    /// Creates an unconfigured instance.
    fn create(&self) -> Box<dyn Module>;

    /// External files the instance configured from `section` will need.
    ///
    /// Checked by the run driver before the pipeline is built so a missing
    /// dataset is reported as a missing dependency, not a module failure.
    fn required_files(&self, section: &str, config: &Config) -> Vec<PathBuf> {
        let _ = (section, config);
        Vec::new()
    }
}

type CreateFn = dyn Fn() -> Box<dyn Module> + Send + Sync;

/// Factory built from a closure.
pub struct FnFactory {
    info: ModuleInfo,
    create: Box<CreateFn>,
}

impl FnFactory {
    pub fn new<F>(kind: &str, summary: &str, create: F) -> Self
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        Self {
            info: ModuleInfo::new(kind, summary),
            create: Box::new(create),
        }
    }
}

impl ModuleFactory for FnFactory {
    fn info(&self) -> ModuleInfo {
        self.info.clone()
    }

    fn create(&self) -> Box<dyn Module> {
        (self.create)()
    }
}

/// Kind → factory map.
///
/// # Example
///
/// ```
/// use cosmix_module::{FnModule, Outcome};
/// use cosmix_runtime::registry::ModuleRegistry;
///
/// let mut registry = ModuleRegistry::with_builtins();
/// registry.register_fn("flat_like", "constant likelihood", || {
///     Box::new(FnModule::new(|block| {
///         block.put("likelihoods", "flat_like", 0.0)?;
///         Ok(Outcome::Success)
///     }))
/// });
/// assert!(registry.contains("consistency"));
/// assert!(registry.contains("flat_like"));
/// ```
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: IndexMap<String, Arc<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the builtin modules.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::modules::register_builtins(&mut registry);
        registry
    }

    /// Registers a factory under its `info().kind`, replacing any previous
    /// one.
    pub fn register(&mut self, factory: impl ModuleFactory + 'static) {
        let kind = factory.info().kind.to_ascii_lowercase();
        self.factories.insert(kind, Arc::new(factory));
    }

    /// Registers a closure factory.
    pub fn register_fn<F>(&mut self, kind: &str, summary: &str, create: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.register(FnFactory::new(kind, summary, create));
    }

    #[must_use]
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(&kind.to_ascii_lowercase()).cloned()
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_ascii_lowercase())
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Descriptions of every registered kind.
    #[must_use]
    pub fn infos(&self) -> Vec<ModuleInfo> {
        self.factories.values().map(|f| f.info()).collect()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
