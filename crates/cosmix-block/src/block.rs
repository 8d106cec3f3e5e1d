//! The parameter store.

use crate::error::BlockError;
use crate::value::{FromValue, Value, ValueKind};
use cosmix_types::{normalize, Address};
use indexmap::IndexMap;
use std::sync::Arc;

/// Kind of a logged write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Put,
    Replace,
    Remove,
}

/// One entry of the write log.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    /// Module that performed the write, `None` for the pipeline itself.
    pub writer: Option<Arc<str>>,
    pub address: Address,
    pub op: WriteOp,
}

/// Ordered `section → key → value` store passed through a pipeline.
///
/// Section and key names are case-insensitive. A value's type tag is fixed
/// once written: [`put`](Self::put) refuses to change it and
/// [`replace_any`](Self::replace_any) is the explicit escape hatch.
///
/// Every write is appended to a log together with the name of the module
/// that was running at the time (see [`set_writer`](Self::set_writer)), so a
/// failed lookup can say who did write to the section.
///
/// # Example
///
/// ```
/// use cosmix_block::DataBlock;
///
/// let mut block = DataBlock::new();
/// block.put("cosmological_parameters", "omega_m", 0.3).unwrap();
/// block.put("cosmological_parameters", "n_z", 3_i64).unwrap();
///
/// assert_eq!(block.get_real("Cosmological_Parameters", "OMEGA_M").unwrap(), 0.3);
/// // integers widen to reals
/// assert_eq!(block.get_real("cosmological_parameters", "n_z").unwrap(), 3.0);
/// // but the tag cannot change through put
/// assert!(block.put("cosmological_parameters", "omega_m", "high").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataBlock {
    sections: IndexMap<String, IndexMap<String, Value>>,
    log: Vec<WriteRecord>,
    writer: Option<Arc<str>>,
}

impl DataBlock {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh store pre-seeded with the contents of `base`.
    ///
    /// The write log and current writer are not carried over.
    #[must_use]
    pub fn seeded_from(base: &DataBlock) -> Self {
        Self {
            sections: base.sections.clone(),
            log: Vec::new(),
            writer: None,
        }
    }

    /// Sets the module name recorded against subsequent writes.
    pub fn set_writer(&mut self, writer: Option<&str>) {
        self.writer = writer.map(Arc::from);
    }

    /// Current writer.
    #[must_use]
    pub fn writer(&self) -> Option<&str> {
        self.writer.as_deref()
    }

    /// Returns `true` if a value exists at the address.
    #[must_use]
    pub fn has(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(&normalize(section))
            .is_some_and(|s| s.contains_key(&normalize(key)))
    }

    /// Returns `true` if the section holds at least one key.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections
            .get(&normalize(section))
            .is_some_and(|s| !s.is_empty())
    }

    /// Returns the raw value at the address.
    ///
    /// # Errors
    ///
    /// [`BlockError::NotFound`] if nothing is stored there.
    pub fn get(&self, section: &str, key: &str) -> Result<&Value, BlockError> {
        let section_n = normalize(section);
        let key_n = normalize(key);
        self.sections
            .get(&section_n)
            .and_then(|s| s.get(&key_n))
            .ok_or_else(|| BlockError::NotFound {
                hint: self.missing_hint(&section_n),
                section: section_n,
                key: key_n,
            })
    }

    /// Typed read.
    ///
    /// # Errors
    ///
    /// [`BlockError::NotFound`] or [`BlockError::WrongType`].
    pub fn get_as<T: FromValue>(&self, section: &str, key: &str) -> Result<T, BlockError> {
        let value = self.get(section, key)?;
        T::from_value(value).ok_or_else(|| BlockError::WrongType {
            section: normalize(section),
            key: normalize(key),
            expected: T::KIND,
            found: value.kind(),
        })
    }

    /// Typed read with a default for a missing value.
    ///
    /// A value of the wrong type is still an error.
    ///
    /// # Errors
    ///
    /// [`BlockError::WrongType`].
    pub fn get_as_or<T: FromValue>(
        &self,
        section: &str,
        key: &str,
        default: T,
    ) -> Result<T, BlockError> {
        match self.get_as(section, key) {
            Err(e) if e.is_not_found() => Ok(default),
            other => other,
        }
    }

    /// Reads a real; integers widen.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_real(&self, section: &str, key: &str) -> Result<f64, BlockError> {
        self.get_as(section, key)
    }

    /// # Errors
    ///
    /// See [`get_as_or`](Self::get_as_or).
    pub fn get_real_or(&self, section: &str, key: &str, default: f64) -> Result<f64, BlockError> {
        self.get_as_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_int(&self, section: &str, key: &str) -> Result<i64, BlockError> {
        self.get_as(section, key)
    }

    /// # Errors
    ///
    /// See [`get_as_or`](Self::get_as_or).
    pub fn get_int_or(&self, section: &str, key: &str, default: i64) -> Result<i64, BlockError> {
        self.get_as_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool, BlockError> {
        self.get_as(section, key)
    }

    /// # Errors
    ///
    /// See [`get_as_or`](Self::get_as_or).
    pub fn get_bool_or(&self, section: &str, key: &str, default: bool) -> Result<bool, BlockError> {
        self.get_as_or(section, key, default)
    }

    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_str(&self, section: &str, key: &str) -> Result<String, BlockError> {
        self.get_as(section, key)
    }

    /// # Errors
    ///
    /// See [`get_as_or`](Self::get_as_or).
    pub fn get_str_or(&self, section: &str, key: &str, default: &str) -> Result<String, BlockError> {
        self.get_as_or(section, key, default.to_string())
    }

    /// Reads a real vector; integer vectors widen.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_real_vec(&self, section: &str, key: &str) -> Result<Vec<f64>, BlockError> {
        self.get_as(section, key)
    }

    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_int_vec(&self, section: &str, key: &str) -> Result<Vec<i64>, BlockError> {
        self.get_as(section, key)
    }

    /// Stores a value.
    ///
    /// # Errors
    ///
    /// [`BlockError::TypeConflict`] if a value of another tag already exists
    /// at the address. The store is unchanged in that case.
    pub fn put(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), BlockError> {
        let value = value.into();
        let section_n = normalize(section);
        let key_n = normalize(key);

        if let Some(existing) = self.sections.get(&section_n).and_then(|s| s.get(&key_n)) {
            if existing.kind() != value.kind() {
                return Err(BlockError::TypeConflict {
                    section: section_n,
                    key: key_n,
                    existing: existing.kind(),
                    attempted: value.kind(),
                });
            }
        }

        self.insert(section_n, key_n, value, WriteOp::Put);
        Ok(())
    }

    /// Stores a value regardless of any existing tag.
    pub fn replace_any(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        self.insert(normalize(section), normalize(key), value.into(), WriteOp::Replace);
    }

    /// Removes a value, returning it if present.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<Value> {
        let section_n = normalize(section);
        let key_n = normalize(key);
        let removed = self
            .sections
            .get_mut(&section_n)
            .and_then(|s| s.shift_remove(&key_n));
        if removed.is_some() {
            self.record(Address::new(&section_n, &key_n), WriteOp::Remove);
        }
        removed
    }

    /// Section names in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Keys and values of a section in insertion order.
    ///
    /// Empty if the section does not exist.
    pub fn entries(&self, section: &str) -> impl Iterator<Item = (&str, &Value)> {
        self.sections
            .get(&normalize(section))
            .into_iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Key names of a section in insertion order.
    pub fn keys(&self, section: &str) -> impl Iterator<Item = &str> {
        self.entries(section).map(|(k, _)| k)
    }

    /// Total number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(IndexMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The write log, oldest first.
    #[must_use]
    pub fn write_log(&self) -> &[WriteRecord] {
        &self.log
    }

    /// Kind of the stored value, if any.
    #[must_use]
    pub fn kind_of(&self, section: &str, key: &str) -> Option<ValueKind> {
        self.get(section, key).ok().map(Value::kind)
    }

    fn insert(&mut self, section: String, key: String, value: Value, op: WriteOp) {
        let address = Address::new(&section, &key);
        self.sections.entry(section).or_default().insert(key, value);
        self.record(address, op);
    }

    fn record(&mut self, address: Address, op: WriteOp) {
        self.log.push(WriteRecord {
            writer: self.writer.clone(),
            address,
            op,
        });
    }

    fn missing_hint(&self, section: &str) -> String {
        let mut writers: Vec<&str> = Vec::new();
        for rec in self.log.iter().filter(|r| r.address.section() == section) {
            let name = rec.writer.as_deref().unwrap_or("pipeline");
            if !writers.contains(&name) {
                writers.push(name);
            }
        }

        if writers.is_empty() {
            if self.sections.contains_key(section) {
                format!(" (section '{section}' was seeded before the pipeline ran)")
            } else {
                format!(" (no module wrote to section '{section}')")
            }
        } else {
            format!(" (section '{section}' written by: {})", writers.join(", "))
        }
    }
}
