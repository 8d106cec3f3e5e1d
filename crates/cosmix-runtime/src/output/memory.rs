//! In-memory and discarding writers.

use super::{OutputError, OutputWriter};
use parking_lot::Mutex;
use std::sync::Arc;

/// Rows captured by a [`MemoryOutput`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub metadata: Vec<(String, String)>,
    pub rows: Vec<Vec<f64>>,
    pub comments: Vec<String>,
    pub finalized: bool,
}

/// Writer that keeps everything in memory.
///
/// Clones share the same table, so a test can keep one handle and pass
/// the other to the run.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    table: Arc<Mutex<MemoryTable>>,
    started: bool,
}

impl MemoryOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the table.
    #[must_use]
    pub fn table(&self) -> MemoryTable {
        self.table.lock().clone()
    }

    /// Snapshot of the rows.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.table.lock().rows.clone()
    }
}

impl OutputWriter for MemoryOutput {
    fn begin(&mut self, columns: &[String], metadata: &[(String, String)]) -> Result<(), OutputError> {
        let mut table = self.table.lock();
        *table = MemoryTable {
            columns: columns.to_vec(),
            metadata: metadata.to_vec(),
            ..MemoryTable::default()
        };
        self.started = true;
        Ok(())
    }

    fn record(&mut self, row: &[f64]) -> Result<(), OutputError> {
        if !self.started {
            return Err(OutputError::NotStarted);
        }
        let mut table = self.table.lock();
        if row.len() != table.columns.len() {
            return Err(OutputError::RowWidth {
                expected: table.columns.len(),
                got: row.len(),
            });
        }
        table.rows.push(row.to_vec());
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), OutputError> {
        if !self.started {
            return Err(OutputError::NotStarted);
        }
        self.table.lock().comments.push(text.to_string());
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), OutputError> {
        self.table.lock().finalized = true;
        Ok(())
    }
}

/// Writer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl OutputWriter for NullOutput {
    fn begin(&mut self, _columns: &[String], _metadata: &[(String, String)]) -> Result<(), OutputError> {
        Ok(())
    }

    fn record(&mut self, _row: &[f64]) -> Result<(), OutputError> {
        Ok(())
    }

    fn comment(&mut self, _text: &str) -> Result<(), OutputError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
