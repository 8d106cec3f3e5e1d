//! Sample output.
//!
//! Samplers produce rows; an [`OutputWriter`] stores them. The column
//! layout is fixed at [`begin`](OutputWriter::begin):
//!
//! ```text
//! <varying section--key>...  <extra outputs>...  prior  like  post
//! ```
//!
//! [`save_block`] is separate: it writes a single evaluated block as a
//! directory tree, one subdirectory per section.

mod error;
mod memory;
mod text;

pub use error::OutputError;
pub use memory::{MemoryOutput, MemoryTable, NullOutput};
pub use text::{read_chain, Chain, TextOutput};

use crate::config::{Config, ConfigError};
use cosmix_block::{DataBlock, Value};
use cosmix_types::names;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sink for sample rows.
pub trait OutputWriter: Send {
    /// Starts the table with column labels and `key = value` metadata.
    fn begin(&mut self, columns: &[String], metadata: &[(String, String)]) -> Result<(), OutputError>;

    /// Appends one row; its width must match the columns.
    fn record(&mut self, row: &[f64]) -> Result<(), OutputError>;

    /// Appends free-form `key = value` text after the rows written so far.
    fn comment(&mut self, text: &str) -> Result<(), OutputError>;

    /// Flushes and closes. Safe to call more than once.
    fn finalize(&mut self) -> Result<(), OutputError>;
}

/// Chain format selected by `[output] format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    None,
}

impl std::str::FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "none" => Ok(Self::None),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Chain file named by `[output] filename`, resolved against the
/// parameter file's directory.
///
/// # Errors
///
/// [`ConfigError`] if `filename` is not a string.
pub fn output_path(config: &Config) -> Result<Option<PathBuf>, ConfigError> {
    Ok(config
        .get::<String>(names::OUTPUT, "filename")?
        .map(|f| config.resolve_path(&f)))
}

/// Creates the writer described by `[output]`.
///
/// No `filename` means nothing is written. With `append` an existing
/// chain file is continued rather than truncated.
///
/// # Errors
///
/// [`OutputError::UnknownFormat`], or a config error wrapped as
/// [`OutputError::UnknownFormat`] text if `[output]` is malformed.
pub fn create_output(config: &Config, append: bool) -> Result<Box<dyn OutputWriter>, OutputError> {
    let format: OutputFormat = config
        .get_str_or(names::OUTPUT, "format", "text")
        .map_err(|e| OutputError::UnknownFormat(e.to_string()))?
        .parse()?;
    let path = output_path(config).map_err(|e| OutputError::UnknownFormat(e.to_string()))?;

    match (format, path) {
        (OutputFormat::Text, Some(path)) => {
            debug!(path = %path.display(), append, "Text output selected");
            Ok(Box::new(if append {
                TextOutput::appending(path)
            } else {
                TextOutput::new(path)
            }))
        }
        (OutputFormat::Text, None) => {
            debug!("No [output] filename; samples are not written");
            Ok(Box::new(NullOutput))
        }
        (OutputFormat::None, _) => Ok(Box::new(NullOutput)),
    }
}

/// Writes `block` under `dir`.
///
/// ```text
/// <dir>/<section>/values.txt   key = value, one scalar per line
/// <dir>/<section>/<key>.txt    one element per line, for vectors
/// ```
///
/// # Errors
///
/// [`OutputError::Io`] on any filesystem failure.
pub fn save_block(block: &DataBlock, dir: &Path) -> Result<(), OutputError> {
    for section in block.sections() {
        let section_dir = dir.join(section);
        std::fs::create_dir_all(&section_dir).map_err(|e| OutputError::io(&section_dir, e))?;

        let mut scalars = String::new();
        for (key, value) in block.entries(section) {
            if value.kind().is_vector() {
                let path = section_dir.join(format!("{key}.txt"));
                std::fs::write(&path, vector_lines(value)).map_err(|e| OutputError::io(&path, e))?;
            } else {
                scalars.push_str(&format!("{key} = {value}\n"));
            }
        }
        let path = section_dir.join("values.txt");
        std::fs::write(&path, scalars).map_err(|e| OutputError::io(&path, e))?;
    }
    debug!(dir = %dir.display(), sections = block.sections().count(), "Block saved");
    Ok(())
}

fn vector_lines(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::IntVec(v) => v.iter().for_each(|x| out.push_str(&format!("{x}\n"))),
        Value::RealVec(v) => v.iter().for_each(|x| out.push_str(&format!("{x}\n"))),
        other => out.push_str(&format!("{other}\n")),
    }
    out
}

/// Reads a `values.txt` file written by [`save_block`] into `key → text`.
///
/// # Errors
///
/// [`OutputError::Io`] if the file cannot be read.
pub fn read_values(path: &Path) -> Result<Vec<(String, String)>, OutputError> {
    let text = std::fs::read_to_string(path).map_err(|e| OutputError::io(path, e))?;
    Ok(text
        .lines()
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn save_block_layout() {
        let temp = TempDir::new().expect("tempdir");
        let mut block = DataBlock::new();
        block.put("cosmological_parameters", "omega_m", 0.3).expect("put");
        block.put("cosmological_parameters", "flat", true).expect("put");
        block.put("distances", "z", vec![0.0, 0.5]).expect("put");
        block.put("distances", "nz", 2_i64).expect("put");

        save_block(&block, temp.path()).expect("save");

        let values = read_values(&temp.path().join("cosmological_parameters/values.txt"))
            .expect("values");
        assert_eq!(
            values,
            vec![
                ("omega_m".to_string(), "0.3".to_string()),
                ("flat".to_string(), "True".to_string())
            ]
        );
        let z = std::fs::read_to_string(temp.path().join("distances/z.txt")).expect("z");
        assert_eq!(z, "0\n0.5\n");
        let dist = std::fs::read_to_string(temp.path().join("distances/values.txt")).expect("d");
        assert_eq!(dist, "nz = 2\n");
    }

    #[test]
    fn create_output_from_config() {
        let temp = TempDir::new().expect("tempdir");
        let params = temp.path().join("params.toml");
        let config = Config::from_toml_str("[output]\nfilename = \"out/chain.txt\"")
            .expect("config")
            .with_source(&params);
        assert_eq!(
            output_path(&config).expect("path"),
            Some(temp.path().join("out/chain.txt"))
        );
        assert!(create_output(&config, false).is_ok());

        let config = Config::from_toml_str("[output]\nformat = \"fits\"").expect("config");
        let err = create_output(&config, true).err().expect("unknown format");
        assert_eq!(err.code(), "OUTPUT_UNKNOWN_FORMAT");

        let config = Config::default();
        assert_eq!(output_path(&config).expect("path"), None);
        assert!(create_output(&config, false).is_ok());
    }
}
