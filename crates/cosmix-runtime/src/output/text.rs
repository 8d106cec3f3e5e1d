//! Tab-separated chain files.
//!
//! ```text
//! #cosmological_parameters--omega_m	cosmological_parameters--h0	prior	like	post
//! ## sampler = emcee
//! ## walkers = 16
//! 0.31	0.68	1.20	-3.5	-2.3
//! ...
//! ```

use super::{OutputError, OutputWriter};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Buffered text writer; flushed on [`finalize`](OutputWriter::finalize).
#[derive(Debug)]
pub struct TextOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    width: usize,
    rows: usize,
    append: bool,
}

impl TextOutput {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            width: 0,
            rows: 0,
            append: false,
        }
    }

    /// A writer that continues an existing chain file instead of
    /// truncating it. The header must match the columns passed to
    /// [`begin`](OutputWriter::begin); a missing or empty file is started
    /// fresh.
    #[must_use]
    pub fn appending(path: impl Into<PathBuf>) -> Self {
        Self {
            append: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, OutputError> {
        self.writer.as_mut().ok_or(OutputError::NotStarted)
    }
}

impl OutputWriter for TextOutput {
    fn begin(&mut self, columns: &[String], metadata: &[(String, String)]) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        let header = format!("#{}", columns.join("\t"));
        let existing = if self.append { first_line(&self.path)? } else { None };
        let file = match &existing {
            Some(line) if *line != header => {
                return Err(OutputError::Parse {
                    path: self.path.clone(),
                    line: 1,
                    message: format!("cannot append: header is '{line}', expected '{header}'"),
                });
            }
            Some(_) => OpenOptions::new().append(true).open(&self.path),
            None => File::create(&self.path),
        }
        .map_err(|e| OutputError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);

        let io = |e| OutputError::io(&self.path, e);
        if existing.is_none() {
            writeln!(writer, "{header}").map_err(io)?;
        }
        for (key, value) in metadata {
            writeln!(writer, "## {key} = {value}").map_err(io)?;
        }

        debug!(
            path = %self.path.display(),
            columns = columns.len(),
            appending = existing.is_some(),
            "Chain file opened"
        );
        self.writer = Some(writer);
        self.width = columns.len();
        Ok(())
    }

    fn record(&mut self, row: &[f64]) -> Result<(), OutputError> {
        if row.len() != self.width {
            return Err(OutputError::RowWidth {
                expected: self.width,
                got: row.len(),
            });
        }
        let line = row
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join("\t");
        let path = self.path.clone();
        writeln!(self.writer()?, "{line}").map_err(|e| OutputError::io(path, e))?;
        self.rows += 1;
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), OutputError> {
        let path = self.path.clone();
        writeln!(self.writer()?, "## {text}").map_err(|e| OutputError::io(path, e))
    }

    fn finalize(&mut self) -> Result<(), OutputError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| OutputError::io(&self.path, e))?;
            debug!(path = %self.path.display(), rows = self.rows, "Chain file closed");
        }
        Ok(())
    }
}

/// First line of `path`, or `None` if the file is missing or empty.
fn first_line(path: &Path) -> Result<Option<String>, OutputError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(OutputError::io(path, e)),
    };
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| OutputError::io(path, e))?;
    let line = line.trim_end().to_string();
    Ok((!line.is_empty()).then_some(line))
}

/// A chain file read back into memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chain {
    pub columns: Vec<String>,
    /// `## key = value` lines, in file order.
    pub metadata: Vec<(String, String)>,
    pub rows: Vec<Vec<f64>>,
}

impl Chain {
    /// Index of a column by label.
    #[must_use]
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// All values of one column.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    /// Last metadata value for `key`.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Reads a chain file written by [`TextOutput`].
///
/// # Errors
///
/// [`OutputError::Io`] or [`OutputError::Parse`].
pub fn read_chain(path: &Path) -> Result<Chain, OutputError> {
    let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
    let mut chain = Chain::default();
    let parse_err = |line: usize, message: String| OutputError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| OutputError::io(path, e))?;
        let n = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(meta) = trimmed.strip_prefix("##") {
            if let Some((k, v)) = meta.split_once('=') {
                chain.metadata.push((k.trim().to_string(), v.trim().to_string()));
            }
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('#') {
            chain.columns = header.split('\t').map(|c| c.trim().to_string()).collect();
            continue;
        }
        let row = trimmed
            .split_whitespace()
            .map(|t| t.parse::<f64>().map_err(|_| parse_err(n, format!("'{t}' is not a number"))))
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != chain.columns.len() {
            return Err(parse_err(
                n,
                format!("{} values for {} columns", row.len(), chain.columns.len()),
            ));
        }
        chain.rows.push(row);
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::ErrorCode;
    use tempfile::TempDir;

    fn columns() -> Vec<String> {
        ["cosmological_parameters--omega_m", "prior", "like", "post"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn write_then_read() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("chains/run.txt");
        let mut out = TextOutput::new(&path);
        out.begin(&columns(), &[("sampler".into(), "grid".into())])
            .expect("begin");
        out.record(&[0.3, 1.5, -2.0, -0.5]).expect("record");
        out.record(&[0.35, 1.5, f64::NEG_INFINITY, f64::NEG_INFINITY])
            .expect("record");
        out.comment("n_samples = 2").expect("comment");
        out.finalize().expect("finalize");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("#cosmological_parameters--omega_m\tprior\tlike\tpost\n## sampler = grid\n"));

        let chain = read_chain(&path).expect("parse");
        assert_eq!(chain.columns, columns());
        assert_eq!(chain.rows.len(), 2);
        assert_eq!(chain.rows[1][2], f64::NEG_INFINITY);
        assert_eq!(chain.meta("sampler"), Some("grid"));
        assert_eq!(chain.meta("n_samples"), Some("2"));
        assert_eq!(chain.column_index("like"), Some(2));
    }

    #[test]
    fn record_before_begin() {
        let mut out = TextOutput::new("unused.txt");
        let err = out.record(&[1.0]).expect_err("not started");
        assert_eq!(err.code(), "OUTPUT_NOT_STARTED");
    }

    #[test]
    fn row_width_checked() {
        let temp = TempDir::new().expect("tempdir");
        let mut out = TextOutput::new(temp.path().join("x.txt"));
        out.begin(&columns(), &[]).expect("begin");
        let err = out.record(&[1.0]).expect_err("width");
        assert_eq!(err.code(), "OUTPUT_ROW_WIDTH");
    }

    #[test]
    fn malformed_chain() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("bad.txt");
        std::fs::write(&path, "#a\tb\n1 2\n3\n").expect("write");
        let err = read_chain(&path).expect_err("short row");
        assert!(err.to_string().contains(":3:"), "{err}");
    }

    #[test]
    fn append_continues_the_chain() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("run.txt");

        let mut out = TextOutput::appending(&path);
        out.begin(&columns(), &[("sampler".into(), "emcee".into())])
            .expect("fresh begin");
        out.record(&[0.3, 0.0, -1.0, -1.0]).expect("record");
        out.finalize().expect("finalize");

        let mut out = TextOutput::appending(&path);
        out.begin(&columns(), &[("resumed".into(), "true".into())])
            .expect("append begin");
        out.record(&[0.4, 0.0, -2.0, -2.0]).expect("record");
        out.finalize().expect("finalize");

        let chain = read_chain(&path).expect("parse");
        assert_eq!(chain.rows.len(), 2);
        assert_eq!(chain.meta("resumed"), Some("true"));

        let mut other = columns();
        other[0] = "cosmological_parameters--h0".into();
        let err = TextOutput::appending(&path)
            .begin(&other, &[])
            .expect_err("header mismatch");
        assert_eq!(err.code(), "OUTPUT_PARSE");
    }
}
