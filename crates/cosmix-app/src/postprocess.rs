//! Chain summaries.
//!
//! Reads the chain a run wrote and summarises each parameter column:
//! weighted mean, standard deviation, median and 68% interval, plus a 1-D
//! histogram.
//!
//! Weights depend on the sampler recorded in the chain header:
//!
//! | sampler | weight | burn-in |
//! |---------|--------|---------|
//! | `grid`, `test` | `exp(post - max post)` | none |
//! | `metropolis`, `emcee` | 1 per row | `[postprocess] burn` (default 0.2) |
//!
//! Rows with a non-finite posterior get weight 0.

use crate::RunError;
use cosmix_runtime::output::{output_path, read_chain, Chain};
use cosmix_runtime::ConfigLoader;
use std::path::{Path, PathBuf};
use tracing::info;

const SECTION: &str = "postprocess";
const DEFAULT_BURN: f64 = 0.2;
const DEFAULT_BINS: usize = 20;
const TRAILING: [&str; 3] = ["prior", "like", "post"];

/// Summary statistics of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    /// 16th percentile.
    pub lower: f64,
    /// 84th percentile.
    pub upper: f64,
}

/// Summaries of a finished chain.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    chain: Chain,
    weights: Vec<f64>,
    outdir: PathBuf,
    bins: usize,
}

impl Postprocessor {
    /// Loads the chain named by the `[output] filename` of `params`.
    ///
    /// # Errors
    ///
    /// [`RunError::Config`] if the parameter file cannot be read,
    /// [`RunError::Postprocess`] if it names no chain file or the chain has
    /// no usable rows.
    pub fn from_run(params: &Path, outdir: impl Into<PathBuf>) -> Result<Self, RunError> {
        let config = ConfigLoader::new(params).load()?;
        let path = output_path(&config)?
            .ok_or_else(|| RunError::Postprocess("no [output] filename in the parameter file".into()))?;
        let chain = read_chain(&path)?;
        let burn = config.get_real_or(SECTION, "burn", DEFAULT_BURN)?;
        let bins = config.get_int_or(SECTION, "bins", DEFAULT_BINS as i64)?;
        let bins = usize::try_from(bins)
            .ok()
            .filter(|b| *b > 0)
            .ok_or_else(|| RunError::Postprocess(format!("bins must be positive, got {bins}")))?;
        info!(chain = %path.display(), rows = chain.rows.len(), "postprocess.load");
        Ok(Self::from_chain(chain, burn, outdir)?.with_bins(bins))
    }

    /// Summarises an already loaded chain.
    ///
    /// # Errors
    ///
    /// [`RunError::Postprocess`] if `burn` is outside `[0, 1)` or no row
    /// carries weight.
    pub fn from_chain(chain: Chain, burn: f64, outdir: impl Into<PathBuf>) -> Result<Self, RunError> {
        if !(0.0..1.0).contains(&burn) {
            return Err(RunError::Postprocess(format!("burn must be in [0, 1), got {burn}")));
        }
        let post = chain
            .column_index("post")
            .ok_or_else(|| RunError::Postprocess("chain has no post column".into()))?;
        let posts = chain.column(post);

        let weights: Vec<f64> = match chain.meta("sampler") {
            Some("grid") | Some("test") => {
                let max = posts
                    .iter()
                    .copied()
                    .filter(|p| p.is_finite())
                    .fold(f64::NEG_INFINITY, f64::max);
                posts
                    .iter()
                    .map(|p| if p.is_finite() { (p - max).exp() } else { 0.0 })
                    .collect()
            }
            _ => {
                let skip = (burn * posts.len() as f64).floor() as usize;
                posts
                    .iter()
                    .enumerate()
                    .map(|(i, p)| if i >= skip && p.is_finite() { 1.0 } else { 0.0 })
                    .collect()
            }
        };
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(RunError::Postprocess("no valid samples".into()));
        }

        Ok(Self {
            chain,
            weights,
            outdir: outdir.into(),
            bins: DEFAULT_BINS,
        })
    }

    #[must_use]
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.max(1);
        self
    }

    /// Columns that are summarised: everything before `prior like post`.
    fn parameter_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.chain
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !TRAILING.contains(&c.as_str()))
            .map(|(i, c)| (i, c.as_str()))
    }

    /// (value, weight) pairs of one column, finite values only.
    fn weighted(&self, index: usize) -> Vec<(f64, f64)> {
        self.chain
            .rows
            .iter()
            .zip(&self.weights)
            .map(|(row, w)| (row[index], *w))
            .filter(|(x, w)| *w > 0.0 && x.is_finite())
            .collect()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<ParameterSummary> {
        self.parameter_columns()
            .map(|(i, name)| summarize(name, &self.weighted(i)))
            .collect()
    }

    /// Normalised histogram of one column: `(bin centre, density)`.
    #[must_use]
    pub fn histogram(&self, column: &str) -> Vec<(f64, f64)> {
        let Some(index) = self.chain.column_index(column) else {
            return Vec::new();
        };
        histogram(&self.weighted(index), self.bins)
    }

    /// Writes `means.txt` and one `<column>.txt` histogram per parameter.
    ///
    /// # Errors
    ///
    /// [`RunError::Io`] on any filesystem failure.
    pub fn save(&self) -> Result<Vec<PathBuf>, RunError> {
        std::fs::create_dir_all(&self.outdir).map_err(|e| RunError::io(&self.outdir, e))?;
        let mut written = Vec::new();

        let mut means = String::from("#parameter\tmean\tstd\tmedian\tlower68\tupper68\n");
        for s in self.summaries() {
            means.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                s.name, s.mean, s.std, s.median, s.lower, s.upper
            ));
        }
        written.push(self.write("means.txt", &means)?);

        for (_, name) in self.parameter_columns() {
            let mut text = format!("#{name}\tdensity\n");
            for (centre, density) in self.histogram(name) {
                text.push_str(&format!("{centre}\t{density}\n"));
            }
            written.push(self.write(&format!("{name}.txt"), &text)?);
        }
        info!(dir = %self.outdir.display(), files = written.len(), "postprocess.saved");
        Ok(written)
    }

    fn write(&self, file: &str, text: &str) -> Result<PathBuf, RunError> {
        let path = self.outdir.join(file);
        std::fs::write(&path, text).map_err(|e| RunError::io(&path, e))?;
        Ok(path)
    }
}

fn summarize(name: &str, samples: &[(f64, f64)]) -> ParameterSummary {
    let total: f64 = samples.iter().map(|(_, w)| w).sum();
    let mean = samples.iter().map(|(x, w)| x * w).sum::<f64>() / total;
    let var = samples.iter().map(|(x, w)| w * (x - mean).powi(2)).sum::<f64>() / total;
    ParameterSummary {
        name: name.to_string(),
        mean,
        std: var.sqrt(),
        median: quantile(samples, 0.5),
        lower: quantile(samples, 0.16),
        upper: quantile(samples, 0.84),
    }
}

/// Weighted quantile: the smallest value whose cumulative weight reaches
/// `q` of the total.
fn quantile(samples: &[(f64, f64)], q: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = sorted.iter().map(|(_, w)| w).sum();
    let mut acc = 0.0;
    for (x, w) in &sorted {
        acc += w;
        if acc >= q * total {
            return *x;
        }
    }
    sorted.last().map_or(f64::NAN, |(x, _)| *x)
}

fn histogram(samples: &[(f64, f64)], bins: usize) -> Vec<(f64, f64)> {
    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| (lo.min(*x), hi.max(*x)));
    if samples.is_empty() {
        return Vec::new();
    }
    if hi <= lo {
        return vec![(lo, 1.0)];
    }
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0.0; bins];
    for (x, w) in samples {
        let i = (((x - lo) / width) as usize).min(bins - 1);
        counts[i] += w;
    }
    let total: f64 = counts.iter().sum();
    counts
        .iter()
        .enumerate()
        .map(|(i, c)| (lo + (i as f64 + 0.5) * width, c / (total * width)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmix_types::ErrorCode;
    use tempfile::TempDir;

    fn chain(sampler: &str, rows: Vec<Vec<f64>>) -> Chain {
        Chain {
            columns: ["cosmological_parameters--x", "prior", "like", "post"]
                .map(String::from)
                .to_vec(),
            metadata: vec![("sampler".into(), sampler.into())],
            rows,
        }
    }

    #[test]
    fn chain_weights_skip_burn_in() {
        let rows = (0..10)
            .map(|i| vec![f64::from(i), 0.0, -1.0, -1.0])
            .collect();
        let pp = Postprocessor::from_chain(chain("emcee", rows), 0.5, "unused").expect("pp");
        let s = &pp.summaries()[0];
        // rows 5..=9
        assert!((s.mean - 7.0).abs() < 1e-12);
        assert_eq!(s.median, 7.0);
        assert_eq!(s.name, "cosmological_parameters--x");
    }

    #[test]
    fn grid_weights_follow_posterior() {
        let rows = vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, f64::NEG_INFINITY],
            vec![2.0, 0.0, 0.0, (0.5_f64).ln()],
        ];
        let pp = Postprocessor::from_chain(chain("grid", rows), 0.9, "unused").expect("pp");
        let s = &pp.summaries()[0];
        // weights 1, 0, 0.5
        assert!((s.mean - 2.0 / 3.0).abs() < 1e-12, "{}", s.mean);
    }

    #[test]
    fn histogram_is_normalised() {
        let rows = (0..100)
            .map(|i| vec![f64::from(i) / 10.0, 0.0, 0.0, 0.0])
            .collect();
        let pp = Postprocessor::from_chain(chain("metropolis", rows), 0.0, "unused")
            .expect("pp")
            .with_bins(10);
        let h = pp.histogram("cosmological_parameters--x");
        assert_eq!(h.len(), 10);
        let width = h[1].0 - h[0].0;
        let area: f64 = h.iter().map(|(_, d)| d * width).sum();
        assert!((area - 1.0).abs() < 1e-9);
        assert!(pp.histogram("missing").is_empty());
    }

    #[test]
    fn save_writes_tables() {
        let temp = TempDir::new().expect("tempdir");
        let rows = (0..20).map(|i| vec![f64::from(i), 0.0, 0.0, 0.0]).collect();
        let pp = Postprocessor::from_chain(chain("emcee", rows), 0.0, temp.path().join("pp"))
            .expect("pp");
        let written = pp.save().expect("save");
        assert_eq!(written.len(), 2);
        let means = std::fs::read_to_string(temp.path().join("pp/means.txt")).expect("means");
        assert!(means.starts_with("#parameter\tmean"));
        assert!(means.contains("cosmological_parameters--x\t9.5\t"));
        assert!(temp
            .path()
            .join("pp/cosmological_parameters--x.txt")
            .exists());
    }

    #[test]
    fn rejects_unusable_chains() {
        let rows = vec![vec![0.0, 0.0, 0.0, f64::NEG_INFINITY]];
        let err = Postprocessor::from_chain(chain("emcee", rows), 0.0, "unused").expect_err("empty");
        assert_eq!(err.code(), "RUN_POSTPROCESS");

        let err = Postprocessor::from_chain(chain("emcee", Vec::new()), 1.5, "unused").expect_err("burn");
        assert_eq!(err.code(), "RUN_POSTPROCESS");
    }
}
