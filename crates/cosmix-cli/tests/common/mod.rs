//! Shared E2E test helpers for `cosmix` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for a single CLI run.
pub const TIMEOUT: Duration = Duration::from_secs(30);

/// A Command for the `cosmix` binary with a clean environment: no
/// `COSMIX_*` overrides and no `RUST_LOG` leak in from the caller.
pub fn cosmix_cmd() -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("cosmix");
    cmd.timeout(TIMEOUT);
    cmd.env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("COSMIX_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

/// Writes `params.toml` and `values.toml` for the builtin H(z) pipeline into
/// `dir` and returns the parameter file path.
///
/// The pipeline is consistency → background → a Gaussian likelihood of
/// H(z) at z = 0, 0.5, 1; `sampler` selects the sampler and `extra` is
/// appended verbatim.
pub fn write_params(dir: &Path, sampler: &str, extra: &str) -> PathBuf {
    let params = format!(
        r#"[runtime]
sampler = "{sampler}"

[pipeline]
modules = "consistency background hubble"
values = "values.toml"
quiet = true

[output]
filename = "out/chain.txt"

[consistency]
extra_relations = ""

[background]
zmin = 0.0
zmax = 1.0
nz = 3

[hubble]
kind = "gaussian_likelihood"
y_name = "h"
x = [0.0, 0.5, 1.0]
y = [70.0, 91.6, 123.2]
sigma = 1.0

{extra}
"#
    );
    let values = "[cosmological_parameters]\nomega_c = [0.2, 0.261, 0.32]\nomega_b = 0.039\nh0 = [0.6, 0.7, 0.8]\n";
    let path = dir.join("params.toml");
    std::fs::write(&path, params).expect("write params.toml");
    std::fs::write(dir.join("values.toml"), values).expect("write values.toml");
    path
}
