//! E2E tests for the `cosmix` binary.
//!
//! Report lines go to stdout; logs and `[CODE] message` errors go to
//! stderr.

mod common;

use common::{cosmix_cmd, write_params};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

// ─── Single evaluation ─────────────────────────────────────────────

#[test]
fn reports_likelihood_on_stdout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "test", "");
    cosmix_cmd()
        .arg(&params)
        .assert()
        .success()
        .stdout(contains("Prior = "))
        .stdout(contains("Likelihood = -"))
        .stdout(contains("Posterior = "))
        .stdout(contains("Parameter").not())
        .stderr(contains("WARN").not().and(contains("Parameter").not()));
}

#[test]
fn override_and_save_dir() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "test", "[test]\nsave_dir = \"out/block\"");
    cosmix_cmd()
        .arg(&params)
        .args(["-p", "consistency.extra_relations=omega_x=omega_c+100"])
        .assert()
        .success();

    let values = std::fs::read_to_string(tmp.path().join("out/block/cosmological_parameters/values.txt"))
        .expect("values.txt");
    let omega_x: f64 = values
        .lines()
        .find_map(|l| l.strip_prefix("omega_x = "))
        .and_then(|v| v.trim().parse().ok())
        .expect("omega_x line");
    assert!((omega_x - 100.261).abs() < 1e-9, "{values}");
}

// ─── Errors ────────────────────────────────────────────────────────

#[test]
fn missing_params_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    cosmix_cmd()
        .arg(tmp.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(contains("[CONFIG_READ_FILE]"));
}

#[test]
fn unknown_override_is_reported_with_code() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "test", "");
    cosmix_cmd()
        .arg(&params)
        .args(["-p", "background.nonsense=1"])
        .assert()
        .failure()
        .stderr(contains("[CONFIG_UNKNOWN_OPTION]"));
}

#[test]
fn malformed_assignment_is_a_usage_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "test", "");
    cosmix_cmd()
        .arg(&params)
        .args(["-p", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(contains("no-equals-sign"));
}

#[test]
fn theta_conflict_fails_before_running() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "test", "");
    let text = std::fs::read_to_string(&params)
        .expect("params")
        .replace("extra_relations = \"\"", "extra_relations = \"\"\ncosmomc_theta = true");
    std::fs::write(&params, text).expect("rewrite");

    cosmix_cmd()
        .arg(&params)
        .assert()
        .failure()
        .stdout(contains("Likelihood").not())
        .stderr(contains("[PIPELINE_CONFIGURE]").and(contains("cosmomc_theta")));
}

// ─── Samplers ──────────────────────────────────────────────────────

#[test]
fn grid_with_injection_and_threads() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(tmp.path(), "grid", "[grid]\nnsample_dimension = 6");
    cosmix_cmd()
        .arg(&params)
        .args(["-v", "cosmological_parameters.h0=0.7", "--threads", "2"])
        .assert()
        .success();

    let chain = std::fs::read_to_string(tmp.path().join("out/chain.txt")).expect("chain");
    let mut lines = chain.lines();
    assert_eq!(
        lines.next(),
        Some("#cosmological_parameters--omega_c\tprior\tlike\tpost")
    );
    let rows = chain.lines().filter(|l| !l.starts_with('#')).count();
    assert_eq!(rows, 6);
    assert!(chain.contains("## sampler = grid"));
}

#[test]
fn metropolis_then_postprocess() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let params = write_params(
        tmp.path(),
        "metropolis",
        "[metropolis]\nsamples = 300\nnsteps = 100\nrandom_seed = 1\nproposal_scale = 0.02",
    );
    let summary = tmp.path().join("summary");
    cosmix_cmd()
        .arg(&params)
        .arg("--postprocess")
        .arg(&summary)
        .arg("--verbose")
        .assert()
        .success()
        .stderr(contains("run.done"));

    let means = std::fs::read_to_string(summary.join("means.txt")).expect("means.txt");
    assert!(means.contains("cosmological_parameters--omega_c\t"));
    assert!(means.contains("cosmological_parameters--h0\t"));
    assert!(summary.join("cosmological_parameters--h0.txt").exists());
}
