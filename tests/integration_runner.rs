//! End-to-end batch runs over CSV fixtures.

mod common;

use std::fs;
use std::path::Path;

use curtail_redist::config::RunConfig;
use curtail_redist::runner;

fn config(dir: &Path, toml: &str) -> RunConfig {
    let path = dir.join("run.toml");
    fs::write(&path, toml).expect("config should be writable");
    let cfg = RunConfig::from_toml_file(&path).expect("config should parse");
    assert!(cfg.validate().is_empty());
    cfg
}

const BLOCK_AND_HOUR: &str = r#"
[run]
hydrology = "1"
output_dir = "out"
threads = 2

[inputs]
generators = "generators.csv"
nodes = "nodes.csv"
fuels = "fuels.csv"
ratings = "ratings.csv"

[[resolution]]
name = "block"
suffix = "B"
curtailment = "curtailment_B.csv"
energy = "energy_B.csv"

[[resolution]]
name = "hour"
suffix = "H"
curtailment = "curtailment_H.csv"
energy = "energy_H.csv"
"#;

#[test]
fn failed_resolution_does_not_stop_the_others() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_catalog(dir.path());
    common::write_block_tables(dir.path());
    // no hour tables on disk

    let cfg = config(dir.path(), BLOCK_AND_HOUR);
    let summary = runner::run(&cfg).expect("run should complete");

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 1);
    assert_eq!(summary.resolutions[0].status, "ok");
    assert_eq!(summary.resolutions[1].status, "error");
    assert!(
        summary.resolutions[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("curtailment_H.csv"))
    );

    let out = dir.path().join("out");
    for name in [
        "long_block.csv",
        "zones_block.csv",
        "wide_block_energy.csv",
        "wide_block_curtailment.csv",
    ] {
        assert!(out.join(name).exists(), "{name} should be written");
    }
    assert!(!out.join("long_hour.csv").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.manifest_path).expect("manifest"))
            .expect("manifest should be JSON");
    assert_eq!(manifest["success"], 1);
    assert_eq!(manifest["failure"], 1);
    assert_eq!(manifest["resolutions"][1]["status"], "error");
}

#[test]
fn block_results_follow_capacity_and_ratings() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_catalog(dir.path());
    common::write_block_tables(dir.path());

    let mut cfg = config(dir.path(), BLOCK_AND_HOUR);
    cfg.resolution.truncate(1);
    let summary = runner::run(&cfg).expect("run should complete");
    assert_eq!(summary.failure, 0);

    let long = fs::read_to_string(dir.path().join("out/long_block.csv")).expect("long table");
    let lines: Vec<&str> = long.lines().collect();
    // header, month 1 (G1, G2, G3), month 2 (UNKNOWN in NoZone, G1, G2)
    assert_eq!(lines.len(), 7);
    assert_eq!(
        lines[1],
        "2030,1,1,G1,N1,Z1,30.0000,20.0000,42.6667,7.3333,60.0000,14.6667"
    );
    assert_eq!(
        lines[3],
        "2030,1,1,G3,N2,Z1,6.0000,40.0000,46.0000,0.0000,13.0435,0.0000"
    );
    assert_eq!(
        lines[4],
        "2030,2,1,UNKNOWN,NoNode,NoZone,0.0000,5.0000,5.0000,0.0000,0.0000,0.0000"
    );
    // the February rating caps G1 at 25 while G2 saturates
    assert_eq!(
        lines[5],
        "2030,2,1,G1,N1,Z1,10.0000,40.0000,40.0000,10.0000,20.0000,20.0000"
    );
    assert_eq!(
        lines[6],
        "2030,2,1,G2,N2,Z1,0.0000,40.0000,40.0000,0.0000,0.0000,0.0000"
    );

    let zones = fs::read_to_string(dir.path().join("out/zones_block.csv")).expect("zone table");
    assert!(
        zones
            .lines()
            .any(|l| l == "2030,1,1,Z1,36.0000,110.0000,110.0000,36.0000,24.6575,24.6575")
    );

    let report = &summary.reports[0].1;
    assert_eq!(report.groups, 3);
    assert!(report.unconverged.is_empty());
}

#[test]
fn other_hydrology_is_selectable() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_catalog(dir.path());
    common::write_block_tables(dir.path());

    let mut cfg = config(dir.path(), BLOCK_AND_HOUR);
    cfg.resolution.truncate(1);
    cfg.run.hydrology = "2".to_string();
    let summary = runner::run(&cfg).expect("run should complete");
    assert_eq!(summary.reports[0].1.records, 2);
}

#[test]
fn mismatched_suffix_fails_the_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_catalog(dir.path());
    common::write_block_tables(dir.path());

    let toml = BLOCK_AND_HOUR
        .replace("curtailment_H.csv", "curtailment_B.csv")
        .replace("energy_H.csv", "energy_B.csv");
    let cfg = config(dir.path(), &toml);
    let summary = runner::run(&cfg).expect("run should complete");

    assert_eq!(summary.success, 1);
    let err = summary.resolutions[1].error.clone().unwrap_or_default();
    assert!(err.contains("`_H` suffix"), "{err}");
}

#[test]
fn missing_metadata_fails_every_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    common::write_block_tables(dir.path());

    let cfg = config(dir.path(), BLOCK_AND_HOUR);
    let summary = runner::run(&cfg).expect("run should complete");
    assert_eq!(summary.success, 0);
    assert_eq!(summary.failure, 2);
    assert!(summary.manifest_path.exists());
}
