//! Batch orchestration: one independent run per time resolution.
//!
//! A failing resolution is recorded with its error and does not stop the
//! others; the manifest reports partial success.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use crate::config::{ResolutionConfig, RunConfig};
use crate::io::export::{WideField, export_long_csv, export_wide_csv, export_zone_csv};
use crate::io::import::{load_catalog, load_dispatch};
use crate::redistribution::engine::{EngineConfig, GroupDiagnostics, Redistribution, redistribute};
use crate::redistribution::preprocess::{DispatchTables, GeneratorCatalog, preprocess};
use crate::redistribution::summary::RunReport;

/// Preprocess, redistribute and aggregate one set of dispatch tables.
pub fn redistribute_tables(
    tables: &DispatchTables,
    catalog: &GeneratorCatalog,
    hydrology: &str,
    engine: &EngineConfig,
) -> Redistribution {
    let records = preprocess(tables, catalog, hydrology);
    redistribute(&records, engine)
}

/// Manifest entry of one resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionRecord {
    pub resolution: String,
    /// `"ok"` or `"error"`.
    pub status: String,
    pub error: Option<String>,
    pub records: usize,
    pub groups: usize,
    pub unconverged: Vec<GroupDiagnostics>,
    pub outputs: Vec<String>,
}

/// Run manifest written next to the outputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub hydrology: String,
    pub iter_max: usize,
    pub tolerance: f64,
    pub success: usize,
    pub failure: usize,
    pub resolutions: Vec<ResolutionRecord>,
}

/// Summary returned after the run.
#[derive(Debug)]
pub struct RunSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub resolutions: Vec<ResolutionRecord>,
    /// Reports of the successful resolutions, in configuration order.
    pub reports: Vec<(String, RunReport)>,
}

struct ResolutionOutput {
    report: RunReport,
    outputs: Vec<PathBuf>,
}

/// Runs every configured resolution and writes the run manifest.
///
/// # Errors
///
/// Only fails when the output directory, thread pool or manifest cannot be
/// set up; input errors are recorded per resolution.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let output_dir = &config.run.output_dir;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;

    let mut builder = ThreadPoolBuilder::new();
    if config.run.threads > 0 {
        builder = builder.num_threads(config.run.threads);
    }
    let pool = builder
        .build()
        .context("building rayon thread pool for zone groups")?;

    let inputs = &config.inputs;
    let catalog = load_catalog(
        &inputs.generators,
        &inputs.nodes,
        &inputs.fuels,
        inputs.ratings.as_deref(),
    )
    .context("loading generator metadata");
    if let Err(err) = &catalog {
        error!("{err:#}");
    }

    let outcomes: Vec<Result<ResolutionOutput>> = pool.install(|| {
        config
            .resolution
            .par_iter()
            .map(|res| match &catalog {
                Ok(catalog) => run_resolution(res, catalog, config),
                Err(err) => Err(anyhow!("{err:#}")),
            })
            .collect()
    });

    let mut records = Vec::with_capacity(outcomes.len());
    let mut reports = Vec::new();
    for (res, outcome) in config.resolution.iter().zip(outcomes) {
        let name = res.name.to_string();
        let record = match outcome {
            Ok(out) => {
                info!(
                    resolution = %name,
                    records = out.report.records,
                    groups = out.report.groups,
                    unconverged = out.report.unconverged.len(),
                    "resolution finished"
                );
                let record = ResolutionRecord {
                    resolution: name.clone(),
                    status: "ok".to_string(),
                    error: None,
                    records: out.report.records,
                    groups: out.report.groups,
                    unconverged: out.report.unconverged.clone(),
                    outputs: out.outputs.iter().map(|p| p.display().to_string()).collect(),
                };
                reports.push((name, out.report));
                record
            }
            Err(err) => {
                error!(resolution = %name, "resolution failed: {err:#}");
                ResolutionRecord {
                    resolution: name,
                    status: "error".to_string(),
                    error: Some(format!("{err:#}")),
                    records: 0,
                    groups: 0,
                    unconverged: Vec::new(),
                    outputs: Vec::new(),
                }
            }
        };
        records.push(record);
    }

    let success = records.iter().filter(|r| r.status == "ok").count();
    let failure = records.len() - success;

    let manifest = RunManifest {
        hydrology: config.run.hydrology.clone(),
        iter_max: config.engine.iter_max,
        tolerance: config.engine.tolerance,
        success,
        failure,
        resolutions: records.clone(),
    };
    let manifest_path = output_dir.join("run_manifest.json");
    write_manifest(&manifest_path, &manifest)?;

    Ok(RunSummary {
        success,
        failure,
        manifest_path,
        resolutions: records,
        reports,
    })
}

fn run_resolution(
    res: &ResolutionConfig,
    catalog: &GeneratorCatalog,
    config: &RunConfig,
) -> Result<ResolutionOutput> {
    let curtailment = load_dispatch(&res.curtailment, &res.suffix, res.name)
        .with_context(|| format!("loading {} curtailment", res.name))?;
    let energy = load_dispatch(&res.energy, &res.suffix, res.name)
        .with_context(|| format!("loading {} energy", res.name))?;
    let tables = DispatchTables {
        curtailment,
        energy,
    };

    let engine = config.engine_config();
    let outcome = redistribute_tables(&tables, catalog, &config.run.hydrology, &engine);
    let results = &outcome.results;

    let dir = &config.run.output_dir;
    let mut outputs = Vec::new();

    let long = dir.join(format!("long_{}.csv", res.name));
    export_long_csv(results, &long).with_context(|| format!("writing '{}'", long.display()))?;
    outputs.push(long);

    let zones = dir.join(format!("zones_{}.csv", res.name));
    export_zone_csv(&outcome.zones, &zones)
        .with_context(|| format!("writing '{}'", zones.display()))?;
    outputs.push(zones);

    for field in WideField::ALL {
        let wide = dir.join(format!("wide_{}_{}.csv", res.name, field.as_str()));
        export_wide_csv(results, field, &wide)
            .with_context(|| format!("writing '{}'", wide.display()))?;
        outputs.push(wide);
    }

    Ok(ResolutionOutput {
        report: RunReport::from_redistribution(&outcome),
        outputs,
    })
}

fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest")?;
    fs::write(path, json).with_context(|| format!("writing manifest '{}'", path.display()))
}
