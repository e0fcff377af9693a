//! CSV export of redistribution results.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::redistribution::types::{Period, RedistributionResult, ZoneSummary};

/// Column header of the long-format generator table.
const LONG_HEADER: &str = "year,month,sub_period,generator,node,zone,\
                           curtailment_original,energy_original,\
                           redistributed_energy,redistributed_curtailment,\
                           original_curtailment_pct,redistributed_curtailment_pct";

/// Column header of the zone table.
const ZONE_HEADER: &str = "year,month,sub_period,zone,\
                           curtailment_original,energy_original,\
                           redistributed_energy,redistributed_curtailment,\
                           original_curtailment_pct,redistributed_curtailment_pct";

/// Result field pivoted into a wide per-generator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideField {
    RedistributedEnergy,
    RedistributedCurtailment,
}

impl WideField {
    pub const ALL: [WideField; 2] = [
        WideField::RedistributedEnergy,
        WideField::RedistributedCurtailment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WideField::RedistributedEnergy => "energy",
            WideField::RedistributedCurtailment => "curtailment",
        }
    }

    fn value(&self, r: &RedistributionResult) -> f64 {
        match self {
            WideField::RedistributedEnergy => r.redistributed_energy,
            WideField::RedistributedCurtailment => r.redistributed_curtailment,
        }
    }
}

fn period_fields(p: &Period) -> [String; 3] {
    [
        p.year.to_string(),
        p.month.to_string(),
        p.sub_period.to_string(),
    ]
}

fn header(h: &str) -> impl Iterator<Item = &str> {
    h.split(',').map(str::trim)
}

/// Writes one row per generator result.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_long_csv(results: &[RedistributionResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(LONG_HEADER))?;

    for r in results {
        let [year, month, sub] = period_fields(&r.period);
        wtr.write_record(&[
            year,
            month,
            sub,
            r.generator.clone(),
            r.node.clone(),
            r.zone.clone(),
            format!("{:.4}", r.curtailment_original),
            format!("{:.4}", r.energy_original),
            format!("{:.4}", r.redistributed_energy),
            format!("{:.4}", r.redistributed_curtailment),
            format!("{:.4}", r.original_curtailment_pct),
            format!("{:.4}", r.redistributed_curtailment_pct),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes one row per `(period, zone)` aggregate.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_zone_csv(zones: &[ZoneSummary], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(ZONE_HEADER))?;

    for z in zones {
        let [year, month, sub] = period_fields(&z.period);
        wtr.write_record(&[
            year,
            month,
            sub,
            z.zone.clone(),
            format!("{:.4}", z.curtailment_original),
            format!("{:.4}", z.energy_original),
            format!("{:.4}", z.redistributed_energy),
            format!("{:.4}", z.redistributed_curtailment),
            format!("{:.4}", z.original_curtailment_pct),
            format!("{:.4}", z.redistributed_curtailment_pct),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Pivots one field into a wide table: one row per period, one column per generator.
///
/// Generators without a value in a period get an empty cell.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_wide_csv(
    results: &[RedistributionResult],
    field: WideField,
    writer: impl Write,
) -> io::Result<()> {
    let generators: BTreeSet<&str> = results.iter().map(|r| r.generator.as_str()).collect();
    let mut rows: BTreeMap<Period, BTreeMap<&str, f64>> = BTreeMap::new();
    for r in results {
        *rows
            .entry(r.period)
            .or_default()
            .entry(r.generator.as_str())
            .or_default() += field.value(r);
    }

    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    let mut head = vec!["year", "month", "sub_period"];
    head.extend(generators.iter().copied());
    wtr.write_record(&head)?;

    for (period, values) in &rows {
        let mut record: Vec<String> = period_fields(period).to_vec();
        record.extend(generators.iter().map(|g| {
            values
                .get(g)
                .map(|v| format!("{v:.4}"))
                .unwrap_or_default()
        }));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the long-format table to `path`.
pub fn export_long_csv(results: &[RedistributionResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_long_csv(results, io::BufWriter::new(file))
}

/// Writes the zone table to `path`.
pub fn export_zone_csv(zones: &[ZoneSummary], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_zone_csv(zones, io::BufWriter::new(file))
}

/// Writes a wide pivot of `field` to `path`.
pub fn export_wide_csv(
    results: &[RedistributionResult],
    field: WideField,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_wide_csv(results, field, io::BufWriter::new(file))
}
