//! Long-format CSV loading of dispatch values and generator lookup sheets.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::{InputError, Result};
use crate::redistribution::capacity::CapacityTable;
use crate::redistribution::preprocess::GeneratorCatalog;
use crate::redistribution::types::{CapacityRating, DispatchValue, Period, Resolution};

/// `scenario,year,month,sub_period,generator,value`
#[derive(Debug, Deserialize)]
struct DispatchRow {
    scenario: String,
    year: i32,
    month: u32,
    sub_period: u32,
    generator: String,
    value: f64,
}

/// `generator,node,pmax,fuel`; an empty `pmax` means no nominal capacity.
#[derive(Debug, Deserialize)]
struct GeneratorRow {
    generator: String,
    node: String,
    pmax: Option<f64>,
    fuel: String,
}

/// `node,zone`
#[derive(Debug, Deserialize)]
struct NodeRow {
    node: String,
    zone: String,
}

/// `fuel,enabled`
#[derive(Debug, Deserialize)]
struct FuelRow {
    fuel: String,
    #[serde(deserialize_with = "flag")]
    enabled: bool,
}

/// `year,month,generator,pmax`
#[derive(Debug, Deserialize)]
struct RatingRow {
    year: i32,
    month: u32,
    generator: String,
    pmax: f64,
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" | "" => Ok(false),
        other => Err(de::Error::custom(format!("invalid flag \"{other}\""))),
    }
}

/// Rejects anything that is not a `.csv` file.
pub fn check_extension(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(())
    } else {
        Err(InputError::UnsupportedExtension {
            path: path.to_path_buf(),
        })
    }
}

/// Checks that the file stem ends with `_<suffix>`.
pub fn check_suffix(path: &Path, suffix: &str, resolution: Resolution) -> Result<()> {
    let expected = format!("_{suffix}");
    let matches = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(&expected));
    if matches {
        Ok(())
    } else {
        Err(InputError::UnexpectedSuffix {
            path: path.to_path_buf(),
            suffix: suffix.to_string(),
            resolution: resolution.to_string(),
        })
    }
}

/// Rejects negative, infinite and NaN quantities.
pub fn check_quantity(path: &Path, generator: &str, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::InvalidValue {
            path: path.to_path_buf(),
            generator: generator.to_string(),
            field,
            value,
        })
    }
}

/// Deserializes every row of a CSV file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    check_extension(path)?;
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows_from(file, path)
}

/// Deserializes every row from `reader`; `path` is only used in errors.
pub fn read_rows_from<T: DeserializeOwned>(reader: impl Read, path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads a curtailment or energy table of one resolution.
///
/// # Errors
///
/// Fails on a wrong extension or suffix, an unreadable file or a missing column.
pub fn load_dispatch(path: &Path, suffix: &str, resolution: Resolution) -> Result<Vec<DispatchValue>> {
    check_suffix(path, suffix, resolution)?;
    let rows: Vec<DispatchRow> = read_rows(path)?;
    for row in &rows {
        check_quantity(path, &row.generator, "value", row.value)?;
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded dispatch table");
    Ok(rows.into_iter().map(dispatch_value).collect())
}

fn dispatch_value(row: DispatchRow) -> DispatchValue {
    DispatchValue {
        hydrology: row.scenario,
        period: Period::new(row.year, row.month, row.sub_period),
        generator: row.generator,
        value: row.value,
    }
}

/// Builds the generator catalog from its lookup sheets.
///
/// A generator's participation flag is the `enabled` flag of its fuel type;
/// unknown fuels are not enabled.
///
/// # Errors
///
/// Fails on an unreadable sheet, a missing column or a negative or
/// non-finite capacity.
pub fn load_catalog(
    generators: &Path,
    nodes: &Path,
    fuels: &Path,
    ratings: Option<&Path>,
) -> Result<GeneratorCatalog> {
    let generator_rows: Vec<GeneratorRow> = read_rows(generators)?;
    for g in &generator_rows {
        if let Some(pmax) = g.pmax {
            check_quantity(generators, &g.generator, "pmax", pmax)?;
        }
    }
    let nodes: Vec<NodeRow> = read_rows(nodes)?;
    let fuels: Vec<FuelRow> = read_rows(fuels)?;
    let ratings: Vec<RatingRow> = match ratings {
        Some(path) => {
            let rows: Vec<RatingRow> = read_rows(path)?;
            for r in &rows {
                check_quantity(path, &r.generator, "pmax", r.pmax)?;
            }
            rows
        }
        None => Vec::new(),
    };
    Ok(build_catalog(generator_rows, nodes, fuels, ratings))
}

fn build_catalog(
    generators: Vec<GeneratorRow>,
    nodes: Vec<NodeRow>,
    fuels: Vec<FuelRow>,
    ratings: Vec<RatingRow>,
) -> GeneratorCatalog {
    let fuel_enabled: HashMap<String, bool> =
        fuels.into_iter().map(|f| (f.fuel, f.enabled)).collect();

    let mut catalog = GeneratorCatalog {
        zones: nodes.into_iter().map(|n| (n.node, n.zone)).collect(),
        ratings: CapacityTable::from_ratings(ratings.into_iter().map(|r| {
            (
                r.generator,
                CapacityRating {
                    year: r.year,
                    month: r.month,
                    pmax: r.pmax,
                },
            )
        })),
        ..GeneratorCatalog::default()
    };

    for g in generators {
        let enabled = match fuel_enabled.get(&g.fuel) {
            Some(&enabled) => enabled,
            None => {
                warn!(generator = %g.generator, fuel = %g.fuel, "unknown fuel type, not enabled");
                false
            }
        };
        if let Some(pmax) = g.pmax {
            catalog.pmax.insert(g.generator.clone(), pmax);
        }
        catalog.enabled.insert(g.generator.clone(), enabled);
        catalog.nodes.insert(g.generator, g.node);
    }
    catalog
}
