//! Joins dispatch values with generator metadata into [`GenerationRecord`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use super::capacity::{CapacitySource, CapacityTable};
use super::types::{
    DispatchValue, GenerationRecord, GeneratorInfo, Period, UNKNOWN_NODE, UNKNOWN_ZONE,
};

/// Generator lookup sheets as handed over by the loader.
#[derive(Debug, Clone, Default)]
pub struct GeneratorCatalog {
    /// Generator → node.
    pub nodes: HashMap<String, String>,
    /// Node → zone.
    pub zones: HashMap<String, String>,
    /// Generator → nominal capacity.
    pub pmax: HashMap<String, f64>,
    /// Generator → participation flag (from the fuel enablement table).
    pub enabled: HashMap<String, bool>,
    /// Monthly capacity overrides.
    pub ratings: CapacityTable,
}

impl GeneratorCatalog {
    /// Resolves the static metadata of one generator.
    ///
    /// Unknown generators fall into the `NoNode`/`NoZone` catch-all and are
    /// not enabled for curtailment.
    pub fn resolve(&self, generator: &str) -> GeneratorInfo {
        let node = self.nodes.get(generator).cloned();
        let zone = node.as_ref().and_then(|n| self.zones.get(n)).cloned();
        GeneratorInfo {
            node: node.unwrap_or_else(|| UNKNOWN_NODE.to_string()),
            zone: zone.unwrap_or_else(|| UNKNOWN_ZONE.to_string()),
            pmax: self.pmax.get(generator).copied(),
            enabled_for_curtailment: self.enabled.get(generator).copied().unwrap_or(false),
        }
    }
}

/// Curtailment and energy tables of one time resolution.
#[derive(Debug, Clone, Default)]
pub struct DispatchTables {
    pub curtailment: Vec<DispatchValue>,
    pub energy: Vec<DispatchValue>,
}

/// Builds the generation record table for one hydrology scenario.
///
/// Curtailment and energy are outer-joined on `(period, generator)`; a missing
/// side counts as zero and duplicate keys are summed. Generators missing from
/// the zone or capacity mappings are reported once at `warn` level.
///
/// # Arguments
///
/// * `tables` - Long-format curtailment and energy values
/// * `catalog` - Generator metadata lookups
/// * `hydrology` - Scenario identifier; values of any other scenario are dropped
///
/// # Returns
///
/// Records sorted by `(period, zone, generator)`.
pub fn preprocess(
    tables: &DispatchTables,
    catalog: &GeneratorCatalog,
    hydrology: &str,
) -> Vec<GenerationRecord> {
    let mut joined: BTreeMap<(Period, &str), (f64, f64)> = BTreeMap::new();
    let mut dropped = 0usize;

    for v in &tables.curtailment {
        if v.hydrology != hydrology {
            dropped += 1;
            continue;
        }
        joined.entry((v.period, v.generator.as_str())).or_default().0 += v.value;
    }
    for v in &tables.energy {
        if v.hydrology != hydrology {
            dropped += 1;
            continue;
        }
        joined.entry((v.period, v.generator.as_str())).or_default().1 += v.value;
    }
    if dropped > 0 {
        debug!(hydrology, dropped, "filtered values of other hydrology scenarios");
    }

    let mut infos: HashMap<&str, GeneratorInfo> = HashMap::new();
    let mut missing_zone = BTreeSet::new();
    let mut missing_capacity = BTreeSet::new();

    let mut records: Vec<GenerationRecord> = joined
        .into_iter()
        .map(|((period, generator), (curtailment, energy))| {
            let info = infos
                .entry(generator)
                .or_insert_with(|| catalog.resolve(generator));
            if info.zone == UNKNOWN_ZONE {
                missing_zone.insert(generator);
            }
            let (pmax, source) = catalog
                .ratings
                .lookup(generator, period.year_month(), info.pmax);
            if source == CapacitySource::Missing {
                missing_capacity.insert(generator);
            }
            GenerationRecord::new(
                period,
                generator,
                info.node.clone(),
                info.zone.clone(),
                curtailment,
                energy,
                pmax,
                info.enabled_for_curtailment,
            )
        })
        .collect();

    for generator in missing_zone {
        warn!(generator, "generator missing from node/zone mapping, using {UNKNOWN_ZONE}");
    }
    for generator in missing_capacity {
        warn!(generator, "generator has no capacity rating, assuming zero capacity");
    }

    records.sort_by(|a, b| {
        (a.period, &a.zone, &a.generator).cmp(&(b.period, &b.zone, &b.generator))
    });
    records
}
