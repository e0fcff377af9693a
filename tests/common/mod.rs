//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use curtail_redist::redistribution::types::{GenerationRecord, Period, RedistributionResult};

/// Default period used by single-period fixtures.
pub fn period() -> Period {
    Period::new(2030, 1, 1)
}

/// Record in zone `Z1` of the default period.
pub fn unit(name: &str, pmax: f64, energy: f64, curtailment: f64, enabled: bool) -> GenerationRecord {
    unit_in("Z1", period(), name, pmax, energy, curtailment, enabled)
}

/// Record in an explicit zone and period.
pub fn unit_in(
    zone: &str,
    period: Period,
    name: &str,
    pmax: f64,
    energy: f64,
    curtailment: f64,
    enabled: bool,
) -> GenerationRecord {
    GenerationRecord::new(
        period,
        name,
        format!("N-{name}"),
        zone,
        curtailment,
        energy,
        pmax,
        enabled,
    )
}

/// Mixed table over three months and three zones.
///
/// Contains disabled units, zero-capacity units, a saturating high-capacity
/// unit, a zero-output unit and a zone without any eligible capacity.
pub fn mixed_table() -> Vec<GenerationRecord> {
    let mut records = Vec::new();
    for month in 1..=3 {
        let p = Period::new(2030, month, 1);
        let m = month as f64;
        records.push(unit_in("North", p, "N-Hydro", 120.0, 40.0 * m, 12.5, true));
        records.push(unit_in("North", p, "N-Wind", 60.0, 18.0 * m, 7.25 * m, true));
        records.push(unit_in("North", p, "N-Coal", 200.0, 90.0, 3.0, false));
        records.push(unit_in("North", p, "N-Solar", 0.0, 10.0, 4.0 * m, true));
        records.push(unit_in("South", p, "S-Big", 500.0, 2.0, 0.5, true));
        records.push(unit_in("South", p, "S-Small", 20.0, 55.0 * m, 30.0, true));
        records.push(unit_in("South", p, "S-Idle", 80.0, 0.0, 0.0, true));
        records.push(unit_in("East", p, "E-Gas", 90.0, 70.0, 11.0 * m, false));
        records.push(unit_in("East", p, "E-Diesel", 0.0, 5.0, 1.0, true));
    }
    records
}

/// Sums `(energy + curtailment)` of inputs and outputs per `(period, zone)`.
pub fn zone_totals(
    records: &[GenerationRecord],
    results: &[RedistributionResult],
) -> BTreeMap<(Period, String), (f64, f64)> {
    let mut totals: BTreeMap<(Period, String), (f64, f64)> = BTreeMap::new();
    for r in records {
        totals.entry((r.period, r.zone.clone())).or_default().0 += r.effective_total();
    }
    for r in results {
        totals.entry((r.period, r.zone.clone())).or_default().1 +=
            r.redistributed_energy + r.redistributed_curtailment;
    }
    totals
}

/// Writes a fixture file below `dir`.
pub fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("fixture should be writable");
}

/// Writes the generator metadata sheets used by the runner tests.
pub fn write_catalog(dir: &Path) {
    write(
        dir,
        "generators.csv",
        "generator,node,pmax,fuel\n\
         G1,N1,100,hydro\n\
         G2,N2,50,wind\n\
         G3,N2,80,coal\n",
    );
    write(dir, "nodes.csv", "node,zone\nN1,Z1\nN2,Z1\n");
    write(dir, "fuels.csv", "fuel,enabled\nhydro,true\nwind,true\ncoal,false\n");
    write(
        dir,
        "ratings.csv",
        "year,month,generator,pmax\n\
         2030,2,G1,25\n",
    );
}

/// Writes block dispatch tables for two months and two hydrologies.
pub fn write_block_tables(dir: &Path) {
    write(
        dir,
        "curtailment_B.csv",
        "scenario,year,month,sub_period,generator,value\n\
         1,2030,1,1,G1,30\n\
         1,2030,1,1,G3,6\n\
         1,2030,2,1,G1,10\n\
         2,2030,1,1,G1,999\n",
    );
    write(
        dir,
        "energy_B.csv",
        "scenario,year,month,sub_period,generator,value\n\
         1,2030,1,1,G1,20\n\
         1,2030,1,1,G2,50\n\
         1,2030,1,1,G3,40\n\
         1,2030,2,1,G1,40\n\
         1,2030,2,1,G2,40\n\
         1,2030,2,1,UNKNOWN,5\n\
         2,2030,1,1,G2,999\n",
    );
}
