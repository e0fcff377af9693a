//! Zone aggregation and post-hoc run report.

use std::collections::BTreeMap;
use std::fmt;

use super::engine::{GroupDiagnostics, Redistribution};
use super::types::{Period, RedistributionResult, ZoneSummary, percentage, round_to};

/// Sums the generator results per `(period, zone)`.
///
/// Percentages are recomputed from the summed values rather than averaged.
/// Pass unrounded results; the sums are rounded to `decimals` here.
pub fn aggregate_zones(results: &[RedistributionResult], decimals: u32) -> Vec<ZoneSummary> {
    let mut zones: BTreeMap<(Period, &str), [f64; 4]> = BTreeMap::new();
    for r in results {
        let acc = zones.entry((r.period, r.zone.as_str())).or_default();
        acc[0] += r.curtailment_original;
        acc[1] += r.energy_original;
        acc[2] += r.redistributed_energy;
        acc[3] += r.redistributed_curtailment;
    }

    zones
        .into_iter()
        .map(|((period, zone), [curt, energy, red_energy, red_curt])| {
            let total = curt + energy;
            ZoneSummary {
                period,
                zone: zone.to_string(),
                curtailment_original: round_to(curt, decimals),
                energy_original: round_to(energy, decimals),
                redistributed_energy: round_to(red_energy, decimals),
                redistributed_curtailment: round_to(red_curt, decimals),
                original_curtailment_pct: round_to(percentage(curt, total), decimals),
                redistributed_curtailment_pct: round_to(
                    percentage(red_curt, red_energy + red_curt),
                    decimals,
                ),
            }
        })
        .collect()
}

/// Aggregate figures of one redistribution run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of generator records.
    pub records: usize,
    /// Number of `(period, zone)` groups.
    pub groups: usize,
    /// Total curtailment before redistribution.
    pub curtailment_original: f64,
    /// Total curtailment after redistribution.
    pub curtailment_redistributed: f64,
    /// Mean rounds per group (pass-through groups count as zero).
    pub mean_iterations: f64,
    /// Groups whose target was not fully re-placed.
    pub unconverged: Vec<GroupDiagnostics>,
    /// Groups with a clamped negative target.
    pub shortfall_groups: usize,
}

impl RunReport {
    pub fn from_redistribution(run: &Redistribution) -> Self {
        let groups = run.diagnostics.len();
        let iterations: usize = run.diagnostics.iter().map(|d| d.iterations).sum();
        Self {
            records: run.results.len(),
            groups,
            curtailment_original: run.results.iter().map(|r| r.curtailment_original).sum(),
            curtailment_redistributed: run
                .results
                .iter()
                .map(|r| r.redistributed_curtailment)
                .sum(),
            mean_iterations: if groups > 0 {
                iterations as f64 / groups as f64
            } else {
                0.0
            },
            unconverged: run.unconverged().cloned().collect(),
            shortfall_groups: run.diagnostics.iter().filter(|d| d.shortfall > 0.0).count(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Redistribution Report ---")?;
        writeln!(f, "Records:               {}", self.records)?;
        writeln!(f, "Zone groups:           {}", self.groups)?;
        writeln!(f, "Original curtailment:  {:.4}", self.curtailment_original)?;
        writeln!(f, "Redistributed:         {:.4}", self.curtailment_redistributed)?;
        writeln!(f, "Mean iterations:       {:.2}", self.mean_iterations)?;
        writeln!(f, "Shortfall groups:      {}", self.shortfall_groups)?;
        write!(f, "Unconverged groups:    {}", self.unconverged.len())?;
        for d in &self.unconverged {
            write!(
                f,
                "\n  {} {} ({}, residual {:.4})",
                d.period, d.zone, d.termination, d.residual
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(zone: &str, curt: f64, energy: f64, red_curt: f64) -> RedistributionResult {
        let total = curt + energy;
        RedistributionResult {
            period: Period::new(2030, 1, 1),
            generator: format!("G-{zone}-{curt}"),
            node: "N".to_string(),
            zone: zone.to_string(),
            curtailment_original: curt,
            energy_original: energy,
            redistributed_energy: total - red_curt,
            redistributed_curtailment: red_curt,
            original_curtailment_pct: percentage(curt, total),
            redistributed_curtailment_pct: percentage(red_curt, total),
        }
    }

    #[test]
    fn zone_sums_and_aggregate_ratio() {
        let results = vec![
            result("Z1", 30.0, 20.0, 10.0),
            result("Z1", 0.0, 150.0, 20.0),
            result("Z2", 5.0, 5.0, 5.0),
        ];
        let zones = aggregate_zones(&results, 4);
        assert_eq!(zones.len(), 2);

        let z1 = &zones[0];
        assert_eq!(z1.zone, "Z1");
        assert_eq!(z1.curtailment_original, 30.0);
        assert_eq!(z1.energy_original, 170.0);
        assert_eq!(z1.redistributed_curtailment, 30.0);
        assert_eq!(z1.redistributed_energy, 170.0);
        // 30 / 200, not the mean of 20% and 10%
        assert_eq!(z1.redistributed_curtailment_pct, 15.0);
        assert_eq!(z1.original_curtailment_pct, 15.0);
    }

    #[test]
    fn empty_zone_has_zero_percentages() {
        let zones = aggregate_zones(&[result("Z1", 0.0, 0.0, 0.0)], 4);
        assert_eq!(zones[0].original_curtailment_pct, 0.0);
        assert_eq!(zones[0].redistributed_curtailment_pct, 0.0);
    }

    #[test]
    fn report_of_empty_run() {
        let report = RunReport::from_redistribution(&Redistribution::default());
        assert_eq!(report.groups, 0);
        assert_eq!(report.mean_iterations, 0.0);
        assert!(format!("{report}").contains("Unconverged groups:    0"));
    }
}
