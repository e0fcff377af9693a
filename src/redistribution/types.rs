//! Core redistribution types: periods, input rows, generation records and results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Node assigned to generators missing from the node mapping.
pub const UNKNOWN_NODE: &str = "NoNode";
/// Zone assigned to generators or nodes missing from the zone mapping.
pub const UNKNOWN_ZONE: &str = "NoZone";

/// Dispatch time slice: `(year, month, sub-period)`.
///
/// Ordering is lexicographic, so sorted tables read chronologically.
///
/// # Examples
///
/// ```
/// use curtail_redist::redistribution::types::Period;
///
/// let a = Period::new(2030, 1, 3);
/// let b = Period::new(2030, 2, 1);
/// assert!(a < b);
/// assert_eq!(a.year_month(), (2030, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year.
    pub year: i32,
    /// Month of year (1-12).
    pub month: u32,
    /// Block or hour index inside the month.
    pub sub_period: u32,
}

impl Period {
    pub fn new(year: i32, month: u32, sub_period: u32) -> Self {
        Self {
            year,
            month,
            sub_period,
        }
    }

    /// Key used for monthly capacity lookups.
    pub fn year_month(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}/{}", self.year, self.month, self.sub_period)
    }
}

/// Time resolution of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Coarse load blocks within a month.
    Block,
    /// Hourly sub-periods.
    Hour,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Block => "block",
            Resolution::Hour => "hour",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Resolution::Block),
            "hour" => Ok(Resolution::Hour),
            other => Err(format!("must be \"block\" or \"hour\", got \"{other}\"")),
        }
    }
}

/// One long-format curtailment or energy value as handed over by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchValue {
    /// Hydrology scenario identifier the value was simulated under.
    pub hydrology: String,
    pub period: Period,
    pub generator: String,
    /// Energy in the table's unit (>= 0).
    pub value: f64,
}

/// Static generator metadata after all lookup sheets have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorInfo {
    pub node: String,
    pub zone: String,
    /// Nominal capacity, used when no monthly rating applies.
    pub pmax: Option<f64>,
    /// Whether the unit's fuel type allows it to be curtailed.
    pub enabled_for_curtailment: bool,
}

/// Monthly capacity-rating override for one generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityRating {
    pub year: i32,
    pub month: u32,
    pub pmax: f64,
}

/// Joined per-(period, generator) record with the derived carve-outs.
///
/// Built once by the preprocessor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub period: Period,
    pub generator: String,
    pub node: String,
    pub zone: String,
    /// Curtailment as reported by the dispatch simulation.
    pub curtailment_original: f64,
    /// Energy as reported by the dispatch simulation.
    pub energy_original: f64,
    /// Capacity rating for the record's month.
    pub pmax: f64,
    pub enabled_for_curtailment: bool,
    /// `curtailment_original + energy_original`.
    pub energy_plus_curtailment: f64,
    /// Curtailment of a unit that may not be curtailed.
    pub curtailment_excluded_disabled: f64,
    /// Curtailment of an enabled unit without capacity.
    pub curtailment_excluded_zero_pmax: f64,
    /// Curtailment left after the carve-outs.
    pub effective_curtailment: f64,
    /// Energy including the carved-out curtailment.
    pub effective_energy: f64,
}

impl GenerationRecord {
    /// Builds a record and computes all derived fields.
    ///
    /// # Arguments
    ///
    /// * `period` - Dispatch time slice
    /// * `generator` - Generator name
    /// * `node` / `zone` - Network location
    /// * `curtailment_original` / `energy_original` - Reported values (>= 0)
    /// * `pmax` - Capacity rating for the period's month
    /// * `enabled_for_curtailment` - Participation flag
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        period: Period,
        generator: impl Into<String>,
        node: impl Into<String>,
        zone: impl Into<String>,
        curtailment_original: f64,
        energy_original: f64,
        pmax: f64,
        enabled_for_curtailment: bool,
    ) -> Self {
        let curtailment_excluded_disabled = if enabled_for_curtailment {
            0.0
        } else {
            curtailment_original
        };
        let has_capacity = pmax > 0.0;
        let curtailment_excluded_zero_pmax = if enabled_for_curtailment && !has_capacity {
            curtailment_original
        } else {
            0.0
        };
        let excluded = curtailment_excluded_disabled + curtailment_excluded_zero_pmax;

        Self {
            period,
            generator: generator.into(),
            node: node.into(),
            zone: zone.into(),
            curtailment_original,
            energy_original,
            pmax,
            enabled_for_curtailment,
            energy_plus_curtailment: curtailment_original + energy_original,
            curtailment_excluded_disabled,
            curtailment_excluded_zero_pmax,
            effective_curtailment: curtailment_original - excluded,
            effective_energy: energy_original + excluded,
        }
    }

    /// Energy the unit could have delivered in the period.
    pub fn effective_total(&self) -> f64 {
        self.effective_energy + self.effective_curtailment
    }

    /// Whether the unit may take part in redistribution at all.
    pub fn can_participate(&self) -> bool {
        self.enabled_for_curtailment && self.pmax > 0.0 && self.effective_total() > 0.0
    }
}

/// Redistributed values for one (period, generator).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedistributionResult {
    pub period: Period,
    pub generator: String,
    pub node: String,
    pub zone: String,
    pub curtailment_original: f64,
    pub energy_original: f64,
    pub redistributed_energy: f64,
    pub redistributed_curtailment: f64,
    /// Original curtailment as a percentage of energy plus curtailment.
    pub original_curtailment_pct: f64,
    /// Redistributed curtailment as a percentage of energy plus curtailment.
    pub redistributed_curtailment_pct: f64,
}

impl RedistributionResult {
    /// Copy with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            period: self.period,
            generator: self.generator.clone(),
            node: self.node.clone(),
            zone: self.zone.clone(),
            curtailment_original: round_to(self.curtailment_original, decimals),
            energy_original: round_to(self.energy_original, decimals),
            redistributed_energy: round_to(self.redistributed_energy, decimals),
            redistributed_curtailment: round_to(self.redistributed_curtailment, decimals),
            original_curtailment_pct: round_to(self.original_curtailment_pct, decimals),
            redistributed_curtailment_pct: round_to(self.redistributed_curtailment_pct, decimals),
        }
    }
}

/// Column-wise sums of [`RedistributionResult`] per (period, zone).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub period: Period,
    pub zone: String,
    pub curtailment_original: f64,
    pub energy_original: f64,
    pub redistributed_energy: f64,
    pub redistributed_curtailment: f64,
    pub original_curtailment_pct: f64,
    /// Aggregate ratio, not an average of unit percentages.
    pub redistributed_curtailment_pct: f64,
}

/// Percentage (0-100) of `part` in `whole`, defined as 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { 100.0 * part / whole }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    // normalise -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}
