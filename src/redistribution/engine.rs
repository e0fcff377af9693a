//! Zone-level curtailment redistribution.
//!
//! Every `(period, zone)` group re-places its placement target across the
//! eligible generators pro rata to capacity, saturating each unit at its
//! available energy, for at most `iter_max` rounds. Groups are independent
//! and evaluated in parallel; rounds inside a group are strictly sequential.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use super::summary::aggregate_zones;
use super::types::{GenerationRecord, Period, RedistributionResult, ZoneSummary, percentage};

/// Default bound on redistribution rounds per group.
pub const DEFAULT_ITER_MAX: usize = 5;
/// Default relative tolerance on the placement target.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Default number of decimals kept in the results.
pub const DEFAULT_ROUND_DECIMALS: u32 = 4;

/// Numeric parameters of the redistribution.
///
/// # Examples
///
/// ```
/// use curtail_redist::redistribution::engine::EngineConfig;
///
/// let cfg = EngineConfig::default();
/// assert_eq!(cfg.iter_max, 5);
/// assert_eq!(cfg.tolerance, 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of rounds per group (> 0).
    pub iter_max: usize,
    /// A group terminates once `assigned >= target * (1 - tolerance)`.
    pub tolerance: f64,
    /// Decimals kept in the final results.
    pub round_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            iter_max: DEFAULT_ITER_MAX,
            tolerance: DEFAULT_TOLERANCE,
            round_decimals: DEFAULT_ROUND_DECIMALS,
        }
    }
}

/// Per-generator allocation state, owned by one group's allocation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationState {
    /// Energy available at round 0 (0 for units that never participate).
    pub available_energy_0: f64,
    /// Energy still available after the last committed round.
    pub available_energy: f64,
    /// Energy the unit is expected to place at round 0.
    pub placement_0: f64,
    /// Amount still to be placed: `placement_0 - operating_point`.
    pub placement: f64,
    /// Capacity used for the pro-rata share while eligible.
    pub pmax: f64,
    /// Whether the unit takes part in the next round.
    pub eligible: bool,
    /// Sum of the operating points of all committed rounds.
    pub operating_point: f64,
}

impl AllocationState {
    /// Round-0 state of one record.
    pub fn initial(record: &GenerationRecord) -> Self {
        let (available, placement, pmax) = if record.can_participate() {
            (record.effective_total(), record.effective_energy, record.pmax)
        } else {
            (0.0, 0.0, 0.0)
        };
        Self {
            available_energy_0: available,
            available_energy: available,
            placement_0: placement,
            placement,
            pmax,
            eligible: available > 0.0,
            operating_point: 0.0,
        }
    }

    /// Capacity counted in the pro-rata denominator.
    pub fn capacity_if_participating(&self) -> f64 {
        if self.eligible { self.pmax } else { 0.0 }
    }
}

/// Why a group stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Assigned energy reached the target within tolerance.
    Satisfied,
    /// No eligible capacity was left before the target was reached.
    CapacityExhausted,
    /// `iter_max` rounds ran without reaching the target.
    IterationLimit,
    /// The group had no eligible capacity; values pass through unchanged.
    PassThrough,
}

impl Termination {
    /// Whether the placement target was fully re-placed.
    pub fn converged(&self) -> bool {
        matches!(self, Termination::Satisfied | Termination::PassThrough)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Satisfied => "satisfied",
            Termination::CapacityExhausted => "capacity exhausted",
            Termination::IterationLimit => "iteration limit",
            Termination::PassThrough => "pass-through",
        };
        f.write_str(s)
    }
}

/// Outcome of one group's allocation, reported alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDiagnostics {
    pub period: Period,
    pub zone: String,
    /// Rounds actually executed.
    pub iterations: usize,
    pub termination: Termination,
    /// Target used for allocation (never negative).
    pub placement_target: f64,
    /// Energy assigned across all rounds.
    pub assigned: f64,
    /// `placement_target - assigned`.
    pub residual: f64,
    /// Part of a negative raw target that could not be placed anywhere.
    pub shortfall: f64,
}

/// All records sharing one `(period, zone)`.
#[derive(Debug, Clone)]
pub struct ZoneGroup<'a> {
    pub period: Period,
    pub zone: &'a str,
    pub members: Vec<&'a GenerationRecord>,
}

/// Terminal allocation of one group.
#[derive(Debug, Clone)]
pub struct GroupAllocation {
    /// One state per member, in member order.
    pub states: Vec<AllocationState>,
    pub diagnostics: GroupDiagnostics,
}

impl<'a> ZoneGroup<'a> {
    /// Splits a record table into groups ordered by `(period, zone)`.
    ///
    /// Members keep their order from `records`.
    pub fn partition(records: &'a [GenerationRecord]) -> Vec<ZoneGroup<'a>> {
        let mut groups: BTreeMap<(Period, &'a str), Vec<&'a GenerationRecord>> = BTreeMap::new();
        for r in records {
            groups.entry((r.period, r.zone.as_str())).or_default().push(r);
        }
        groups
            .into_iter()
            .map(|((period, zone), members)| ZoneGroup {
                period,
                zone,
                members,
            })
            .collect()
    }

    /// Raw placement target: round-0 placements minus all carved-out curtailment.
    ///
    /// Can be negative when ineligible curtailment exceeds the eligible energy.
    pub fn raw_placement_target(&self) -> f64 {
        self.members
            .iter()
            .map(|r| {
                AllocationState::initial(r).placement_0
                    - r.curtailment_excluded_disabled
                    - r.curtailment_excluded_zero_pmax
            })
            .sum()
    }

    /// Runs the bounded allocation loop.
    ///
    /// Each round reads the group totals from the previous round's snapshot,
    /// computes every member's operating point, then commits the next
    /// snapshot. The loop stops early once the target is met or no eligible
    /// capacity remains.
    pub fn allocate(&self, config: &EngineConfig) -> GroupAllocation {
        let mut states: Vec<AllocationState> =
            self.members.iter().map(|r| AllocationState::initial(r)).collect();

        let raw_target = self.raw_placement_target();
        let placement_target = raw_target.max(0.0);
        let shortfall = (-raw_target).max(0.0);

        let initial_capacity: f64 = states.iter().map(|s| s.capacity_if_participating()).sum();
        if initial_capacity <= 0.0 {
            return GroupAllocation {
                states,
                diagnostics: self.diagnostics(0, Termination::PassThrough, placement_target, 0.0, 0.0),
            };
        }

        let threshold = placement_target * (1.0 - config.tolerance);
        let mut assigned = 0.0_f64;
        let mut iterations = 0;
        let mut termination = Termination::IterationLimit;

        while iterations < config.iter_max {
            // 1. Snapshot of the group totals
            let capacity: f64 = states.iter().map(|s| s.capacity_if_participating()).sum();
            if capacity <= 0.0 {
                termination = Termination::CapacityExhausted;
                break;
            }
            let remaining = placement_target - assigned;

            // 2. Per-generator operating points, saturated at available energy
            let deltas: Vec<f64> = states
                .iter()
                .map(|s| {
                    let factor = s.capacity_if_participating() / capacity;
                    (remaining * factor).min(s.available_energy).max(0.0)
                })
                .collect();

            // 3. Group aggregate and termination flag
            assigned += deltas.iter().sum::<f64>();
            iterations += 1;
            let satisfied = assigned >= threshold;

            // 4. Commit the next snapshot
            for (s, delta) in states.iter_mut().zip(&deltas) {
                s.available_energy -= delta;
                s.operating_point += delta;
                s.placement = s.placement_0 - s.operating_point;
                s.eligible = s.available_energy_0 > 0.0 && s.available_energy > 0.0 && !satisfied;
            }

            if satisfied {
                termination = Termination::Satisfied;
                break;
            }
        }

        if termination == Termination::IterationLimit
            && states.iter().all(|s| s.capacity_if_participating() <= 0.0)
        {
            termination = Termination::CapacityExhausted;
        }

        GroupAllocation {
            states,
            diagnostics: self.diagnostics(iterations, termination, placement_target, assigned, shortfall),
        }
    }

    /// Allocates and derives the per-generator results, unrounded.
    pub fn redistribute(&self, config: &EngineConfig) -> (Vec<RedistributionResult>, GroupDiagnostics) {
        let allocation = self.allocate(config);
        let pass_through = allocation.diagnostics.termination == Termination::PassThrough;
        let results = self
            .members
            .iter()
            .zip(&allocation.states)
            .map(|(r, s)| finalize(r, s, pass_through))
            .collect();
        (results, allocation.diagnostics)
    }

    fn diagnostics(
        &self,
        iterations: usize,
        termination: Termination,
        placement_target: f64,
        assigned: f64,
        shortfall: f64,
    ) -> GroupDiagnostics {
        GroupDiagnostics {
            period: self.period,
            zone: self.zone.to_string(),
            iterations,
            termination,
            placement_target,
            assigned,
            residual: placement_target - assigned,
            shortfall,
        }
    }
}

/// Derives the final result of one member from its terminal state.
///
/// In a group without eligible capacity, disabled members keep their reported
/// values; every other non-participant folds its curtailment into energy.
fn finalize(
    record: &GenerationRecord,
    state: &AllocationState,
    pass_through: bool,
) -> RedistributionResult {
    let total = record.effective_total();
    let (energy, curtailment) = if pass_through && !record.enabled_for_curtailment {
        (record.energy_original, record.curtailment_original)
    } else if state.available_energy_0 > 0.0 {
        let curtailment = total - state.operating_point;
        (total - curtailment, curtailment)
    } else {
        (total, 0.0)
    };

    RedistributionResult {
        period: record.period,
        generator: record.generator.clone(),
        node: record.node.clone(),
        zone: record.zone.clone(),
        curtailment_original: record.curtailment_original,
        energy_original: record.energy_original,
        redistributed_energy: energy,
        redistributed_curtailment: curtailment,
        original_curtailment_pct: percentage(record.curtailment_original, total),
        redistributed_curtailment_pct: percentage(curtailment, total),
    }
}

/// Results and diagnostics of a whole record table.
#[derive(Debug, Clone, Default)]
pub struct Redistribution {
    /// One row per input record, ordered by `(period, zone)` group.
    pub results: Vec<RedistributionResult>,
    /// Zone totals, summed before rounding.
    pub zones: Vec<ZoneSummary>,
    /// One entry per group.
    pub diagnostics: Vec<GroupDiagnostics>,
}

impl Redistribution {
    /// Groups that did not re-place their full target.
    pub fn unconverged(&self) -> impl Iterator<Item = &GroupDiagnostics> {
        self.diagnostics
            .iter()
            .filter(|d| !d.termination.converged())
    }
}

/// Redistributes curtailment for every `(period, zone)` group of `records`.
///
/// Groups run in parallel on the current rayon pool; output order does not
/// depend on scheduling. Results and zone totals are rounded to
/// `config.round_decimals` only after the zone sums are taken.
pub fn redistribute(records: &[GenerationRecord], config: &EngineConfig) -> Redistribution {
    let groups = ZoneGroup::partition(records);
    let outcomes: Vec<(Vec<RedistributionResult>, GroupDiagnostics)> = groups
        .par_iter()
        .map(|g| g.redistribute(config))
        .collect();

    let mut unrounded = Vec::with_capacity(records.len());
    let mut out = Redistribution {
        results: Vec::new(),
        zones: Vec::new(),
        diagnostics: Vec::with_capacity(outcomes.len()),
    };
    for (results, diag) in outcomes {
        if !diag.termination.converged() {
            warn!(
                period = %diag.period,
                zone = %diag.zone,
                iterations = diag.iterations,
                residual = diag.residual,
                "placement target not fully re-placed ({})",
                diag.termination
            );
        }
        if diag.shortfall > 0.0 {
            warn!(
                period = %diag.period,
                zone = %diag.zone,
                shortfall = diag.shortfall,
                "ineligible curtailment exceeds eligible energy"
            );
        }
        unrounded.extend(results);
        out.diagnostics.push(diag);
    }
    out.zones = aggregate_zones(&unrounded, config.round_decimals);
    out.results = unrounded
        .iter()
        .map(|r| r.rounded(config.round_decimals))
        .collect();
    debug!(
        groups = out.diagnostics.len(),
        records = out.results.len(),
        "redistribution finished"
    );
    out
}
