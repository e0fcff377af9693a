//! Monthly capacity ratings with last-observation-carried-forward lookup.

use std::collections::{BTreeMap, HashMap};

use super::types::CapacityRating;

/// Where a looked-up capacity value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacitySource {
    /// Rating published for exactly this month.
    Rating,
    /// Most recent earlier rating.
    CarriedForward,
    /// Nominal capacity from the generator sheet.
    Nominal,
    /// No value known; the unit contributes zero capacity.
    Missing,
}

/// Per-generator monthly capacity ratings.
///
/// Ratings are kept in a `BTreeMap` keyed by `(year, month)` so that the
/// carried-forward value is a single range query.
#[derive(Debug, Clone, Default)]
pub struct CapacityTable {
    ratings: HashMap<String, BTreeMap<(i32, u32), f64>>,
}

impl CapacityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(generator, rating)` pairs. Later duplicates win.
    pub fn from_ratings<I, S>(ratings: I) -> Self
    where
        I: IntoIterator<Item = (S, CapacityRating)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (generator, rating) in ratings {
            table.insert(generator, rating);
        }
        table
    }

    pub fn insert(&mut self, generator: impl Into<String>, rating: CapacityRating) {
        self.ratings
            .entry(generator.into())
            .or_default()
            .insert((rating.year, rating.month), rating.pmax);
    }

    /// Resolves the capacity of `generator` for `(year, month)`.
    ///
    /// Precedence: exact rating, most recent earlier rating, `nominal`, zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use curtail_redist::redistribution::capacity::{CapacitySource, CapacityTable};
    /// use curtail_redist::redistribution::types::CapacityRating;
    ///
    /// let table = CapacityTable::from_ratings([(
    ///     "G1",
    ///     CapacityRating { year: 2030, month: 3, pmax: 80.0 },
    /// )]);
    /// assert_eq!(table.lookup("G1", (2030, 5), Some(100.0)), (80.0, CapacitySource::CarriedForward));
    /// assert_eq!(table.lookup("G1", (2030, 1), Some(100.0)), (100.0, CapacitySource::Nominal));
    /// ```
    pub fn lookup(
        &self,
        generator: &str,
        year_month: (i32, u32),
        nominal: Option<f64>,
    ) -> (f64, CapacitySource) {
        if let Some(series) = self.ratings.get(generator) {
            if let Some(&pmax) = series.get(&year_month) {
                return (pmax, CapacitySource::Rating);
            }
            if let Some((_, &pmax)) = series.range(..year_month).next_back() {
                return (pmax, CapacitySource::CarriedForward);
            }
        }
        match nominal {
            Some(pmax) => (pmax, CapacitySource::Nominal),
            None => (0.0, CapacitySource::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(year: i32, month: u32, pmax: f64) -> CapacityRating {
        CapacityRating { year, month, pmax }
    }

    fn table() -> CapacityTable {
        CapacityTable::from_ratings([
            ("G1", rating(2030, 2, 90.0)),
            ("G1", rating(2030, 6, 60.0)),
            ("G2", rating(2031, 1, 0.0)),
        ])
    }

    #[test]
    fn exact_month_wins() {
        let t = table();
        assert_eq!(t.lookup("G1", (2030, 6), Some(100.0)), (60.0, CapacitySource::Rating));
    }

    #[test]
    fn gaps_carry_forward_most_recent() {
        let t = table();
        assert_eq!(
            t.lookup("G1", (2030, 4), Some(100.0)),
            (90.0, CapacitySource::CarriedForward)
        );
        assert_eq!(
            t.lookup("G1", (2031, 1), Some(100.0)),
            (60.0, CapacitySource::CarriedForward)
        );
    }

    #[test]
    fn carry_forward_crosses_year_boundary() {
        let t = table();
        assert_eq!(
            t.lookup("G2", (2032, 7), None),
            (0.0, CapacitySource::CarriedForward)
        );
    }

    #[test]
    fn before_first_rating_uses_nominal() {
        let t = table();
        assert_eq!(t.lookup("G1", (2030, 1), Some(100.0)), (100.0, CapacitySource::Nominal));
    }

    #[test]
    fn unknown_generator_without_nominal_is_missing() {
        let t = table();
        assert_eq!(t.lookup("G9", (2030, 1), None), (0.0, CapacitySource::Missing));
    }
}
