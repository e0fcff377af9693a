//! Zone-level curtailment redistribution for grid-dispatch simulation output.

pub mod cli;
pub mod config;
pub mod error;
/// CSV loading and export.
pub mod io;
pub mod logging;
/// Preprocessing, redistribution engine and zone aggregation.
pub mod redistribution;
pub mod runner;
