//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, RunConfig};
use crate::redistribution::types::Resolution;

/// Redistribute zone-level curtailment across eligible generators.
#[derive(Debug, Parser)]
#[command(name = "curtail-redist", version, about)]
pub struct Cli {
    /// Run configuration (TOML).
    #[arg(long, short)]
    pub config: PathBuf,

    /// Only run these resolutions (repeatable).
    #[arg(long = "resolution", value_name = "NAME")]
    pub resolutions: Vec<Resolution>,

    /// Override the hydrology scenario.
    #[arg(long)]
    pub hydrology: Option<String>,

    /// Override the maximum number of redistribution rounds.
    #[arg(long)]
    pub iter_max: Option<usize>,

    /// Override the output directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the worker thread count (0 = all cores).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Applies the command-line overrides to a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a requested resolution is not configured.
    pub fn apply(&self, cfg: &mut RunConfig) -> Result<(), ConfigError> {
        if let Some(h) = &self.hydrology {
            cfg.run.hydrology = h.clone();
        }
        if let Some(n) = self.iter_max {
            cfg.engine.iter_max = n;
        }
        if let Some(dir) = &self.output_dir {
            cfg.run.output_dir = dir.clone();
        }
        if let Some(t) = self.threads {
            cfg.run.threads = t;
        }
        if self.verbose {
            cfg.run.log_level = "debug".to_string();
        }

        if !self.resolutions.is_empty() {
            if let Some(missing) = self
                .resolutions
                .iter()
                .find(|r| !cfg.resolution.iter().any(|c| c.name == **r))
            {
                return Err(ConfigError {
                    field: "resolution".to_string(),
                    message: format!("\"{missing}\" is not configured"),
                });
            }
            cfg.resolution.retain(|c| self.resolutions.contains(&c.name));
        }
        Ok(())
    }
}
