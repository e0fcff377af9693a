//! TOML-based run configuration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::redistribution::engine::{
    DEFAULT_ITER_MAX, DEFAULT_ROUND_DECIMALS, DEFAULT_TOLERANCE, EngineConfig,
};
use crate::redistribution::types::Resolution;

/// Top-level run configuration parsed from TOML.
///
/// All sections have defaults. Relative paths are resolved against the
/// directory of the configuration file by [`RunConfig::from_toml_file`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Numeric parameters of the redistribution.
    #[serde(default)]
    pub engine: EngineSection,
    /// Scenario filter, output location and parallelism.
    #[serde(default)]
    pub run: RunSection,
    /// Generator lookup sheets shared by all resolutions.
    #[serde(default)]
    pub inputs: InputsSection,
    /// Dispatch tables, one entry per time resolution.
    #[serde(default = "default_resolutions")]
    pub resolution: Vec<ResolutionConfig>,
}

/// Numeric parameters of the redistribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Maximum redistribution rounds per zone group (must be > 0).
    pub iter_max: usize,
    /// Relative tolerance on the placement target, in (0, 1).
    pub tolerance: f64,
    /// Decimals kept in the results.
    pub round_decimals: u32,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            iter_max: DEFAULT_ITER_MAX,
            tolerance: DEFAULT_TOLERANCE,
            round_decimals: DEFAULT_ROUND_DECIMALS,
        }
    }
}

/// Scenario filter, output location and parallelism.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Hydrology scenario kept by the preprocessor.
    pub hydrology: String,
    /// Directory receiving all output tables.
    pub output_dir: PathBuf,
    /// Worker threads for zone groups; 0 uses the rayon default.
    pub threads: usize,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            hydrology: "1".to_string(),
            output_dir: PathBuf::from("out"),
            threads: 0,
            log_level: "info".to_string(),
        }
    }
}

/// Generator lookup sheets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsSection {
    /// `generator,node,pmax,fuel`
    pub generators: PathBuf,
    /// `node,zone`
    pub nodes: PathBuf,
    /// `fuel,enabled`
    pub fuels: PathBuf,
    /// Optional `year,month,generator,pmax` overrides.
    pub ratings: Option<PathBuf>,
}

impl Default for InputsSection {
    fn default() -> Self {
        Self {
            generators: PathBuf::from("generators.csv"),
            nodes: PathBuf::from("nodes.csv"),
            fuels: PathBuf::from("fuels.csv"),
            ratings: None,
        }
    }
}

/// Dispatch tables of one time resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    pub name: Resolution,
    /// File-name suffix the dispatch tables must carry (`energy_<suffix>.csv`).
    pub suffix: String,
    pub curtailment: PathBuf,
    pub energy: PathBuf,
}

impl ResolutionConfig {
    /// Conventional file layout for `name` with `suffix`.
    pub fn conventional(name: Resolution, suffix: &str) -> Self {
        Self {
            name,
            suffix: suffix.to_string(),
            curtailment: PathBuf::from(format!("curtailment_{suffix}.csv")),
            energy: PathBuf::from(format!("energy_{suffix}.csv")),
        }
    }
}

fn default_resolutions() -> Vec<ResolutionConfig> {
    vec![
        ResolutionConfig::conventional(Resolution::Block, "B"),
        ResolutionConfig::conventional(Resolution::Hour, "H"),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"engine.iter_max"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineSection::default(),
            run: RunSection::default(),
            inputs: InputsSection::default(),
            resolution: default_resolutions(),
        }
    }
}

impl RunConfig {
    /// Parses a configuration file and resolves its relative paths.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            cfg.resolve_paths(base);
        }
        Ok(cfg)
    }

    /// Parses a configuration from a TOML string; paths stay as written.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Makes every relative path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.run.output_dir);
        join(&mut self.inputs.generators);
        join(&mut self.inputs.nodes);
        join(&mut self.inputs.fuels);
        if let Some(r) = self.inputs.ratings.as_mut() {
            join(r);
        }
        for res in &mut self.resolution {
            join(&mut res.curtailment);
            join(&mut res.energy);
        }
    }

    /// Engine parameters of this run.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            iter_max: self.engine.iter_max,
            tolerance: self.engine.tolerance,
            round_decimals: self.engine.round_decimals,
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let e = &self.engine;
        if e.iter_max == 0 {
            errors.push(ConfigError::new("engine.iter_max", "must be > 0"));
        }
        if !(e.tolerance > 0.0 && e.tolerance < 1.0) {
            errors.push(ConfigError::new("engine.tolerance", "must be in (0, 1)"));
        }
        if e.round_decimals > 12 {
            errors.push(ConfigError::new("engine.round_decimals", "must be <= 12"));
        }

        let r = &self.run;
        if r.hydrology.trim().is_empty() {
            errors.push(ConfigError::new("run.hydrology", "must not be empty"));
        }
        if !LOG_LEVELS.contains(&r.log_level.as_str()) {
            errors.push(ConfigError::new(
                "run.log_level",
                format!("must be one of {}, got \"{}\"", LOG_LEVELS.join(", "), r.log_level),
            ));
        }

        if self.resolution.is_empty() {
            errors.push(ConfigError::new("resolution", "at least one resolution is required"));
        }
        let mut seen = HashSet::new();
        for (i, res) in self.resolution.iter().enumerate() {
            if !seen.insert(res.name) {
                errors.push(ConfigError::new(
                    format!("resolution[{i}].name"),
                    format!("duplicate resolution \"{}\"", res.name),
                ));
            }
            if res.suffix.trim().is_empty() {
                errors.push(ConfigError::new(
                    format!("resolution[{i}].suffix"),
                    "must not be empty",
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let cfg = RunConfig::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
        assert_eq!(cfg.resolution.len(), 2);
        assert_eq!(cfg.engine_config(), EngineConfig::default());
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[engine]
iter_max = 8
tolerance = 1e-6
round_decimals = 3

[run]
hydrology = "wet"
output_dir = "results"
threads = 2
log_level = "debug"

[inputs]
generators = "meta/generators.csv"
nodes = "meta/nodes.csv"
fuels = "meta/fuels.csv"
ratings = "meta/ratings.csv"

[[resolution]]
name = "hour"
suffix = "H"
curtailment = "curtailment_H.csv"
energy = "energy_H.csv"
"#;
        let cfg = RunConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.engine.iter_max), Some(8));
        assert_eq!(cfg.as_ref().map(|c| c.run.hydrology.as_str()), Some("wet"));
        assert_eq!(cfg.as_ref().map(|c| c.resolution.len()), Some(1));
        assert_eq!(
            cfg.as_ref().map(|c| c.resolution[0].name),
            Some(Resolution::Hour)
        );
        assert!(cfg.map(|c| c.validate().is_empty()).unwrap_or(false));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[run]
hydrology = "3"
"#;
        let cfg = RunConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.run.hydrology.as_str()), Some("3"));
        assert_eq!(cfg.as_ref().map(|c| c.engine.iter_max), Some(5));
        assert_eq!(cfg.as_ref().map(|c| c.resolution.len()), Some(2));
    }

    #[test]
    fn unknown_field_rejected() {
        let toml = r#"
[engine]
iter_max = 5
bogus = true
"#;
        assert!(RunConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_resolution_rejected() {
        let toml = r#"
[[resolution]]
name = "day"
suffix = "D"
curtailment = "c_D.csv"
energy = "e_D.csv"
"#;
        assert!(RunConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_bad_engine_values() {
        let mut cfg = RunConfig::default();
        cfg.engine.iter_max = 0;
        cfg.engine.tolerance = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "engine.iter_max"));
        assert!(errors.iter().any(|e| e.field == "engine.tolerance"));
    }

    #[test]
    fn validation_catches_duplicate_resolution() {
        let mut cfg = RunConfig::default();
        cfg.resolution.push(ResolutionConfig::conventional(Resolution::Block, "B2"));
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "resolution[2].name"));
    }

    #[test]
    fn validation_catches_bad_log_level() {
        let mut cfg = RunConfig::default();
        cfg.run.log_level = "loud".to_string();
        assert!(cfg.validate().iter().any(|e| e.field == "run.log_level"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let mut cfg = RunConfig::default();
        cfg.inputs.ratings = Some(PathBuf::from("/abs/ratings.csv"));
        cfg.resolve_paths(Path::new("/data/run"));
        assert_eq!(cfg.inputs.nodes, PathBuf::from("/data/run/nodes.csv"));
        assert_eq!(cfg.run.output_dir, PathBuf::from("/data/run/out"));
        assert_eq!(
            cfg.resolution[0].energy,
            PathBuf::from("/data/run/energy_B.csv")
        );
        assert_eq!(cfg.inputs.ratings, Some(PathBuf::from("/abs/ratings.csv")));
    }

    #[test]
    fn error_display_names_field() {
        let e = ConfigError::new("engine.iter_max", "must be > 0");
        assert_eq!(e.to_string(), "config error: engine.iter_max: must be > 0");
    }
}
