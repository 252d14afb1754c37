//! Analysis configuration
//!
//! One flat struct consumed by the query layer. Built from a [`Preset`],
//! refined with builder methods or YAML overrides, checked by `validate()`.

use super::error::{ConfigError, ConfigResult};
use super::io::{AnalysisOverrides, ConfigExportV1};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_sub_queries() -> usize {
    256
}

/// Solver and query-layer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Preset these values were derived from
    pub preset: Preset,

    /// Wall-clock budget per root query in milliseconds (0 = unlimited)
    #[serde(default = "default_timeout_ms")]
    pub analysis_timeout_ms: u64,

    /// Resolve virtual call sites lazily from receiver allocation sites
    #[serde(default = "default_true")]
    pub on_the_fly_call_graph: bool,

    /// Permit more than one root query per engine
    #[serde(default = "default_true")]
    pub allow_multiple_queries: bool,

    /// Share discovered call-graph edges across root queries
    #[serde(default = "default_true")]
    pub share_call_graph: bool,

    /// Record field-write/field-read points of indirection
    #[serde(default = "default_true")]
    pub resolve_field_aliases: bool,

    /// Follow returns past the seed method into its callers
    #[serde(default = "default_true")]
    pub track_unbalanced_returns: bool,

    /// Upper bound on alias sub-queries per root query
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    /// Worker threads for whole-program mode (0 = rayon default)
    pub parallel_workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl AnalysisConfig {
    /// Complete configuration for a preset
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                preset,
                analysis_timeout_ms: 1_000,
                on_the_fly_call_graph: false,
                allow_multiple_queries: false,
                share_call_graph: true,
                resolve_field_aliases: false,
                track_unbalanced_returns: true,
                max_sub_queries: 16,
                parallel_workers: 0,
            },
            Preset::Balanced | Preset::Custom => Self {
                preset,
                analysis_timeout_ms: default_timeout_ms(),
                on_the_fly_call_graph: true,
                allow_multiple_queries: true,
                share_call_graph: true,
                resolve_field_aliases: true,
                track_unbalanced_returns: true,
                max_sub_queries: default_max_sub_queries(),
                parallel_workers: 0,
            },
            Preset::Thorough => Self {
                preset,
                analysis_timeout_ms: 60_000,
                on_the_fly_call_graph: true,
                allow_multiple_queries: true,
                share_call_graph: true,
                resolve_field_aliases: true,
                track_unbalanced_returns: true,
                max_sub_queries: 4_096,
                parallel_workers: 0,
            },
        }
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.analysis_timeout_ms = ms;
        self
    }

    pub fn on_the_fly_call_graph(mut self, enabled: bool) -> Self {
        self.on_the_fly_call_graph = enabled;
        self
    }

    pub fn allow_multiple_queries(mut self, enabled: bool) -> Self {
        self.allow_multiple_queries = enabled;
        self
    }

    pub fn share_call_graph(mut self, enabled: bool) -> Self {
        self.share_call_graph = enabled;
        self
    }

    pub fn resolve_field_aliases(mut self, enabled: bool) -> Self {
        self.resolve_field_aliases = enabled;
        self
    }

    pub fn track_unbalanced_returns(mut self, enabled: bool) -> Self {
        self.track_unbalanced_returns = enabled;
        self
    }

    pub fn max_sub_queries(mut self, n: usize) -> Self {
        self.max_sub_queries = n;
        self
    }

    pub fn parallel_workers(mut self, n: usize) -> Self {
        self.parallel_workers = n;
        self
    }

    /// Timeout as a duration, `None` when unlimited
    pub fn timeout(&self) -> Option<Duration> {
        if self.analysis_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.analysis_timeout_ms))
        }
    }

    /// Validate ranges and flag combinations
    pub fn validate(&self) -> ConfigResult<()> {
        if self.analysis_timeout_ms > 3_600_000 {
            return Err(ConfigError::range_with_hint(
                "analysis_timeout_ms",
                self.analysis_timeout_ms,
                0,
                3_600_000,
                "Use 0 for an unlimited budget",
            ));
        }

        if self.max_sub_queries > 1_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_sub_queries",
                self.max_sub_queries,
                0,
                1_000_000,
                "Each sub-query owns its own automata",
            ));
        }

        if self.parallel_workers > 1024 {
            return Err(ConfigError::range_with_hint(
                "parallel_workers",
                self.parallel_workers,
                0,
                1024,
                "Use 0 for the rayon default",
            ));
        }

        if self.on_the_fly_call_graph && self.max_sub_queries == 0 {
            return Err(ConfigError::Validation(
                "on_the_fly_call_graph needs max_sub_queries > 0 to resolve receivers".to_string(),
            ));
        }

        Ok(())
    }

    /// Load from a YAML file (schema v1)
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML text (schema v1)
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        // Version check
        if export.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: vec![1],
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::preset(preset);
        if let Some(overrides) = export.overrides {
            overrides.apply(&mut config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Export as YAML (schema v1)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: self.preset.to_string(),
            overrides: Some(AnalysisOverrides::from_config(self)),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}
