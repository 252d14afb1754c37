//! Configuration I/O (YAML)
//!
//! Defines YAML schema types. Loading lives on `AnalysisConfig`.

use super::analysis_config::AnalysisConfig;
use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<AnalysisOverrides>,
}

/// Per-field overrides on top of a preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_the_fly_call_graph: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_multiple_queries: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_call_graph: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_field_aliases: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_unbalanced_returns: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sub_queries: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_workers: Option<usize>,
}

impl AnalysisOverrides {
    /// Full snapshot of a configuration
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            analysis_timeout_ms: Some(config.analysis_timeout_ms),
            on_the_fly_call_graph: Some(config.on_the_fly_call_graph),
            allow_multiple_queries: Some(config.allow_multiple_queries),
            share_call_graph: Some(config.share_call_graph),
            resolve_field_aliases: Some(config.resolve_field_aliases),
            track_unbalanced_returns: Some(config.track_unbalanced_returns),
            max_sub_queries: Some(config.max_sub_queries),
            parallel_workers: Some(config.parallel_workers),
        }
    }

    pub fn apply(self, config: &mut AnalysisConfig) {
        if let Some(v) = self.analysis_timeout_ms {
            config.analysis_timeout_ms = v;
        }
        if let Some(v) = self.on_the_fly_call_graph {
            config.on_the_fly_call_graph = v;
        }
        if let Some(v) = self.allow_multiple_queries {
            config.allow_multiple_queries = v;
        }
        if let Some(v) = self.share_call_graph {
            config.share_call_graph = v;
        }
        if let Some(v) = self.resolve_field_aliases {
            config.resolve_field_aliases = v;
        }
        if let Some(v) = self.track_unbalanced_returns {
            config.track_unbalanced_returns = v;
        }
        if let Some(v) = self.max_sub_queries {
            config.max_sub_queries = v;
        }
        if let Some(v) = self.parallel_workers {
            config.parallel_workers = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ConfigError;
    use crate::config::Preset;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_roundtrip() {
        let config = AnalysisConfig::preset(Preset::Thorough).timeout_ms(1234);

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: thorough"));
        assert!(yaml.contains("analysis_timeout_ms: 1234"));

        let parsed = AnalysisConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
preset: fast
overrides:
  analysis_timeout_ms: 250
  on_the_fly_call_graph: true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();
        let path = temp_file.path().to_str().unwrap();

        let config = AnalysisConfig::from_yaml(path).unwrap();
        assert_eq!(config.preset, Preset::Fast);
        assert_eq!(config.analysis_timeout_ms, 250);
        assert!(config.on_the_fly_call_graph);
        assert!(!config.resolve_field_aliases);
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = AnalysisConfig::from_yaml_str("preset: fast\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = AnalysisConfig::from_yaml_str("version: 2\npreset: fast\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedVersion { .. }
        ));
    }

    #[test]
    fn test_yaml_unknown_preset() {
        let result = AnalysisConfig::from_yaml_str("version: 1\npreset: turbo\n");
        assert!(matches!(result, Err(ConfigError::UnknownPreset(_))));
    }

    #[test]
    fn test_yaml_unknown_override_rejected() {
        let yaml = "version: 1\npreset: fast\noverrides:\n  max_depth: 3\n";
        assert!(AnalysisConfig::from_yaml_str(yaml).is_err());
    }
}
