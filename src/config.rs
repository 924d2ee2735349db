//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mutree/mutree.toml`
//! 3. Local config: `<dir>/.mutree.toml` (directory of the record file)
//! 4. Environment variables: `MUTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::SAMPLE_FIELD;

/// Default mean shift bandwidth of the `clust` parser.
pub const DEFAULT_BANDWIDTH: f64 = 0.049_787_068_367_863_944;

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub sample_field: Option<String>,
    pub levels: Option<Vec<String>>,
    pub min_size: Option<usize>,
    pub comb_sizes: Option<Vec<usize>>,
    pub cluster_bandwidth: Option<f64>,
}

/// Unified configuration for mutree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Column holding the sample id of each record
    pub sample_field: String,
    /// Annotation levels a tree is built over, outermost first
    pub levels: Vec<String>,
    /// Minimum number of samples of an enumerated type
    pub min_size: usize,
    /// Subset sizes used by `combos`
    pub comb_sizes: Vec<usize>,
    /// Bandwidth of the mean shift behind `_clust` levels
    pub cluster_bandwidth: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_field: SAMPLE_FIELD.to_string(),
            levels: vec!["Gene".into(), "Form".into()],
            min_size: 1,
            comb_sizes: vec![1, 2],
            cluster_bandwidth: DEFAULT_BANDWIDTH,
        }
    }
}

/// Get the XDG config directory for mutree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mutree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mutree.toml"))
}

/// Get the path to the local config file in a data directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".mutree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay values win where specified; lists are replaced, not merged.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            sample_field: overlay
                .sample_field
                .clone()
                .unwrap_or_else(|| self.sample_field.clone()),
            levels: overlay.levels.clone().unwrap_or_else(|| self.levels.clone()),
            min_size: overlay.min_size.unwrap_or(self.min_size),
            comb_sizes: overlay
                .comb_sizes
                .clone()
                .unwrap_or_else(|| self.comb_sizes.clone()),
            cluster_bandwidth: overlay.cluster_bandwidth.unwrap_or(self.cluster_bandwidth),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory searched for `.mutree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply MUTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MUTREE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("levels")
                    .with_list_parse_key("comb_sizes")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("sample_field") {
            settings.sample_field = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("levels") {
            settings.levels = val;
        }
        if let Ok(val) = config.get::<usize>("min_size") {
            settings.min_size = val;
        }
        if let Ok(val) = config.get::<Vec<usize>>("comb_sizes") {
            settings.comb_sizes = val;
        }
        if let Ok(val) = config.get_float("cluster_bandwidth") {
            settings.cluster_bandwidth = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.levels.is_empty() {
            return Err(ApplicationError::Config {
                message: "levels must name at least one annotation level".into(),
            });
        }
        if !(self.cluster_bandwidth > 0.0) {
            return Err(ApplicationError::Config {
                message: format!("cluster_bandwidth must be positive, got {}", self.cluster_bandwidth),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mutree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mutree/mutree.toml
#   Local:  <record file dir>/.mutree.toml
#   Env:    MUTREE_* environment variables (lists are comma separated)

# Column holding the sample id
# sample_field = "Sample"

# Annotation levels, outermost first. Derived levels: Type, Location,
# and parsed levels such as Form_base or Score_clust.
# levels = ["Gene", "Form"]

# Minimum sample count of enumerated types
# min_size = 1

# Subset sizes used by `mutree combos`
# comb_sizes = [1, 2]

# Mean shift bandwidth for *_clust levels
# cluster_bandwidth = 0.0498
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.sample_field, "Sample");
        assert_eq!(settings.levels, vec!["Gene".to_string(), "Form".to_string()]);
        assert_eq!(settings.min_size, 1);
        assert_eq!(settings.comb_sizes, vec![1, 2]);
        assert!((settings.cluster_bandwidth - (-3.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn given_overlay_when_merging_then_specified_fields_win() {
        let overlay = RawSettings {
            levels: Some(vec!["Gene".into(), "Type".into()]),
            min_size: Some(5),
            ..Default::default()
        };

        let merged = Settings::default().merge_with(&overlay);

        assert_eq!(merged.levels, vec!["Gene".to_string(), "Type".to_string()]);
        assert_eq!(merged.min_size, 5);
        assert_eq!(merged.sample_field, "Sample");
        assert_eq!(merged.comb_sizes, vec![1, 2]);
    }

    #[test]
    fn given_empty_levels_when_validating_then_fails() {
        let settings = Settings {
            levels: vec![],
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("parse template");
        assert!(raw.levels.is_none());
    }
}
