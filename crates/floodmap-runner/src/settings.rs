//! Run settings: an optional YAML file overridden by command-line flags.
//!
//! ```yaml
//! search_distance: 25.0
//! infrastructure: [hospital, school, shelter]
//! catalog:
//!   - name: shelter
//!     osm_key: amenity
//!     osm_value: shelter
//!     group: Emergency Services
//!     description: Emergency shelters
//! overpass_url: https://overpass.kumi.systems/api/interpreter
//! cache_dir: ./osm_cache
//! parallel: true
//! ```

use crate::RunError;
use floodmap_impact::{
    ConfigError, ImpactConfig, InfrastructureCatalog, InfrastructureKind, SearchDistance,
    DEFAULT_INFRASTRUCTURE,
};
use floodmap_osm::DEFAULT_OVERPASS_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for an `impact` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Buffer radius in meters.
    pub search_distance: SearchDistance,
    /// Infrastructure kinds to analyse.
    pub infrastructure: Vec<String>,
    /// Extra or replacement catalog entries.
    pub catalog: Vec<InfrastructureKind>,
    /// Overpass interpreter URL.
    pub overpass_url: String,
    /// Directory for cached Overpass responses.
    pub cache_dir: Option<PathBuf>,
    /// Sample features on all cores.
    pub parallel: bool,
    /// Fetch and analyse the road network.
    pub include_roads: bool,
    /// Render PNG static maps.
    pub static_maps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_distance: SearchDistance::default(),
            infrastructure: DEFAULT_INFRASTRUCTURE.iter().map(|s| s.to_string()).collect(),
            catalog: Vec::new(),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            cache_dir: None,
            parallel: false,
            include_roads: true,
            static_maps: true,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Built-in catalog extended with the configured entries.
    pub fn catalog(&self) -> Result<InfrastructureCatalog, ConfigError> {
        let mut catalog = InfrastructureCatalog::builtin();
        for kind in &self.catalog {
            catalog.insert(kind.clone())?;
        }
        Ok(catalog)
    }

    /// Configuration handed to the impact assigner.
    pub fn impact_config(&self) -> ImpactConfig {
        ImpactConfig {
            search_distance: self.search_distance,
            infrastructure: self.infrastructure.clone(),
            parallel: self.parallel,
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    /// `--search-distance`.
    pub search_distance: Option<f64>,
    /// `--infrastructure`.
    pub infrastructure: Option<Vec<String>>,
    /// `--overpass-url`.
    pub overpass_url: Option<String>,
    /// `--cache-dir`.
    pub cache_dir: Option<PathBuf>,
    /// `--parallel`.
    pub parallel: bool,
    /// `--no-roads`.
    pub no_roads: bool,
    /// `--no-static-maps`.
    pub no_static_maps: bool,
}

impl SettingsOverrides {
    /// Apply the overrides on top of `settings`.
    pub fn apply(self, mut settings: Settings) -> Result<Settings, RunError> {
        if let Some(meters) = self.search_distance {
            settings.search_distance = SearchDistance::new(meters)?;
        }
        if let Some(infrastructure) = self.infrastructure {
            if infrastructure.is_empty() {
                return Err(RunError::InvalidArgument(
                    "--infrastructure needs at least one type".to_string(),
                ));
            }
            settings.infrastructure = infrastructure;
        }
        if let Some(url) = self.overpass_url {
            settings.overpass_url = url;
        }
        if let Some(dir) = self.cache_dir {
            settings.cache_dir = Some(dir);
        }
        settings.parallel |= self.parallel;
        settings.include_roads &= !self.no_roads;
        settings.static_maps &= !self.no_static_maps;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.search_distance.meters(), 10.0);
        assert_eq!(settings.infrastructure.len(), 7);
        assert!(settings.include_roads);
        assert!(settings.static_maps);
        assert_eq!(settings.overpass_url, DEFAULT_OVERPASS_URL);
    }

    #[test]
    fn test_parse_yaml_with_catalog() {
        let yaml = r#"
search_distance: 25.0
infrastructure: [hospital, shelter]
catalog:
  - name: shelter
    osm_key: amenity
    osm_value: shelter
    group: Emergency Services
parallel: true
"#;
        let settings: Settings = serde_yaml::from_str(yaml).expect("valid settings");
        assert_eq!(settings.search_distance.meters(), 25.0);
        assert!(settings.parallel);
        assert!(settings.include_roads);

        let catalog = settings.catalog().expect("valid catalog");
        let kinds = catalog.resolve(&settings.infrastructure).expect("known kinds");
        assert_eq!(kinds[1].osm_value, "shelter");
        assert_eq!(kinds[1].description, "");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(serde_yaml::from_str::<Settings>("search_distance: -5").is_err());
        assert!(serde_yaml::from_str::<Settings>("serach_distance: 5").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let file = Settings {
            search_distance: SearchDistance::new(30.0).expect("valid distance"),
            parallel: false,
            ..Settings::default()
        };
        let overrides = SettingsOverrides {
            search_distance: Some(5.0),
            infrastructure: Some(vec!["school".to_string()]),
            parallel: true,
            no_roads: true,
            ..SettingsOverrides::default()
        };
        let settings = overrides.apply(file).expect("valid overrides");
        assert_eq!(settings.search_distance.meters(), 5.0);
        assert_eq!(settings.infrastructure, vec!["school".to_string()]);
        assert!(settings.parallel);
        assert!(!settings.include_roads);
        assert!(settings.static_maps);
    }

    #[test]
    fn test_override_validation() {
        let overrides = SettingsOverrides {
            search_distance: Some(f64::NAN),
            ..SettingsOverrides::default()
        };
        assert!(matches!(
            overrides.apply(Settings::default()),
            Err(RunError::ConfigError(ConfigError::InvalidSearchDistance(_)))
        ));
    }
}
