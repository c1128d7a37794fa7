//! Impact configuration and the infrastructure catalog.

use crate::error::ConfigError;
use crate::sampler::SearchDistance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Infrastructure analysed when none is configured.
pub const DEFAULT_INFRASTRUCTURE: [&str; 7] = [
    "hospital",
    "school",
    "fire_station",
    "police",
    "grocery",
    "pharmacy",
    "fuel",
];

/// Settings for one impact assignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Buffer radius around each feature.
    pub search_distance: SearchDistance,
    /// Infrastructure names to analyse, resolved through an
    /// [`InfrastructureCatalog`].
    pub infrastructure: Vec<String>,
    /// Evaluate features on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            search_distance: SearchDistance::default(),
            infrastructure: DEFAULT_INFRASTRUCTURE.iter().map(|s| s.to_string()).collect(),
            parallel: false,
        }
    }
}

/// How one kind of infrastructure is found in OpenStreetMap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureKind {
    /// Name used in configuration and in the `infrastructure_type` property.
    pub name: String,
    /// OSM tag key, e.g. `amenity`.
    pub osm_key: String,
    /// OSM tag value, e.g. `hospital`.
    pub osm_value: String,
    /// Display group, e.g. `Healthcare`.
    pub group: String,
    /// Short description for maps and reports.
    #[serde(default)]
    pub description: String,
}

impl InfrastructureKind {
    /// Create a catalog entry.
    pub fn new(name: &str, osm_key: &str, osm_value: &str, group: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            osm_key: osm_key.to_string(),
            osm_value: osm_value.to_string(),
            group: group.to_string(),
            description: description.to_string(),
        }
    }

    /// Name shown for features without one, e.g. "Unnamed Fire Station".
    pub fn unnamed_label(&self) -> String {
        let title: Vec<String> = self
            .osm_value
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect();
        format!("Unnamed {}", title.join(" "))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let missing = [
            ("name", &self.name),
            ("osm_key", &self.osm_key),
            ("osm_value", &self.osm_value),
            ("group", &self.group),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((field, _)) => Err(ConfigError::InvalidCatalogEntry {
                name: self.name.clone(),
                reason: format!("{} must not be empty", field),
            }),
            None => Ok(()),
        }
    }
}

/// Known infrastructure kinds by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfrastructureCatalog {
    kinds: BTreeMap<String, InfrastructureKind>,
}

impl InfrastructureCatalog {
    /// Catalog with the built-in kinds.
    pub fn builtin() -> Self {
        let kinds = [
            InfrastructureKind::new("hospital", "amenity", "hospital", "Healthcare", "Hospitals and emergency rooms"),
            InfrastructureKind::new("pharmacy", "amenity", "pharmacy", "Healthcare", "Pharmacies"),
            InfrastructureKind::new("school", "amenity", "school", "Education", "Primary and secondary schools"),
            InfrastructureKind::new("fire_station", "amenity", "fire_station", "Emergency Services", "Fire stations"),
            InfrastructureKind::new("police", "amenity", "police", "Emergency Services", "Police stations"),
            InfrastructureKind::new("grocery", "shop", "supermarket", "Supplies", "Supermarkets and grocery stores"),
            InfrastructureKind::new("fuel", "amenity", "fuel", "Supplies", "Fuel stations"),
        ];
        Self {
            kinds: kinds.into_iter().map(|k| (k.name.clone(), k)).collect(),
        }
    }

    /// Add or replace a kind.
    ///
    /// Two kinds may not share an OSM tag, so a feature never belongs to
    /// more than one kind.
    pub fn insert(&mut self, kind: InfrastructureKind) -> Result<(), ConfigError> {
        kind.validate()?;
        let shared = self.kinds.values().find(|other| {
            other.name != kind.name && other.osm_key == kind.osm_key && other.osm_value == kind.osm_value
        });
        if let Some(other) = shared {
            return Err(ConfigError::InvalidCatalogEntry {
                name: kind.name.clone(),
                reason: format!("{}={} is already used by '{}'", kind.osm_key, kind.osm_value, other.name),
            });
        }
        self.kinds.insert(kind.name.clone(), kind);
        Ok(())
    }

    /// Look up a kind by name.
    pub fn get(&self, name: &str) -> Option<&InfrastructureKind> {
        self.kinds.get(name)
    }

    /// Resolve configured names, failing on the first unknown one.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<InfrastructureKind>, ConfigError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownInfrastructure(name.to_string()))
            })
            .collect()
    }

    /// All kinds, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &InfrastructureKind> {
        self.kinds.values()
    }

    /// Number of kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImpactConfig::default();
        assert_eq!(config.search_distance.meters(), 10.0);
        assert_eq!(config.infrastructure.len(), 7);
        assert!(!config.parallel);
    }

    #[test]
    fn test_builtin_catalog_covers_defaults() {
        let catalog = InfrastructureCatalog::builtin();
        let kinds = catalog.resolve(&DEFAULT_INFRASTRUCTURE).expect("defaults resolve");
        assert_eq!(kinds.len(), DEFAULT_INFRASTRUCTURE.len());

        let grocery = catalog.get("grocery").expect("grocery entry");
        assert_eq!((grocery.osm_key.as_str(), grocery.osm_value.as_str()), ("shop", "supermarket"));
        assert_eq!(catalog.get("hospital").map(|k| k.group.as_str()), Some("Healthcare"));
    }

    #[test]
    fn test_unknown_infrastructure() {
        let catalog = InfrastructureCatalog::builtin();
        assert_eq!(
            catalog.resolve(&["hospital", "heliport"]),
            Err(ConfigError::UnknownInfrastructure("heliport".to_string()))
        );
    }

    #[test]
    fn test_insert_validates() {
        let mut catalog = InfrastructureCatalog::builtin();
        let shelter = InfrastructureKind::new("shelter", "amenity", "shelter", "Emergency Services", "");
        catalog.insert(shelter).expect("valid entry");
        assert_eq!(catalog.len(), 8);

        let broken = InfrastructureKind::new("broken", "", "x", "Other", "");
        assert!(matches!(
            catalog.insert(broken),
            Err(ConfigError::InvalidCatalogEntry { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_shared_tag() {
        let mut catalog = InfrastructureCatalog::builtin();
        let clinic = InfrastructureKind::new("clinic", "amenity", "hospital", "Healthcare", "");
        assert!(matches!(
            catalog.insert(clinic),
            Err(ConfigError::InvalidCatalogEntry { ref name, .. }) if name == "clinic"
        ));

        // Replacing an entry under its own name keeps its tag
        let hospital = InfrastructureKind::new("hospital", "amenity", "hospital", "Health", "Hospitals");
        catalog.insert(hospital).expect("replacement");
        assert_eq!(catalog.get("hospital").map(|k| k.group.as_str()), Some("Health"));
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn test_unnamed_label() {
        let catalog = InfrastructureCatalog::builtin();
        let label = |name: &str| catalog.get(name).map(InfrastructureKind::unnamed_label);
        assert_eq!(label("fire_station").as_deref(), Some("Unnamed Fire Station"));
        assert_eq!(label("grocery").as_deref(), Some("Unnamed Supermarket"));
    }

    #[test]
    fn test_config_from_json() {
        let config: ImpactConfig =
            serde_json::from_str(r#"{"search_distance": 25.0, "infrastructure": ["school"]}"#)
                .expect("valid config");
        assert_eq!(config.search_distance.meters(), 25.0);
        assert_eq!(config.infrastructure, vec!["school".to_string()]);
        assert!(!config.parallel);

        assert!(serde_json::from_str::<ImpactConfig>(r#"{"search_distance": -2}"#).is_err());
    }
}
