//! ==============================================================================
//! registry.rs - fixed list of monitoring stations
//! ==============================================================================
//!
//! purpose:
//!     holds the ordered, non-empty list of locations known at startup.
//!     the first entry is the default selection. nothing mutates it afterwards.
//!
//! relationships:
//!     - built from: config.rs ([[locations]]) or the built-in stations below
//!     - used by: runtime.rs (selection), state.rs (id validation), main.rs (api)
//!
//! ==============================================================================

use crate::domain::Location;
use crate::error::RegistryError;
use std::collections::HashSet;

/// LASS airbox shared by the built-in stations
const DEFAULT_DEVICE_URL: &str = "https://pm25.lass-net.org/data/last.php?device_id=B827EBC2994D";

#[derive(Clone, Debug)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<Location>) -> Result<Self, RegistryError> {
        if locations.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for loc in &locations {
            if !seen.insert(loc.id.as_str()) {
                return Err(RegistryError::DuplicateId(loc.id.clone()));
            }
        }

        Ok(Self { locations })
    }

    /// the four campus stations
    pub fn builtin() -> Self {
        let station = |id: &str, name: &str| Location {
            id: id.to_string(),
            name: name.to_string(),
            api_url: DEFAULT_DEVICE_URL.to_string(),
        };

        Self {
            locations: vec![
                station("A", "小芳堂"),
                station("B", "司令台"),
                station("C", "小田原"),
                station("D", "腳踏車練習場"),
            ],
        }
    }

    /// configured stations when present, built-in ones otherwise
    pub fn from_config(configured: &[Location]) -> Result<Self, RegistryError> {
        if configured.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::new(configured.to_vec())
        }
    }

    pub fn default_location(&self) -> &Location {
        // non-empty by construction
        &self.locations[0]
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(id: &str) -> Location {
        Location { id: id.into(), name: format!("station {id}"), api_url: format!("http://x/{id}") }
    }

    #[test]
    fn builtin_registry_defaults_to_first_station() {
        let registry = LocationRegistry::builtin();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.default_location().id, "A");
        assert_eq!(registry.default_location().name, "小芳堂");
        assert_eq!(registry.get("D").map(|l| l.name.as_str()), Some("腳踏車練習場"));
        assert!(registry.get("Z").is_none());
    }

    #[test]
    fn rejects_empty_list() {
        assert_eq!(LocationRegistry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = LocationRegistry::new(vec![loc("A"), loc("B"), loc("A")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("A".into()));
    }

    #[test]
    fn configured_list_replaces_builtin_and_keeps_order() {
        let registry = LocationRegistry::from_config(&[loc("Q"), loc("P")]).unwrap();
        let ids: Vec<_> = registry.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["Q", "P"]);
        assert_eq!(registry.default_location().id, "Q");

        let fallback = LocationRegistry::from_config(&[]).unwrap();
        assert_eq!(fallback.default_location().id, "A");
    }
}
