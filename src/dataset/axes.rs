//! Logical axes and the names they may go by.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Ordered candidate names for each logical axis. Earlier entries win.
pub struct AxisAliases {
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
    pub time: Vec<String>,
}

impl Default for AxisAliases {
    fn default() -> Self {
        AxisAliases {
            latitude: vec!["latitude".to_string(), "lat".to_string()],
            longitude: vec!["longitude".to_string(), "lon".to_string()],
            time: vec!["time".to_string()],
        }
    }
}

impl AxisAliases {
    /// Finds the first latitude/longitude pair where both names are present.
    ///
    /// Pairs are tried position by position (`latitude`/`longitude`, then
    /// `lat`/`lon`), so a dataset with `latitude` and `lon` has no spatial axes.
    pub fn resolve_spatial(&self, present: impl Fn(&str) -> bool) -> Option<(String, String)> {
        self.latitude
            .iter()
            .zip(self.longitude.iter())
            .find(|(lat, lon)| present(lat) && present(lon))
            .map(|(lat, lon)| (lat.clone(), lon.clone()))
    }

    pub fn resolve_time(&self, present: impl Fn(&str) -> bool) -> Option<String> {
        self.time.iter().find(|name| present(name)).cloned()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Canonical coordinate names, resolved once when the dataset is loaded.
pub struct ResolvedAxes {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub time: Option<String>,
}

impl ResolvedAxes {
    pub fn resolve(aliases: &AxisAliases, present: impl Fn(&str) -> bool) -> Self {
        let spatial = aliases.resolve_spatial(&present);
        let time = aliases.resolve_time(&present);
        let (latitude, longitude) = match spatial {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };

        ResolvedAxes {
            latitude,
            longitude,
            time,
        }
    }
}

// -- Tests -------------------------------------------------------------------
