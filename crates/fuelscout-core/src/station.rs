//! Harvested station records as they flow through the pipeline.

use serde::{Deserialize, Serialize};

/// A fuel station candidate harvested from the price source.
///
/// `id` is the source-assigned identifier and the dedup key across all
/// harvesting passes. Coordinates may be absent until the detail fetch (or a
/// registry hit) resolves them; such stations are retained in harvester
/// output maps but excluded from enrichment and ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Per-liter price. Some listings carry none.
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    /// Haversine distance from the query origin, km.
    #[serde(default)]
    pub straight_line_distance_km: Option<f64>,
    /// Real route distance, attached by the distance enricher.
    #[serde(default)]
    pub driving_distance_km: Option<f64>,
    #[serde(default)]
    pub driving_duration_min: Option<i64>,
}

impl Station {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            lat: None,
            lng: None,
            price_per_unit: None,
            straight_line_distance_km: None,
            driving_distance_km: None,
            driving_duration_min: None,
        }
    }

    /// Whether both coordinates have been resolved.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }

    /// Best available distance from the origin: driving distance when the
    /// enricher attached one, straight-line otherwise.
    #[must_use]
    pub fn effective_distance_km(&self) -> Option<f64> {
        self.driving_distance_km.or(self.straight_line_distance_km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_distance_prefers_driving() {
        let mut s = Station::new("1", "Shell");
        s.straight_line_distance_km = Some(2.0);
        assert_eq!(s.effective_distance_km(), Some(2.0));
        s.driving_distance_km = Some(2.7);
        assert_eq!(s.effective_distance_km(), Some(2.7));
    }

    #[test]
    fn station_deserializes_with_missing_optionals() {
        let s: Station = serde_json::from_str(r#"{"id":"42","name":"Esso"}"#).unwrap();
        assert!(!s.has_coordinates());
        assert!(s.price_per_unit.is_none());
    }
}
