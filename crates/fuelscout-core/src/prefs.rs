use serde::{Deserialize, Serialize};

/// Caller-supplied vehicle and decision parameters for one ranking call.
///
/// Immutable for the duration of the call; rankings are recomputed from
/// scratch whenever preferences change, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Tank capacity, liters.
    pub tank_size: f64,
    /// Consumption, liters per 100 km.
    pub fuel_efficiency: f64,
    /// Furthest extra round-trip the user will consider, km.
    pub max_detour_km: f64,
    /// Minimum net savings for a detour to count as worth it.
    pub min_savings: f64,
    /// Harvest radius around the origin, km.
    pub search_radius_km: f64,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            tank_size: 50.0,
            fuel_efficiency: 10.0,
            max_detour_km: 20.0,
            min_savings: 1.0,
            search_radius_km: 15.0,
        }
    }
}
