//! Net-savings ranking engine.
//!
//! Pure function over a harvested station list and user preferences. The
//! nearest priced station is the baseline; every other station's detour is
//! measured against it as an extra round trip, and the fuel burned on that
//! detour (priced at the baseline's rate) is charged against the gross
//! price savings on a fill-up.

use serde::Serialize;

use crate::prefs::UserPreferences;
use crate::station::Station;

/// Assumed fraction of the tank filled on a stop.
const FILL_FRACTION: f64 = 0.75;

/// A station with its cost-benefit figures against the baseline.
#[derive(Debug, Clone, Serialize)]
pub struct RankedStation {
    #[serde(flatten)]
    pub station: Station,
    pub gross_savings: f64,
    pub detour_cost: f64,
    pub net_savings: f64,
    pub is_baseline: bool,
    pub worth_it: bool,
}

/// Presentation orderings layered over the computed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Cheapest first (the default).
    #[default]
    Price,
    /// Nearest first, driving distance preferred.
    Distance,
    /// Highest net savings first.
    NetSavings,
    /// Worth-it stations first by net savings, the rest by price.
    BestValue,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Rank stations by the net-savings model.
///
/// Stations without a price or without any distance figure are dropped; an
/// empty slice comes back if none remain. The result carries every priced
/// station, including those priced above the baseline (negative net savings
/// are useful for showing "loss" options). Output is sorted by
/// [`SortKey::Price`]; apply [`sort_ranked`] for the other orderings.
#[must_use]
pub fn rank(stations: &[Station], prefs: &UserPreferences) -> Vec<RankedStation> {
    let priced: Vec<&Station> = stations
        .iter()
        .filter(|s| s.price_per_unit.is_some() && s.effective_distance_km().is_some())
        .collect();

    let Some(baseline) = select_baseline(&priced) else {
        return Vec::new();
    };

    // Both unwraps guarded by the filter above.
    let baseline_price = baseline.price_per_unit.unwrap_or_default();
    let baseline_distance = baseline.effective_distance_km().unwrap_or_default();
    let liters_to_fill = prefs.tank_size * FILL_FRACTION;

    let mut results: Vec<RankedStation> = priced
        .iter()
        .map(|station| {
            let price = station.price_per_unit.unwrap_or_default();
            let distance = station.effective_distance_km().unwrap_or_default();

            // Extra distance beyond the baseline, as a round trip. A station
            // at or inside the baseline distance costs nothing to reach.
            let detour_km = ((distance - baseline_distance) * 2.0).max(0.0);

            let gross_savings = (baseline_price - price) * liters_to_fill;
            let fuel_used = detour_km / 100.0 * prefs.fuel_efficiency;
            let detour_cost = fuel_used * baseline_price;
            let net_savings = round2(gross_savings - detour_cost);

            RankedStation {
                station: (*station).clone(),
                gross_savings: round2(gross_savings),
                detour_cost: round2(detour_cost),
                net_savings,
                is_baseline: station.id == baseline.id,
                worth_it: net_savings >= prefs.min_savings,
            }
        })
        .collect();

    sort_ranked(&mut results, SortKey::Price);
    results
}

/// The minimum-distance priced station; ties go to the first seen.
fn select_baseline<'a>(priced: &[&'a Station]) -> Option<&'a Station> {
    let mut best: Option<&Station> = None;
    for station in priced {
        let distance = station.effective_distance_km()?;
        match best {
            Some(b) if distance >= b.effective_distance_km().unwrap_or(f64::MAX) => {}
            _ => best = Some(station),
        }
    }
    best
}

/// Re-order computed results by the given presentation key.
pub fn sort_ranked(results: &mut [RankedStation], key: SortKey) {
    match key {
        SortKey::Price => results.sort_by(|a, b| {
            let pa = a.station.price_per_unit.unwrap_or(f64::MAX);
            let pb = b.station.price_per_unit.unwrap_or(f64::MAX);
            pa.total_cmp(&pb)
        }),
        SortKey::Distance => results.sort_by(|a, b| {
            let da = a.station.effective_distance_km().unwrap_or(f64::MAX);
            let db = b.station.effective_distance_km().unwrap_or(f64::MAX);
            da.total_cmp(&db)
        }),
        SortKey::NetSavings => results.sort_by(|a, b| b.net_savings.total_cmp(&a.net_savings)),
        SortKey::BestValue => results.sort_by(|a, b| match (a.worth_it, b.worth_it) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (true, true) => b.net_savings.total_cmp(&a.net_savings),
            (false, false) => {
                let pa = a.station.price_per_unit.unwrap_or(f64::MAX);
                let pb = b.station.price_per_unit.unwrap_or(f64::MAX);
                pa.total_cmp(&pb)
            }
        }),
    }
}

impl SortKey {
    /// Parse a query-string sort value. Unknown values fall back to price.
    #[must_use]
    pub fn from_query(s: &str) -> Self {
        match s {
            "distance" => SortKey::Distance,
            "savings" => SortKey::NetSavings,
            "worth_it" | "best_value" => SortKey::BestValue,
            _ => SortKey::Price,
        }
    }
}
