//! Great-circle distance.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in decimal degrees, rounded to
/// 2 decimal places.
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    (EARTH_RADIUS_KM * c * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_km(43.9, -78.87, 43.9, -78.87), 0.0);
    }

    #[test]
    fn oshawa_to_toronto_is_about_fifty_km() {
        let d = haversine_km(43.8971, -78.8658, 43.6532, -79.3832);
        assert!((40.0..60.0).contains(&d), "got {d}");
    }

    #[test]
    fn result_is_rounded_to_two_decimals() {
        let d = haversine_km(43.90, -78.87, 43.95, -78.80);
        assert!((d * 100.0 - (d * 100.0).round()).abs() < 1e-9);
    }

    #[test]
    fn symmetric_in_endpoints() {
        let a = haversine_km(43.90, -78.87, 44.30, -78.32);
        let b = haversine_km(44.30, -78.32, 43.90, -78.87);
        assert_eq!(a, b);
    }
}
