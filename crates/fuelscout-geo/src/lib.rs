pub mod distance;
pub mod error;
pub mod geocode;
pub mod haversine;

pub use distance::DistanceClient;
pub use error::GeoError;
pub use geocode::GeoClient;
pub use haversine::haversine_km;
