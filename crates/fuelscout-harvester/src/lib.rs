pub mod error;
pub mod harvest;
pub mod http_source;
pub mod pacing;
pub mod parse;
pub mod source;

pub use error::HarvestError;
pub use harvest::{Harvester, HarvestOptions};
pub use http_source::HttpStationSource;
pub use source::{Listing, StationDetail, StationSource};
