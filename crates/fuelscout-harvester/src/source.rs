//! The capability seam between harvesting logic and the scraping technology.
//!
//! Dedup, registry write-through, pacing, and block detection all live above
//! this trait; the concrete page-fetching mechanism (plain HTTP today, a
//! headless browser or an alternate data provider tomorrow) lives below it
//! and can be swapped without touching the rest of the pipeline.

use crate::error::HarvestError;

/// One station row parsed from an area's search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Source-assigned stable station id.
    pub id: String,
    pub name: String,
    /// Normalized per-liter price, if the listing carried one.
    pub price_per_unit: Option<f64>,
}

/// Coordinates and address extracted from a station's detail view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationDetail {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

impl StationDetail {
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

/// A stateful scraping session against the price source.
///
/// One session maps to one consistent identity (user agent, cookies) on the
/// source site; callers drive it strictly sequentially.
#[allow(async_fn_in_trait)]
pub trait StationSource {
    /// Search one area term and parse its listing page.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on network failure, timeout, or a non-2xx
    /// response. An empty listing page is `Ok(vec![])`, not an error — the
    /// caller's block-detection counter is what interprets empties.
    async fn search(&mut self, term: &str) -> Result<Vec<Listing>, HarvestError>;

    /// Fetch one station's detail view and extract coordinates/address.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] on network failure, timeout, non-2xx
    /// response, or when the page carries no coordinates.
    async fn fetch_detail(&mut self, station_id: &str) -> Result<StationDetail, HarvestError>;

    /// Discard the current session identity and start a fresh one.
    ///
    /// Called after suspected blocking so the next request presents a new
    /// fingerprint to the source.
    async fn reset_session(&mut self);
}
