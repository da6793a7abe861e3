//! Sequential area-sweep harvesting with anti-blocking discipline.
//!
//! One harvester run drives one source session through a list of area terms,
//! strictly in order — parallel fetches would present a distributed request
//! pattern to the source and invite anti-bot defenses, so the serialization
//! here is a design invariant, not an incidental limitation.

use std::collections::HashMap;
use std::time::Duration;

use fuelscout_core::Station;
use fuelscout_db::RegistryEntry;
use fuelscout_geo::haversine_km;
use sqlx::PgPool;

use crate::error::HarvestError;
use crate::pacing::Pacing;
use crate::source::StationSource;

/// Registry rows are flushed every this many newly resolved stations, so a
/// crash mid-run keeps most of the work.
const REGISTRY_FLUSH_EVERY: usize = 25;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Query origin; when set, output is annotated with straight-line
    /// distance and sorted nearest-first.
    pub origin: Option<(f64, f64)>,
    /// Listings taken from each area's results.
    pub max_per_area: usize,
    /// Drop stations further than this from the origin. Stations with an
    /// unknown distance pass the filter.
    pub max_distance_km: Option<f64>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            origin: None,
            max_per_area: 10,
            max_distance_km: None,
        }
    }
}

pub struct Harvester<S> {
    source: S,
    registry: Option<PgPool>,
    pacing: Pacing,
    empty_streak_threshold: u32,
    block_cooldown: Duration,
}

impl<S: StationSource> Harvester<S> {
    pub fn new(
        source: S,
        registry: Option<PgPool>,
        pacing: Pacing,
        empty_streak_threshold: u32,
        block_cooldown: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            pacing,
            empty_streak_threshold,
            block_cooldown,
        }
    }

    /// Harvest all area terms into a deduplicated, coordinate-bearing
    /// station list.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::AllSearchesFailed`] when every area search
    /// failed outright. Empty-but-successful searches are not an error; they
    /// produce an empty result (a valid "no data" outcome).
    pub async fn run(
        &mut self,
        terms: &[String],
        options: &HarvestOptions,
    ) -> Result<Vec<Station>, HarvestError> {
        let mut stations: Vec<Station> = Vec::new();
        let mut empty_streak: u32 = 0;
        let mut failed_searches = 0usize;

        for (i, term) in terms.iter().enumerate() {
            // Repeated empty results look like upstream blocking: cool down
            // and present a fresh session identity before continuing.
            if empty_streak >= self.empty_streak_threshold {
                tracing::warn!(
                    empty_streak,
                    cooldown_secs = self.block_cooldown.as_secs(),
                    "possible rate limiting detected; cooling down and restarting session"
                );
                tokio::time::sleep(self.block_cooldown).await;
                self.source.reset_session().await;
                empty_streak = 0;
            }

            if i > 0 {
                self.pacing.pause().await;
            }

            match self.source.search(term).await {
                Ok(listings) if listings.is_empty() => {
                    empty_streak += 1;
                    tracing::info!(term, empty_streak, "area search returned no listings");
                }
                Ok(listings) => {
                    empty_streak = 0;
                    let mut added = 0usize;
                    for listing in listings.into_iter().take(options.max_per_area) {
                        if stations.iter().any(|s| s.id == listing.id) {
                            continue;
                        }
                        let mut station = Station::new(listing.id, listing.name);
                        station.price_per_unit = listing.price_per_unit;
                        stations.push(station);
                        added += 1;
                    }
                    tracing::info!(term, added, total = stations.len(), "area search done");
                }
                Err(err) => {
                    empty_streak += 1;
                    failed_searches += 1;
                    tracing::warn!(term, error = %err, "area search failed; skipping");
                }
            }
        }

        if !terms.is_empty() && failed_searches == terms.len() {
            return Err(HarvestError::AllSearchesFailed);
        }

        self.resolve_coordinates(&mut stations).await;

        Ok(finalize(stations, options))
    }

    /// Fill coordinates from the registry where possible, then visit detail
    /// pages one at a time for the rest, writing resolutions back through.
    async fn resolve_coordinates(&mut self, stations: &mut [Station]) {
        let unresolved: Vec<String> = stations
            .iter()
            .filter(|s| !s.has_coordinates())
            .map(|s| s.id.clone())
            .collect();
        if unresolved.is_empty() {
            return;
        }

        let known = self.registry_lookup(&unresolved).await;
        for station in stations.iter_mut() {
            if let Some(entry) = known.get(&station.id) {
                station.lat = Some(entry.lat);
                station.lng = Some(entry.lng);
                if station.address.is_none() {
                    station.address = entry.address.clone();
                }
            }
        }

        let mut pending: Vec<RegistryEntry> = Vec::new();
        for station in stations.iter_mut().filter(|s| !s.has_coordinates()) {
            self.pacing.pause().await;
            match self.source.fetch_detail(&station.id).await {
                Ok(detail) if detail.has_coordinates() => {
                    station.lat = detail.lat;
                    station.lng = detail.lng;
                    station.address = detail.address;
                    pending.push(RegistryEntry::new(
                        station.id.clone(),
                        station.name.clone(),
                        station.address.clone(),
                        station.lat.unwrap_or_default(),
                        station.lng.unwrap_or_default(),
                    ));
                    if pending.len() >= REGISTRY_FLUSH_EVERY {
                        self.registry_flush(&mut pending).await;
                    }
                }
                Ok(_) => {
                    tracing::warn!(station_id = %station.id, "detail page had no coordinates");
                }
                Err(err) => {
                    tracing::warn!(station_id = %station.id, error = %err, "detail fetch failed; dropping station");
                }
            }
        }
        self.registry_flush(&mut pending).await;
    }

    async fn registry_lookup(&self, ids: &[String]) -> HashMap<String, RegistryEntry> {
        let Some(pool) = &self.registry else {
            return HashMap::new();
        };
        match fuelscout_db::lookup_stations(pool, ids).await {
            Ok(found) => {
                tracing::debug!(requested = ids.len(), found = found.len(), "registry lookup");
                found
            }
            Err(err) => {
                tracing::warn!(error = %err, "registry lookup failed; resolving via detail pages");
                HashMap::new()
            }
        }
    }

    /// Best-effort durability: a failed write is logged, never fatal — the
    /// in-memory results still go back to the caller.
    async fn registry_flush(&self, pending: &mut Vec<RegistryEntry>) {
        if pending.is_empty() {
            return;
        }
        let Some(pool) = &self.registry else {
            pending.clear();
            return;
        };
        match fuelscout_db::upsert_stations(pool, pending).await {
            Ok(written) => tracing::debug!(written, "registry flush"),
            Err(err) => tracing::warn!(error = %err, "registry upsert failed"),
        }
        pending.clear();
    }
}

/// Keep coordinate-bearing stations, annotate straight-line distance from
/// the origin, apply the distance bound, sort nearest-first.
fn finalize(stations: Vec<Station>, options: &HarvestOptions) -> Vec<Station> {
    let mut out: Vec<Station> = stations
        .into_iter()
        .filter(Station::has_coordinates)
        .map(|mut s| {
            if let Some((olat, olng)) = options.origin {
                s.straight_line_distance_km = Some(haversine_km(
                    olat,
                    olng,
                    s.lat.unwrap_or_default(),
                    s.lng.unwrap_or_default(),
                ));
            }
            s
        })
        .filter(|s| match (options.max_distance_km, s.straight_line_distance_km) {
            (Some(max), Some(d)) => d <= max,
            _ => true,
        })
        .collect();

    if options.origin.is_some() {
        out.sort_by(|a, b| {
            let da = a.straight_line_distance_km.unwrap_or(f64::MAX);
            let db = b.straight_line_distance_km.unwrap_or(f64::MAX);
            da.total_cmp(&db)
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::source::{Listing, StationDetail};

    fn listing(id: &str, price: Option<f64>) -> Listing {
        Listing {
            id: id.to_owned(),
            name: format!("Station {id}"),
            price_per_unit: price,
        }
    }

    fn detail(lat: f64, lng: f64) -> StationDetail {
        StationDetail {
            lat: Some(lat),
            lng: Some(lng),
            address: Some("1 Test Rd".to_owned()),
        }
    }

    /// Scripted source: one canned response per search call, a fixed detail
    /// map, and an event log for ordering assertions.
    struct MockSource {
        searches: VecDeque<Result<Vec<Listing>, HarvestError>>,
        details: HashMap<String, StationDetail>,
        log: Vec<String>,
    }

    impl MockSource {
        fn new(
            searches: Vec<Result<Vec<Listing>, HarvestError>>,
            details: HashMap<String, StationDetail>,
        ) -> Self {
            Self {
                searches: searches.into(),
                details,
                log: Vec::new(),
            }
        }
    }

    impl StationSource for MockSource {
        async fn search(&mut self, term: &str) -> Result<Vec<Listing>, HarvestError> {
            self.log.push(format!("search:{term}"));
            self.searches
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_detail(&mut self, station_id: &str) -> Result<StationDetail, HarvestError> {
            self.log.push(format!("detail:{station_id}"));
            self.details
                .get(station_id)
                .cloned()
                .ok_or_else(|| HarvestError::MissingCoordinates {
                    station_id: station_id.to_owned(),
                })
        }

        async fn reset_session(&mut self) {
            self.log.push("reset".to_owned());
        }
    }

    fn harvester(source: MockSource) -> Harvester<MockSource> {
        Harvester::new(source, None, Pacing::none(), 3, Duration::ZERO)
    }

    fn terms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn dedups_station_ids_across_areas() {
        let details = HashMap::from([
            ("X".to_owned(), detail(43.9, -78.9)),
            ("Y".to_owned(), detail(43.8, -78.8)),
        ]);
        let source = MockSource::new(
            vec![
                Ok(vec![listing("X", Some(1.50))]),
                Ok(vec![listing("X", Some(1.48)), listing("Y", Some(1.45))]),
            ],
            details,
        );
        let mut h = harvester(source);
        let out = h
            .run(&terms(&["Oshawa", "Whitby"]), &HarvestOptions::default())
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        let x = out.iter().find(|s| s.id == "X").unwrap();
        // First-seen listing wins; the second area's price for X is ignored.
        assert_eq!(x.price_per_unit, Some(1.50));
        // Detail fetched once per unique id.
        assert_eq!(
            h.source.log.iter().filter(|e| *e == "detail:X").count(),
            1
        );
    }

    #[tokio::test]
    async fn cooldown_fires_once_after_three_consecutive_empties() {
        let details = HashMap::from([("Z".to_owned(), detail(43.9, -78.9))]);
        let source = MockSource::new(
            vec![
                Ok(vec![]),
                Ok(vec![]),
                Ok(vec![]),
                Ok(vec![listing("Z", Some(1.40))]),
            ],
            details,
        );
        let mut h = harvester(source);
        let out = h
            .run(&terms(&["a", "b", "c", "d"]), &HarvestOptions::default())
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        let resets = h.source.log.iter().filter(|e| *e == "reset").count();
        assert_eq!(resets, 1);
        // The reset happens after the third empty search and before the fourth.
        let searches_and_resets: Vec<&str> = h
            .source
            .log
            .iter()
            .filter(|e| e.starts_with("search") || *e == "reset")
            .map(String::as_str)
            .collect();
        assert_eq!(
            searches_and_resets,
            ["search:a", "search:b", "search:c", "reset", "search:d"]
        );
    }

    #[tokio::test]
    async fn empty_streak_resets_on_any_non_empty_result() {
        let details = HashMap::from([("A".to_owned(), detail(43.9, -78.9))]);
        let source = MockSource::new(
            vec![
                Ok(vec![]),
                Ok(vec![]),
                Ok(vec![listing("A", Some(1.50))]),
                Ok(vec![]),
                Ok(vec![]),
            ],
            details,
        );
        let mut h = harvester(source);
        h.run(&terms(&["a", "b", "c", "d", "e"]), &HarvestOptions::default())
            .await
            .unwrap();
        assert!(!h.source.log.contains(&"reset".to_owned()));
    }

    #[tokio::test]
    async fn failed_search_counts_toward_streak_and_is_skipped() {
        let details = HashMap::from([("A".to_owned(), detail(43.9, -78.9))]);
        let source = MockSource::new(
            vec![
                Err(HarvestError::UnexpectedStatus {
                    status: 403,
                    url: "x".to_owned(),
                }),
                Ok(vec![]),
                Ok(vec![]),
                Ok(vec![listing("A", Some(1.50))]),
            ],
            details,
        );
        let mut h = harvester(source);
        let out = h
            .run(&terms(&["a", "b", "c", "d"]), &HarvestOptions::default())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(h.source.log.iter().filter(|e| *e == "reset").count(), 1);
    }

    #[tokio::test]
    async fn all_failed_searches_surface_as_error() {
        let err = HarvestError::UnexpectedStatus {
            status: 503,
            url: "x".to_owned(),
        };
        let err2 = HarvestError::UnexpectedStatus {
            status: 503,
            url: "y".to_owned(),
        };
        let source = MockSource::new(vec![Err(err), Err(err2)], HashMap::new());
        let mut h = harvester(source);
        let result = h.run(&terms(&["a", "b"]), &HarvestOptions::default()).await;
        assert!(matches!(result, Err(HarvestError::AllSearchesFailed)));
    }

    #[tokio::test]
    async fn empty_results_are_no_data_not_an_error() {
        let source = MockSource::new(vec![Ok(vec![]), Ok(vec![])], HashMap::new());
        let mut h = harvester(source);
        let out = h.run(&terms(&["a", "b"]), &HarvestOptions::default()).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn failed_detail_drops_only_that_station() {
        let details = HashMap::from([("A".to_owned(), detail(43.9, -78.9))]);
        let source = MockSource::new(
            vec![Ok(vec![listing("A", Some(1.50)), listing("B", Some(1.40))])],
            details,
        );
        let mut h = harvester(source);
        let out = h.run(&terms(&["a"]), &HarvestOptions::default()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "A");
    }

    #[tokio::test]
    async fn origin_annotates_sorts_and_bounds_distance() {
        let details = HashMap::from([
            ("NEAR".to_owned(), detail(43.91, -78.88)),
            ("MID".to_owned(), detail(43.95, -78.80)),
            ("FAR".to_owned(), detail(44.50, -79.50)),
        ]);
        let source = MockSource::new(
            vec![Ok(vec![
                listing("FAR", Some(1.30)),
                listing("NEAR", Some(1.50)),
                listing("MID", Some(1.40)),
            ])],
            details,
        );
        let mut h = harvester(source);
        let options = HarvestOptions {
            origin: Some((43.90, -78.87)),
            max_per_area: 10,
            max_distance_km: Some(30.0),
        };
        let out = h.run(&terms(&["a"]), &options).await.unwrap();

        let ids: Vec<&str> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["NEAR", "MID"]);
        assert!(out[0].straight_line_distance_km.unwrap() < out[1].straight_line_distance_km.unwrap());
    }

    #[tokio::test]
    async fn max_per_area_caps_listings_taken() {
        let details = HashMap::from([
            ("1".to_owned(), detail(43.9, -78.9)),
            ("2".to_owned(), detail(43.8, -78.8)),
        ]);
        let source = MockSource::new(
            vec![Ok(vec![
                listing("1", Some(1.50)),
                listing("2", Some(1.49)),
                listing("3", Some(1.48)),
            ])],
            details,
        );
        let mut h = harvester(source);
        let options = HarvestOptions {
            max_per_area: 2,
            ..HarvestOptions::default()
        };
        let out = h.run(&terms(&["a"]), &options).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(h.source.log.iter().all(|e| e != "detail:3"));
    }
}
