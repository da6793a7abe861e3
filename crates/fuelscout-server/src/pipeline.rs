//! Pipeline orchestrator: one query entrypoint over geo → harvest →
//! enrich → cache → rank.

use std::sync::Arc;
use std::time::Duration;

use fuelscout_core::{rank, sort_ranked, AppConfig, RankedStation, SortKey, Station, UserPreferences};
use fuelscout_geo::{haversine_km, DistanceClient, GeoClient, GeoError};
use fuelscout_harvester::{Harvester, HarvestError, HarvestOptions, HttpStationSource};
use fuelscout_harvester::pacing::Pacing;
use sqlx::PgPool;
use thiserror::Error;

use crate::cache::RequestCache;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream services unavailable: {0}")]
    Upstream(String),

    #[error("harvesting failed: {0}")]
    Harvest(#[from] HarvestError),

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("database error: {0}")]
    Db(#[from] fuelscout_db::DbError),
}

/// Shared pipeline facade. Each harvesting run gets its own source session;
/// the registry pool and request cache are the only state shared between
/// concurrent runs.
pub struct Pipeline {
    config: Arc<AppConfig>,
    registry: Option<PgPool>,
    geo: GeoClient,
    distance: DistanceClient,
    cache: RequestCache,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns [`PipelineError::Geo`] if an HTTP client cannot be built.
    pub fn new(config: Arc<AppConfig>, registry: Option<PgPool>) -> Result<Self, PipelineError> {
        let geo = GeoClient::new(
            config.geocode_base_url.clone(),
            config.geocode_api_key.clone(),
            config.search_timeout_secs,
        )?;
        let distance = DistanceClient::new(
            config.distance_base_url.clone(),
            config.distance_api_key.clone(),
            config.search_timeout_secs,
        )?;
        let cache = RequestCache::new(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self {
            config,
            registry,
            geo,
            distance,
            cache,
        })
    }

    /// Full end-to-end query: cached fetch around the origin, then rank with
    /// the caller's preferences. Ranking is recomputed on every call, even
    /// on a cache hit.
    ///
    /// # Errors
    ///
    /// Propagates validation, harvesting, and deadline failures; partial
    /// results from an expired deadline are discarded, never returned.
    pub async fn query(
        &self,
        lat: f64,
        lng: f64,
        prefs: &UserPreferences,
        sort: SortKey,
    ) -> Result<Vec<RankedStation>, PipelineError> {
        let stations = self
            .fetch_stations(lat, lng, prefs.search_radius_km, None, None)
            .await?;
        let mut ranked = rank(&stations, prefs);
        sort_ranked(&mut ranked, sort);
        Ok(ranked)
    }

    /// Cached smart fetch: resolve area names around the origin, harvest,
    /// enrich with driving distances, and cache the raw list.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::query`].
    pub async fn fetch_stations(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        max_per_area: Option<usize>,
        max_distance_km: Option<f64>,
    ) -> Result<Vec<Station>, PipelineError> {
        validate_coords(lat, lng)?;

        let key = RequestCache::key(lat, lng);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(key, count = cached.len(), "request cache hit");
            return Ok(cached);
        }

        let deadline = Duration::from_secs(self.config.query_deadline_secs);
        let stations = tokio::time::timeout(deadline, async {
            let terms = self.resolve_area_terms(lat, lng, radius_km).await?;
            self.harvest_terms(&terms, Some((lat, lng)), max_per_area, max_distance_km, true)
                .await
        })
        .await
        .map_err(|_| PipelineError::DeadlineExceeded)??;

        self.cache.put(key, stations.clone()).await;
        Ok(stations)
    }

    /// Harvest an explicit list of area terms; no caching (the cache is
    /// keyed by origin, and explicit-term calls are operator-driven).
    ///
    /// # Errors
    ///
    /// See [`Pipeline::query`].
    pub async fn harvest_terms(
        &self,
        terms: &[String],
        origin: Option<(f64, f64)>,
        max_per_area: Option<usize>,
        max_distance_km: Option<f64>,
        driving: bool,
    ) -> Result<Vec<Station>, PipelineError> {
        if terms.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one search term is required".to_owned(),
            ));
        }

        let source = HttpStationSource::new(
            self.config.source_base_url.clone(),
            self.config.search_timeout_secs,
            self.config.detail_timeout_secs,
        )?;
        let mut harvester = Harvester::new(
            source,
            self.registry.clone(),
            Pacing::new(self.config.harvest_delay_ms, self.config.harvest_jitter_ms),
            self.config.empty_streak_threshold,
            Duration::from_secs(self.config.block_cooldown_secs),
        );

        let options = HarvestOptions {
            origin,
            max_per_area: max_per_area.unwrap_or(self.config.max_per_area),
            max_distance_km,
        };
        let mut stations = harvester.run(terms, &options).await?;

        if driving {
            if let Some((olat, olng)) = origin {
                self.distance.enrich(olat, olng, &mut stations).await;
            }
        }
        Ok(stations)
    }

    /// Serve stations straight from the registry, nearest first, with the
    /// closest batch distance-enriched. No harvesting involved.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] when the registry is unreachable.
    pub async fn nearby_from_registry(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<Station>, PipelineError> {
        validate_coords(lat, lng)?;
        let Some(pool) = &self.registry else {
            return Err(PipelineError::Upstream(
                "station registry is not configured".to_owned(),
            ));
        };

        let rows = fuelscout_db::list_stations(pool).await?;
        let mut stations: Vec<Station> = rows
            .into_iter()
            .filter_map(|row| {
                let distance = haversine_km(lat, lng, row.lat, row.lng);
                if distance > radius_km {
                    return None;
                }
                let mut s = Station::new(row.id, row.name);
                s.address = row.address;
                s.lat = Some(row.lat);
                s.lng = Some(row.lng);
                s.straight_line_distance_km = Some(distance);
                Some(s)
            })
            .collect();
        stations.sort_by(|a, b| {
            let da = a.straight_line_distance_km.unwrap_or(f64::MAX);
            let db = b.straight_line_distance_km.unwrap_or(f64::MAX);
            da.total_cmp(&db)
        });

        stations.truncate(50);
        self.distance.enrich(lat, lng, &mut stations).await;
        Ok(stations)
    }

    /// Whether the registry backing this pipeline can serve queries. A
    /// pipeline without a registry reports healthy (nothing to degrade).
    pub async fn registry_healthy(&self) -> bool {
        match &self.registry {
            Some(pool) => fuelscout_db::ping(pool).await.is_ok(),
            None => true,
        }
    }

    async fn resolve_area_terms(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<String>, PipelineError> {
        let mut terms: Vec<String> = Vec::new();
        if let Some(name) = self.geo.reverse_geocode(lat, lng).await {
            terms.push(name);
        }
        for name in self.geo.nearby_place_names(lat, lng, radius_km).await {
            if !terms.contains(&name) {
                terms.push(name);
            }
        }
        if terms.is_empty() {
            // Harvesting zero terms would masquerade as "no data"; surface
            // the geo outage instead.
            return Err(PipelineError::Upstream(
                "could not resolve any search areas for the origin".to_owned(),
            ));
        }
        tracing::info!(count = terms.len(), "resolved area terms");
        Ok(terms)
    }
}

fn validate_coords(lat: f64, lng: f64) -> Result<(), PipelineError> {
    if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(PipelineError::InvalidInput(
            "lat and lng must be valid coordinates".to_owned(),
        ));
    }
    Ok(())
}
