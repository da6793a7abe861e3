//! Station harvesting endpoints.
//!
//! All three harvesting routes return the raw (unranked) station list —
//! ranking depends on user preferences the UI holds, so the client ranks.

use axum::extract::{Path, Query, State};
use axum::Json;
use fuelscout_core::{SortKey, UserPreferences};
use serde::Deserialize;

use super::{ApiError, AppState, RankedResponse, StationsResponse};

#[derive(Debug, Deserialize)]
pub(super) struct SmartParams {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
    #[serde(rename = "maxPerArea")]
    max_per_area: Option<usize>,
    #[serde(rename = "maxDistance")]
    max_distance: Option<f64>,
}

/// `GET /stations/smart?lat&lng&radius&maxPerArea&maxDistance`
///
/// Resolves area names around the origin, harvests them, enriches with
/// driving distances, and serves from the request cache when fresh.
pub(super) async fn smart(
    State(state): State<AppState>,
    Query(params): Query<SmartParams>,
) -> Result<Json<StationsResponse>, ApiError> {
    let (lat, lng) = require_origin(params.lat, params.lng)?;
    let radius = params.radius.unwrap_or(15.0);

    let stations = state
        .pipeline
        .fetch_stations(lat, lng, radius, params.max_per_area, params.max_distance)
        .await?;
    Ok(Json(StationsResponse::new(stations)))
}

#[derive(Debug, Deserialize)]
pub(super) struct RankedParams {
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(rename = "tankSize")]
    tank_size: Option<f64>,
    #[serde(rename = "fuelEfficiency")]
    fuel_efficiency: Option<f64>,
    #[serde(rename = "maxDetour")]
    max_detour_km: Option<f64>,
    #[serde(rename = "minSavings")]
    min_savings: Option<f64>,
    radius: Option<f64>,
    sort: Option<String>,
}

/// `GET /stations/ranked?lat&lng&tankSize&fuelEfficiency&minSavings&radius&sort`
///
/// Server-side variant of the ranking flow: same fetch as `/stations/smart`,
/// then net-savings ranking with the supplied preferences. For clients that
/// don't carry the ranking math themselves.
pub(super) async fn ranked(
    State(state): State<AppState>,
    Query(params): Query<RankedParams>,
) -> Result<Json<RankedResponse>, ApiError> {
    let (lat, lng) = require_origin(params.lat, params.lng)?;

    let defaults = UserPreferences::default();
    let prefs = UserPreferences {
        tank_size: params.tank_size.unwrap_or(defaults.tank_size),
        fuel_efficiency: params.fuel_efficiency.unwrap_or(defaults.fuel_efficiency),
        max_detour_km: params.max_detour_km.unwrap_or(defaults.max_detour_km),
        min_savings: params.min_savings.unwrap_or(defaults.min_savings),
        search_radius_km: params.radius.unwrap_or(defaults.search_radius_km),
    };
    let sort = params
        .sort
        .as_deref()
        .map_or(SortKey::Price, SortKey::from_query);

    let ranked = state.pipeline.query(lat, lng, &prefs, sort).await?;
    Ok(Json(RankedResponse::new(ranked)))
}

#[derive(Debug, Deserialize)]
pub(super) struct ByAreaParams {
    lat: Option<f64>,
    lng: Option<f64>,
    max: Option<usize>,
    driving: Option<bool>,
}

/// `GET /stations/by-area/{term}?lat&lng&max&driving`
///
/// Harvests a single named area. Origin is optional; without it results are
/// unannotated and unenriched.
pub(super) async fn by_area(
    State(state): State<AppState>,
    Path(term): Path<String>,
    Query(params): Query<ByAreaParams>,
) -> Result<Json<StationsResponse>, ApiError> {
    let origin = optional_origin(params.lat, params.lng)?;
    let stations = state
        .pipeline
        .harvest_terms(
            &[term],
            origin,
            params.max,
            None,
            params.driving.unwrap_or(false),
        )
        .await?;
    Ok(Json(StationsResponse::new(stations)))
}

#[derive(Debug, Deserialize)]
pub(super) struct MultiBody {
    #[serde(rename = "searchTerms")]
    search_terms: Vec<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(rename = "maxPerArea")]
    max_per_area: Option<usize>,
    #[serde(rename = "maxDistance")]
    max_distance: Option<f64>,
    driving: Option<bool>,
}

/// `POST /stations/multi`
///
/// Harvests an explicit list of area terms in one sequential session.
pub(super) async fn multi(
    State(state): State<AppState>,
    Json(body): Json<MultiBody>,
) -> Result<Json<StationsResponse>, ApiError> {
    let origin = optional_origin(body.lat, body.lng)?;
    let stations = state
        .pipeline
        .harvest_terms(
            &body.search_terms,
            origin,
            body.max_per_area,
            body.max_distance,
            body.driving.unwrap_or(false),
        )
        .await?;
    Ok(Json(StationsResponse::new(stations)))
}

#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
}

/// `GET /stations/nearby?lat&lng&radius`
///
/// Serves stations straight from the registry — no harvesting. Fast path
/// for a warm registry; prices are not included since only the harvester
/// sees them.
pub(super) async fn nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<StationsResponse>, ApiError> {
    let (lat, lng) = require_origin(params.lat, params.lng)?;
    let radius = params.radius.unwrap_or(30.0);
    let stations = state.pipeline.nearby_from_registry(lat, lng, radius).await?;
    Ok(Json(StationsResponse::new(stations)))
}

fn require_origin(lat: Option<f64>, lng: Option<f64>) -> Result<(f64, f64), ApiError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok((lat, lng)),
        _ => Err(ApiError::new(
            axum::http::StatusCode::BAD_REQUEST,
            "lat and lng are required",
        )),
    }
}

/// Both-or-neither: a lone coordinate is a caller bug, not a degraded mode.
fn optional_origin(lat: Option<f64>, lng: Option<f64>) -> Result<Option<(f64, f64)>, ApiError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some((lat, lng))),
        (None, None) => Ok(None),
        _ => Err(ApiError::new(
            axum::http::StatusCode::BAD_REQUEST,
            "lat and lng must be supplied together",
        )),
    }
}
