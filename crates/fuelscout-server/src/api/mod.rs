mod stations;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use fuelscout_core::Station;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::request_id;
use crate::pipeline::{Pipeline, PipelineError};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Success envelope for the station endpoints.
#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub success: bool,
    pub count: usize,
    pub stations: Vec<Station>,
}

impl StationsResponse {
    fn new(stations: Vec<Station>) -> Self {
        Self {
            success: true,
            count: stations.len(),
            stations,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Map pipeline failures onto the external contract: internals are logged,
/// callers see "try again later" wording for upstream trouble.
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            PipelineError::DeadlineExceeded => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "the search took too long; try again later",
            ),
            PipelineError::Upstream(_) | PipelineError::Harvest(_) | PipelineError::Geo(_) => {
                tracing::error!(error = %err, "pipeline upstream failure");
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "station data is temporarily unavailable; try again later",
                )
            }
            PipelineError::Db(_) => {
                tracing::error!(error = %err, "registry failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

/// Ranked success envelope, used by the server-side ranking endpoint.
#[derive(Debug, Serialize)]
pub struct RankedResponse {
    pub success: bool,
    pub count: usize,
    pub stations: Vec<fuelscout_core::RankedStation>,
}

impl RankedResponse {
    fn new(stations: Vec<fuelscout_core::RankedStation>) -> Self {
        Self {
            success: true,
            count: stations.len(),
            stations,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    database: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthData> {
    let database = state.pipeline.registry_healthy().await;
    Json(HealthData {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stations/smart", get(stations::smart))
        .route("/stations/ranked", get(stations::ranked))
        .route("/stations/by-area/{term}", get(stations::by_area))
        .route("/stations/multi", post(stations::multi))
        .route("/stations/nearby", get(stations::nearby))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Router over a pipeline whose every external surface points at the
    /// given mock server; no registry.
    fn test_app(server: &MockServer, deadline_secs: u64) -> Router {
        let config = Arc::new(fuelscout_core::AppConfig {
            database_url: String::new(),
            env: fuelscout_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_owned(),
            source_base_url: server.uri(),
            geocode_base_url: server.uri(),
            geocode_api_key: None,
            distance_base_url: server.uri(),
            distance_api_key: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout_secs: 1,
            harvest_delay_ms: 0,
            harvest_jitter_ms: 0,
            empty_streak_threshold: 3,
            block_cooldown_secs: 0,
            max_per_area: 10,
            search_timeout_secs: 5,
            detail_timeout_secs: 5,
            query_deadline_secs: deadline_secs,
            cache_ttl_secs: 1800,
        });
        let pipeline = Arc::new(Pipeline::new(config, None).expect("pipeline"));
        build_app(AppState { pipeline })
    }

    async fn get_json(
        app: Router,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok_without_a_registry() {
        let server = MockServer::start().await;
        let (status, json) = get_json(test_app(&server, 10), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], true);
    }

    #[tokio::test]
    async fn missing_origin_is_a_bad_request() {
        let server = MockServer::start().await;
        let (status, json) = get_json(test_app(&server, 10), "/stations/smart").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "lat and lng are required");
    }

    #[tokio::test]
    async fn invalid_coordinates_map_to_bad_request() {
        let server = MockServer::start().await;
        // No mocks mounted: rejection must happen before any external call.
        let (status, json) =
            get_json(test_app(&server, 10), "/stations/smart?lat=123.0&lng=-78.87").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn geo_outage_maps_to_bad_gateway_with_retry_wording() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/(geocode|place)/.*"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (status, json) =
            get_json(test_app(&server, 10), "/stations/smart?lat=43.90&lng=-78.87").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["success"], false);
        let error = json["error"].as_str().expect("error string");
        assert!(error.contains("try again later"), "got: {error}");
    }

    #[tokio::test]
    async fn expired_deadline_maps_to_gateway_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "results": [] }))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let (status, json) =
            get_json(test_app(&server, 0), "/stations/smart?lat=43.90&lng=-78.87").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json["success"], false);
        let error = json["error"].as_str().expect("error string");
        assert!(error.contains("took too long"), "got: {error}");
    }

    #[tokio::test]
    async fn by_area_returns_the_success_envelope() {
        let server = MockServer::start().await;
        let listing_page = r#"
            <a href="/station/111">Shell Oshawa</a>
            <span class="StationDisplayPrice">149.9</span>
        "#;
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/station/111"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"latitude": 43.91, "longitude": -78.86}"#,
            ))
            .mount(&server)
            .await;

        let (status, json) = get_json(test_app(&server, 10), "/stations/by-area/Oshawa").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 1);
        let station = &json["stations"][0];
        assert_eq!(station["id"], "111");
        assert_eq!(station["name"], "Shell Oshawa");
        assert!((station["price_per_unit"].as_f64().unwrap() - 1.499).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_harvest_is_a_success_with_no_stations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no results</html>"))
            .mount(&server)
            .await;

        let (status, json) = get_json(test_app(&server, 10), "/stations/by-area/Nowhere").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 0);
    }
}
