use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration, assembled from environment variables.
///
/// Every pipeline tunable lives here rather than as a hard-coded constant:
/// the block-detection heuristic in particular (`empty_streak_threshold`,
/// `block_cooldown_secs`) is empirically tuned and deployments are expected
/// to adjust it for sparse regions.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    /// Origin of the price source site, e.g. `https://www.gasbuddy.com`.
    pub source_base_url: String,
    /// Geocoding/places API origin.
    pub geocode_base_url: String,
    pub geocode_api_key: Option<String>,
    /// Distance-matrix API origin.
    pub distance_base_url: String,
    pub distance_api_key: Option<String>,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// Fixed component of the pause between source page loads.
    pub harvest_delay_ms: u64,
    /// Upper bound of the random jitter added to each pause.
    pub harvest_jitter_ms: u64,
    /// Consecutive empty area searches before the source is assumed blocked.
    pub empty_streak_threshold: u32,
    /// Cool-down before resuming after suspected blocking.
    pub block_cooldown_secs: u64,
    /// Listings taken per area search.
    pub max_per_area: usize,
    /// Timeout for area-search page loads.
    pub search_timeout_secs: u64,
    /// Timeout for station detail page loads.
    pub detail_timeout_secs: u64,

    /// Overall deadline for one `query` pipeline run.
    pub query_deadline_secs: u64,
    /// Freshness window for cached harvest results.
    pub cache_ttl_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("source_base_url", &self.source_base_url)
            .field("geocode_base_url", &self.geocode_base_url)
            .field(
                "geocode_api_key",
                &self.geocode_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("distance_base_url", &self.distance_base_url)
            .field(
                "distance_api_key",
                &self.distance_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("harvest_delay_ms", &self.harvest_delay_ms)
            .field("harvest_jitter_ms", &self.harvest_jitter_ms)
            .field("empty_streak_threshold", &self.empty_streak_threshold)
            .field("block_cooldown_secs", &self.block_cooldown_secs)
            .field("max_per_area", &self.max_per_area)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("detail_timeout_secs", &self.detail_timeout_secs)
            .field("query_deadline_secs", &self.query_deadline_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}
