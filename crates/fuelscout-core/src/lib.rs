use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod prefs;
pub mod ranking;
pub mod station;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use prefs::UserPreferences;
pub use ranking::{rank, sort_ranked, RankedStation, SortKey};
pub use station::Station;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
