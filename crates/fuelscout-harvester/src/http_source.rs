//! Plain-HTTP implementation of [`StationSource`].
//!
//! One instance holds one reqwest client with a fixed user agent — the
//! session identity the source site sees. `reset_session` rebuilds the
//! client around a freshly drawn user agent, the HTTP analogue of
//! restarting a browser context after suspected blocking.

use std::time::Duration;

use rand::prelude::IndexedRandom;

use crate::error::HarvestError;
use crate::parse::{parse_detail, parse_listings};
use crate::source::{Listing, StationDetail, StationSource};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

pub struct HttpStationSource {
    client: reqwest::Client,
    base_url: String,
    search_timeout: Duration,
    detail_timeout: Duration,
}

impl HttpStationSource {
    /// Creates a source session against the given site origin.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        search_timeout_secs: u64,
        detail_timeout_secs: u64,
    ) -> Result<Self, HarvestError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self {
            client: build_client(USER_AGENTS[0])?,
            base_url,
            search_timeout: Duration::from_secs(search_timeout_secs),
            detail_timeout: Duration::from_secs(detail_timeout_secs),
        })
    }

    fn search_url(&self, term: &str) -> Result<String, HarvestError> {
        let base = format!("{}/home", self.base_url);
        let mut url = reqwest::Url::parse(&base).map_err(|e| HarvestError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("search", term)
            .append_pair("fuel", "1");
        Ok(url.to_string())
    }

    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.text().await?)
    }
}

impl StationSource for HttpStationSource {
    async fn search(&mut self, term: &str) -> Result<Vec<Listing>, HarvestError> {
        let url = self.search_url(term)?;
        let body = self.fetch_page(&url, self.search_timeout).await?;
        Ok(parse_listings(&body))
    }

    async fn fetch_detail(&mut self, station_id: &str) -> Result<StationDetail, HarvestError> {
        let url = format!("{}/station/{station_id}", self.base_url);
        let body = self.fetch_page(&url, self.detail_timeout).await?;
        let detail = parse_detail(&body);
        if !detail.has_coordinates() {
            return Err(HarvestError::MissingCoordinates {
                station_id: station_id.to_owned(),
            });
        }
        Ok(detail)
    }

    async fn reset_session(&mut self) {
        let ua = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        match build_client(ua) {
            Ok(client) => {
                tracing::info!("source session restarted with fresh identity");
                self.client = client;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to rebuild source session; keeping old client");
            }
        }
    }
}

fn build_client(user_agent: &str) -> Result<reqwest::Client, HarvestError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?)
}
