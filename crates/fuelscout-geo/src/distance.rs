//! Driving-distance enrichment via a distance-matrix API.

use std::time::Duration;

use fuelscout_core::Station;
use serde::Deserialize;

use crate::error::GeoError;

/// Destinations per distance-matrix request (external API limit).
const BATCH_SIZE: usize = 25;

/// Client for batched origin→destinations distance lookups.
pub struct DistanceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixValue>,
    #[serde(default)]
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    /// Meters for distance, seconds for duration.
    value: f64,
}

impl DistanceClient {
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    /// Attaches `driving_distance_km`/`driving_duration_min` to every station
    /// with known coordinates, in batches of [`BATCH_SIZE`] destinations per
    /// request with the origin fixed.
    ///
    /// Per-destination elements with a non-OK status keep no driving figures
    /// (ranking falls back to straight-line distance), and a failed batch
    /// request is logged and skipped — enrichment never fails as a whole.
    pub async fn enrich(&self, origin_lat: f64, origin_lng: f64, stations: &mut [Station]) {
        let eligible: Vec<usize> = (0..stations.len())
            .filter(|&i| stations[i].has_coordinates())
            .collect();

        for batch in eligible.chunks(BATCH_SIZE) {
            match self.fetch_batch(origin_lat, origin_lng, batch, stations).await {
                Ok(elements) => {
                    for (&idx, element) in batch.iter().zip(elements.iter()) {
                        if element.status != "OK" {
                            continue;
                        }
                        if let Some(d) = &element.distance {
                            stations[idx].driving_distance_km = Some((d.value / 10.0).round() / 100.0);
                        }
                        if let Some(d) = &element.duration {
                            #[allow(clippy::cast_possible_truncation)]
                            let minutes = (d.value / 60.0).round() as i64;
                            stations[idx].driving_duration_min = Some(minutes);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        batch_len = batch.len(),
                        error = %err,
                        "distance matrix batch failed; keeping straight-line distances"
                    );
                }
            }
        }
    }

    async fn fetch_batch(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        batch: &[usize],
        stations: &[Station],
    ) -> Result<Vec<MatrixElement>, GeoError> {
        let destinations = batch
            .iter()
            .map(|&i| {
                let s = &stations[i];
                format!(
                    "{},{}",
                    s.lat.unwrap_or_default(),
                    s.lng.unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("|");

        let mut url = format!(
            "{}/distancematrix/json?origins={origin_lat},{origin_lng}&destinations={destinations}&units=metric",
            self.base_url
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        let parsed: MatrixResponse =
            serde_json::from_str(&body).map_err(|e| GeoError::Deserialize {
                context: "distance matrix response".to_owned(),
                source: e,
            })?;

        if parsed.status != "OK" {
            return Err(GeoError::UpstreamStatus {
                status: parsed.status,
                context: "distance matrix".to_owned(),
            });
        }

        Ok(parsed.rows.into_iter().next().map(|r| r.elements).unwrap_or_default())
    }
}
