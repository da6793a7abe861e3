//! Area-name resolution against a geocoding/places service.
//!
//! Both lookups degrade to "nothing resolved" on any failure — the pipeline
//! proceeds with fewer area terms rather than aborting, so network and parse
//! errors are logged and swallowed here instead of surfacing to callers.

use std::time::Duration;

use serde::Deserialize;

use crate::error::GeoError;

/// Preference order for picking a place name out of the address-component
/// hierarchy of a reverse-geocode result.
const LOCALITY_TYPES: [&str; 3] = ["locality", "sublocality", "administrative_area_level_3"];

/// Thin client for reverse geocoding and nearby-locality search.
pub struct GeoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
}

impl GeoClient {
    /// Creates a client with the given API origin (no trailing slash) and
    /// optional API key.
    ///
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

    /// Resolves a point to the most specific locality name, or `None`.
    ///
    /// Never errors: failures are logged and treated as "no name resolved".
    pub async fn reverse_geocode(&self, lat: f64, lng: f64) -> Option<String> {
        match self.reverse_geocode_inner(lat, lng).await {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(lat, lng, error = %err, "reverse geocode failed");
                None
            }
        }
    }

    async fn reverse_geocode_inner(&self, lat: f64, lng: f64) -> Result<Option<String>, GeoError> {
        let mut url = format!("{}/geocode/json?latlng={lat},{lng}", self.base_url);
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        let parsed: GeocodeResponse = self.get_json(&url, "reverse geocode").await?;

        // Walk results in order; the most specific component type wins.
        for wanted in LOCALITY_TYPES {
            for result in &parsed.results {
                for component in &result.address_components {
                    if component.types.iter().any(|t| t == wanted) {
                        return Ok(Some(component.long_name.clone()));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Lists unique place names within `radius_km` of a point.
    ///
    /// Never errors: failures are logged and produce an empty list.
    pub async fn nearby_place_names(&self, lat: f64, lng: f64, radius_km: f64) -> Vec<String> {
        match self.nearby_place_names_inner(lat, lng, radius_km).await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(lat, lng, radius_km, error = %err, "nearby place search failed");
                Vec::new()
            }
        }
    }

    async fn nearby_place_names_inner(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<String>, GeoError> {
        #[allow(clippy::cast_possible_truncation)]
        let radius_m = (radius_km * 1000.0).round() as i64;
        let mut url = format!(
            "{}/place/nearbysearch/json?location={lat},{lng}&radius={radius_m}&type=locality",
            self.base_url
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        let parsed: PlacesResponse = self.get_json(&url, "nearby place search").await?;

        let mut names: Vec<String> = Vec::new();
        for place in parsed.results {
            if !names.contains(&place.name) {
                names.push(place.name);
            }
        }
        Ok(names)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T, GeoError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| GeoError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}
