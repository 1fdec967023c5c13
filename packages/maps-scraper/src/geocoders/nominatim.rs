//! Reverse geocoding with Nominatim (OpenStreetMap).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::error::{GeocodeError, GeocodeResult};
use crate::traits::geocoder::{AdminDivisions, ReverseGeocoder};

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Sent as `User-Agent`; the public instance rejects anonymous clients.
pub const DEFAULT_USER_AGENT: &str = "gmaps-scraper/1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Street-level detail; coarser zooms drop hamlet and house number.
const REVERSE_ZOOM: &str = "18";

// Address keys differ by country; each level takes the first key present.
const COUNTRY_KEYS: &[&str] = &["country"];
const PROVINCE_KEYS: &[&str] = &["state", "province", "region"];
const REGENCY_KEYS: &[&str] = &["city", "regency", "county", "municipality", "town"];
const DISTRICT_KEYS: &[&str] = &["city_district", "district", "subdistrict", "municipality"];
const SUBDISTRICT_KEYS: &[&str] = &["village", "suburb", "quarter", "neighbourhood"];
const HAMLET_KEYS: &[&str] = &["hamlet", "quarter", "neighbourhood"];
const POSTCODE_KEYS: &[&str] = &["postcode"];
const ROAD_KEYS: &[&str] = &["road"];
const HOUSE_NUMBER_KEYS: &[&str] = &["house_number"];

/// Nominatim `/reverse` response (`format=jsonv2`).
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Map<String, Value>,
    #[serde(default, alias = "class")]
    category: Option<String>,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Nominatim-backed [`ReverseGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http_client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Point at a self-hosted instance (or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn reverse_url(&self, latitude: f64, longitude: f64) -> GeocodeResult<Url> {
        let mut url = Url::parse(&format!("{}/reverse", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string())
            .append_pair("zoom", REVERSE_ZOOM)
            .append_pair("addressdetails", "1");
        Ok(url)
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, latitude: f64, longitude: f64) -> GeocodeResult<AdminDivisions> {
        let url = self.reverse_url(latitude, longitude)?;
        debug!(url = %url, "Reverse geocoding");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Reverse geocoding request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Reverse geocoding returned non-success status");
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: ReverseResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse reverse geocoding response");
            e
        })?;

        if let Some(message) = body.error {
            return Err(GeocodeError::Service(message));
        }

        Ok(divisions_from(&body))
    }
}

fn divisions_from(body: &ReverseResponse) -> AdminDivisions {
    let address = &body.address;
    let osm_category = match (&body.category, &body.place_type) {
        (Some(category), Some(place_type)) => Some(format!("{}/{}", category, place_type)),
        (Some(category), None) => Some(category.clone()),
        _ => None,
    };

    AdminDivisions {
        country: first_key(address, COUNTRY_KEYS),
        province: first_key(address, PROVINCE_KEYS),
        regency: first_key(address, REGENCY_KEYS),
        district: first_key(address, DISTRICT_KEYS),
        subdistrict: first_key(address, SUBDISTRICT_KEYS),
        hamlet: first_key(address, HAMLET_KEYS),
        postal_code: first_key(address, POSTCODE_KEYS),
        road: first_key(address, ROAD_KEYS),
        house_number: first_key(address, HOUSE_NUMBER_KEYS),
        osm_category,
    }
}

fn first_key(address: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        address
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}
