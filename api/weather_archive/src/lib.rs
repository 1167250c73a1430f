#[macro_use] extern crate log;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Address of the archive server the station front end talks to by default
pub const DEFAULT_BASE_URL: &str = "http://158.193.177.12:5000";

/// Date format used by the archive when it reports available dates
const SERVER_DATE_FORMAT: &str = "%d.%m.%Y";
/// Date format expected by the archive in download paths
const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";

/// Weather archive API client
#[derive(Debug, Clone)]
pub struct WeatherArchiveAPI {
    client: Client,
    base_url: String,
}

/// Areas and cities the archive holds records for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableLocations {
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub cities: Vec<String>,
}

/// Which record kinds exist for one location
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistRecords {
    #[serde(default)]
    pub exist_weather_images: bool,
    #[serde(default)]
    pub exist_weather_data: bool,
    #[serde(default)]
    pub exist_weather_images_with_data: bool,
}

/// Image layers recorded for one location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableLayers {
    /// Every layer with stored images
    #[serde(default)]
    pub layers: Vec<String>,
    /// Layers whose images are joined with measurement records
    #[serde(default)]
    pub layers_with_data: Vec<String>,
}

/// Dates (DD.MM.YYYY, ascending) for a location/layer pair.
///
/// The three lists follow the archive's join on the weather data id:
/// `_id_null` holds images without measurements, `range_data_weather_data`
/// holds measurements and `_id_not_null` holds images joined with measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableDates {
    #[serde(default)]
    pub range_data_weather_data_id_null: Vec<String>,
    #[serde(default)]
    pub range_data_weather_data: Vec<String>,
    #[serde(default)]
    pub range_data_weather_data_id_not_null: Vec<String>,
}

/// Parse a date as reported by the archive (`DD.MM.YYYY`)
pub fn parse_server_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), SERVER_DATE_FORMAT)
        .map_err(|e| anyhow!("invalid archive date '{}': {}", date, e))
}

/// Format a date the way download endpoints expect it (`YYYY-MM-DD`)
pub fn format_request_date(date: NaiveDate) -> String {
    date.format(REQUEST_DATE_FORMAT).to_string()
}

/// Convert an archive date to its sortable year-first form
pub fn to_sortable(date: &str) -> Result<String> {
    parse_server_date(date).map(format_request_date)
}

impl WeatherArchiveAPI {
    /// Create a client for the archive at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(anyhow!("archive base URL must not be empty"));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        })
    }

    /// Create a client for the default archive address
    pub fn with_default_address() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the areas and cities the archive knows about
    pub async fn fetch_available_locations(&self) -> Result<AvailableLocations> {
        let url = self.build_url(&["available_locations"]);
        self.get_json(&url).await
    }

    /// Check which record kinds exist for a location
    pub async fn fetch_exist_records(&self, location: &str) -> Result<ExistRecords> {
        let url = self.build_url(&["exist_records", location]);
        self.get_json(&url).await
    }

    /// List image layers for a location
    pub async fn fetch_available_layers(&self, location: &str) -> Result<AvailableLayers> {
        let url = self.build_url(&["available_layers", location]);
        self.get_json(&url).await
    }

    /// List available dates for a location and layer.
    /// The archive rejects an empty layer segment, so callers must always pass a token.
    pub async fn fetch_available_dates(&self, location: &str, layer: &str) -> Result<AvailableDates> {
        if layer.trim().is_empty() {
            return Err(anyhow!("available_dates requires a non-empty layer token"));
        }
        let url = self.build_url(&["available_dates", location, layer]);
        self.get_json(&url).await
    }

    /// Download a zip archive of images for one layer
    pub async fn fetch_weather_images(
        &self,
        location: &str,
        layer: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<u8>> {
        let start = format_request_date(start);
        let end = format_request_date(end);
        let url = self.build_url(&["weather_images", location, layer, &start, &end]);
        self.get_bytes(&url).await
    }

    /// Download a zip archive of measurement records.
    /// `fields` is the already joined field token.
    pub async fn fetch_weather_data(
        &self,
        location: &str,
        fields: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<u8>> {
        let start = format_request_date(start);
        let end = format_request_date(end);
        let url = self.build_url(&["weather_data", location, fields, &start, &end]);
        self.get_bytes(&url).await
    }

    /// Download a zip archive of images joined with measurement records
    pub async fn fetch_weather_images_and_data(
        &self,
        location: &str,
        layer: &str,
        fields: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<u8>> {
        let start = format_request_date(start);
        let end = format_request_date(end);
        let url = self.build_url(&["weather_images_and_data", location, layer, fields, &start, &end]);
        self.get_bytes(&url).await
    }

    /// Build an `/api/...` URL from path segments
    fn build_url(&self, segments: &[&str]) -> String {
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s.trim()).into_owned())
            .collect();

        format!("{}/api/{}", self.base_url, path.join("/"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Archive request failed: HTTP {} - URL: {}", response.status(), url));
        }

        Ok(response.json::<T>().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading from: {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Archive download failed: HTTP {} - URL: {}", response.status(), url));
        }

        let bytes = response.bytes().await?;
        info!("Successfully fetched {} bytes from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }
}
