//! Client for the legacy EFA deployment behind the VVM mobile app.
//!
//! Three endpoints are used, all with `outputFormat=json`:
//! - `XML_DM_REQUEST` for the departure monitor of a single stop
//! - `XML_STOPFINDER_REQUEST` for free-text stop search
//! - `XML_COORD_REQUEST` for stops around a WGS84 coordinate

pub mod response;

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use response::{CoordSearchResponse, DepartureMonitorResponse, StopFinderResponse};

pub const VVM_BASE_URL: &str = "https://mobile.defas-fgi.de/vvmapp";

const DM_ENDPOINT: &str = "XML_DM_REQUEST";
const STOPFINDER_ENDPOINT: &str = "XML_STOPFINDER_REQUEST";
const COORD_ENDPOINT: &str = "XML_COORD_REQUEST";

/// Coordinate format understood by the deployment, decimal-degree WGS84.
const COORD_FORMAT: &str = "WGS84[DD.ddddd]";

/// Default search radius for coordinate lookups, in meters.
pub const DEFAULT_COORD_RADIUS_M: u32 = 500;

/// Placeholder when a stop pin carries no usable name.
pub const UNKNOWN_STOP_NAME: &str = "Unknown Stop Name";

#[derive(Debug, Error)]
pub enum EfaError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// A stop resolved by search, identified by its stateless id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopMatch {
    /// Stateless stop id, usable as a departure monitor target.
    pub id: String,
    pub name: String,
}

/// HTTP client for the VVM EFA deployment.
#[derive(Clone)]
pub struct EfaClient {
    client: Client,
    base_url: String,
}

impl EfaClient {
    pub fn new() -> Result<Self, EfaError> {
        Self::with_base_url(VVM_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, EfaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EfaError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn departure_monitor_url(&self, stop_id: &str) -> String {
        format!(
            "{}?useRealtime=1&mode=direct&name_dm={}&type_dm=stop&useAllStops=1&mergeDep=1&maxTimeLoop=2&outputFormat=json",
            self.endpoint_url(DM_ENDPOINT),
            urlencoding::encode(stop_id)
        )
    }

    fn stop_finder_url(&self, keyword: &str) -> String {
        format!(
            "{}?name_sf={}&regionID_sf=1&type_sf=any&outputFormat=json",
            self.endpoint_url(STOPFINDER_ENDPOINT),
            urlencoding::encode(keyword)
        )
    }

    fn coord_search_url(&self, latitude: f64, longitude: f64, radius_m: u32) -> String {
        // EFA wants lon before lat here.
        let coord = format!("{}:{}:{}", longitude, latitude, COORD_FORMAT);
        format!(
            "{}?coord={}&max=10&inclFilter=1&radius_1={}&type_1=STOP&stateless=1&language=en&coordOutputFormat={}&coordOutputFormatTail=7&outputFormat=json",
            self.endpoint_url(COORD_ENDPOINT),
            urlencoding::encode(&coord),
            radius_m,
            urlencoding::encode(COORD_FORMAT)
        )
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, EfaError> {
        let start = Instant::now();
        debug!(url = %url, "Requesting EFA endpoint");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EfaError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(EfaError::ApiError(format!("HTTP error: {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EfaError::NetworkError(format!("Failed to read body: {}", e)))?;

        if body.trim().is_empty() {
            return Err(EfaError::ParseError("empty response body".to_string()));
        }

        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "EFA response received"
        );

        serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(300).collect();
            warn!(url = %url, error = %e, body = %snippet, "Failed to parse EFA response");
            EfaError::ParseError(e.to_string())
        })
    }

    /// Fetch the departure monitor for a stop by its stateless id.
    pub async fn departure_monitor(
        &self,
        stop_id: &str,
    ) -> Result<DepartureMonitorResponse, EfaError> {
        self.fetch_json(&self.departure_monitor_url(stop_id)).await
    }

    /// Search stops by free-text keyword.
    ///
    /// Failures are logged and yield an empty list so callers can treat
    /// "no results" and "search unavailable" the same way.
    pub async fn search_stops(&self, keyword: &str) -> Vec<StopMatch> {
        match self.search_stops_inner(keyword).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Stop search failed");
                Vec::new()
            }
        }
    }

    async fn search_stops_inner(&self, keyword: &str) -> Result<Vec<StopMatch>, EfaError> {
        let response: StopFinderResponse = self.fetch_json(&self.stop_finder_url(keyword)).await?;
        Ok(stop_matches(&response))
    }

    /// Search stops around a WGS84 coordinate.
    ///
    /// Soft-fails to an empty list like [`EfaClient::search_stops`].
    pub async fn stops_near(&self, latitude: f64, longitude: f64, radius_m: u32) -> Vec<StopMatch> {
        match self.stops_near_inner(latitude, longitude, radius_m).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(latitude, longitude, error = %e, "Coordinate search failed");
                Vec::new()
            }
        }
    }

    async fn stops_near_inner(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<Vec<StopMatch>, EfaError> {
        let response: CoordSearchResponse = self
            .fetch_json(&self.coord_search_url(latitude, longitude, radius_m))
            .await?;
        Ok(coord_matches(&response))
    }
}

/// Extract usable stop matches from a stop finder response, keeping
/// provider order. Points without a stateless id or name are skipped.
fn stop_matches(response: &StopFinderResponse) -> Vec<StopMatch> {
    response
        .points()
        .iter()
        .filter(|p| p.is_stop())
        .filter_map(|p| {
            Some(StopMatch {
                id: p.stateless.clone()?,
                name: p.name.clone()?,
            })
        })
        .collect()
}

/// Extract stop matches from a coordinate search response. Pins without
/// an id are skipped; unnamed pins get a placeholder name.
fn coord_matches(response: &CoordSearchResponse) -> Vec<StopMatch> {
    response
        .pins
        .iter()
        .filter(|p| p.is_stop())
        .filter_map(|p| {
            Some(StopMatch {
                id: p.id.clone()?,
                name: p.display_name().unwrap_or(UNKNOWN_STOP_NAME).to_string(),
            })
        })
        .collect()
}
