use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::data_source::{SegmentRequest, SourceError, SourceFuture, WeatherDataSource};
use crate::geomath::{project_wind, round_to, vapor_pressure_deficit};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{
    Coordinate, ProviderId, Quality, SegmentResponse, SeriesPoint, UtcDateTime, Wind, Wx,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.weather.gov";
pub const NWS_SOURCE_TOKEN: &str = "opaque-fcst-1";
/// api.weather.gov rejects requests without an identifying User-Agent.
pub const DEFAULT_USER_AGENT: &str = "firewx/1.0 (contact@example.com)";

const KMH_PER_MS: f64 = 3.6;

/// Hourly forecast grid for the segment start, via `/points` then `forecastGridData`.
#[derive(Clone)]
pub struct NwsAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    user_agent: String,
    timeout_ms: u64,
    source_token: String,
}

impl NwsAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_API_BASE_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            source_token: String::from(NWS_SOURCE_TOKEN),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_source_token(mut self, source_token: impl Into<String>) -> Self {
        self.source_token = source_token.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        let request = HttpRequest::get(url)
            .with_header("User-Agent", self.user_agent.clone())
            .with_header("Accept", "application/geo+json")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("nws transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("nws transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "nws upstream returned status {}",
                response.status
            )));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            SourceError::malformed_payload(format!("failed to parse nws response: {e}"))
        })
    }

    async fn grid_properties(&self, at: Coordinate) -> Result<GridProperties, SourceError> {
        let points_url = format!(
            "{}/points/{},{}",
            self.base_url,
            round_to(at.lat(), 4),
            round_to(at.lon(), 4)
        );
        let points: PointsDocument = self.get_json(points_url).await?;
        let grid_url = points.properties.forecast_grid_data.ok_or_else(|| {
            SourceError::malformed_payload("nws points response has no forecastGridData")
        })?;

        debug!(grid_url = %grid_url, "resolved nws forecast grid");
        let grid: GridDocument = self.get_json(grid_url).await?;
        Ok(grid.properties)
    }

    fn build_series(&self, grid: GridProperties, req: &SegmentRequest) -> Vec<SeriesPoint> {
        let (Some(speeds), Some(directions)) = (grid.wind_speed, grid.wind_direction) else {
            return Vec::new();
        };
        let speeds = speeds.by_start();
        let directions = directions.by_start();
        let temperature = grid.temperature.map(GridLayer::by_start).unwrap_or_default();
        let dewpoint = grid.dewpoint.map(GridLayer::by_start).unwrap_or_default();
        let humidity = grid.relative_humidity.map(GridLayer::by_start).unwrap_or_default();
        let precip = grid
            .quantitative_precipitation
            .map(GridLayer::by_start)
            .unwrap_or_default();
        let gusts = grid.wind_gust.map(GridLayer::by_start).unwrap_or_default();

        let earliest = req.time.start.plus_hours(-1);
        let end = req.time.end();
        let path_bearing = req.segment_meta().bearing_deg;
        let at = |layer: &BTreeMap<UtcDateTime, Option<f64>>, time: &UtcDateTime| {
            layer.get(time).copied().flatten()
        };

        speeds
            .iter()
            .filter(|(time, _)| directions.contains_key(*time))
            .filter(|(time, _)| **time >= earliest && **time < end)
            .map(|(time, speed_kmh)| {
                let speed_ms = speed_kmh.unwrap_or(0.0) / KMH_PER_MS;
                let dir_from = at(&directions, time).unwrap_or(0.0);
                let (along, cross) = project_wind(speed_ms, dir_from, path_bearing);

                let temp_c = at(&temperature, time);
                let dewpoint_c = at(&dewpoint, time);
                let wx = Wx {
                    rh_pct: at(&humidity, time).map(|rh| rh.clamp(0.0, 100.0) as u8),
                    temp_c,
                    dewpoint_c,
                    vpd_kpa: temp_c
                        .zip(dewpoint_c)
                        .map(|(temp, dew)| vapor_pressure_deficit(temp, dew)),
                    precip_mm_1h: at(&precip, time),
                    red_flag_warning: None,
                };

                let wind = Wind {
                    speed_ms,
                    dir_from_deg: dir_from,
                    gust_ms: at(&gusts, time).map(|gust| gust / KMH_PER_MS),
                    along_ms: None,
                    cross_ms: None,
                }
                .with_components(along, cross);

                SeriesPoint {
                    time_utc: *time,
                    wind,
                    wx,
                    quality: Quality::new(self.source_token.clone()),
                }
            })
            .collect()
    }
}

impl WeatherDataSource for NwsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Nws
    }

    fn segment_series<'a>(&'a self, req: SegmentRequest) -> SourceFuture<'a, SegmentResponse> {
        Box::pin(async move {
            let grid = self.grid_properties(req.a).await?;
            if grid.wind_speed.is_none() || grid.wind_direction.is_none() {
                return Err(SourceError::malformed_payload(
                    "nws grid has no windSpeed/windDirection series",
                ));
            }

            let series = self.build_series(grid, &req);
            Ok(req.respond(series))
        })
    }
}

#[derive(Debug, Deserialize)]
struct PointsDocument {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    #[serde(rename = "forecastGridData")]
    forecast_grid_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GridDocument {
    properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    wind_speed: Option<GridLayer>,
    wind_direction: Option<GridLayer>,
    wind_gust: Option<GridLayer>,
    temperature: Option<GridLayer>,
    dewpoint: Option<GridLayer>,
    relative_humidity: Option<GridLayer>,
    quantitative_precipitation: Option<GridLayer>,
}

#[derive(Debug, Default, Deserialize)]
struct GridLayer {
    #[serde(default)]
    values: Vec<GridValue>,
}

#[derive(Debug, Deserialize)]
struct GridValue {
    #[serde(rename = "validTime")]
    valid_time: String,
    value: Option<f64>,
}

impl GridLayer {
    /// Values keyed by interval start. Unparseable intervals are skipped.
    fn by_start(self) -> BTreeMap<UtcDateTime, Option<f64>> {
        self.values
            .into_iter()
            .filter_map(|entry| match parse_valid_time(&entry.valid_time) {
                Some(start) => Some((start, entry.value)),
                None => {
                    warn!(valid_time = %entry.valid_time, "skipping unparseable nws validTime");
                    None
                }
            })
            .collect()
    }
}

/// `2025-10-04T20:00:00+00:00/PT1H` -> interval start in UTC.
fn parse_valid_time(valid_time: &str) -> Option<UtcDateTime> {
    let start = valid_time.split('/').next()?;
    UtcDateTime::parse_any_offset(start).ok()
}
