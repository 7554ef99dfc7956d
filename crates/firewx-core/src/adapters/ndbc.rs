use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, Month};
use tracing::{debug, warn};

use crate::data_source::{SegmentRequest, SourceError, SourceFuture, WeatherDataSource};
use crate::geomath::{distance, project_wind};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{
    Coordinate, DistanceUnit, ProviderId, Quality, SegmentResponse, SeriesPoint, UtcDateTime,
    ValidationError, Wind, Wx,
};

pub const DEFAULT_REALTIME_BASE_URL: &str = "https://www.ndbc.noaa.gov/data/realtime2";
pub const NDBC_SOURCE_TOKEN: &str = "opaque-obs-1";
pub const DEFAULT_CATALOG_MAX_KM: f64 = 300.0;

/// Chooses the buoy station that represents a segment.
pub trait StationResolver: Send + Sync {
    fn resolve(&self, a: Coordinate, b: Coordinate) -> Option<String>;
}

/// Always answers with the configured station, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedStationResolver {
    station_id: Option<String>,
}

impl FixedStationResolver {
    pub fn new(station_id: Option<String>) -> Self {
        Self {
            station_id: station_id
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty()),
        }
    }
}

impl StationResolver for FixedStationResolver {
    fn resolve(&self, _a: Coordinate, _b: Coordinate) -> Option<String> {
        self.station_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStation {
    pub id: String,
    pub position: Coordinate,
}

/// Nearest catalogued station to the segment start, bounded by `max_km`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCatalogResolver {
    stations: Vec<CatalogStation>,
    max_km: f64,
}

impl StationCatalogResolver {
    pub fn new(stations: Vec<CatalogStation>, max_km: f64) -> Result<Self, ValidationError> {
        if !max_km.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "max_km" });
        }
        if max_km <= 0.0 {
            return Err(ValidationError::NonPositiveRadius { value: max_km });
        }
        Ok(Self { stations, max_km })
    }

    /// Parses `station,lat,lon` rows. Blank lines, `#` comments and a leading
    /// header row are ignored.
    pub fn from_csv(text: &str, max_km: f64) -> Result<Self, ValidationError> {
        let mut stations = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
            let invalid = |reason: &str| ValidationError::InvalidStationCatalog {
                line: index + 1,
                reason: reason.to_owned(),
            };
            if fields.len() < 3 {
                return Err(invalid("expected station,lat,lon"));
            }

            let (Ok(lat), Ok(lon)) = (fields[1].parse::<f64>(), fields[2].parse::<f64>()) else {
                if stations.is_empty() && index == first_content_line(text) {
                    continue;
                }
                return Err(invalid("latitude and longitude must be numbers"));
            };
            if fields[0].is_empty() {
                return Err(invalid("station id cannot be empty"));
            }

            stations.push(CatalogStation {
                id: fields[0].to_owned(),
                position: Coordinate::new(lat, lon)?,
            });
        }

        Self::new(stations, max_km)
    }

    pub fn stations(&self) -> &[CatalogStation] {
        &self.stations
    }
}

fn first_content_line(text: &str) -> usize {
    text.lines()
        .position(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .unwrap_or(0)
}

impl StationResolver for StationCatalogResolver {
    fn resolve(&self, a: Coordinate, _b: Coordinate) -> Option<String> {
        self.stations
            .iter()
            .map(|station| {
                let km = distance(a, station.position, DistanceUnit::Kilometers);
                (station, km)
            })
            .filter(|(_, km)| *km <= self.max_km)
            .min_by(|left, right| left.1.total_cmp(&right.1))
            .map(|(station, _)| station.id.clone())
    }
}

/// Latest observation from the NDBC realtime2 text feed of one station.
#[derive(Clone)]
pub struct NdbcAdapter {
    resolver: Arc<dyn StationResolver>,
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
    source_token: String,
}

impl NdbcAdapter {
    pub fn new(resolver: Arc<dyn StationResolver>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            resolver,
            http_client,
            base_url: String::from(DEFAULT_REALTIME_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            source_token: String::from(NDBC_SOURCE_TOKEN),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
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

    async fn latest_observation(
        &self,
        station_id: &str,
    ) -> Result<Option<Observation>, SourceError> {
        let url = format!("{}/{}.txt", self.base_url, urlencoding::encode(station_id));
        let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("ndbc transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("ndbc transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            warn!(station_id, status = response.status, "ndbc feed not available");
            return Err(SourceError::unavailable(format!(
                "ndbc station {station_id} returned status {}",
                response.status
            )));
        }

        let observation = parse_latest_observation(&response.body).map_err(|reason| {
            warn!(station_id, reason, "ndbc feed is malformed");
            SourceError::malformed_payload(format!("ndbc station {station_id}: {reason}"))
        })?;
        if observation.is_none() {
            debug!(station_id, "newest ndbc row has no wind reading");
        }
        Ok(observation)
    }

    fn to_series_point(&self, observation: Observation, path_bearing: f64) -> SeriesPoint {
        let (along, cross) = project_wind(observation.wspd, observation.wdir, path_bearing);
        let wind = Wind {
            speed_ms: observation.wspd,
            dir_from_deg: observation.wdir,
            gust_ms: observation.gst,
            along_ms: None,
            cross_ms: None,
        }
        .with_components(along, cross);

        let quality = Quality::new(self.source_token.clone())
            .with_data_age_min(observation.time.minutes_until(UtcDateTime::now()));

        SeriesPoint {
            time_utc: observation.time,
            wind,
            wx: Wx::default(),
            quality,
        }
    }
}

impl WeatherDataSource for NdbcAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Ndbc
    }

    fn segment_series<'a>(&'a self, req: SegmentRequest) -> SourceFuture<'a, SegmentResponse> {
        Box::pin(async move {
            let Some(station_id) = self.resolver.resolve(req.a, req.b) else {
                return Err(SourceError::unavailable("unavailable"));
            };

            let path_bearing = req.segment_meta().bearing_deg;
            let series = self
                .latest_observation(&station_id)
                .await?
                .map(|observation| self.to_series_point(observation, path_bearing))
                .into_iter()
                .collect();

            Ok(req.respond(series))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observation {
    time: UtcDateTime,
    wdir: f64,
    wspd: f64,
    gst: Option<f64>,
}

/// Newest row of a realtime2 standard meteorological file.
///
/// `Ok(None)` when that row reports wind direction or speed as missing (`MM`).
fn parse_latest_observation(text: &str) -> Result<Option<Observation>, &'static str> {
    let mut headers = Vec::new();
    let mut newest = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(header) = line.strip_prefix('#') {
            headers.push(header.trim());
        } else if newest.is_none() {
            newest = Some(line);
        }
    }

    let header = headers
        .iter()
        .rev()
        .find(|header| header.split_whitespace().next() == Some("YY"))
        .or_else(|| headers.last())
        .ok_or("no header line")?;
    let row = newest
        .ok_or("no data rows")?
        .split_whitespace()
        .collect::<Vec<_>>();

    let columns = header
        .split_whitespace()
        .enumerate()
        .map(|(index, name)| (name, index))
        .collect::<HashMap<_, _>>();
    let column = |name: &str| columns.get(name).and_then(|index| row.get(*index)).copied();
    let integer = |name: &str| column(name)?.parse::<i32>().ok();

    let observed = observation_time(&integer).ok_or("invalid observation time")?;

    let (Some(wdir), Some(wspd)) = (column("WDIR"), column("WSPD")) else {
        return Err("missing WDIR or WSPD column");
    };
    if wdir == "MM" || wspd == "MM" {
        return Ok(None);
    }
    let number = |raw: &str| raw.parse::<f64>().ok().filter(|value| value.is_finite());
    let wdir = number(wdir).ok_or("unparseable WDIR")?;
    let wspd = number(wspd).ok_or("unparseable WSPD")?;

    let gst = match column("GST") {
        None | Some("MM") => None,
        Some(raw) => Some(number(raw).ok_or("unparseable GST")?),
    };

    Ok(Some(Observation {
        time: observed,
        wdir,
        wspd,
        gst,
    }))
}

fn observation_time(integer: &dyn Fn(&str) -> Option<i32>) -> Option<UtcDateTime> {
    let year = integer("YY")?;
    let year = if year < 100 { year + 2000 } else { year };
    let month = Month::try_from(u8::try_from(integer("MM")?).ok()?).ok()?;
    let day = u8::try_from(integer("DD")?).ok()?;
    let hour = u8::try_from(integer("hh")?).ok()?;
    let minute = u8::try_from(integer("mm")?).ok()?;
    let observed = Date::from_calendar_date(year, month, day)
        .ok()?
        .with_hms(hour, minute, 0)
        .ok()?
        .assume_utc();
    UtcDateTime::from_offset_datetime(observed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::{TimeMode, TimeSpec};

    const SAMPLE: &str = "#YY  MM DD hh mm WDIR WSPD GST\n2025 10 04 20 00 180 5.0 7.0\n";

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn northbound_request() -> SegmentRequest {
        let start = UtcDateTime::parse("2025-10-04T20:00:00Z").expect("valid");
        let time = TimeSpec::new(TimeMode::Obs, start, 6).expect("valid");
        SegmentRequest::new(coord(37.0, -122.0), coord(37.5, -122.0), time).expect("valid")
    }

    fn adapter(station: Option<&str>, client: Arc<RecordingHttpClient>) -> NdbcAdapter {
        let resolver = FixedStationResolver::new(station.map(str::to_owned));
        NdbcAdapter::new(Arc::new(resolver), client)
    }

    #[test]
    fn parses_newest_row_under_yy_header() {
        let text = "#YY  MM DD hh mm WDIR WSPD GST  WVHT\n\
                    #yr  mo dy hr mn degT m/s  m/s     m\n\
                    25 10 04 20 10 270 6.2 MM 1.1\n\
                    25 10 04 20 00 260 6.0 8.0 1.1\n";

        let observation = parse_latest_observation(text)
            .expect("well formed")
            .expect("wind present");
        assert_eq!(observation.time.format_rfc3339(), "2025-10-04T20:10:00Z");
        assert_eq!(observation.wdir, 270.0);
        assert_eq!(observation.wspd, 6.2);
        assert_eq!(observation.gst, None);
    }

    #[test]
    fn missing_wind_reading_is_not_an_error() {
        let text = "#YY MM DD hh mm WDIR WSPD\n2025 10 04 20 00 MM 5.0\n";
        assert_eq!(parse_latest_observation(text), Ok(None));
    }

    #[test]
    fn malformed_feeds_are_rejected() {
        assert_eq!(
            parse_latest_observation("#YY MM DD hh mm WDIR WSPD\n"),
            Err("no data rows")
        );
        assert_eq!(
            parse_latest_observation("2025 10 04 20 00 180 5.0\n"),
            Err("no header line")
        );
        assert_eq!(
            parse_latest_observation("#YY MM DD hh mm WDIR WSPD\n2025 13 04 20 00 1 5\n"),
            Err("invalid observation time")
        );
        assert_eq!(
            parse_latest_observation("#YY MM DD hh mm WSPD\n2025 10 04 20 00 5\n"),
            Err("missing WDIR or WSPD column")
        );
        assert_eq!(
            parse_latest_observation("#YY MM DD hh mm WDIR WSPD GST\n2025 10 04 20 00 1 5 x\n"),
            Err("unparseable GST")
        );
    }

    #[test]
    fn tailwind_from_sample_row() {
        let client = Arc::new(RecordingHttpClient::ok(SAMPLE));
        let adapter = adapter(Some("46026"), Arc::clone(&client));

        let response = block_on(adapter.segment_series(northbound_request())).expect("ok");

        assert_eq!(response.series.len(), 1);
        let point = &response.series[0];
        assert_eq!(point.time_utc.format_rfc3339(), "2025-10-04T20:00:00Z");
        assert_eq!(point.wind.gust_ms, Some(7.0));
        let along = point.wind.along_ms.expect("projected");
        assert!((along - 5.0).abs() < 1e-6, "southerly wind pushes a northbound path");
        assert_eq!(point.quality.source_token, NDBC_SOURCE_TOKEN);
        assert_eq!(point.quality.qflags, vec![String::from("ok")]);
        assert!(point.quality.data_age_min.is_some());
        assert_eq!(response.rollups.max_gust_ms, Some(7.0));
        assert_eq!(response.horizon_hours, 6);

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].url,
            "https://www.ndbc.noaa.gov/data/realtime2/46026.txt"
        );
    }

    #[test]
    fn unresolvable_station_is_unavailable() {
        let client = Arc::new(RecordingHttpClient::new(Vec::new()));
        let adapter = adapter(None, Arc::clone(&client));

        let error = block_on(adapter.segment_series(northbound_request())).expect_err("fails");
        assert_eq!(error.code(), "source.unavailable");
        assert_eq!(error.message(), "unavailable");
        assert!(client.recorded_requests().is_empty());
    }

    #[test]
    fn non_success_status_is_unavailable() {
        let client = Arc::new(RecordingHttpClient::new(vec![Ok(HttpResponse::with_status(
            503,
            "Service Unavailable",
        ))]));
        let adapter = adapter(Some("46026"), client);

        let error = block_on(adapter.segment_series(northbound_request())).expect_err("fails");
        assert_eq!(error.code(), "source.unavailable");
        assert!(error.message().contains("503"));
    }

    #[test]
    fn html_error_page_is_malformed() {
        let client = Arc::new(RecordingHttpClient::ok("<html>maintenance</html>"));
        let adapter = adapter(Some("46026"), client);

        let error = block_on(adapter.segment_series(northbound_request())).expect_err("fails");
        assert_eq!(error.code(), "source.malformed_payload");
    }

    #[test]
    fn missing_wind_reading_yields_empty_series() {
        let client = Arc::new(RecordingHttpClient::ok(
            "#YY MM DD hh mm WDIR WSPD GST\n2025 10 04 20 00 MM MM MM\n",
        ));
        let adapter = adapter(Some("46026"), client);

        let response = block_on(adapter.segment_series(northbound_request())).expect("ok");
        assert!(response.series.is_empty());
        assert_eq!(response.rollups.max_gust_ms, None);
    }

    #[test]
    fn transport_failure_is_an_error() {
        let client = Arc::new(RecordingHttpClient::new(vec![Err(HttpError::new("reset"))]));
        let adapter = adapter(Some("46026"), client);

        let error = block_on(adapter.segment_series(northbound_request())).expect_err("fails");
        assert_eq!(error.code(), "source.unavailable");
    }

    #[test]
    fn catalog_picks_nearest_station_within_range() {
        let csv = "station,lat,lon\n\
                   # bay area\n\
                   46026,37.755,-122.839\n\
                   46012,37.356,-122.881\n\
                   51001,24.451,-162.008\n";
        let resolver = StationCatalogResolver::from_csv(csv, 300.0).expect("valid catalog");
        assert_eq!(resolver.stations().len(), 3);

        let a = coord(37.3, -122.8);
        assert_eq!(resolver.resolve(a, a), Some(String::from("46012")));

        let remote = coord(0.0, 0.0);
        assert_eq!(resolver.resolve(remote, remote), None);
    }

    #[test]
    fn catalog_rejects_malformed_rows() {
        let error = StationCatalogResolver::from_csv("46026,37.7,-122.8\nbad,north,west\n", 300.0)
            .expect_err("invalid");
        assert!(matches!(
            error,
            ValidationError::InvalidStationCatalog { line: 2, .. }
        ));
        assert!(StationCatalogResolver::from_csv("46026,97.0,0.0\n", 300.0).is_err());
        assert!(StationCatalogResolver::new(Vec::new(), 0.0).is_err());
    }

    #[test]
    fn fixed_resolver_ignores_blank_ids() {
        let a = coord(0.0, 0.0);
        assert_eq!(FixedStationResolver::new(Some(String::from("  "))).resolve(a, a), None);
        assert_eq!(
            FixedStationResolver::new(Some(String::from("46026"))).resolve(a, a),
            Some(String::from("46026"))
        );
    }
}
