use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Quality, UtcDateTime, ValidationError};

/// Wind at one instant. Speeds in m/s, direction is the meteorological "from" bearing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_ms: f64,
    pub dir_from_deg: f64,
    pub gust_ms: Option<f64>,
    /// Positive is a tailwind toward the segment end.
    pub along_ms: Option<f64>,
    /// Projection onto the left-of-track unit vector; positive pushes toward the left.
    pub cross_ms: Option<f64>,
}

impl Wind {
    pub fn new(speed_ms: f64, dir_from_deg: f64) -> Result<Self, ValidationError> {
        if !speed_ms.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "speed_ms" });
        }
        if !dir_from_deg.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "dir_from_deg",
            });
        }

        Ok(Self {
            speed_ms,
            dir_from_deg,
            gust_ms: None,
            along_ms: None,
            cross_ms: None,
        })
    }

    pub fn with_gust_ms(mut self, gust_ms: Option<f64>) -> Self {
        self.gust_ms = gust_ms.filter(|value| value.is_finite());
        self
    }

    pub fn with_components(mut self, along_ms: f64, cross_ms: f64) -> Self {
        self.along_ms = Some(along_ms);
        self.cross_ms = Some(cross_ms);
        self
    }
}

/// Surface weather accompanying a wind sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wx {
    pub rh_pct: Option<u8>,
    pub temp_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub vpd_kpa: Option<f64>,
    pub precip_mm_1h: Option<f64>,
    pub red_flag_warning: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time_utc: UtcDateTime,
    pub wind: Wind,
    pub wx: Wx,
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub bearing_deg: f64,
    pub length_km: f64,
}

/// Aggregates over a series. Every field is `None` for an empty series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollups {
    pub max_gust_ms: Option<f64>,
    pub max_along_ms: Option<f64>,
    pub max_cross_ms_abs: Option<f64>,
    pub min_rh_pct: Option<u8>,
    pub vpd_kpa_p95: Option<f64>,
    pub hours_rh_below_20: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    Forecast,
    Obs,
}

impl TimeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forecast => "forecast",
            Self::Obs => "obs",
        }
    }
}

impl Display for TimeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "forecast" => Ok(Self::Forecast),
            "obs" => Ok(Self::Obs),
            other => Err(ValidationError::InvalidTimeMode {
                value: other.to_owned(),
            }),
        }
    }
}

/// Requested time window: `hours` from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpec {
    pub mode: TimeMode,
    pub start: UtcDateTime,
    pub hours: u32,
}

impl TimeSpec {
    pub fn new(mode: TimeMode, start: UtcDateTime, hours: u32) -> Result<Self, ValidationError> {
        if hours == 0 {
            return Err(ValidationError::EmptyHorizon);
        }
        Ok(Self { mode, start, hours })
    }

    /// Exclusive end of the window.
    pub fn end(&self) -> UtcDateTime {
        self.start.plus_hours(i64::from(self.hours))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplingStrategy {
    #[default]
    #[serde(rename = "pointA")]
    PointA,
    #[serde(rename = "blend(A,mid,B)")]
    BlendAMidB,
    #[serde(rename = "path-integrated")]
    PathIntegrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingSpec {
    pub strategy: SamplingStrategy,
    pub level_m_agl: u32,
}

impl Default for SamplingSpec {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::PointA,
            level_m_agl: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[default]
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "km/h")]
    KilometersPerHour,
    #[serde(rename = "mph")]
    MilesPerHour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionUnit {
    #[default]
    #[serde(rename = "deg")]
    Degrees,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureUnit {
    #[default]
    #[serde(rename = "kPa")]
    Kilopascal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrecipUnit {
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
}

/// Unit labels echoed back with a segment response. Values are never converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsSpec {
    pub speed: SpeedUnit,
    pub dir: DirectionUnit,
    pub temp: TemperatureUnit,
    pub pressure: PressureUnit,
    pub precip: PrecipUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub segment: SegmentMeta,
    pub series: Vec<SeriesPoint>,
    pub rollups: Rollups,
    pub meta_units: UnitsSpec,
    pub horizon_hours: u32,
    pub sampling: SamplingStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_spec_rejects_zero_hours() {
        let start = UtcDateTime::parse("2025-10-04T20:00:00Z").expect("valid");
        assert!(matches!(
            TimeSpec::new(TimeMode::Forecast, start, 0),
            Err(ValidationError::EmptyHorizon)
        ));
        let spec = TimeSpec::new(TimeMode::Obs, start, 6).expect("valid");
        assert_eq!(spec.end().format_rfc3339(), "2025-10-05T02:00:00Z");
    }

    #[test]
    fn parses_time_mode() {
        assert_eq!("OBS".parse::<TimeMode>(), Ok(TimeMode::Obs));
        assert!("hindcast".parse::<TimeMode>().is_err());
    }

    #[test]
    fn units_and_sampling_serialize_with_wire_labels() {
        let units = serde_json::to_value(UnitsSpec::default()).expect("serialize");
        assert_eq!(units["speed"], "m/s");
        assert_eq!(units["pressure"], "kPa");

        let sampling = serde_json::to_value(SamplingStrategy::BlendAMidB).expect("serialize");
        assert_eq!(sampling, "blend(A,mid,B)");
    }

    #[test]
    fn wind_drops_non_finite_gust() {
        let wind = Wind::new(5.0, 270.0)
            .expect("valid")
            .with_gust_ms(Some(f64::NAN));
        assert_eq!(wind.gust_ms, None);
    }
}
