use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::geomath::{bearing, distance, rollup};
use crate::{
    Coordinate, DistanceUnit, Incident, ProviderId, SamplingSpec, SegmentMeta, SegmentResponse,
    SeriesPoint, TimeSpec, UnitsSpec, ValidationError,
};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    InvalidRequest,
    MalformedPayload,
    NotConfigured,
    Internal,
}

/// Structured source error used by router failover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    /// Upstream answered but the body could not be understood.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Proximity search: everything within `radius` (in `unit`) of `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub center: Coordinate,
    pub radius: f64,
    pub unit: DistanceUnit,
}

impl NearbyQuery {
    pub fn new(
        center: Coordinate,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Self, ValidationError> {
        if !radius.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "radius" });
        }
        if radius <= 0.0 {
            return Err(ValidationError::NonPositiveRadius { value: radius });
        }

        Ok(Self {
            center,
            radius,
            unit,
        })
    }

    /// Radius converted to `unit`; exact when `unit` is the query's own unit.
    pub fn radius_in(&self, unit: DistanceUnit) -> f64 {
        if unit == self.unit {
            self.radius
        } else {
            self.unit.to_meters(self.radius) / unit.to_meters(1.0)
        }
    }
}

/// Conditions along the path from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRequest {
    pub a: Coordinate,
    pub b: Coordinate,
    pub time: TimeSpec,
    pub sampling: SamplingSpec,
    pub units: UnitsSpec,
}

impl SegmentRequest {
    pub fn new(a: Coordinate, b: Coordinate, time: TimeSpec) -> Result<Self, ValidationError> {
        if time.hours == 0 {
            return Err(ValidationError::EmptyHorizon);
        }

        Ok(Self {
            a,
            b,
            time,
            sampling: SamplingSpec::default(),
            units: UnitsSpec::default(),
        })
    }

    pub fn with_sampling(mut self, sampling: SamplingSpec) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_units(mut self, units: UnitsSpec) -> Self {
        self.units = units;
        self
    }

    /// Bearing and length of `a -> b`, independent of any provider.
    pub fn segment_meta(&self) -> SegmentMeta {
        SegmentMeta {
            bearing_deg: bearing(self.a, self.b),
            length_km: distance(self.a, self.b, DistanceUnit::Kilometers),
        }
    }

    /// Wraps `series` with this request's segment geometry, rollups and echoed settings.
    pub fn respond(&self, series: Vec<SeriesPoint>) -> SegmentResponse {
        SegmentResponse {
            segment: self.segment_meta(),
            rollups: rollup(&series),
            series,
            meta_units: self.units,
            horizon_hours: self.time.hours,
            sampling: self.sampling.strategy,
        }
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Incident provider contract.
///
/// An error means the provider could not answer. "Nothing found" is `Ok` with
/// an empty list or `None`, never an error.
pub trait FireDataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn search_nearby<'a>(&'a self, query: NearbyQuery) -> SourceFuture<'a, Vec<Incident>>;

    fn lookup_by_id<'a>(&'a self, incident_id: String) -> SourceFuture<'a, Option<Incident>>;
}

/// Path-weather provider contract.
pub trait WeatherDataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn segment_series<'a>(&'a self, req: SegmentRequest) -> SourceFuture<'a, SegmentResponse>;
}
