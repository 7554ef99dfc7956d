use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// WGS84 latitude/longitude pair in degrees.
///
/// Equality and hashing are by value. Construction rejects non-finite and
/// out-of-range degrees, so the bit patterns compared here are always finite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(value: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lat" });
        }
        if !lon.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "lon" });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { value: lon });
        }

        // -0.0 and 0.0 must hash identically.
        Ok(Self {
            lat: lat + 0.0,
            lon: lon + 0.0,
        })
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lon(self) -> f64 {
        self.lon
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

/// Ordered rings of vertices. An empty polygon has no vertices at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    rings: Vec<Vec<Coordinate>>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<Coordinate>>) -> Self {
        Self { rings }
    }

    pub fn rings(&self) -> &[Vec<Coordinate>] {
        &self.rings
    }

    pub fn vertices(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.rings.iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(Vec::is_empty)
    }
}

/// Optional point and/or polygon footprint of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
}

impl Geometry {
    pub fn point(point: Coordinate) -> Self {
        Self {
            point: Some(point),
            polygon: None,
        }
    }

    pub fn polygon(polygon: Polygon) -> Self {
        Self {
            point: None,
            polygon: Some(polygon),
        }
    }

    pub fn with_polygon(mut self, polygon: Polygon) -> Self {
        self.polygon = Some(polygon);
        self
    }

    /// A geometry with neither point nor polygon carries no location.
    pub fn is_empty(&self) -> bool {
        self.point.is_none() && self.polygon.is_none()
    }
}
