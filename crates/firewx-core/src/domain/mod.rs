//! # Domain Models
//!
//! Normalized records every provider adapter must produce.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Coordinate`] | Validated WGS84 lat/lon pair, hashable by value |
//! | [`Geometry`] | Optional point and/or polygon rings |
//! | [`Incident`] | Wildfire incident with provenance [`Quality`] |
//! | [`SeriesPoint`] | Wind and surface weather at one instant |
//! | [`SegmentResponse`] | Series, segment geometry and [`Rollups`] for a path |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Records are built fresh per query and never mutated afterwards.

mod geo;
mod incident;
mod timestamp;
mod weather;

pub use geo::{Coordinate, Geometry, Polygon};
pub use incident::{resolve_incident_id, Incident, Quality};
pub use timestamp::UtcDateTime;
pub use weather::{
    DirectionUnit, PrecipUnit, PressureUnit, Rollups, SamplingSpec, SamplingStrategy,
    SegmentMeta, SegmentResponse, SeriesPoint, SpeedUnit, TemperatureUnit, TimeMode, TimeSpec,
    UnitsSpec, Wind, Wx,
};
