//! # Firewx Core
//!
//! Wildfire proximity and path-weather queries over interchangeable upstream
//! providers.
//!
//! ## Overview
//!
//! - **Geo-math kernel**: great-circle distance, bearing, wind decomposition,
//!   vapor-pressure deficit and series rollups
//! - **Normalized domain model** for incidents and weather samples
//! - **Provider traits** for fire and weather sources, with ArcGIS, seed, NDBC
//!   and NWS adapters
//! - **Failover routers** that try providers in priority order
//! - **Query services** and builders that wire them at process start
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | ArcGIS REST, in-memory seed, NDBC buoy and NWS grid adapters |
//! | [`config`] | Service builders and `FIREWX_*` environment settings |
//! | [`data_source`] | Provider traits, queries and [`SourceError`] |
//! | [`domain`] | Coordinates, geometry, incidents, weather series |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`geomath`] | Pure geometry and aggregation functions |
//! | [`http_client`] | HTTP transport seam |
//! | [`routing`] | Incident and weather failover routers |
//! | [`services`] | Fire finder and weather services |
//! | [`source`] | Provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use firewx_core::{Coordinate, DistanceUnit, FireFinderBuilder, NearbyFiresRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FireFinderBuilder::new().with_env().build()?;
//!     let request = NearbyFiresRequest::new(
//!         Coordinate::new(39.2, -120.25)?,
//!         25.0,
//!         DistanceUnit::Miles,
//!     )?;
//!
//!     let routed = service.search_nearby(&request).await?;
//!     for fire in &routed.data.fires {
//!         println!("{} {:?} {}", fire.name, fire.distance, fire.severity);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CLI                 │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ FireFinderService /  │────▶│ Geo-math kernel  │
//! │ WeatherService       │     └──────────────────┘
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ Incident / Weather   │
//! │ Router (failover)    │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ Provider adapters    │────▶│ HTTP client      │
//! └──────────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapters report [`SourceError`]s. Routers absorb them according to the
//! failover policy and surface a [`RouteFailure`] only when no provider can
//! answer:
//!
//! ```rust
//! use firewx_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::Unavailable | SourceErrorKind::MalformedPayload => "try later",
//!         SourceErrorKind::InvalidRequest => "fix the input",
//!         _ => "internal",
//!     }
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod geomath;
pub mod http_client;
pub mod routing;
pub mod services;
pub mod source;

#[cfg(test)]
mod test_support;

// Adapter implementations
pub use adapters::{
    ArcGisConfig, ArcGisRestAdapter, CatalogStation, FixedStationResolver, InMemoryFireAdapter,
    NdbcAdapter, NwsAdapter, StationCatalogResolver, StationResolver,
};

// Builders
pub use config::{FireFinderBuilder, WeatherServiceBuilder};

// Provider traits and queries
pub use data_source::{
    FireDataSource, NearbyQuery, SegmentRequest, SourceError, SourceErrorKind, SourceFuture,
    WeatherDataSource,
};

// Domain models
pub use domain::{
    resolve_incident_id, Coordinate, DirectionUnit, Geometry, Incident, Polygon, PrecipUnit,
    PressureUnit, Quality, Rollups, SamplingSpec, SamplingStrategy, SegmentMeta,
    SegmentResponse, SeriesPoint, SpeedUnit, TemperatureUnit, TimeMode, TimeSpec, UnitsSpec,
    UtcDateTime, Wind, Wx,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

// Error types
pub use error::{CoreError, ValidationError};

// Geo-math kernel
pub use geomath::DistanceUnit;

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Routing types
pub use routing::{
    AdapterGate, AllowAll, FailoverPolicy, IncidentRouter, RouteFailure, RouteResult,
    RouteSuccess, WeatherRouter,
};

// Services
pub use services::{
    DistanceBasis, DistanceResponse, FireFinderService, NearbyFire, NearbyFiresRequest,
    NearbyFiresResponse, Severity, WeatherService,
};

// Source identifiers
pub use source::ProviderId;
