//! CLI argument definitions for firewx.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nearby` | Fires within a radius of a point, closest first |
//! | `distance` | Distance from a point to one incident |
//! | `incident` | Normalized incident record by id |
//! | `wind` | Wind and weather along a path segment |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `20000` | Per-request upstream timeout |
//! | `--offline` | `false` | Answer fire queries from the seed list only |
//!
//! # Examples
//!
//! ```bash
//! firewx nearby --lat 39.2 --lon -120.25 --radius 25
//! firewx distance --lat 39.3 --lon -120.3 --id IRWIN123 --unit km
//! firewx wind --alat 37.0 --alon -122.0 --blat 37.5 --blon -122.0 --hours 12
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use firewx_core::{DistanceUnit, SamplingStrategy, TimeMode};

/// Wildfire proximity and path-weather queries.
#[derive(Debug, Parser)]
#[command(
    name = "firewx",
    author,
    version,
    about = "Wildfire proximity and path-weather queries",
    long_about = "firewx normalizes wildfire incidents (ArcGIS/WFIGS) and path weather \
(NDBC buoys, NWS forecast grids) into one JSON envelope, falling back across providers \
when one fails or returns nothing.\n\
\n\
Logs are written to stderr; set RUST_LOG to adjust verbosity."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-request upstream timeout in milliseconds.
    ///
    /// Overrides FIREWX_HTTP_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Skip the live feature service and answer fire queries from the seed list.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fires within a radius of a point.
    ///
    /// # Examples
    ///
    ///   firewx nearby --lat 39.2 --lon -120.25 --radius 25
    ///   firewx nearby --lat 39.2 --lon -120.25 --radius 40 --unit km --pretty
    Nearby(NearbyArgs),

    /// Distance from a point to one incident.
    Distance(DistanceArgs),

    /// Normalized incident record by id.
    Incident(IncidentArgs),

    /// Wind and surface weather along the segment A -> B.
    ///
    /// # Examples
    ///
    ///   firewx wind --alat 37.0 --alon -122.0 --blat 37.5 --blon -122.0
    ///   firewx wind --alat 39.2 --alon -120.2 --blat 39.5 --blon -120.2 --mode obs
    Wind(WindArgs),
}

#[derive(Debug, Args)]
pub struct NearbyArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius, strictly positive.
    #[arg(long)]
    pub radius: f64,

    /// Distance unit: miles, kilometers or meters (mi, km, m).
    #[arg(long, default_value = "miles")]
    pub unit: DistanceUnit,
}

#[derive(Debug, Args)]
pub struct DistanceArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Incident id (IRWIN id, GlobalID, OBJECTID or name).
    #[arg(long)]
    pub id: String,

    #[arg(long, default_value = "miles")]
    pub unit: DistanceUnit,
}

#[derive(Debug, Args)]
pub struct IncidentArgs {
    #[arg(long)]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct WindArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub alat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub alon: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub blat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub blon: f64,

    /// Horizon in hours from the start time.
    #[arg(long, default_value_t = 24)]
    pub hours: u32,

    /// forecast or obs.
    #[arg(long, default_value = "forecast")]
    pub mode: TimeMode,

    /// Window start as RFC3339 UTC; defaults to now.
    #[arg(long)]
    pub start: Option<String>,

    /// Sampling height above ground, echoed in the response.
    #[arg(long, default_value_t = 10)]
    pub level_m_agl: u32,

    #[arg(long, value_enum, default_value_t = SamplingArg::PointA)]
    pub sampling: SamplingArg,
}

/// Sampling strategy labels accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SamplingArg {
    PointA,
    Blend,
    PathIntegrated,
}

impl From<SamplingArg> for SamplingStrategy {
    fn from(value: SamplingArg) -> Self {
        match value {
            SamplingArg::PointA => Self::PointA,
            SamplingArg::Blend => Self::BlendAMidB,
            SamplingArg::PathIntegrated => Self::PathIntegrated,
        }
    }
}
