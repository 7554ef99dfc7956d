use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in route metadata and envelopes.
///
/// These name the adapter that answered; they are never copied into record
/// quality markers, which carry an opaque source token instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// ArcGIS FeatureServer REST (WFIGS incident locations).
    Arcgis,
    /// Static in-memory incident list.
    Seed,
    /// NOAA NDBC realtime buoy observations.
    Ndbc,
    /// NWS gridded forecast.
    Nws,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Arcgis, Self::Seed, Self::Ndbc, Self::Nws];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arcgis => "arcgis",
            Self::Seed => "seed",
            Self::Ndbc => "ndbc",
            Self::Nws => "nws",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "arcgis" => Ok(Self::Arcgis),
            "seed" => Ok(Self::Seed),
            "ndbc" => Ok(Self::Ndbc),
            "nws" => Ok(Self::Nws),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
