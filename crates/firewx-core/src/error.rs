use thiserror::Error;

/// Validation and contract errors exposed by `firewx-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange { value: f64 },
    #[error("radius must be strictly positive, got {value}")]
    NonPositiveRadius { value: f64 },
    #[error("horizon hours must be greater than zero")]
    EmptyHorizon,

    #[error("incident id cannot be empty")]
    EmptyIncidentId,

    #[error("invalid distance unit '{value}', expected one of miles, kilometers, meters")]
    InvalidDistanceUnit { value: String },
    #[error("invalid time mode '{value}', expected one of forecast, obs")]
    InvalidTimeMode { value: String },
    #[error("invalid source '{value}', expected one of arcgis, seed, ndbc, nws")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("station catalog line {line}: {reason}")]
    InvalidStationCatalog { line: usize, reason: String },

    #[error("failover chain requires at least one adapter")]
    EmptyAdapterChain,
    #[error("min_results must be greater than zero when set")]
    ZeroMinResults,

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
