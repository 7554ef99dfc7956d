mod distance;
mod incident;
mod nearby;
mod wind;

use firewx_core::{
    Envelope, EnvelopeError, FireFinderBuilder, FireFinderService, ProviderId, RouteFailure,
    RouteSuccess, WeatherService, WeatherServiceBuilder,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

/// How a command ended, independent of what was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Every provider failed.
    Unavailable,
    NotFound,
}

impl Outcome {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Unavailable => 3,
            Self::NotFound => 4,
        }
    }
}

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
    pub outcome: Outcome,
}

impl CommandResult {
    pub fn routed<T: Serialize>(route: RouteSuccess<T>) -> Result<Self, CliError> {
        Ok(Self {
            data: serde_json::to_value(&route.data)?,
            warnings: route.warnings,
            errors: route.errors,
            latency_ms: route.latency_ms,
            source_chain: route.source_chain,
            outcome: Outcome::Success,
        })
    }

    pub fn unavailable(failure: RouteFailure) -> Self {
        Self {
            data: Value::Null,
            warnings: failure.warnings,
            errors: failure.errors,
            latency_ms: failure.latency_ms,
            source_chain: failure.source_chain,
            outcome: Outcome::Unavailable,
        }
    }

    pub fn not_found(mut self, message: impl Into<String>) -> Result<Self, CliError> {
        self.errors.push(EnvelopeError::new("not_found", message)?);
        self.data = Value::Null;
        self.outcome = Outcome::NotFound;
        Ok(self)
    }
}

pub struct CommandOutcome {
    pub envelope: Envelope<Value>,
    pub exit_code: u8,
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let result = match &cli.command {
        Command::Nearby(args) => nearby::run(args, &fire_service(cli)?).await?,
        Command::Distance(args) => distance::run(args, &fire_service(cli)?).await?,
        Command::Incident(args) => incident::run(args, &fire_service(cli)?).await?,
        Command::Wind(args) => {
            let mut result = wind::run(args, &weather_service(cli)?).await?;
            if cli.offline {
                result
                    .warnings
                    .push(String::from("--offline applies to fire queries only"));
            }
            result
        }
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        source_chain,
        outcome,
    } = result;

    let mut metadata = Metadata::new(source_chain, latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta()?;

    Ok(CommandOutcome {
        envelope: Envelope::with_errors(meta, data, errors)?,
        exit_code: outcome.exit_code(),
    })
}

fn fire_service(cli: &Cli) -> Result<FireFinderService, CliError> {
    let mut builder = FireFinderBuilder::new()
        .with_env()
        .with_offline(cli.offline);
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_timeout_ms(timeout_ms);
    }

    let service = builder.build()?;
    debug!(chain = ?service.router().source_chain(), "fire service ready");
    Ok(service)
}

fn weather_service(cli: &Cli) -> Result<WeatherService, CliError> {
    let mut builder = WeatherServiceBuilder::new().with_env();
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_timeout_ms(timeout_ms);
    }

    let service = builder.build()?;
    debug!(chain = ?service.router().source_chain(), "weather service ready");
    Ok(service)
}

/// Trims an incident id argument, rejecting blanks.
fn incident_id(raw: &str) -> Result<&str, CliError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(firewx_core::ValidationError::EmptyIncidentId.into());
    }
    Ok(id)
}
