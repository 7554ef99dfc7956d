use firewx_core::{Coordinate, SamplingSpec, SegmentRequest, TimeSpec, UtcDateTime, WeatherService};

use crate::cli::WindArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &WindArgs, service: &WeatherService) -> Result<CommandResult, CliError> {
    let a = Coordinate::new(args.alat, args.alon)?;
    let b = Coordinate::new(args.blat, args.blon)?;
    let start = match args.start.as_deref() {
        Some(raw) => UtcDateTime::parse(raw)?,
        None => UtcDateTime::now(),
    };

    let time = TimeSpec::new(args.mode, start, args.hours)?;
    let request = SegmentRequest::new(a, b, time)?.with_sampling(SamplingSpec {
        strategy: args.sampling.into(),
        level_m_agl: args.level_m_agl,
    });

    match service.segment(request).await {
        Ok(route) => CommandResult::routed(route),
        Err(failure) => Ok(CommandResult::unavailable(failure)),
    }
}
