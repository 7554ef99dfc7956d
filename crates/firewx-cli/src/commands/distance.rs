use firewx_core::{Coordinate, FireFinderService};

use crate::cli::DistanceArgs;
use crate::error::CliError;

use super::{incident_id, CommandResult};

pub async fn run(
    args: &DistanceArgs,
    service: &FireFinderService,
) -> Result<CommandResult, CliError> {
    let point = Coordinate::new(args.lat, args.lon)?;
    let id = incident_id(&args.id)?;

    match service.distance_to(point, id, args.unit).await {
        Ok(route) if route.data.is_some() => CommandResult::routed(route),
        Ok(route) => CommandResult::routed(route)?
            .not_found(format!("incident '{id}' not found or has no geometry")),
        Err(failure) => Ok(CommandResult::unavailable(failure)),
    }
}
