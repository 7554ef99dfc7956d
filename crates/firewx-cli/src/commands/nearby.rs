use firewx_core::{Coordinate, FireFinderService, NearbyFiresRequest};

use crate::cli::NearbyArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    args: &NearbyArgs,
    service: &FireFinderService,
) -> Result<CommandResult, CliError> {
    let center = Coordinate::new(args.lat, args.lon)?;
    let request = NearbyFiresRequest::new(center, args.radius, args.unit)?;

    match service.search_nearby(&request).await {
        Ok(route) => CommandResult::routed(route),
        Err(failure) => Ok(CommandResult::unavailable(failure)),
    }
}
