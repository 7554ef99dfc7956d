use firewx_core::FireFinderService;

use crate::cli::IncidentArgs;
use crate::error::CliError;

use super::{incident_id, CommandResult};

pub async fn run(
    args: &IncidentArgs,
    service: &FireFinderService,
) -> Result<CommandResult, CliError> {
    let id = incident_id(&args.id)?;

    match service.incident(id).await {
        Ok(route) if route.data.is_some() => CommandResult::routed(route),
        Ok(route) => {
            CommandResult::routed(route)?.not_found(format!("incident '{id}' not found"))
        }
        Err(failure) => Ok(CommandResult::unavailable(failure)),
    }
}
