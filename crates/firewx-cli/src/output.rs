use std::io::{self, Write};

use firewx_core::Envelope;
use serde_json::Value;

use crate::error::CliError;

/// Writes the envelope as a single JSON document on stdout.
pub fn render(envelope: &Envelope<Value>, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{payload}")?;
    handle.flush()?;
    Ok(())
}
