use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] firewx_core::ValidationError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Core(#[from] firewx_core::CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => 2,
            Self::Core(firewx_core::CoreError::Validation(_)) => 2,
            Self::Core(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_category() {
        let invalid = CliError::from(firewx_core::ValidationError::EmptyHorizon);
        assert_eq!(invalid.exit_code(), 2);

        let core_invalid = CliError::from(firewx_core::CoreError::from(
            firewx_core::ValidationError::EmptyAdapterChain,
        ));
        assert_eq!(core_invalid.exit_code(), 2);

        let io = CliError::from(std::io::Error::other("closed pipe"));
        assert_eq!(io.exit_code(), 10);
    }
}
