use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] driftwatch_core::ValidationError),

    #[error("line {line}: {reason}")]
    Input { line: usize, reason: String },

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Warehouse(#[from] driftwatch_core::WarehouseError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Input { .. } => 2,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 6,
            Self::Command(_) | Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}

/// Exit code for an envelope that carries an engine failure.
pub fn engine_exit_code(code: &str) -> u8 {
    match code {
        "empty_input" => 3,
        _ => 4,
    }
}
