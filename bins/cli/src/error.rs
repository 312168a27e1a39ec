use bundle_sync_infra::ErrorEnvelope;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    InvalidInput = 2,
    Io = 3,
    Internal = 1,
}

impl ExitCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug)]
pub enum CliError {
    Envelope(ErrorEnvelope),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Envelope(error) => envelope_exit_code(error),
            Self::Io(_) => ExitCode::Io,
            Self::Serialization(_) => ExitCode::Internal,
        }
    }
}

/// Input and config problems exit with 2, filesystem problems with 3.
fn envelope_exit_code(error: &ErrorEnvelope) -> ExitCode {
    match (error.code.namespace(), error.code.code()) {
        (
            "config",
            "config_file_not_found" | "config_file_permission_denied" | "config_file_io",
        )
        | ("core", "io" | "not_found" | "permission_denied") => ExitCode::Io,
        ("config" | "path", _) | ("core", "invalid_input") => ExitCode::InvalidInput,
        _ => ExitCode::Internal,
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope(error) => write!(formatter, "{}: {}", error.code, error.message),
            Self::Io(error) => write!(formatter, "core:io: {error}"),
            Self::Serialization(error) => write!(formatter, "core:internal: {error}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ErrorEnvelope> for CliError {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Envelope(error)
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}
