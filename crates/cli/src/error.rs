//! CLI error types.

use std::fmt;

use error_stack::Report;
use usersync_common::error::UsersyncError;

#[derive(Debug)]
pub enum CliError {
    /// Settings could not be loaded
    Config(String),
    /// Consent input was unusable or consent retrieval failed
    Consent(String),
    /// Input was neither a query string nor a URL
    Input(String),
    /// IO error
    Io(std::io::Error),
    /// JSON serialization error
    Json(String),
    /// Logger could not be installed
    Logger(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Consent(msg) => write!(f, "Consent error: {}", msg),
            CliError::Input(msg) => write!(f, "Input error: {}", msg),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(msg) => write!(f, "JSON error: {}", msg),
            CliError::Logger(msg) => write!(f, "Logger error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err.to_string())
    }
}

impl From<Report<UsersyncError>> for CliError {
    fn from(report: Report<UsersyncError>) -> Self {
        match report.current_context() {
            UsersyncError::Configuration { .. } => CliError::Config(format!("{report:?}")),
            other => CliError::Consent(other.to_string()),
        }
    }
}
