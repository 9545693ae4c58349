//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::sheet::SheetError;

/// Errors produced by the library layer, wrapping console client errors
/// and adding configuration, persistence and input failures.
#[derive(Debug)]
pub enum PrintCountError {
    /// An error from the device console client.
    Api(remoteui_api::Error),
    /// The fleet configuration could not be loaded or is invalid.
    Config(ConfigError),
    /// Writing the monthly sheet failed.
    Sheet(SheetError),
    /// Reading or writing a local file failed.
    Io(std::io::Error),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for PrintCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "Console error: {}", e),
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Sheet(e) => write!(f, "Sheet error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for PrintCountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Sheet(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<remoteui_api::Error> for PrintCountError {
    fn from(e: remoteui_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<ConfigError> for PrintCountError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SheetError> for PrintCountError {
    fn from(e: SheetError) -> Self {
        Self::Sheet(e)
    }
}

impl From<std::io::Error> for PrintCountError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
