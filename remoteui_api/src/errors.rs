//! Error types for the device console client.

/// Errors that can occur while talking to a device's web console.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A URL could not be built from the configured base and path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The request could not be completed (connection refused, TLS, body read).
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The request did not complete within its time budget.
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    /// The console answered with a non-success status where one was required.
    #[error("Request to {url} failed with status {status}")]
    HttpStatus { status: u16, url: String },
    /// The login page did not contain a form with a password field.
    #[error("No login form found at {url}")]
    LoginFormMissing { url: String },
    /// Credentials were submitted but the console did not accept them.
    #[error("Login failed: {0}")]
    LoginFailed(String),
}

impl Error {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source,
            }
        }
    }

    /// True when the failure came from the time budget rather than the network.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
