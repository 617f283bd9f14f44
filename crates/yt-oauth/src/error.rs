use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while acquiring or persisting OAuth credentials.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Client secrets missing or unusable.
    #[error("{0}")]
    Configuration(String),

    /// The credential file could not be written.
    #[error("Failed to write OAuth token file '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request to the token endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint rejected the request (status {status}): {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Authorization was denied: {0}")]
    Denied(String),

    /// Consent went through but some required scopes were not granted.
    #[error("Authorization did not grant the required scopes: {}", missing.join(", "))]
    InsufficientScope { missing: Vec<String> },

    #[error("Local authorization flow failed: {0}")]
    LocalFlow(#[from] LocalFlowError),

    #[error("Console authorization flow failed: {0}")]
    Console(String),
}

impl OAuthError {
    /// True for failures caused by local setup rather than by the
    /// authorization itself.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Storage { .. })
    }
}

/// Outcome of a failed loopback (`local`) authorization attempt.
#[derive(Debug, Error)]
pub enum LocalFlowError {
    #[error("could not bind callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no authorization callback received within {0:?}")]
    Timeout(Duration),

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("callback did not carry an authorization code")]
    MissingCode,

    #[error("callback state does not match the authorization request")]
    StateMismatch,

    #[error("callback server stopped unexpectedly: {0}")]
    Server(String),
}

impl LocalFlowError {
    /// Whether `auto` mode may retry the authorization through the console.
    ///
    /// Only a listener that cannot be bound or a consent step that never
    /// completes qualify; an explicit denial or a tampered callback does not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Timeout(_))
    }
}
