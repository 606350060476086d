//! ==============================================================================
//! error.rs - typed failures at the module seams
//! ==============================================================================
//!
//! purpose:
//!     the poll and completion paths never surface errors to the display.
//!     they still return typed results so the caller decides, in one place,
//!     to log and carry on.
//!
//! relationships:
//!     - used by: poller.rs (PollError), insight.rs (CompletionError),
//!       registry.rs (RegistryError)
//!
//! ==============================================================================

/// failure of one poll cycle against a sensor endpoint
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("sensor request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sensor endpoint returned status {0}")]
    Status(u16),

    #[error("sensor payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sensor payload is not a json object")]
    NotAnObject,
}

/// failure of the external completion service
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("api key not set (expected env var {0})")]
    MissingApiKey(String),

    #[error("malformed completion response: {0}")]
    Format(String),
}

/// invalid location list at startup
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("location registry must contain at least one location")]
    Empty,

    #[error("duplicate location id: {0}")]
    DuplicateId(String),
}
