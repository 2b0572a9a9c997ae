use std::path::PathBuf;

use thiserror::Error;

/// Error types for the fixture harness
#[derive(Error, Debug)]
pub enum FixtureError {
    // Configuration errors
    #[error("Fixture file not found: {}", path.display())]
    MissingFixtureFile { path: PathBuf },

    #[error("Could not read fixture file {}: {reason}", file.display())]
    InvalidFixtureFile { file: PathBuf, reason: String },

    #[error("Not enough {resource} configured: required {required}, got {available}")]
    NotEnoughTargets {
        resource: String,
        required: usize,
        available: usize,
    },

    // Setup/teardown call failures
    #[error(
        "{endpoint} returned status {actual} for {} (expected {expected}): {body}",
        file.display()
    )]
    UnexpectedStatus {
        endpoint: String,
        file: PathBuf,
        expected: u16,
        actual: u16,
        body: serde_json::Value,
    },

    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    // Webhook server errors
    #[error("Webhook server failed to bind 127.0.0.1:{port}: {reason}")]
    WebhookBind { port: u16, reason: String },

    #[error("Timed out after {waited_ms}ms waiting for a webhook delivery on port {port}")]
    WebhookTimeout { port: u16, waited_ms: u64 },
}

impl FixtureError {
    /// True for errors raised before any request was sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FixtureError::MissingFixtureFile { .. } | FixtureError::NotEnoughTargets { .. }
        )
    }
}

/// Result type with the harness error
pub type Result<T> = std::result::Result<T, FixtureError>;
