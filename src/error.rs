//! Error types for the lead qualifier.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Handoff error: {0}")]
    Handoff(#[from] HandoffError),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse service account credentials: {0}")]
    Credentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned no content")]
    EmptyResponse { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Tabular store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("{operation} request failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Row {row} cannot transition to status {target}")]
    InvalidTransition { row: u32, target: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handoff resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("No lead found for sender {sender_id}")]
    NotFound { sender_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Webhook subscription handshake rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing verification parameters")]
    MissingParameters,

    #[error("Missing hub.challenge")]
    MissingChallenge,

    #[error("Unsupported hub.mode")]
    ModeMismatch,

    #[error("Invalid verify token")]
    TokenMismatch,
}

/// Intake queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Intake queue is closed")]
    Closed,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
