pub mod http;

pub use http::{HealthStatus, HttpGateway};

use async_trait::async_trait;
use thiserror::Error;

use crate::state::ChatMessage;

/// Sends a conversation to a completion service and returns the reply text.
///
/// Implementors own transport and wire-format details. A successful call may
/// return an empty string when the service had nothing to say; deciding what
/// to show in that case is the caller's job.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, GatewayError>;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("completion task failed: {0}")]
    Task(String),
}
