use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionGateway, GatewayError};
use crate::state::ChatMessage;

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Body of the tutor server's `/health` route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub mcp_connected: bool,
    #[serde(default)]
    pub tools_count: u32,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Completion gateway that POSTs the whole history to a chat endpoint.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The health route lives next to the chat route: `/chat` becomes `/health`.
    pub fn health_url(&self) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| GatewayError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?;

        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidEndpoint(self.endpoint.clone()))?
            .pop()
            .push("health");

        Ok(url)
    }

    pub async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let url = self.health_url()?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }

        let body = response.text().await.map_err(GatewayError::Transport)?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CompletionGateway for HttpGateway {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, GatewayError> {
        debug!(endpoint = %self.endpoint, messages = history.len(), "posting chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages: history })
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }

        let body = response.text().await.map_err(GatewayError::Transport)?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(chat_response.message.unwrap_or_default())
    }
}
