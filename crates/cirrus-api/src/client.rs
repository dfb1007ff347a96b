//! HTTP client for the agent backend

use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    stream::ByteStream,
    types::ConversationEntry,
};

/// Backend API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (e.g. `http://localhost:8000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Open the chat event stream.
    ///
    /// Issues exactly one `POST {base}/chat` and returns the raw body as a
    /// chunk stream. Never retries; dropping the stream closes the connection.
    pub async fn stream_chat(
        &self,
        content: &str,
        history: &[ConversationEntry],
    ) -> Result<ByteStream> {
        let url = self.url("chat");
        tracing::debug!(url = %url, history = history.len(), "Opening chat stream");

        let request = ChatRequest {
            content,
            kind: "text",
            metadata: ChatMetadata {
                conversation_history: history,
            },
        };

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(Error::from)),
        ))
    }

    /// Fetch the current cloud resource listing
    pub async fn resources(&self) -> Result<serde_json::Value> {
        self.get_json("gcp/resources").await
    }

    /// Check backend health
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Health endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthStatus {
    /// Whether the backend reports itself healthy
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

// Request types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    metadata: ChatMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMetadata<'a> {
    conversation_history: &'a [ConversationEntry],
}
