//! Transport abstraction for opening the chat event stream

use async_trait::async_trait;
use cirrus_api::{ApiClient, ByteStream, ConversationEntry, Result};

/// Opens one chat request and hands back the raw response body.
///
/// Implementations issue exactly one request per call and never retry.
/// Dropping the returned stream must release the connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the user's text with the prior conversation
    async fn send(&self, content: &str, history: &[ConversationEntry]) -> Result<ByteStream>;
}

/// Transport backed by the HTTP chat endpoint
pub struct HttpTransport {
    client: ApiClient,
}

impl HttpTransport {
    /// Create a transport over an existing client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create a transport for the backend at `base_url`
    pub fn from_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self::new(ApiClient::new(base_url)?))
    }

    /// The underlying API client, for the non-streaming endpoints
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, content: &str, history: &[ConversationEntry]) -> Result<ByteStream> {
        self.client.stream_chat(content, history).await
    }
}
