use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult};
use crate::models::ChatRequest;
use crate::streaming::ByteStream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait Provider: Send + Sync {
    /// Label used in logs and metrics
    fn id(&self) -> &'static str;

    /// Send the request and hand back the raw response body once the
    /// endpoint has accepted it.
    async fn open_stream(&self, req: &ChatRequest) -> ChatResult<ByteStream>;
}

/// OpenAI-compatible completion endpoint reached over HTTP
pub struct HttpProvider {
    pub endpoint: String,
    pub api_key: String,
    pub client: Client,
}

impl HttpProvider {
    pub fn from_config(config: &ClientConfig) -> ChatResult<Self> {
        let endpoint = config.validate()?;
        let mut builder = Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: config.api_key()?,
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn id(&self) -> &'static str {
        "gateway"
    }

    async fn open_stream(&self, req: &ChatRequest) -> ChatResult<ByteStream> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "completion endpoint rejected request");
            return Err(ChatError::UnexpectedStatus(status, body));
        }
        if resp.content_length() == Some(0) {
            return Err(ChatError::MissingBody);
        }
        debug!(
            content_type = ?resp.headers().get(CONTENT_TYPE),
            "streaming completion response"
        );
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::Stream(e.to_string())));
        Ok(Box::pin(body))
    }
}
