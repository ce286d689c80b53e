use crate::config::ClientConfig;
use crate::error::ChatResult;
use crate::models::{ChatMessage, ChatRequest};
use crate::providers::{HttpProvider, Provider};
use crate::streaming::{assemble, SnapshotStream};
use futures::StreamExt;
use metrics::{counter, decrement_gauge, histogram, increment_gauge};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub struct ChatClient {
    provider: Arc<dyn Provider>,
    model: Option<String>,
    system_prompt: Option<String>,
}

impl ChatClient {
    pub fn new(config: &ClientConfig) -> ChatResult<Self> {
        let provider = Arc::new(HttpProvider::from_config(config)?);
        Ok(Self::with_provider(provider, config))
    }

    pub fn with_provider(provider: Arc<dyn Provider>, config: &ClientConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    fn build_request(&self, history: &[ChatMessage]) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend_from_slice(history);
        let req = ChatRequest::new(messages);
        match &self.model {
            Some(model) => req.with_model(model.clone()),
            None => req,
        }
    }

    /// Start one streamed reply to `history`. Setup failures return `Err`
    /// before any snapshot is produced. There is no retry.
    pub async fn stream_reply(&self, history: &[ChatMessage]) -> ChatResult<SnapshotStream> {
        let provider = self.provider.id();
        let req = self.build_request(history);
        debug!(messages = req.messages.len(), %provider, "opening reply stream");

        increment_gauge!("chat_inflight_requests", 1.0, "provider" => provider);
        let start = Instant::now();
        let opened = self.provider.open_stream(&req).await;
        histogram!("chat_request_latency_seconds", start.elapsed().as_secs_f64(), "provider" => provider);
        decrement_gauge!("chat_inflight_requests", 1.0, "provider" => provider);

        match opened {
            Ok(bytes) => {
                counter!("chat_requests_total", 1, "provider" => provider, "result" => "success");
                let mut first = true;
                let snapshots = assemble(bytes).inspect(move |item| {
                    if first && item.is_ok() {
                        histogram!("chat_first_token_latency_seconds", start.elapsed().as_secs_f64(), "provider" => provider);
                        first = false;
                    }
                });
                Ok(Box::pin(snapshots))
            }
            Err(e) => {
                counter!("chat_requests_total", 1, "provider" => provider, "result" => "error");
                Err(e)
            }
        }
    }
}
