use crate::client::ChatClient;
use crate::conversation::Conversation;
use crate::error::{ChatError, ChatResult};
use futures::StreamExt;
use tracing::{error, info, info_span, Instrument};

/// Shown as a new assistant entry whenever a reply fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't process your request right now. Please try again.";

/// A chat with the farming assistant.
///
/// `send` takes `&mut self`, so only one reply can be in flight at a time.
pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(client: ChatClient, conversation: Conversation) -> Self {
        Self {
            client,
            conversation,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send `input` and stream the reply into the conversation.
    ///
    /// `on_update` receives the full reply text after every fragment. On
    /// failure the partial reply is kept, [`FALLBACK_REPLY`] is appended after
    /// it and the error is returned.
    pub async fn send<F>(&mut self, input: &str, on_update: F) -> ChatResult<()>
    where
        F: FnMut(&str),
    {
        let input = input.trim();
        if input.is_empty() {
            return Err(ChatError::InvalidRequest("message is empty".to_string()));
        }

        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("chat_exchange", request_id = %request_id);
        self.conversation.push_user(input);

        let outcome = self.stream_into_log(on_update).instrument(span.clone()).await;
        let _entered = span.enter();
        match outcome {
            Ok(updates) => {
                self.conversation.close_reply();
                info!(updates, "reply complete");
                Ok(())
            }
            Err(e) => {
                if e.is_setup_failure() {
                    error!(error = %e, status = ?e.status_code(), "reply request rejected");
                } else {
                    let partial = self.conversation.is_streaming();
                    error!(error = %e, partial, "reply stream broke off");
                }
                self.conversation.push_assistant(FALLBACK_REPLY);
                Err(e)
            }
        }
    }

    async fn stream_into_log<F>(&mut self, mut on_update: F) -> ChatResult<usize>
    where
        F: FnMut(&str),
    {
        let history = self.conversation.request_messages();
        let mut snapshots = self.client.stream_reply(&history).await?;
        let mut updates = 0;
        while let Some(snapshot) = snapshots.next().await {
            let snapshot = snapshot?;
            self.conversation.upsert_streaming_reply(&snapshot);
            on_update(&snapshot);
            updates += 1;
        }
        Ok(updates)
    }
}
