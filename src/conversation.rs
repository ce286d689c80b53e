//! Ordered conversation log shown to the user.
//!
//! Only the trailing entry may change: while a reply streams in, it is the
//! active slot and each snapshot overwrites its content. Every earlier entry
//! is immutable once committed.

use crate::models::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    has_greeting: bool,
    reply_open: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an assistant greeting that is displayed but never sent upstream.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
            has_greeting: true,
            reply_open: false,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.close_reply();
        self.messages.push(ChatMessage::user(content));
    }

    /// Append a new assistant entry for the first fragment of a reply, or
    /// replace the content of the active one for later fragments.
    pub fn upsert_streaming_reply(&mut self, full_text: &str) {
        if self.reply_open {
            if let Some(last) = self.messages.last_mut() {
                last.content.clear();
                last.content.push_str(full_text);
                return;
            }
        }
        self.messages.push(ChatMessage::assistant(full_text));
        self.reply_open = true;
    }

    /// Commit the active reply, if any.
    pub fn close_reply(&mut self) {
        self.reply_open = false;
    }

    /// Append a committed assistant entry after any open reply.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.close_reply();
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Messages to send upstream: the conversation without the greeting.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        let skip = usize::from(self.has_greeting);
        self.messages
            .iter()
            .skip(skip)
            .cloned()
            .collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.reply_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_fragment_appends_then_overwrites() {
        let mut log = Conversation::new();
        log.push_user("Tractor rent in Nashik?");
        log.upsert_streaming_reply("About");
        log.upsert_streaming_reply("About ₹800");
        log.upsert_streaming_reply("About ₹800 per hour.");

        assert_eq!(log.len(), 2);
        assert!(log.is_streaming());
        assert_eq!(log.last(), Some(&ChatMessage::assistant("About ₹800 per hour.")));

        log.close_reply();
        assert!(!log.is_streaming());
    }

    #[test]
    fn committed_entries_stay_put() {
        let mut log = Conversation::new();
        log.push_user("first");
        log.upsert_streaming_reply("reply one");
        log.push_user("second");
        log.upsert_streaming_reply("reply two");

        assert_eq!(
            log.messages(),
            &[
                ChatMessage::user("first"),
                ChatMessage::assistant("reply one"),
                ChatMessage::user("second"),
                ChatMessage::assistant("reply two"),
            ]
        );
    }

    #[test]
    fn fallback_lands_after_partial_reply() {
        let mut log = Conversation::new();
        log.push_user("Weather for sowing?");
        log.upsert_streaming_reply("Expect rain");
        log.push_assistant("Sorry, something went wrong.");
        log.upsert_streaming_reply("late fragment");

        assert_eq!(log.len(), 4);
        assert_eq!(log.messages()[1].content, "Expect rain");
        assert_eq!(log.messages()[2].content, "Sorry, something went wrong.");
        assert_eq!(log.messages()[3].content, "late fragment");
    }

    #[test]
    fn greeting_is_not_sent_upstream() {
        let mut log = Conversation::with_greeting("Namaste! How can I help your farm today?");
        assert_eq!(log.len(), 1);
        assert!(log.request_messages().is_empty());

        log.push_user("Best fertilizer for paddy?");
        assert_eq!(
            log.request_messages(),
            vec![ChatMessage::user("Best fertilizer for paddy?")]
        );
    }
}
