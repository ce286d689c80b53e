//! Streaming chat client for the farming assistant of the Krishi marketplace.
//!
//! Sends the conversation to an OpenAI-compatible chat-completion endpoint and
//! assembles the Server-Sent-Events reply into live snapshots of the full
//! reply text.

pub mod assembler;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod providers;
pub mod session;
pub mod streaming;
pub mod utf8;

// Re-export main types for convenience
pub use assembler::StreamAssembler;
pub use client::ChatClient;
pub use config::ClientConfig;
pub use conversation::Conversation;
pub use error::{ChatError, ChatResult};
pub use models::{ChatMessage, ChatRequest, MessageRole};
pub use providers::{HttpProvider, Provider};
pub use session::{ChatSession, FALLBACK_REPLY};
pub use streaming::{assemble, ByteStream, SnapshotStream};

/// Initialize the logging system
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
