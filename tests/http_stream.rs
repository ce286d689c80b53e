use futures::StreamExt;
use krishi_chat::{
    ChatClient, ChatError, ChatMessage, ChatSession, ClientConfig, Conversation, FALLBACK_REPLY,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAMASTE_BODY: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Na\"}}]}\n\n\
: keep-alive\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"maste\"}}]}\n\n\
data: [DONE]\n";

fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(format!("{}/v1/chat/completions", server.uri()));
    config.api_key = Some("test-token".to_string());
    config
}

#[tokio::test]
async fn streams_reply_from_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "stream": true,
            "messages": [{"role": "user", "content": "Say namaste"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(NAMASTE_BODY),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).unwrap();
    let snapshots: Vec<String> = client
        .stream_reply(&[ChatMessage::user("Say namaste")])
        .await
        .unwrap()
        .map(|s| s.unwrap())
        .collect()
        .await;

    assert_eq!(snapshots, vec!["Na".to_string(), "Namaste".to_string()]);
}

#[tokio::test]
async fn non_success_status_fails_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_string("credits exhausted"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).unwrap();
    let err = client
        .stream_reply(&[ChatMessage::user("hi")])
        .await
        .err()
        .unwrap();
    match err {
        ChatError::UnexpectedStatus(status, body) => {
            assert_eq!(status.as_u16(), 402);
            assert_eq!(body, "credits exhausted");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_body_is_a_setup_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).unwrap();
    let err = client
        .stream_reply(&[ChatMessage::user("hi")])
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatError::MissingBody));
}

#[tokio::test]
async fn session_reports_one_error_and_no_text_on_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server)).unwrap();
    let mut session = ChatSession::new(client, Conversation::new());

    let mut emissions = 0;
    let result = session.send("Price of a rotavator?", |_| emissions += 1).await;

    assert!(result.is_err());
    assert_eq!(emissions, 0);
    assert_eq!(
        session.conversation().messages(),
        &[
            ChatMessage::user("Price of a rotavator?"),
            ChatMessage::assistant(FALLBACK_REPLY),
        ]
    );
}

#[tokio::test]
async fn missing_api_key_is_reported() {
    let server = MockServer::start().await;
    let mut config = ClientConfig::new(format!("{}/v1/chat/completions", server.uri()));
    config.api_key = Some("   ".to_string());
    std::env::remove_var(krishi_chat::config::API_KEY_ENV);

    let err = ChatClient::new(&config).err().unwrap();
    assert!(matches!(err, ChatError::EnvVar(_)));
}
