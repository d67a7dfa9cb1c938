//! End-to-end tests of `POST /api/chat` against a mocked OpenAI API.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use terra_app_server::api::SESSION_ID_HEADER;
use terra_app_server::{AppState, ServerConfig, create_router_with_state};
use terra_engine::{DEFAULT_SESSION_ID, Message, MessageRole, SYSTEM_PROMPT};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

fn setup(server: &MockServer, api_key: Option<&str>) -> (Arc<AppState>, Router) {
    setup_with(server, api_key, ServerConfig::default())
}

fn setup_with(
    server: &MockServer,
    api_key: Option<&str>,
    mut config: ServerConfig,
) -> (Arc<AppState>, Router) {
    config.provider.openai_api_key = api_key.map(String::from);
    config.provider.openai_base_url = server.uri();
    let state = Arc::new(AppState::new(config).expect("state"));
    let router = create_router_with_state(Arc::clone(&state));
    (state, router)
}

async fn post_chat(router: &Router, body: &str, session: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        request = request.header(SESSION_ID_HEADER, session);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn history(state: &AppState, session: &str) -> Vec<Message> {
    state
        .conversations
        .sessions()
        .snapshot(session)
        .await
        .unwrap_or_default()
}

#[tokio::test]
async fn first_message_gets_reply_and_grows_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("Composting is..."))
        .expect(1)
        .mount(&server)
        .await;
    let (state, router) = setup(&server, Some("sk-test"));

    let (status, body) = post_chat(&router, r#"{"message": "What is composting?"}"#, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": "Composting is..."}));
    assert_eq!(
        history(&state, DEFAULT_SESSION_ID).await,
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user("What is composting?"),
            Message::assistant("Composting is..."),
        ]
    );
}

#[tokio::test]
async fn unusable_messages_get_fixed_400() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let (state, router) = setup(&server, Some("sk-test"));

    for body in [r#"{"message": ""}"#, "{}", r#"{"message": 42}"#, "not json"] {
        let (status, reply) = post_chat(&router, body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(reply, json!({"reply": "Please provide a message."}));
    }

    assert!(state.conversations.sessions().is_empty().await);
}

#[tokio::test]
async fn provider_failure_gets_fixed_500_and_keeps_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;
    let (state, router) = setup(&server, Some("sk-test"));

    let (status, body) = post_chat(&router, r#"{"message": "Is solar power clean?"}"#, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"reply": "OpenAI API error occurred."}));
    assert_eq!(
        history(&state, DEFAULT_SESSION_ID).await,
        vec![Message::system(SYSTEM_PROMPT)]
    );
}

#[tokio::test]
async fn missing_api_key_fails_without_calling_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let (_state, router) = setup(&server, None);

    let (status, body) = post_chat(&router, r#"{"message": "hello"}"#, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"reply": "OpenAI API error occurred."}));
}

#[tokio::test]
async fn eight_exchanges_keep_system_and_last_six() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("noted"))
        .expect(8)
        .mount(&server)
        .await;
    let (state, router) = setup(&server, Some("sk-test"));

    for n in 1..=8 {
        let body = json!({"message": format!("question {n}")}).to_string();
        let (status, _) = post_chat(&router, &body, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let messages = history(&state, DEFAULT_SESSION_ID).await;
    assert_eq!(messages.len(), 7);
    assert_eq!(messages[0], Message::system(SYSTEM_PROMPT));
    let users: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(users, vec!["question 6", "question 7", "question 8"]);

    // The eighth request carried the seven retained messages plus the new one.
    let requests = server.received_requests().await.unwrap();
    let last: Value = serde_json::from_slice(&requests[7].body).unwrap();
    assert_eq!(last["messages"].as_array().unwrap().len(), 8);
    assert_eq!(last["model"], "gpt-3.5-turbo");
}

#[tokio::test]
async fn sessions_are_selected_by_body_or_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("hi"))
        .mount(&server)
        .await;
    let (state, router) = setup(&server, Some("sk-test"));

    post_chat(&router, r#"{"message": "from alice"}"#, Some("alice")).await;
    post_chat(&router, r#"{"message": "from bob", "session_id": "bob"}"#, Some("alice")).await;

    let alice = history(&state, "alice").await;
    let bob = history(&state, "bob").await;
    assert_eq!(alice.len(), 3);
    assert_eq!(alice[1], Message::user("from alice"));
    assert_eq!(bob.len(), 3);
    assert_eq!(bob[1], Message::user("from bob"));
    assert!(history(&state, DEFAULT_SESSION_ID).await.is_empty());
}

#[tokio::test]
async fn oversized_body_gets_413() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let mut config = ServerConfig::default();
    config.max_body_size = 256;
    let (state, router) = setup_with(&server, Some("sk-test"), config);

    let body = json!({"message": "trees ".repeat(100)}).to_string();
    let (status, reply) = post_chat(&router, &body, None).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply, json!({"reply": "Message is too large."}));
    assert!(state.conversations.sessions().is_empty().await);
}

#[tokio::test]
async fn client_chosen_session_ids_are_capped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("hi"))
        .mount(&server)
        .await;
    let mut config = ServerConfig::default();
    config.conversation.max_sessions = 5;
    let (state, router) = setup_with(&server, Some("sk-test"), config);

    for n in 0..20 {
        let session = format!("client-{n}");
        let (status, _) = post_chat(&router, r#"{"message": "hello"}"#, Some(&session)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(state.conversations.sessions().len().await, 5);
    assert_eq!(history(&state, "client-19").await.len(), 3);
}
