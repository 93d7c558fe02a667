//! OpenAiClient against a mock chat-completions endpoint

use std::time::Duration;

use leadwell_common::config::ReasoningSettings;
use leadwell_server::services::{OpenAiClient, ReasoningClient, ReasoningError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, timeout: Duration) -> ReasoningSettings {
    ReasoningSettings {
        api_key: "sk-test-key".to_string(),
        model: "gpt-4o".to_string(),
        // Trailing slash must not produce a double slash
        base_url: format!("{}/v1/", server.uri()),
        timeout,
    }
}

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(&settings(server, Duration::from_secs(5))).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

#[tokio::test]
async fn test_complete_json_sends_json_mode_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "response_format": { "type": "json_object" },
            "messages": [{ "role": "user", "content": "Score this lead" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"score": 82, "reason": "Referral"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let value = client(&server).complete_json("Score this lead").await.unwrap();

    assert_eq!(value["score"], 82);
    assert_eq!(value["reason"], "Referral");
}

#[tokio::test]
async fn test_complete_text_returns_trimmed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Good call, send estimate.\n")))
        .mount(&server)
        .await;

    let text = client(&server).complete_text("Summarize").await.unwrap();

    assert_eq!(text, "Good call, send estimate.");
}

#[tokio::test]
async fn test_api_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client(&server).complete_json("anything").await.unwrap_err();

    match err {
        ReasoningError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = client(&server).complete_text("anything").await.unwrap_err();

    assert!(matches!(err, ReasoningError::EmptyResponse));
}

#[tokio::test]
async fn test_non_json_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sure! Here is your JSON:")))
        .mount(&server)
        .await;

    let err = client(&server).complete_json("anything").await.unwrap_err();

    assert!(matches!(err, ReasoningError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&settings(&server, Duration::from_millis(200))).unwrap();
    let err = client.complete_text("anything").await.unwrap_err();

    assert!(matches!(err, ReasoningError::Timeout));
}
