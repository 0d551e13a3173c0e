//! Gemini wire behaviour against a local mock server.

use mockito::{Matcher, Server};
use quizgen::{
    AttemptFailure, ClientConfig, Error, GenerationError, GenerationRequest, RecordShape,
    StrictOutputClient,
};
use serde_json::json;

const PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn config(base_url: String) -> ClientConfig {
    ClientConfig {
        base_url,
        http_timeout_secs: 5,
        ..ClientConfig::default()
    }
}

fn reply_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 40, "totalTokenCount": 160 }
    })
    .to_string()
}

fn request() -> GenerationRequest {
    GenerationRequest::builder(
        "You are an expert quiz generator.",
        "Generate EXACTLY 1 hard open-ended questions about \"tides\".",
        RecordShape::new().text("question").text("answer"),
    )
    .expected_count(1)
    .max_attempts(3)
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_generate_content_round_trip() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": { "temperature": 0.2, "topP": 0.9 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body(
            "Sure!\n```json\n[{\"question\": \"What causes tides?\", \"answer\": \"The moon's gravity.\"}]\n```",
        ))
        .create_async()
        .await;

    let client = StrictOutputClient::from_config(&config(server.url()), Some("test-key".into()))
        .unwrap();
    let records = client.generate(&request()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["answer"], "The moon's gravity.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", PATH)
        .with_status(500)
        .with_body("internal")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body(
            "[{\"question\": \"What is a neap tide?\", \"answer\": \"A tide with minimal range.\"}]",
        ))
        .expect(1)
        .create_async()
        .await;

    let client = StrictOutputClient::from_config(&config(server.url()), Some("test-key".into()))
        .unwrap();
    let records = client.generate(&request()).await.unwrap();

    assert_eq!(records[0]["question"], "What is a neap tide?");
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_persistent_rate_limit_exhausts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(429)
        .with_body("{\"error\": {\"status\": \"RESOURCE_EXHAUSTED\"}}")
        .expect(3)
        .create_async()
        .await;

    let client = StrictOutputClient::from_config(&config(server.url()), Some("test-key".into()))
        .unwrap();
    let err = client.generate(&request()).await.unwrap_err();

    match err {
        Error::Generation(GenerationError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            match *last {
                AttemptFailure::Transport(ref t) => assert_eq!(t.status(), Some(429)),
                ref other => panic!("unexpected failure: {other:?}"),
            }
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_blocked_reply_counts_as_extraction_failure() {
    let mut server = Server::new_async().await;
    let blocked = json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(blocked)
        .expect(3)
        .create_async()
        .await;

    let client = StrictOutputClient::from_config(&config(server.url()), Some("test-key".into()))
        .unwrap();
    let err = client.generate(&request()).await.unwrap_err();

    let last = err.as_generation().and_then(|g| g.last_failure());
    assert!(matches!(last, Some(AttemptFailure::Extraction)));
    mock.assert_async().await;
}
