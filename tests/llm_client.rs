//! HTTP-level tests for the chat-completion client against a mock server.

use docsum::domain::SummaryResult;
use docsum::infra::{FileConfig, Settings};
use docsum::llm::{ChatModel, GenerationDefaults, LLMClient, LlmError, RetryPolicy, Summarizer};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-or-test-0123456789";

fn settings(server: &MockServer, extra: &[(&str, &str)]) -> Settings {
    settings_for(&format!("{}/api/v1/chat/completions", server.uri()), extra)
}

fn settings_for(endpoint: &str, extra: &[(&str, &str)]) -> Settings {
    let mut vars: Vec<(String, String)> = vec![
        ("OPENROUTER_API_KEY".to_string(), API_KEY.to_string()),
        ("LLM_API_URL".to_string(), endpoint.to_string()),
        ("LLM_TIMEOUT_SECONDS".to_string(), "5".to_string()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    // Later entries win so per-test overrides replace the base values.
    Settings::resolve(FileConfig::default(), |key| {
        vars.iter().rfind(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
    .expect("settings")
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_retries(max_retries)
        .with_initial_delay(Duration::from_millis(10))
        .with_jitter(Duration::from_millis(5))
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-123",
        "model": "test/model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1000, "completion_tokens": 1000, "total_tokens": 2000}
    })
}

#[tokio::test]
async fn sends_chat_request_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("Authorization", format!("Bearer {API_KEY}").as_str()))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({
            "model": "test/model",
            "messages": [{"role": "user", "content": "Summarize this"}],
            "max_tokens": 120,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("  Short summary.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(&server, &[])).expect("client");
    let result = client
        .invoke("Summarize this", "test/model", 120, 0.2)
        .await
        .expect("completion");

    assert_eq!(result.text, "Short summary.");
    assert_eq!(result.prompt_tokens, Some(1000));
    assert_eq!(result.completion_tokens, Some(1000));
    assert_eq!(result.total_tokens, Some(2000));
    let cost = result.estimated_cost.expect("cost");
    assert!((cost - 0.0035).abs() < 1e-12, "cost was {cost}");
}

#[tokio::test]
async fn accepts_legacy_text_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"text": "\nLegacy summary\n"}]
        })))
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(&server, &[])).expect("client");
    let result = client.invoke("p", "m", 10, 0.0).await.expect("completion");

    assert_eq!(result, SummaryResult::text_only("Legacy summary"));
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("third time lucky")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(&server, &[]))
        .expect("client")
        .with_retry_policy(fast_retries(3));
    let result = client.invoke("p", "m", 10, 0.2).await.expect("completion");

    assert_eq!(result.text, "third time lucky");
}

#[tokio::test]
async fn exhausted_retries_report_last_http_error() {
    let server = MockServer::start().await;
    let long_body = "e".repeat(2000);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(long_body))
        .expect(3)
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(&server, &[]))
        .expect("client")
        .with_retry_policy(fast_retries(2));
    let err = client.invoke("p", "m", 10, 0.2).await.unwrap_err();

    match err {
        LlmError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            match *last {
                LlmError::Http { status, body } => {
                    assert_eq!(status, 500);
                    assert!(body.chars().count() <= 400);
                    assert!(body.ends_with("..."));
                }
                other => panic!("expected Http, got {other:?}"),
            }
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_response_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(&server, &[]))
        .expect("client")
        .with_retry_policy(fast_retries(3));
    let err = client.invoke("p", "m", 10, 0.2).await.unwrap_err();

    assert!(matches!(err, LlmError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn malformed_response_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": [{}]})))
        .expect(2)
        .mount(&server)
        .await;

    let client = LLMClient::new(&settings(
        &server,
        &[("LLM_RETRY_MALFORMED", "true"), ("LLM_MAX_RETRIES", "1")],
    ))
    .expect("client");
    let policy = client
        .resilience()
        .policy()
        .clone()
        .with_initial_delay(Duration::from_millis(10));
    let client = client.with_retry_policy(policy);

    let err = client.invoke("p", "m", 10, 0.2).await.unwrap_err();
    assert!(
        matches!(err, LlmError::RetryExhausted { attempts: 2, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn slow_upstream_times_out_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = settings(&server, &[("LLM_TIMEOUT_SECONDS", "1")]);
    assert_eq!(settings.timeout, Duration::from_secs(1));
    let client = LLMClient::new(&settings)
        .expect("client")
        .with_retry_policy(fast_retries(0));

    let started = std::time::Instant::now();
    let err = client.invoke("p", "m", 10, 0.2).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    match err {
        LlmError::RetryExhausted { attempts: 1, last } => {
            assert!(matches!(*last, LlmError::Timeout { .. }), "got {last:?}");
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    // Bind and immediately release a port so nothing is listening on it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("free port")
        .port();
    let settings = settings_for(&format!("http://127.0.0.1:{port}/v1/chat/completions"), &[]);

    let client = LLMClient::new(&settings)
        .expect("client")
        .with_retry_policy(fast_retries(1));
    let err = client.invoke("p", "m", 10, 0.2).await.unwrap_err();

    match err {
        LlmError::RetryExhausted { attempts: 2, last } => {
            assert!(matches!(*last, LlmError::Network(_)), "got {last:?}");
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn debug_output_masks_the_key() {
    let server = MockServer::start().await;
    let client = LLMClient::new(&settings(&server, &[])).expect("client");

    let debug = format!("{client:?}");
    assert!(!debug.contains(API_KEY));
    assert!(debug.contains("sk-o****6789"));
}

#[tokio::test]
async fn compare_end_to_end_makes_three_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"messages": [{"role": "user"}]})))
        .respond_with(move |request: &wiremock::Request| {
            let body: serde_json::Value = request.body_json().expect("json body");
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            let reply = if prompt.starts_with("Compare the following") {
                "Document 1. It is better."
            } else if prompt.contains("first document") {
                "A is great"
            } else {
                "B is mediocre"
            };
            ResponseTemplate::new(200).set_body_json(chat_completion(reply))
        })
        .expect(3)
        .mount(&server)
        .await;

    let settings = settings(&server, &[]);
    let client = LLMClient::new(&settings).expect("client");
    let summarizer = Summarizer::new(client, GenerationDefaults::from_settings(&settings));

    let result = summarizer
        .compare("The first document text.", "The second document text.")
        .await
        .expect("comparison");

    assert_eq!(result.first.text, "A is great");
    assert_eq!(result.second.text, "B is mediocre");
    assert_eq!(result.verdict.text, "Document 1. It is better.");

    let requests = server.received_requests().await.expect("recorded requests");
    let verdict_request = requests
        .iter()
        .map(|r| r.body_json::<serde_json::Value>().expect("json"))
        .find(|body| {
            body["messages"][0]["content"]
                .as_str()
                .is_some_and(|p| p.starts_with("Compare the following"))
        })
        .expect("verdict request");
    let prompt = verdict_request["messages"][0]["content"].as_str().unwrap_or_default();
    assert!(prompt.contains("A is great"));
    assert!(prompt.contains("B is mediocre"));
}
