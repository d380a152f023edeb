//! End-to-end integration tests for the gateway.
//!
//! These tests start a real Axum server on a random port, drive it with a
//! reqwest client, and verify the full request flow: CORS preflight, rate
//! limiting, validation, provider dispatch, and fallback degradation.
//! Provider adapters are test doubles with call counters so tests can
//! assert the gateway never reaches a provider when it must not.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use burmemark_gateway::error::ProviderError;
use burmemark_gateway::fallback::FallbackGenerator;
use burmemark_gateway::gateway::{GatewayState, start_server};
use burmemark_gateway::providers::{GenerateOptions, ProviderAdapter, ProviderOutput};
use burmemark_gateway::ratelimit::SlidingWindowLimiter;

const APP_NAME: &str = "Burme Mark AI";

type MockBehavior = Box<dyn Fn() -> Result<ProviderOutput, ProviderError> + Send + Sync>;

/// Call-counting provider test double.
struct MockProvider {
    name: &'static str,
    calls: AtomicUsize,
    behavior: MockBehavior,
}

impl MockProvider {
    fn new(
        name: &'static str,
        behavior: impl Fn() -> Result<ProviderOutput, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
            behavior: Box::new(behavior),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(
        &self,
        _instruction: &str,
        _input: &str,
        _options: &GenerateOptions,
    ) -> Result<ProviderOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.behavior)()
    }
}

fn rate_limited(provider: &str) -> ProviderError {
    ProviderError::RateLimited {
        provider: provider.to_string(),
    }
}

fn test_state(
    chat: Option<Arc<MockProvider>>,
    image: Option<Arc<MockProvider>>,
    code: Option<Arc<MockProvider>>,
    max_requests: usize,
) -> Arc<GatewayState> {
    let as_adapter = |p: Arc<MockProvider>| p as Arc<dyn ProviderAdapter>;
    Arc::new(GatewayState {
        app_name: APP_NAME.to_string(),
        debug_errors: false,
        chat_provider: chat.map(as_adapter),
        image_provider: image.map(as_adapter),
        code_provider: code.map(as_adapter),
        chat_options: GenerateOptions::default(),
        code_options: GenerateOptions::default(),
        fallback: FallbackGenerator::new(true),
        rate_limiter: SlidingWindowLimiter::new(max_requests, Duration::from_secs(60)),
        shutdown_tx: tokio::sync::RwLock::new(None),
    })
}

fn is_bind_permission_error<E: std::fmt::Display>(err: &E) -> bool {
    err.to_string().contains("Operation not permitted")
        || err.to_string().contains("Failed to bind")
}

async fn start_test_server(state: Arc<GatewayState>) -> Option<SocketAddr> {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    match start_server(addr, state).await {
        Ok(bound) => Some(bound),
        Err(e) if is_bind_permission_error(&e) => None,
        Err(e) => panic!("failed to start test server: {e:?}"),
    }
}

async fn post_json(addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .expect("request");
    let status = response.status().as_u16();
    let body: Value = response.json().await.expect("json body");
    (status, body)
}

#[tokio::test]
async fn health_is_idempotent_and_unconditional() {
    let state = test_state(None, None, None, 1);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let client = reqwest::Client::new();
    for _ in 0..3 {
        let response = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status().as_u16(), 200);
        let powered_by = response
            .headers()
            .get("x-powered-by")
            .expect("x-powered-by header")
            .to_str()
            .expect("header value");
        assert_eq!(powered_by, APP_NAME);
        let body: Value = response.json().await.expect("json body");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["app"], APP_NAME);
        assert_eq!(body["services"]["chat"], false);
        assert_eq!(body["services"]["image"], false);
    }
}

#[tokio::test]
async fn health_bypasses_rate_limiting() {
    // Limiter allows one request; exhaust it, then health must still work.
    let state = test_state(None, None, None, 1);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, _) = post_json(addr, "/api/chat", json!({"message": "hi"})).await;
    assert_eq!(status, 200);
    let (status, body) = post_json(addr, "/api/chat", json!({"message": "hi"})).await;
    assert_eq!(status, 429);
    assert_eq!(body["error"], "Rate limit exceeded");

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn options_preflight_carries_cors_headers() {
    let state = test_state(None, None, None, 10);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let client = reqwest::Client::new();
    let response = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/api/chat"))
        .header("origin", "https://burmemark.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .expect("request");

    assert!(
        response.status().as_u16() == 200 || response.status().as_u16() == 204,
        "unexpected status {}",
        response.status()
    );
    let headers = response.headers().clone();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    let methods = headers
        .get("access-control-allow-methods")
        .expect("allow-methods header")
        .to_str()
        .unwrap()
        .to_uppercase();
    assert!(methods.contains("GET"));
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));
    let allow_headers = headers
        .get("access-control-allow-headers")
        .expect("allow-headers header")
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allow_headers.contains("content-type"));
    assert!(response.bytes().await.expect("body").is_empty());
}

#[tokio::test]
async fn missing_message_is_rejected_before_any_provider_call() {
    let chat = MockProvider::new("openai", || Ok(ProviderOutput::Text("hello".to_string())));
    let state = test_state(Some(chat.clone()), None, None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(addr, "/api/chat", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Bad request");
    assert_eq!(body["message"], "message is required");

    let (status, _) = post_json(addr, "/api/chat", json!({"message": ""})).await;
    assert_eq!(status, 400);

    let (status, body) = post_json(addr, "/api/image", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "prompt is required");

    let (status, _) = post_json(addr, "/api/code", json!({"language": "python"})).await;
    assert_eq!(status, 400);

    assert_eq!(chat.call_count(), 0);
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let state = test_state(None, None, None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let client = reqwest::Client::new();
    for path in ["/api/chat", "/api/image", "/api/code"] {
        let response = client
            .get(format!("http://{addr}{path}"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status().as_u16(), 405, "path {path}");
        let body: Value = response.json().await.expect("json body");
        assert_eq!(body["error"], "Method not allowed");
    }
}

#[tokio::test]
async fn unknown_path_returns_404_with_available_endpoints() {
    let state = test_state(None, None, None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/nope"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Endpoint not found");
    let endpoints = body["available_endpoints"].as_array().expect("endpoints");
    assert!(endpoints.contains(&json!("/api/chat")));
    assert!(endpoints.contains(&json!("/health")));
}

#[tokio::test]
async fn chat_uses_provider_when_it_succeeds() {
    let chat = MockProvider::new("openai", || {
        Ok(ProviderOutput::Text("မင်္ဂလာပါ".to_string()))
    });
    let state = test_state(Some(chat.clone()), None, None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(addr, "/api/chat", json!({"message": "hello"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "provider");
    assert_eq!(body["response"], "မင်္ဂလာပါ");
    assert_eq!(body["app"], APP_NAME);
    assert!(body["timestamp"].as_str().is_some());
    assert_eq!(chat.call_count(), 1);
}

#[tokio::test]
async fn chat_falls_back_on_every_recoverable_failure() {
    let behaviors: Vec<(&str, MockBehavior)> = vec![
        ("rate_limited", Box::new(|| Err(rate_limited("openai")))),
        (
            "unavailable",
            Box::new(|| {
                Err(ProviderError::Unavailable {
                    provider: "openai".to_string(),
                    status: 503,
                    message: "down".to_string(),
                })
            }),
        ),
        (
            "network",
            Box::new(|| {
                Err(ProviderError::Network {
                    provider: "openai".to_string(),
                    reason: "timeout".to_string(),
                })
            }),
        ),
        (
            "invalid_response",
            Box::new(|| {
                Err(ProviderError::InvalidResponse {
                    provider: "openai".to_string(),
                    reason: "missing choices[0].message.content".to_string(),
                })
            }),
        ),
    ];

    for (kind, behavior) in behaviors {
        let chat = Arc::new(MockProvider {
            name: "openai",
            calls: AtomicUsize::new(0),
            behavior,
        });
        let state = test_state(Some(chat.clone()), None, None, 100);
        let Some(addr) = start_test_server(state).await else {
            return;
        };

        let (status, body) = post_json(addr, "/api/chat", json!({"message": "sum check"})).await;
        assert_eq!(status, 200, "failure kind {kind}");
        assert_eq!(body["source"], "fallback", "failure kind {kind}");
        // Interpolating fallback carries the caller's original message.
        assert!(
            body["response"].as_str().unwrap().contains("sum check"),
            "failure kind {kind}: {body}"
        );
        assert_eq!(chat.call_count(), 1);
    }
}

#[tokio::test]
async fn image_provider_success_returns_data_url() {
    let image = MockProvider::new("stability", || {
        Ok(ProviderOutput::Binary(vec![0x89, 0x50, 0x4e, 0x47]))
    });
    let state = test_state(None, Some(image.clone()), None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(addr, "/api/image", json!({"prompt": "sunset"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "provider");
    assert_eq!(body["prompt"], "sunset");
    let data_url = body["image"].as_str().expect("image field");
    assert!(data_url.starts_with("data:image/png;base64,"));
    assert!(body.get("image_url").is_none());
    assert!(body["image_id"].as_str().is_some());
}

#[tokio::test]
async fn image_falls_back_to_placeholder_on_provider_429() {
    let image = MockProvider::new("stability", || Err(rate_limited("stability")));
    let state = test_state(None, Some(image.clone()), None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(addr, "/api/image", json!({"prompt": "golden sunset"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "fallback");
    let url = body["image_url"].as_str().expect("image_url field");
    assert!(url.contains("golden%20sunset"), "url: {url}");
    assert!(body.get("image").is_none());
    assert_eq!(
        body["note"],
        "Using placeholder image due to API limitations"
    );
    assert_eq!(image.call_count(), 1);
}

#[tokio::test]
async fn code_fallback_serves_python_template() {
    let code = MockProvider::new("openai", || Err(rate_limited("openai")));
    let state = test_state(None, None, Some(code.clone()), 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(
        addr,
        "/api/code",
        json!({"prompt": "sum two numbers", "language": "python"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["language"], "python");
    let snippet = body["code"].as_str().expect("code field");
    assert!(snippet.starts_with('#'));
    assert!(snippet.contains("def"));
}

#[tokio::test]
async fn code_language_defaults_to_javascript() {
    let state = test_state(None, None, None, 100);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let (status, body) = post_json(addr, "/api/code", json!({"prompt": "sort an array"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["language"], "javascript");
    assert_eq!(body["source"], "fallback");
}

#[tokio::test]
async fn eleventh_rapid_call_is_rate_limited() {
    let chat = MockProvider::new("openai", || Ok(ProviderOutput::Text("ok".to_string())));
    let state = test_state(Some(chat.clone()), None, None, 10);
    let Some(addr) = start_test_server(state).await else {
        return;
    };

    let client = reqwest::Client::new();
    for i in 0..10 {
        let response = client
            .post(format!("http://{addr}/api/chat"))
            .header("x-forwarded-for", "203.0.113.7")
            .json(&json!({"message": "hi"}))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status().as_u16(), 200, "call {}", i + 1);
    }

    let response = client
        .post(format!("http://{addr}/api/chat"))
        .header("x-forwarded-for", "203.0.113.7")
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 429);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Rate limit exceeded");
    // The rejected call never reached the provider.
    assert_eq!(chat.call_count(), 10);

    // A different client identity still gets through.
    let response = client
        .post(format!("http://{addr}/api/chat"))
        .header("x-forwarded-for", "198.51.100.9")
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
}
