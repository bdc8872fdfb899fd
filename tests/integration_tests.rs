//! Integration tests using wiremock to simulate HTTP servers.

use async_trait::async_trait;
use callhook::plugin::{Plugin, PluginInitContext, PluginInitResult};
use callhook::transport::{Transport, TransportRequest, TransportResponse};
use callhook::{
    AbortController, CallConfig, CallOutput, Client, DedupeStrategy, Error, ErrorKind, HookEvent,
    Hooks, Outcome, Params, Result, ResultMode, RetryStrategy,
};
use futures::stream::{self, StreamExt};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Widget {
    id: u32,
    name: String,
}

fn widget() -> Widget {
    Widget {
        id: 42,
        name: "sprocket".to_string(),
    }
}

fn client_for(mock_server: &MockServer) -> Client {
    Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap()
}

/// Hooks that append `<event>` to `log` for every event they see.
fn recording_hooks(log: &Arc<Mutex<Vec<String>>>) -> Hooks {
    let events = [
        HookEvent::BeforeRequest,
        HookEvent::Request,
        HookEvent::Response,
        HookEvent::Success,
        HookEvent::RequestError,
        HookEvent::ResponseError,
        HookEvent::Retry,
        HookEvent::Error,
    ];
    let mut hooks = Hooks::new();
    for event in events {
        let log = log.clone();
        hooks.add(event, move |ctx| {
            let log = log.clone();
            async move {
                log.lock().push(ctx.event.as_str().to_string());
                Ok(())
            }
        });
    }
    hooks
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let output = client.get::<Widget>("/widgets/42").await.unwrap();

    match output.into_outcome() {
        Some(Outcome::Success { data, response }) => {
            assert_eq!(data, widget());
            assert_eq!(response.status, StatusCode::OK);
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/widgets"))
        .and(body_json(serde_json::json!({ "name": "sprocket" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(widget()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let data = client
        .post::<Widget, _>("/widgets", &serde_json::json!({ "name": "sprocket" }))
        .await
        .unwrap()
        .into_data();

    assert_eq!(data, Some(widget()));
}

#[tokio::test]
async fn test_retries_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .mount(&mock_server)
        .await;

    let retried_attempts = Arc::new(Mutex::new(Vec::new()));
    let seen = retried_attempts.clone();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .config(
            CallConfig::new()
                .retry_attempts(2)
                .retry_delay(Duration::from_millis(10)),
        )
        .build()
        .unwrap();

    let output = client
        .call::<Widget>(
            "/widgets/:id",
            CallConfig::new()
                .params(Params::named([("id", 42)]))
                .hook(HookEvent::Retry, move |ctx| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().push(ctx.attempt);
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    assert_eq!(output.into_data(), Some(widget()));
    assert_eq!(*retried_attempts.lock(), vec![1, 2]);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_resolve_to_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let output = client
        .call::<Widget>(
            "/flaky",
            CallConfig::new()
                .retry_attempts(2)
                .retry_delay(Duration::from_millis(5)),
        )
        .await
        .unwrap();

    match output.into_outcome() {
        Some(Outcome::HttpError { error, response }) => {
            assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
            assert_eq!(response.text(), "Server error");
        }
        other => panic!("Expected an HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_is_never_retried_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .config(
            CallConfig::new()
                .retry_attempts(3)
                .retry_delay(Duration::from_millis(5)),
        )
        .build()
        .unwrap();

    let output = client.delete::<serde_json::Value>("/widgets/42").await.unwrap();
    let outcome = output.into_outcome().unwrap();
    assert_eq!(outcome.error().map(Error::kind), Some(ErrorKind::Http));
}

#[tokio::test]
async fn test_retry_status_codes_allow_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let output = client
        .call::<serde_json::Value>(
            "/missing",
            CallConfig::new()
                .retry_attempts(3)
                .retry_delay(Duration::from_millis(5))
                .retry_status_codes([502, 503, 504]),
        )
        .await
        .unwrap();

    assert!(!output.into_outcome().unwrap().is_success());
}

#[tokio::test]
async fn test_exponential_retry_delays() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let delays = Arc::new(Mutex::new(Vec::new()));
    let seen = delays.clone();
    let client = client_for(&mock_server);
    let _ = client
        .call::<serde_json::Value>(
            "/down",
            CallConfig::new()
                .retry_attempts(3)
                .retry_strategy(RetryStrategy::Exponential)
                .retry_delay(Duration::from_millis(5))
                .retry_max_delay(Duration::from_millis(30))
                .hook(HookEvent::Retry, move |ctx| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().push(ctx.retry_delay);
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    assert_eq!(
        *delays.lock(),
        vec![
            Some(Duration::from_millis(10)),
            Some(Duration::from_millis(20)),
            Some(Duration::from_millis(30)),
        ]
    );
}

#[tokio::test]
async fn test_hook_order_on_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .mount(&mock_server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let client = client_for(&mock_server);
    client
        .call::<Widget>("/widgets/42", CallConfig::new().hooks(recording_hooks(&log)))
        .await
        .unwrap();

    assert_eq!(
        *log.lock(),
        vec!["beforeRequest", "request", "response", "success"]
    );
}

#[tokio::test]
async fn test_hook_order_on_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let client = client_for(&mock_server);
    client
        .call::<Widget>("/broken", CallConfig::new().hooks(recording_hooks(&log)))
        .await
        .unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "beforeRequest",
            "request",
            "response",
            "responseError",
            "error"
        ]
    );
}

#[tokio::test]
async fn test_base_and_call_hooks_both_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .mount(&mock_server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let base_log = log.clone();
    let call_log = log.clone();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .config(CallConfig::new().hook(HookEvent::Success, move |_| {
            let log = base_log.clone();
            async move {
                log.lock().push("base");
                Ok(())
            }
        }))
        .build()
        .unwrap();

    client
        .call::<Widget>(
            "/widgets/42",
            CallConfig::new()
                .hooks_execution_mode(callhook::HooksExecutionMode::Sequential)
                .hook(HookEvent::Success, move |_| {
                    let log = call_log.clone();
                    async move {
                        log.lock().push("call");
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    assert_eq!(*log.lock(), vec!["base", "call"]);
}

#[tokio::test]
async fn test_request_hook_sets_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .and(header("x-attempt", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let output = client
        .call::<Widget>(
            "/widgets/42",
            CallConfig::new().hook(HookEvent::Request, |ctx| async move {
                ctx.request.set_header("x-attempt", ctx.attempt.to_string())
            }),
        )
        .await
        .unwrap();

    assert_eq!(output.into_data(), Some(widget()));
}

struct VersionedApi;

#[async_trait]
impl Plugin for VersionedApi {
    fn id(&self) -> &str {
        "versioned-api"
    }

    async fn init(&self, ctx: PluginInitContext) -> Result<PluginInitResult> {
        Ok(PluginInitResult {
            url: Some(format!("/v2{}", ctx.url)),
            ..PluginInitResult::default()
        })
    }

    fn hooks(&self) -> Hooks {
        Hooks::new().on(HookEvent::Request, |ctx| async move {
            ctx.request.set_header("x-api-version", "2")
        })
    }
}

#[tokio::test]
async fn test_plugin_rewrites_url_and_contributes_hooks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/widgets/42"))
        .and(header("x-api-version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(VersionedApi)];
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .config(CallConfig::new().plugins(plugins))
        .build()
        .unwrap();

    let output = client.get::<Widget>("/widgets/42").await.unwrap();
    assert_eq!(output.into_data(), Some(widget()));
}

struct Unauthorized;

#[async_trait]
impl Plugin for Unauthorized {
    fn id(&self) -> &str {
        "auth"
    }

    async fn init(&self, _ctx: PluginInitContext) -> Result<PluginInitResult> {
        Err(Error::plugin("auth", "no token available"))
    }
}

#[tokio::test]
async fn test_plugin_init_failure_fails_the_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Unauthorized)];
    let client = client_for(&mock_server);
    let result = client
        .call::<serde_json::Value>("/widgets", CallConfig::new().plugins(plugins))
        .await;

    match result {
        Err(Error::Plugin { id, .. }) => assert_eq!(id, "auth"),
        other => panic!("Expected a plugin error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_message_from_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/7"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "message": "widget not found", "code": 17 })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let outcome = client
        .get::<Widget>("/widgets/7")
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    let error = outcome.error().unwrap();
    assert_eq!(error.to_string(), "widget not found");
    assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(error.error_data().unwrap()["code"], 17);
}

#[tokio::test]
async fn test_default_error_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let outcome = client
        .call::<Widget>(
            "/busy",
            CallConfig::new().default_error_message("The widget service is unavailable"),
        )
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    let error = outcome.error().unwrap();
    assert_eq!(error.to_string(), "The widget service is unavailable");
    assert_eq!(error.raw_response(), Some("overloaded"));
}

#[tokio::test]
async fn test_result_modes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let data = client
        .call::<Widget>("/gone", CallConfig::new().result_mode(ResultMode::OnlySuccess))
        .await
        .unwrap();
    assert!(matches!(data, CallOutput::Data(None)));

    let response = client
        .call::<Widget>("/gone", CallConfig::new().result_mode(ResultMode::OnlyResponse))
        .await
        .unwrap()
        .into_response()
        .unwrap();
    assert_eq!(response.status, StatusCode::GONE);

    let thrown = client
        .call::<Widget>(
            "/gone",
            CallConfig::new().result_mode(ResultMode::OnlySuccessWithException),
        )
        .await;
    assert!(matches!(thrown, Err(Error::Http { status, .. }) if status == StatusCode::GONE));
}

#[tokio::test]
async fn test_throw_on_error_overrides_result_mode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .call::<Widget>("/teapot", CallConfig::new().throw_on_error(true))
        .await;
    assert!(matches!(result, Err(Error::Http { .. })));

    let result = client
        .call::<Widget>(
            "/teapot",
            CallConfig::new().throw_on_error(callhook::ThrowOnError::when(|ctx| {
                ctx.error.status() == Some(StatusCode::INTERNAL_SERVER_ERROR)
            })),
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_failing_success_hook_resolves_to_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rejecting = || {
        CallConfig::new().hook(HookEvent::Success, |_| async {
            Err(Error::hook(HookEvent::Success, "widget rejected"))
        })
    };

    let outcome = client
        .call::<Widget>("/widgets/42", rejecting())
        .await
        .unwrap()
        .into_outcome()
        .unwrap();
    match outcome {
        Outcome::TransportError { error } => {
            assert!(matches!(error, Error::Hook { event: HookEvent::Success, .. }));
            assert_eq!(error.to_string(), "widget rejected");
            assert_eq!(error.kind(), ErrorKind::Other);
        }
        other => panic!("Expected the hook error, got {:?}", other),
    }

    let result = client
        .call::<Widget>("/widgets/42", rejecting().throw_on_error(true))
        .await;
    assert!(matches!(result, Err(Error::Hook { .. })));
}

#[tokio::test]
async fn test_failing_response_hook_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(widget()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let output = client
        .call::<Widget>(
            "/widgets/42",
            CallConfig::new()
                .retry_attempts(1)
                .retry_delay(Duration::from_millis(5))
                .hook(HookEvent::Response, |ctx| async move {
                    if ctx.attempt == 1 {
                        Err(Error::hook(HookEvent::Response, "stale cache"))
                    } else {
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    assert_eq!(output.into_data(), Some(widget()));
}

#[tokio::test]
async fn test_failing_error_hook_replaces_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let seen_status = Arc::new(Mutex::new(None));
    let client = client_for(&mock_server);
    let result = client
        .call::<Widget>(
            "/widgets/42",
            CallConfig::new()
                .hook(HookEvent::ResponseError, |_| async {
                    Err(Error::hook(HookEvent::ResponseError, "alerting failed"))
                })
                .throw_on_error(callhook::ThrowOnError::when({
                    let seen_status = seen_status.clone();
                    move |ctx| {
                        *seen_status.lock() = ctx.response.as_ref().map(|r| r.status);
                        false
                    }
                })),
        )
        .await
        .unwrap();

    match result.into_outcome() {
        Some(Outcome::TransportError { error }) => {
            assert_eq!(error.to_string(), "alerting failed");
        }
        other => panic!("Expected the hook error, got {:?}", other),
    }
    assert_eq!(*seen_status.lock(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "unexpected": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let outcome = client
        .get::<Widget>("/widgets/42")
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    match outcome {
        Outcome::TransportError {
            error: Error::DeserializationFailed { raw_response, .. },
        } => assert!(raw_response.contains("unexpected")),
        other => panic!("Expected DeserializationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(widget())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let outcome = client.get::<Widget>("/slow").await.unwrap().into_outcome().unwrap();
    assert_eq!(outcome.error().map(Error::kind), Some(ErrorKind::Timeout));
}

#[tokio::test]
async fn test_caller_abort_before_send() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let controller = AbortController::new();
    controller.abort("user navigated away");

    let client = client_for(&mock_server);
    let outcome = client
        .call::<Widget>(
            "/widgets/42",
            CallConfig::new()
                .signal(controller.signal())
                .retry_attempts(3)
                .retry_delay(Duration::from_millis(5)),
        )
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    match outcome {
        Outcome::TransportError { error } => {
            assert_eq!(error.kind(), ErrorKind::Abort);
            assert_eq!(error.to_string(), "user navigated away");
        }
        other => panic!("Expected an abort, got {:?}", other),
    }
}

#[tokio::test]
async fn test_response_stream_progress() {
    let mock_server = MockServer::start().await;
    let body = "x".repeat(10_000);

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&mock_server)
        .await;

    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = progress.clone();
    let client = client_for(&mock_server);
    let text = client
        .call::<String>(
            "/download",
            CallConfig::new()
                .response_type(callhook::ResponseType::Text)
                .force_stream_size(true)
                .hook(HookEvent::ResponseStream, move |ctx| {
                    let seen = seen.clone();
                    async move {
                        if let Some(progress) = ctx.progress {
                            seen.lock().push(progress);
                        }
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert_eq!(text, body);
    let progress = progress.lock();
    let transferred: usize = progress.iter().map(|p| p.chunk.len()).sum();
    assert_eq!(transferred, body.len());
    let last = progress.last().unwrap();
    assert_eq!(last.transferred_bytes, body.len() as u64);
    assert_eq!(last.total_bytes, body.len() as u64);
    assert_eq!(last.progress_percent, 100);
}

#[tokio::test]
async fn test_request_stream_progress() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let payload = serde_json::json!({ "blob": "y".repeat(2_048) });
    let expected_len = serde_json::to_vec(&payload).unwrap().len() as u64;
    let last = Arc::new(Mutex::new(None));
    let seen = last.clone();
    let client = client_for(&mock_server);
    let output = client
        .call::<serde_json::Value>(
            "/upload",
            CallConfig::new()
                .method(Method::POST)
                .json(&payload)
                .unwrap()
                .hook(HookEvent::RequestStream, move |ctx| {
                    let seen = seen.clone();
                    async move {
                        *seen.lock() = ctx.progress;
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    assert!(output.into_outcome().unwrap().is_success());
    let last = last.lock().clone().unwrap();
    assert_eq!(last.transferred_bytes, expected_len);
    assert_eq!(last.progress_percent, 100);
}

/// An in-memory transport that answers every request with the same widget after a delay.
#[derive(Clone)]
struct SlowTransport {
    sends: Arc<AtomicUsize>,
    delay: Duration,
}

impl SlowTransport {
    fn new(delay: Duration) -> Self {
        Self {
            sends: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = request.cancellation.cancelled() => Err(Error::aborted("transport cancelled")),
            _ = tokio::time::sleep(self.delay) => {
                let body = serde_json::to_vec(&widget()).map_err(|e| Error::transport(e.to_string()))?;
                Ok(TransportResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    url: request.url,
                    body: stream::once(async move { Ok(bytes::Bytes::from(body)) }).boxed(),
                })
            }
        }
    }
}

fn client_with(transport: &SlowTransport, strategy: DedupeStrategy) -> Client {
    Client::builder()
        .base_url("https://api.example.com")
        .unwrap()
        .config(CallConfig::new().dedupe_strategy(strategy))
        .transport(transport.clone())
        .build()
        .unwrap()
}

async fn wait_for_sends(transport: &SlowTransport, count: usize) {
    while transport.sends() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_defer_shares_one_send() {
    let transport = SlowTransport::new(Duration::from_millis(100));
    let client = client_with(&transport, DedupeStrategy::Defer);

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.get::<Widget>("/widgets/42").await }
    });
    wait_for_sends(&transport, 1).await;
    assert_eq!(client.in_flight_keys().len(), 1);

    let second = client.get::<Widget>("/widgets/42").await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(first.into_data(), Some(widget()));
    assert_eq!(second.into_data(), Some(widget()));
    assert_eq!(transport.sends(), 1);
    assert!(client.in_flight_keys().is_empty());
}

#[tokio::test]
async fn test_cancel_aborts_previous_call() {
    let transport = SlowTransport::new(Duration::from_millis(100));
    let client = client_with(&transport, DedupeStrategy::Cancel);

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.get::<Widget>("/widgets/42").await }
    });
    wait_for_sends(&transport, 1).await;

    let second = client.get::<Widget>("/widgets/42").await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(second.into_data(), Some(widget()));
    match first.into_outcome() {
        Some(Outcome::TransportError { error }) => {
            assert_eq!(error.kind(), ErrorKind::Abort);
            assert!(error.to_string().contains("Duplicate request cancelled"));
        }
        other => panic!("Expected the first call to be aborted, got {:?}", other),
    }
    assert_eq!(transport.sends(), 2);
    assert!(client.in_flight_keys().is_empty());
}

#[tokio::test]
async fn test_different_keys_are_not_deduplicated() {
    let transport = SlowTransport::new(Duration::from_millis(20));
    let client = client_with(&transport, DedupeStrategy::Defer);

    let (a, b) = tokio::join!(
        client.get::<Widget>("/widgets/1"),
        client.get::<Widget>("/widgets/2"),
    );

    assert!(a.unwrap().into_data().is_some());
    assert!(b.unwrap().into_data().is_some());
    assert_eq!(transport.sends(), 2);
}

/// Answers 200 with the first half of a widget, then stalls forever.
#[derive(Clone, Default)]
struct StallingTransport {
    sends: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for StallingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: request.url,
            body: stream::once(async { Ok(bytes::Bytes::from_static(br#"{"id":42,"#)) })
                .chain(stream::pending())
                .boxed(),
        })
    }
}

#[tokio::test]
async fn test_deferred_caller_sees_abort_of_owner_mid_body() {
    let transport = StallingTransport::default();
    let client = Client::builder()
        .base_url("https://api.example.com")
        .unwrap()
        .config(CallConfig::new().dedupe_strategy(DedupeStrategy::Defer))
        .transport(transport.clone())
        .build()
        .unwrap();

    let controller = AbortController::new();
    let owner = tokio::spawn({
        let client = client.clone();
        let signal = controller.signal();
        async move {
            client
                .call::<Widget>("/widgets/42", CallConfig::new().signal(signal))
                .await
        }
    });
    while transport.sends.load(Ordering::SeqCst) < 1 {
        tokio::task::yield_now().await;
    }

    let joiner = tokio::spawn({
        let client = client.clone();
        async move { client.get::<Widget>("/widgets/42").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.abort("owner gave up");

    let owner = owner.await.unwrap().unwrap();
    let joiner = tokio::time::timeout(Duration::from_secs(5), joiner)
        .await
        .expect("deferred caller settles")
        .unwrap()
        .unwrap();

    match owner.into_outcome() {
        Some(Outcome::TransportError { error }) => {
            assert_eq!(error.to_string(), "owner gave up");
        }
        other => panic!("Expected the owner to be aborted, got {:?}", other),
    }
    match joiner.into_outcome() {
        Some(Outcome::TransportError { error }) => assert_eq!(error.kind(), ErrorKind::Abort),
        other => panic!("Expected the deferred caller to be aborted, got {:?}", other),
    }
    assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    assert!(client.in_flight_keys().is_empty());
}

#[tokio::test]
async fn test_dynamic_base_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/widgets"))
        .and(header("x-scope", "admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Widget>::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .dynamic_config(|ctx| {
            if ctx.url.starts_with("/admin") {
                CallConfig::new().header("x-scope", "admin").expect("valid header")
            } else {
                CallConfig::new()
            }
        })
        .build()
        .unwrap();

    let output = client.get::<Vec<Widget>>("/admin/widgets").await.unwrap();
    assert_eq!(output.into_data(), Some(Vec::new()));
}
