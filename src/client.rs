//! HTTP client driving the call pipeline.
//!
//! The [`Client`] type is the main entry point for making calls. Use [`ClientBuilder`]
//! to set its base configuration and transport.
//!
//! Every call runs the same loop: merge the config layers, initialize plugins, then
//! run one attempt (hooks, validation, dedupe gate, send, parse). A failed attempt
//! consults the retry plan and either loops with the next attempt number or resolves
//! the error into the caller's result mode.

use crate::cancel::AttemptSignals;
use crate::config::{merge_configs, BaseConfig, BaseConfigContext, CallConfig, ExtraOptions, ResponseType};
use crate::dedupe::{dedupe_key, DedupeCache};
use crate::hooks::{ComposedHooks, HookContext, HookEvent};
use crate::plugin::{initialize_plugins, ResolvedInit};
use crate::request::{RequestBody, RequestDescriptor, RequestHandle};
use crate::resolver::{http_error, resolve_error, CallOutput, ErrorContext, Outcome};
use crate::response::ResponseInfo;
use crate::retry::{create_retry_strategy, RetryState};
use crate::schema::{SchemaSet, SchemaTarget};
use crate::stream::{
    abort_on_cancel, chunked, instrument_with_hooks, read_to_end, resolve_total,
    REQUEST_CHUNK_SIZE,
};
use crate::transport::{ReqwestTransport, Transport, TransportBody, TransportRequest};
use crate::url::{apply_params, resolve_full_url, Params};
use crate::{Error, Result};
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// An HTTP client running calls through plugins, hooks, deduplication and retries.
///
/// The client is designed to be reused across calls. Clones share the base
/// configuration, the transport and the dedupe cache.
///
/// # Examples
///
/// ```no_run
/// use callhook::{CallConfig, Client, Outcome, Params, RetryStrategy};
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Widget {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), callhook::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .config(
///         CallConfig::new()
///             .retry_attempts(2)
///             .retry_strategy(RetryStrategy::Exponential)
///             .timeout(Duration::from_secs(10)),
///     )
///     .build()?;
///
/// let output = client
///     .call::<Widget>("/widgets/:id", CallConfig::new().params(Params::named([("id", 42)])))
///     .await?;
///
/// match output.into_outcome() {
///     Some(Outcome::Success { data, .. }) => println!("{} is {}", data.id, data.name),
///     Some(Outcome::HttpError { error, .. }) => eprintln!("HTTP error: {}", error),
///     Some(Outcome::TransportError { error }) => eprintln!("{}: {}", error.name(), error),
///     None => {}
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base: BaseConfig,
    transport: Arc<dyn Transport>,
    dedupe: DedupeCache,
    next_attempt_id: AtomicU64,
}

/// A successful attempt.
struct Delivered<T> {
    data: T,
    response: ResponseInfo,
}

/// A failed attempt, after its error hooks ran.
struct Failed {
    ctx: ErrorContext,
    signals: AttemptSignals,
    hooks: ComposedHooks,
    handle: RequestHandle,
}

/// An error raised inside an attempt, with the response if one was received.
type Raised = (Error, Option<ResponseInfo>);

fn before_response(error: Error) -> Raised {
    (error, None)
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use callhook::Client;
    ///
    /// # fn example() -> Result<(), callhook::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs a call.
    ///
    /// The call resolves to exactly one outcome, projected into the configured result
    /// mode. It returns `Err` only when the result mode or the throw policy asks for
    /// it, or when a plugin's `init` fails.
    ///
    /// # Errors
    ///
    /// See above.
    pub async fn call<T>(&self, url: impl Into<String>, config: CallConfig) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
    {
        let url = url.into();
        let mut state = RetryState::new();

        loop {
            let base = self.inner.base.resolve(&url, &config);
            let (request, options) = merge_configs(base, config.clone()).split();
            let resolved = initialize_plugins(url.clone(), request, options, state.attempt_count).await?;

            let mode = resolved.options.result_mode.unwrap_or_default();
            let throw_on_error = resolved.options.throw_on_error.clone().unwrap_or_default();
            let policy = resolved.options.retry_policy();

            let failed = match self.attempt::<T>(resolved, state.attempt_count).await {
                Ok(Delivered { data, response }) => {
                    return Outcome::Success { data, response }.project(mode);
                }
                Err(failed) => failed,
            };

            let plan = create_retry_strategy(&policy, state, &failed.ctx);
            if failed.signals.is_aborted() || !plan.should_attempt_retry() {
                return resolve_error(failed.ctx, mode, &throw_on_error);
            }

            let delay = plan.delay();
            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = state.attempt_count,
                "Retrying request after delay"
            );

            let retry_ctx = HookContext::new(HookEvent::Retry, &failed.handle, state.attempt_count)
                .with_response(failed.ctx.response.clone())
                .with_error(failed.ctx.error.clone())
                .with_retry_delay(delay);
            if let Err(error) = failed.hooks.run(retry_ctx).await {
                tracing::warn!(error = %error, event = HookEvent::Retry.as_str(), "Hook failed");
                return resolve_error(ErrorContext { error, ..failed.ctx }, mode, &throw_on_error);
            }

            if let Err(error) = failed.signals.sleep(delay).await {
                return resolve_error(ErrorContext { error, ..failed.ctx }, mode, &throw_on_error);
            }
            state = state.next();
        }
    }

    /// Makes a GET call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use callhook::Client;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct User { name: String }
    ///
    /// # async fn example() -> Result<(), callhook::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// if let Some(user) = client.get::<User>("/users/123").await?.into_data() {
    ///     println!("User: {}", user.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T>(&self, url: impl Into<String>) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
    {
        self.call(url, CallConfig::new().method(Method::GET)).await
    }

    /// Makes a POST call with a JSON body.
    pub async fn post<T, B>(&self, url: impl Into<String>, body: &B) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(url, CallConfig::new().method(Method::POST).json(body)?).await
    }

    /// Makes a PUT call with a JSON body.
    pub async fn put<T, B>(&self, url: impl Into<String>, body: &B) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(url, CallConfig::new().method(Method::PUT).json(body)?).await
    }

    /// Makes a PATCH call with a JSON body.
    pub async fn patch<T, B>(&self, url: impl Into<String>, body: &B) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(url, CallConfig::new().method(Method::PATCH).json(body)?).await
    }

    /// Makes a DELETE call.
    pub async fn delete<T>(&self, url: impl Into<String>) -> Result<CallOutput<T>>
    where
        T: DeserializeOwned,
    {
        self.call(url, CallConfig::new().method(Method::DELETE)).await
    }

    /// The dedupe keys of the calls currently in flight.
    pub fn in_flight_keys(&self) -> Vec<String> {
        self.inner.dedupe.keys()
    }

    /// Runs one attempt, including its error hooks when it fails.
    async fn attempt<T>(&self, resolved: ResolvedInit, attempt: usize) -> std::result::Result<Delivered<T>, Failed>
    where
        T: DeserializeOwned,
    {
        let ResolvedInit {
            url,
            request,
            options,
            hooks,
        } = resolved;

        let signals = AttemptSignals::new(request.signal.clone(), options.timeout);
        let method = request.method.clone().unwrap_or(Method::GET);
        let headers = request.headers.clone().unwrap_or_default();

        let full_url = resolve_url(&url, options.params.as_ref(), options.query.as_deref(), &options);
        let prepared = full_url.clone().and_then(|full_url| {
            RequestDescriptor::build(
                full_url,
                method.clone(),
                headers.clone(),
                request.body.clone(),
                request.signal.clone(),
            )
        });
        let handle = RequestHandle::new(match &prepared {
            Ok(descriptor) => descriptor.clone(),
            Err(_) => RequestDescriptor {
                url: full_url.unwrap_or_else(|_| url.clone()),
                method,
                headers,
                body: None,
                signal: request.signal.clone(),
            },
        });

        let exchange = Exchange {
            client: self,
            url,
            options,
            hooks,
            handle,
            signals,
            attempt,
        };

        let result = exchange.execute::<T>(prepared).await;
        match result {
            Ok(delivered) => Ok(delivered),
            Err((error, response)) => Err(exchange.fail(error, response).await),
        }
    }

    fn next_attempt_id(&self) -> u64 {
        self.inner.next_attempt_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// The state of one attempt.
struct Exchange<'a> {
    client: &'a Client,
    url: String,
    options: ExtraOptions,
    hooks: ComposedHooks,
    handle: RequestHandle,
    signals: AttemptSignals,
    attempt: usize,
}

impl Exchange<'_> {
    fn context(&self, event: HookEvent) -> HookContext {
        HookContext::new(event, &self.handle, self.attempt)
    }

    async fn execute<T>(&self, prepared: Result<RequestDescriptor>) -> std::result::Result<Delivered<T>, Raised>
    where
        T: DeserializeOwned,
    {
        if let Err(error) = prepared {
            return Err(before_response(error));
        }
        self.signals.check().map_err(before_response)?;

        self.hooks
            .run(self.context(HookEvent::BeforeRequest))
            .await
            .map_err(before_response)?;

        let validated = validate_request(self.handle.snapshot(), &self.url, &self.options)
            .map_err(before_response)?;
        self.handle.replace(validated);

        let strategy = self.options.dedupe_strategy.unwrap_or_default();
        let key = dedupe_key(strategy, &self.handle.snapshot(), &self.options);
        let admitted = self
            .client
            .inner
            .dedupe
            .admit(
                strategy,
                key,
                self.client.next_attempt_id(),
                self.signals.internal(),
                self.send().boxed(),
            )
            .await;
        let _release = admitted.guard;

        self.hooks
            .run(self.context(HookEvent::Request))
            .await
            .map_err(before_response)?;

        let response = self.signals.guard(admitted.send).await.map_err(before_response)?;
        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = response.latency.as_millis(),
            attempt = self.attempt,
            joined = admitted.joined,
            "Received HTTP response"
        );

        let with_response = |error: Error| (error, Some(response.clone()));

        self.hooks
            .run(self.context(HookEvent::Response).with_response(Some(response.clone())))
            .await
            .map_err(with_response)?;

        if !response.is_success() {
            let error_data = match parse_error_payload(&response) {
                Some(payload) => Some(
                    schemas(&self.options)
                        .validate(SchemaTarget::ErrorData, payload)
                        .map_err(with_response)?,
                ),
                None => None,
            };
            let error = http_error(&response, error_data, self.options.default_error_message.as_deref());
            return Err(with_response(error));
        }

        let payload = parse_payload(&response, self.options.response_type.unwrap_or_default())
            .map_err(with_response)?;
        let payload = schemas(&self.options)
            .validate(SchemaTarget::Data, payload)
            .map_err(with_response)?;
        let data = serde_json::from_value::<T>(payload.clone()).map_err(|e| {
            let raw_response = response.text();
            tracing::error!(error = %e, raw_response = %raw_response, "Failed to deserialize response");
            with_response(Error::DeserializationFailed {
                raw_response,
                serde_error: e.to_string(),
                status: response.status,
            })
        })?;

        self.hooks
            .run(
                self.context(HookEvent::Success)
                    .with_response(Some(response.clone()))
                    .with_data(payload),
            )
            .await
            .map_err(with_response)?;

        Ok(Delivered { data, response })
    }

    /// The transport send of this attempt, with stream instrumentation when stream
    /// hooks are registered. The request is read from the handle when the send starts.
    fn send(&self) -> impl std::future::Future<Output = Result<ResponseInfo>> + Send + 'static {
        let transport = self.client.inner.transport.clone();
        let hooks = self.hooks.clone();
        let handle = self.handle.clone();
        let cancellation = self.signals.transport_token();
        let force_stream_size = self.options.force_stream_size.unwrap_or(false);
        let attempt = self.attempt;

        async move {
            let request = handle.snapshot();
            let started = Instant::now();
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = attempt,
                "Executing HTTP request"
            );

            let body = request.body.map(|bytes| {
                if hooks.has(HookEvent::RequestStream) {
                    let length = bytes.len() as u64;
                    let ctx = HookContext::new(HookEvent::RequestStream, &handle, attempt);
                    TransportBody::Stream {
                        stream: instrument_with_hooks(
                            chunked(bytes, REQUEST_CHUNK_SIZE),
                            length,
                            hooks.clone(),
                            ctx,
                        ),
                        length,
                    }
                } else {
                    TransportBody::Full(bytes)
                }
            });

            let response = transport
                .send(TransportRequest {
                    url: request.url,
                    method: request.method,
                    headers: request.headers,
                    body,
                    cancellation: cancellation.clone(),
                })
                .await?;

            let body = abort_on_cancel(response.body, cancellation);
            let body = if hooks.has(HookEvent::ResponseStream) {
                let (total, body) =
                    resolve_total(body, &response.headers, force_stream_size).await?;
                let ctx = HookContext::new(HookEvent::ResponseStream, &handle, attempt);
                instrument_with_hooks(body, total, hooks, ctx)
            } else {
                body
            };
            let bytes = read_to_end(body).await?;

            Ok(ResponseInfo::new(
                response.status,
                response.headers,
                response.url,
                bytes,
                started.elapsed(),
            ))
        }
    }

    /// Dispatches the error hooks of a failed attempt.
    ///
    /// A failing error hook replaces the error being reported.
    async fn fail(self, error: Error, response: Option<ResponseInfo>) -> Failed {
        let url = self.handle.url();
        tracing::warn!(
            error = %error,
            kind = error.name(),
            attempt = self.attempt,
            url = %url,
            "Request failed"
        );

        let first = match error {
            Error::Http { .. } => HookEvent::ResponseError,
            _ => HookEvent::RequestError,
        };
        let mut error = error;
        for event in [first, HookEvent::Error] {
            let ctx = self
                .context(event)
                .with_response(response.clone())
                .with_error(error.clone());
            if let Err(hook_error) = self.hooks.run(ctx).await {
                tracing::warn!(error = %hook_error, event = event.as_str(), "Hook failed");
                error = hook_error;
            }
        }

        Failed {
            ctx: ErrorContext {
                error,
                response,
                request: self.handle.snapshot(),
                attempt: self.attempt,
            },
            signals: self.signals,
            hooks: self.hooks,
            handle: self.handle,
        }
    }
}

fn schemas(options: &ExtraOptions) -> SchemaSet {
    options.schemas.clone().unwrap_or_default()
}

fn resolve_url(
    url: &str,
    params: Option<&Params>,
    query: Option<&[(String, String)]>,
    options: &ExtraOptions,
) -> Result<String> {
    let templated = apply_params(url, params, query.unwrap_or(&[]));
    resolve_full_url(options.base_url.as_deref(), &templated)
}

/// Applies the request-side schemas, re-deriving the transport fields from their output.
fn validate_request(
    mut request: RequestDescriptor,
    url: &str,
    options: &ExtraOptions,
) -> Result<RequestDescriptor> {
    let Some(schemas) = &options.schemas else {
        return Ok(request);
    };

    if schemas.has(SchemaTarget::Params) || schemas.has(SchemaTarget::Query) {
        let params = match &options.params {
            Some(params) if schemas.has(SchemaTarget::Params) => {
                let output = schemas.validate(SchemaTarget::Params, params.to_value())?;
                Some(Params::from_value(output).map_err(|e| {
                    Error::validation(SchemaTarget::Params, format!("Invalid params: {}", e))
                })?)
            }
            params => params.clone(),
        };
        let query = match &options.query {
            Some(query) if schemas.has(SchemaTarget::Query) => {
                let input = Value::Object(
                    query
                        .iter()
                        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                        .collect(),
                );
                let output = schemas.validate(SchemaTarget::Query, input)?;
                Some(string_pairs(SchemaTarget::Query, output)?)
            }
            query => query.clone(),
        };

        if params != options.params || query != options.query {
            request.url = resolve_url(url, params.as_ref(), query.as_deref(), options)?;
        }
    }

    if schemas.has(SchemaTarget::Body) {
        if let Some(body) = &request.body {
            let (input, was_json) = match serde_json::from_slice::<Value>(body) {
                Ok(value) => (value, true),
                Err(_) => (Value::String(String::from_utf8_lossy(body).into_owned()), false),
            };
            let output = schemas.validate(SchemaTarget::Body, input)?;
            request.body = Some(match (output, was_json) {
                (Value::String(text), false) => Bytes::from(text),
                (output, _) => RequestBody::Json(output).into_bytes()?,
            });
        }
    }

    if schemas.has(SchemaTarget::Headers) {
        let input = Value::Object(
            request
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                    )
                })
                .collect(),
        );
        let output = schemas.validate(SchemaTarget::Headers, input)?;
        let mut headers = HeaderMap::new();
        for (name, value) in string_pairs(SchemaTarget::Headers, output)? {
            let invalid = |e: String| Error::validation(SchemaTarget::Headers, format!("Invalid headers: {}", e));
            let name = HeaderName::try_from(name.as_str()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| invalid(e.to_string()))?;
            headers.insert(name, value);
        }
        request.headers = headers;
    }

    if schemas.has(SchemaTarget::Method) {
        let output = schemas.validate(
            SchemaTarget::Method,
            Value::String(request.method.as_str().to_string()),
        )?;
        request.method = output
            .as_str()
            .and_then(|method| Method::from_bytes(method.as_bytes()).ok())
            .ok_or_else(|| {
                Error::validation(SchemaTarget::Method, "Invalid method: not an HTTP method")
            })?;
    }

    Ok(request)
}

fn string_pairs(target: SchemaTarget, value: Value) -> Result<Vec<(String, String)>> {
    let Value::Object(map) = value else {
        return Err(Error::validation(target, format!("Invalid {}: expected an object", target)));
    };
    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(number) => Ok((key, number.to_string())),
            Value::Bool(flag) => Ok((key, flag.to_string())),
            _ => Err(Error::validation(
                target,
                format!("Invalid {}: '{}' is not a string", target, key),
            )),
        })
        .collect()
}

/// Parses a success body. An empty body is `null`.
fn parse_payload(response: &ResponseInfo, response_type: ResponseType) -> Result<Value> {
    match response_type {
        ResponseType::Text => Ok(Value::String(response.text())),
        ResponseType::Json if response.body.is_empty() => Ok(Value::Null),
        ResponseType::Json => {
            serde_json::from_slice(&response.body).map_err(|e| Error::DeserializationFailed {
                raw_response: response.text(),
                serde_error: e.to_string(),
                status: response.status,
            })
        }
    }
}

/// Parses an error body: JSON when possible, the text otherwise.
fn parse_error_payload(response: &ResponseInfo) -> Option<Value> {
    if response.body.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(&response.body)
            .unwrap_or_else(|_| Value::String(response.text())),
    )
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use callhook::{CallConfig, ClientBuilder, DedupeStrategy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), callhook::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .config(CallConfig::new().dedupe_strategy(DedupeStrategy::Defer))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: CallConfig,
    dynamic: Option<Arc<dyn Fn(&BaseConfigContext<'_>) -> CallConfig + Send + Sync>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            config: CallConfig::new(),
            dynamic: None,
            transport: None,
        }
    }

    /// Sets the base URL for all calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        self.config.options.base_url = Some(url.as_str().trim_end_matches('/').to_string());
        Ok(self)
    }

    /// Adds a header sent with every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.config = self.config.header(name, value)?;
        Ok(self)
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.options.timeout = Some(timeout);
        self
    }

    /// Overlays `config` onto the base configuration.
    pub fn config(mut self, config: CallConfig) -> Self {
        self.config = self.config.overlay(config);
        self
    }

    /// Computes part of the base configuration per call.
    ///
    /// The computed config is overlaid on the static base configuration.
    pub fn dynamic_config<F>(mut self, build: F) -> Self
    where
        F: Fn(&BaseConfigContext<'_>) -> CallConfig + Send + Sync + 'static,
    {
        self.dynamic = Some(Arc::new(build));
        self
    }

    /// Sets the transport. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Uses `client` for the default transport.
    pub fn reqwest_client(self, client: reqwest::Client) -> Self {
        self.transport(ReqwestTransport::from(client))
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let base = match self.dynamic {
            Some(build) => {
                let fixed = self.config;
                BaseConfig::Dynamic(Arc::new(move |ctx: &BaseConfigContext<'_>| {
                    fixed.clone().overlay(build(ctx))
                }))
            }
            None => BaseConfig::Static(self.config),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                base,
                transport,
                dedupe: DedupeCache::default(),
                next_attempt_id: AtomicU64::new(1),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
