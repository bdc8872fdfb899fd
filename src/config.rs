//! Call configuration.
//!
//! A [`CallConfig`] holds two partitions: [`RequestInit`], the transport fields
//! (method, headers, body, signal), and [`ExtraOptions`], every behavioral option
//! (retry, dedupe, hooks, plugins, result shaping). Builder methods write into the
//! right partition, so a config is always split by construction.
//!
//! Three layers are merged for each call: defaults, the client's base config and the
//! per-call config, field by field, later layers winning. Hooks are the exception:
//! base and per-call hooks both contribute. [`SkipAutoMerge`] on the base config
//! turns off the per-call overlay for one or both partitions.

use crate::cancel::AbortSignal;
use crate::dedupe::DedupeStrategy;
use crate::hooks::{HookContext, HookEvent, Hooks, HooksExecutionMode, HooksRegistrationOrder};
use crate::plugin::{Plugin, PluginSource};
use crate::request::RequestBody;
use crate::resolver::{ResultMode, ThrowOnError};
use crate::retry::{
    default_retry_methods, AlwaysRetry, RetryCondition, RetryDelay, RetryPolicy, RetryStrategy,
};
use crate::schema::{Schema, SchemaSet, SchemaTarget};
use crate::url::Params;
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The transport fields of a config.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    /// The HTTP method.
    pub method: Option<Method>,
    /// The request headers. A later layer replaces the whole map.
    pub headers: Option<HeaderMap>,
    /// The request body.
    pub body: Option<RequestBody>,
    /// The caller's cancellation signal.
    pub signal: Option<AbortSignal>,
}

impl RequestInit {
    /// Overlays `top` onto `self`, field by field.
    pub fn overlay(self, top: RequestInit) -> RequestInit {
        RequestInit {
            method: top.method.or(self.method),
            headers: top.headers.or(self.headers),
            body: top.body.or(self.body),
            signal: top.signal.or(self.signal),
        }
    }

    /// Fills unset fields from `fallback`.
    pub fn or(self, fallback: RequestInit) -> RequestInit {
        fallback.overlay(self)
    }
}

/// How a response body is parsed into the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Parse as JSON. An empty body parses as `null`.
    #[default]
    Json,
    /// Decode as UTF-8 text; the payload is a JSON string.
    Text,
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            other => Err(Error::ConfigurationError(format!(
                "Unknown response type '{}'",
                other
            ))),
        }
    }
}

/// Which partition of the per-call config is not merged automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipAutoMerge {
    /// Both partitions.
    All,
    /// The behavioral options.
    Options,
    /// The transport fields.
    Request,
}

impl SkipAutoMerge {
    fn skips_options(self) -> bool {
        matches!(self, SkipAutoMerge::All | SkipAutoMerge::Options)
    }

    fn skips_request(self) -> bool {
        matches!(self, SkipAutoMerge::All | SkipAutoMerge::Request)
    }
}

/// The behavioral options of a config.
#[derive(Clone, Default)]
pub struct ExtraOptions {
    /// Prefix for relative call URLs.
    pub base_url: Option<String>,
    /// Path parameters.
    pub params: Option<Params>,
    /// Query parameters.
    pub query: Option<Vec<(String, String)>>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    /// Retries after the first attempt.
    pub retry_attempts: Option<usize>,
    /// Backoff shape.
    pub retry_strategy: Option<RetryStrategy>,
    /// Base delay between attempts.
    pub retry_delay: Option<RetryDelay>,
    /// Upper bound for exponential delays.
    pub retry_max_delay: Option<Duration>,
    /// Randomize delays.
    pub retry_jitter: Option<bool>,
    /// User retry condition.
    pub retry_condition: Option<Arc<dyn RetryCondition>>,
    /// Methods that may be retried.
    pub retry_methods: Option<Vec<Method>>,
    /// Statuses that may be retried; empty allows any.
    pub retry_status_codes: Option<Vec<u16>>,
    /// Deduplication strategy.
    pub dedupe_strategy: Option<DedupeStrategy>,
    /// Explicit dedupe key.
    pub dedupe_key: Option<String>,
    /// Lifecycle hooks.
    pub hooks: Option<Hooks>,
    /// How the hooks of one event run.
    pub hooks_execution_mode: Option<HooksExecutionMode>,
    /// Whether config hooks run before plugin hooks.
    pub hooks_registration_order: Option<HooksRegistrationOrder>,
    /// Plugins, or a function of the base plugins.
    pub plugins: Option<PluginSource>,
    /// How the body is parsed.
    pub response_type: Option<ResponseType>,
    /// The shape the outcome is returned in.
    pub result_mode: Option<ResultMode>,
    /// Whether failures are returned as `Err`.
    pub throw_on_error: Option<ThrowOnError>,
    /// Validation schemas.
    pub schemas: Option<SchemaSet>,
    /// Message for HTTP errors whose payload carries none.
    pub default_error_message: Option<String>,
    /// Buffer bodies without a length header to report a total in progress events.
    pub force_stream_size: Option<bool>,
    /// Per-call partitions to leave unmerged. Only read from the base config.
    pub skip_auto_merge_for: Option<SkipAutoMerge>,
}

impl ExtraOptions {
    /// The built-in defaults layer.
    pub fn defaults() -> Self {
        ExtraOptions {
            retry_attempts: Some(0),
            retry_strategy: Some(RetryStrategy::Linear),
            retry_delay: Some(RetryDelay::Fixed(Duration::from_secs(1))),
            retry_max_delay: Some(Duration::from_secs(10)),
            retry_jitter: Some(false),
            retry_condition: Some(Arc::new(AlwaysRetry)),
            retry_methods: Some(default_retry_methods()),
            retry_status_codes: Some(Vec::new()),
            dedupe_strategy: Some(DedupeStrategy::None),
            hooks_execution_mode: Some(HooksExecutionMode::Parallel),
            hooks_registration_order: Some(HooksRegistrationOrder::MainFirst),
            response_type: Some(ResponseType::Json),
            result_mode: Some(ResultMode::All),
            throw_on_error: Some(ThrowOnError::Never),
            force_stream_size: Some(false),
            ..ExtraOptions::default()
        }
    }

    /// Overlays `top` onto `self`, field by field.
    ///
    /// Hooks are the one field that is not replaced: hooks of `top` are appended to
    /// hooks of `self`.
    pub fn overlay(self, top: ExtraOptions) -> ExtraOptions {
        let hooks = match (self.hooks, top.hooks) {
            (Some(mut below), Some(above)) => {
                below.extend_from(&above);
                Some(below)
            }
            (below, above) => above.or(below),
        };

        ExtraOptions {
            base_url: top.base_url.or(self.base_url),
            params: top.params.or(self.params),
            query: top.query.or(self.query),
            timeout: top.timeout.or(self.timeout),
            retry_attempts: top.retry_attempts.or(self.retry_attempts),
            retry_strategy: top.retry_strategy.or(self.retry_strategy),
            retry_delay: top.retry_delay.or(self.retry_delay),
            retry_max_delay: top.retry_max_delay.or(self.retry_max_delay),
            retry_jitter: top.retry_jitter.or(self.retry_jitter),
            retry_condition: top.retry_condition.or(self.retry_condition),
            retry_methods: top.retry_methods.or(self.retry_methods),
            retry_status_codes: top.retry_status_codes.or(self.retry_status_codes),
            dedupe_strategy: top.dedupe_strategy.or(self.dedupe_strategy),
            dedupe_key: top.dedupe_key.or(self.dedupe_key),
            hooks,
            hooks_execution_mode: top.hooks_execution_mode.or(self.hooks_execution_mode),
            hooks_registration_order: top
                .hooks_registration_order
                .or(self.hooks_registration_order),
            plugins: PluginSource::merge(self.plugins, top.plugins),
            response_type: top.response_type.or(self.response_type),
            result_mode: top.result_mode.or(self.result_mode),
            throw_on_error: top.throw_on_error.or(self.throw_on_error),
            schemas: top.schemas.or(self.schemas),
            default_error_message: top.default_error_message.or(self.default_error_message),
            force_stream_size: top.force_stream_size.or(self.force_stream_size),
            skip_auto_merge_for: top.skip_auto_merge_for.or(self.skip_auto_merge_for),
        }
    }

    /// The resolved retry settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            attempts: self.retry_attempts.unwrap_or(defaults.attempts),
            strategy: self.retry_strategy.unwrap_or(defaults.strategy),
            delay: self.retry_delay.clone().unwrap_or(defaults.delay),
            max_delay: self.retry_max_delay.unwrap_or(defaults.max_delay),
            jitter: self.retry_jitter.unwrap_or(defaults.jitter),
            condition: self.retry_condition.clone().unwrap_or(defaults.condition),
            methods: self.retry_methods.clone().unwrap_or(defaults.methods),
            status_codes: self.retry_status_codes.clone().unwrap_or(defaults.status_codes),
        }
    }

    /// The plugins of this layer, resolved against no base plugins.
    pub fn plugin_list(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .as_ref()
            .map(|source| source.resolve(&[]))
            .unwrap_or_default()
    }

    /// A deterministic JSON rendering of the serializable options, used for dedupe keys.
    pub(crate) fn fingerprint(&self) -> serde_json::Value {
        let policy = self.retry_policy();
        serde_json::json!({
            "baseUrl": self.base_url,
            "params": self.params.as_ref().map(Params::to_value),
            "query": self.query,
            "timeoutMs": self.timeout.map(|t| t.as_millis() as u64),
            "retryAttempts": policy.attempts,
            "retryMethods": policy.methods.iter().map(Method::as_str).collect::<Vec<_>>(),
            "retryStatusCodes": policy.status_codes,
            "responseType": self.response_type,
            "defaultErrorMessage": self.default_error_message,
        })
    }
}

impl fmt::Debug for ExtraOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraOptions")
            .field("base_url", &self.base_url)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_strategy", &self.retry_strategy)
            .field("retry_delay", &self.retry_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("retry_jitter", &self.retry_jitter)
            .field("retry_methods", &self.retry_methods)
            .field("retry_status_codes", &self.retry_status_codes)
            .field("dedupe_strategy", &self.dedupe_strategy)
            .field("dedupe_key", &self.dedupe_key)
            .field("hooks", &self.hooks)
            .field("hooks_execution_mode", &self.hooks_execution_mode)
            .field("hooks_registration_order", &self.hooks_registration_order)
            .field("plugins", &self.plugins)
            .field("response_type", &self.response_type)
            .field("result_mode", &self.result_mode)
            .field("throw_on_error", &self.throw_on_error)
            .field("schemas", &self.schemas)
            .field("default_error_message", &self.default_error_message)
            .field("force_stream_size", &self.force_stream_size)
            .field("skip_auto_merge_for", &self.skip_auto_merge_for)
            .finish_non_exhaustive()
    }
}

/// Configuration for a call, or the base configuration of a client.
///
/// # Examples
///
/// ```
/// use callhook::{CallConfig, DedupeStrategy, Params, RetryStrategy};
/// use http::Method;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), callhook::Error> {
/// let config = CallConfig::new()
///     .method(Method::PUT)
///     .header("x-tenant", "acme")?
///     .json(&serde_json::json!({ "name": "sprocket" }))?
///     .params(Params::named([("id", 42)]))
///     .retry_attempts(3)
///     .retry_strategy(RetryStrategy::Exponential)
///     .retry_delay(Duration::from_millis(100))
///     .dedupe_strategy(DedupeStrategy::Cancel);
///
/// let (request, options) = config.split();
/// assert_eq!(request.method, Some(Method::PUT));
/// assert_eq!(options.retry_attempts, Some(3));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    /// The transport fields.
    pub request: RequestInit,
    /// The behavioral options.
    pub options: ExtraOptions,
}

impl CallConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// The defaults layer.
    pub fn defaults() -> Self {
        CallConfig {
            request: RequestInit {
                method: Some(Method::GET),
                ..RequestInit::default()
            },
            options: ExtraOptions::defaults(),
        }
    }

    /// Splits the config into its transport fields and options.
    pub fn split(self) -> (RequestInit, ExtraOptions) {
        (self.request, self.options)
    }

    /// Overlays `top` onto `self`, both partitions field by field.
    pub fn overlay(self, top: CallConfig) -> CallConfig {
        CallConfig {
            request: self.request.overlay(top.request),
            options: self.options.overlay(top.options),
        }
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = Some(method);
        self
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.request
            .headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        Ok(self)
    }

    /// Replaces the headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers = Some(headers);
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.request.body = Some(body);
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.body(RequestBody::json(value)?))
    }

    /// Sets a text body.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(RequestBody::Text(text.into()))
    }

    /// Sets the caller's cancellation signal.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.request.signal = Some(signal);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = Some(base_url.into());
        self
    }

    /// Sets the path parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.options.params = Some(params);
        self
    }

    /// Adds a named path parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let mut named = match self.options.params.take() {
            Some(Params::Named(map)) => map,
            _ => BTreeMap::new(),
        };
        named.insert(name.into(), value.to_string());
        self.options.params = Some(Params::Named(named));
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options
            .query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.to_string()));
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets how many retries may follow the first attempt.
    pub fn retry_attempts(mut self, attempts: usize) -> Self {
        self.options.retry_attempts = Some(attempts);
        self
    }

    /// Sets the backoff strategy.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.options.retry_strategy = Some(strategy);
        self
    }

    /// Sets the base delay between attempts.
    pub fn retry_delay(mut self, delay: impl Into<RetryDelay>) -> Self {
        self.options.retry_delay = Some(delay.into());
        self
    }

    /// Sets the upper bound for exponential delays.
    pub fn retry_max_delay(mut self, max_delay: Duration) -> Self {
        self.options.retry_max_delay = Some(max_delay);
        self
    }

    /// Enables or disables delay jitter.
    pub fn retry_jitter(mut self, jitter: bool) -> Self {
        self.options.retry_jitter = Some(jitter);
        self
    }

    /// Sets the retry condition.
    pub fn retry_condition(mut self, condition: impl RetryCondition + 'static) -> Self {
        self.options.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Sets the methods that may be retried.
    pub fn retry_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.options.retry_methods = Some(methods.into_iter().collect());
        self
    }

    /// Sets the statuses that may be retried.
    pub fn retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.options.retry_status_codes = Some(codes.into_iter().collect());
        self
    }

    /// Sets the dedupe strategy.
    pub fn dedupe_strategy(mut self, strategy: DedupeStrategy) -> Self {
        self.options.dedupe_strategy = Some(strategy);
        self
    }

    /// Sets an explicit dedupe key.
    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.options.dedupe_key = Some(key.into());
        self
    }

    /// Adds a set of hooks.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.options
            .hooks
            .get_or_insert_with(Hooks::new)
            .extend_from(&hooks);
        self
    }

    /// Adds one hook.
    pub fn hook<F, Fut>(mut self, event: HookEvent, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.options
            .hooks
            .get_or_insert_with(Hooks::new)
            .add(event, hook);
        self
    }

    /// Sets how the hooks of one event run.
    pub fn hooks_execution_mode(mut self, mode: HooksExecutionMode) -> Self {
        self.options.hooks_execution_mode = Some(mode);
        self
    }

    /// Sets whether config hooks run before plugin hooks.
    pub fn hooks_registration_order(mut self, order: HooksRegistrationOrder) -> Self {
        self.options.hooks_registration_order = Some(order);
        self
    }

    /// Sets the plugin list. On a per-call config this replaces the base plugins.
    pub fn plugins(mut self, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        self.options.plugins = Some(PluginSource::List(plugins));
        self
    }

    /// Derives the plugin list from the base plugins.
    pub fn plugins_with<F>(mut self, derive: F) -> Self
    where
        F: Fn(&[Arc<dyn Plugin>]) -> Vec<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.options.plugins = Some(PluginSource::Derive(Arc::new(derive)));
        self
    }

    /// Sets how the body is parsed.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.options.response_type = Some(response_type);
        self
    }

    /// Sets the shape the outcome is returned in.
    pub fn result_mode(mut self, mode: ResultMode) -> Self {
        self.options.result_mode = Some(mode);
        self
    }

    /// Sets whether failures are returned as `Err`.
    pub fn throw_on_error(mut self, policy: impl Into<ThrowOnError>) -> Self {
        self.options.throw_on_error = Some(policy.into());
        self
    }

    /// Replaces the validation schemas.
    pub fn schemas(mut self, schemas: SchemaSet) -> Self {
        self.options.schemas = Some(schemas);
        self
    }

    /// Sets the schema for one target.
    pub fn schema<S: Schema + 'static>(mut self, target: SchemaTarget, schema: S) -> Self {
        let schemas = self.options.schemas.take().unwrap_or_default();
        self.options.schemas = Some(schemas.with(target, schema));
        self
    }

    /// Sets the message for HTTP errors whose payload carries none.
    pub fn default_error_message(mut self, message: impl Into<String>) -> Self {
        self.options.default_error_message = Some(message.into());
        self
    }

    /// Buffers bodies without a length header so progress events carry a total.
    pub fn force_stream_size(mut self, force: bool) -> Self {
        self.options.force_stream_size = Some(force);
        self
    }

    /// Leaves a partition of per-call configs unmerged. Only honored on base configs.
    pub fn skip_auto_merge_for(mut self, skip: SkipAutoMerge) -> Self {
        self.options.skip_auto_merge_for = Some(skip);
        self
    }
}

/// Merges the defaults, base and per-call layers.
///
/// # Examples
///
/// ```
/// use callhook::config::{merge_configs, SkipAutoMerge};
/// use callhook::CallConfig;
/// use std::time::Duration;
///
/// let base = CallConfig::new().retry_attempts(2).timeout(Duration::from_secs(5));
/// let call = CallConfig::new().retry_attempts(4);
///
/// let (_, options) = merge_configs(base.clone(), call.clone()).split();
/// assert_eq!(options.retry_attempts, Some(4));
/// assert_eq!(options.timeout, Some(Duration::from_secs(5)));
///
/// let base = base.skip_auto_merge_for(SkipAutoMerge::Options);
/// let (_, options) = merge_configs(base, call).split();
/// assert_eq!(options.retry_attempts, Some(2));
/// ```
pub fn merge_configs(base: CallConfig, per_call: CallConfig) -> CallConfig {
    let skip = base.options.skip_auto_merge_for;
    let (default_request, default_options) = CallConfig::defaults().split();
    let (base_request, base_options) = base.split();
    let (call_request, call_options) = per_call.split();

    let mut request = default_request.overlay(base_request);
    if !skip.is_some_and(SkipAutoMerge::skips_request) {
        request = request.overlay(call_request);
    }

    let mut options = default_options.overlay(base_options);
    if !skip.is_some_and(SkipAutoMerge::skips_options) {
        options = options.overlay(call_options);
    }

    CallConfig { request, options }
}

/// What a dynamic base config is computed from.
pub struct BaseConfigContext<'a> {
    /// The URL the call was made with.
    pub url: &'a str,
    /// The per-call options.
    pub options: &'a ExtraOptions,
    /// The per-call transport fields.
    pub request: &'a RequestInit,
}

/// A client's base configuration.
#[derive(Clone)]
pub enum BaseConfig {
    /// The same config for every call.
    Static(CallConfig),
    /// Computed per call, from the URL and the per-call config.
    Dynamic(Arc<dyn Fn(&BaseConfigContext<'_>) -> CallConfig + Send + Sync>),
}

impl BaseConfig {
    pub(crate) fn resolve(&self, url: &str, per_call: &CallConfig) -> CallConfig {
        match self {
            BaseConfig::Static(config) => config.clone(),
            BaseConfig::Dynamic(build) => build(&BaseConfigContext {
                url,
                options: &per_call.options,
                request: &per_call.request,
            }),
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig::Static(CallConfig::new())
    }
}

impl fmt::Debug for BaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseConfig::Static(config) => f.debug_tuple("Static").field(config).finish(),
            BaseConfig::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_fields_precedence() {
        let base = CallConfig::new()
            .method(Method::POST)
            .header("x-base", "1")
            .unwrap();
        let call = CallConfig::new().header("x-call", "1").unwrap();

        let merged = merge_configs(base, call);
        assert_eq!(merged.request.method, Some(Method::POST));
        let headers = merged.request.headers.unwrap();
        // A later layer replaces the whole header map.
        assert!(headers.contains_key("x-call"));
        assert!(!headers.contains_key("x-base"));
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let merged = merge_configs(CallConfig::new(), CallConfig::new());
        assert_eq!(merged.request.method, Some(Method::GET));
        assert_eq!(merged.options.retry_attempts, Some(0));
        assert_eq!(merged.options.dedupe_strategy, Some(DedupeStrategy::None));
        assert_eq!(merged.options.result_mode, Some(ResultMode::All));
        assert_eq!(
            merged.options.retry_policy().methods,
            vec![Method::GET, Method::POST]
        );
    }

    #[test]
    fn test_skip_request_partition() {
        let base = CallConfig::new()
            .method(Method::PATCH)
            .skip_auto_merge_for(SkipAutoMerge::Request);
        let call = CallConfig::new().method(Method::DELETE).retry_attempts(5);

        let merged = merge_configs(base, call);
        assert_eq!(merged.request.method, Some(Method::PATCH));
        assert_eq!(merged.options.retry_attempts, Some(5));
    }

    #[test]
    fn test_skip_all() {
        let base = CallConfig::new().skip_auto_merge_for(SkipAutoMerge::All);
        let call = CallConfig::new().method(Method::DELETE).retry_attempts(5);

        let merged = merge_configs(base, call);
        assert_eq!(merged.request.method, Some(Method::GET));
        assert_eq!(merged.options.retry_attempts, Some(0));
    }

    #[test]
    fn test_hooks_from_both_layers() {
        let base = CallConfig::new().hook(HookEvent::Success, |_| async { Ok(()) });
        let call = CallConfig::new().hook(HookEvent::Success, |_| async { Ok(()) });

        let merged = merge_configs(base, call);
        assert_eq!(merged.options.hooks.unwrap().get(HookEvent::Success).len(), 2);
    }

    #[test]
    fn test_param_builder_accumulates() {
        let config = CallConfig::new().param("a", 1).param("b", "two");
        assert_eq!(
            config.options.params,
            Some(Params::named([("a", "1"), ("b", "two")]))
        );
    }

    #[test]
    fn test_dynamic_base_sees_per_call_config() {
        let base = BaseConfig::Dynamic(Arc::new(|ctx: &BaseConfigContext<'_>| {
            let attempts = ctx.options.retry_attempts.unwrap_or(0) + 1;
            CallConfig::new()
                .base_url(format!("https://{}.example.com", ctx.url.trim_start_matches('/')))
                .retry_attempts(attempts)
        }));
        let call = CallConfig::new().retry_attempts(2);

        let resolved = base.resolve("/tenant", &call);
        assert_eq!(
            resolved.options.base_url.as_deref(),
            Some("https://tenant.example.com")
        );
        assert_eq!(resolved.options.retry_attempts, Some(3));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let config = CallConfig::new().query("b", 2).query("a", 1).retry_attempts(1);
        assert_eq!(
            config.options.fingerprint().to_string(),
            config.clone().options.fingerprint().to_string()
        );
    }

    #[test]
    fn test_debug_lists_merged_options() {
        let options = ExtraOptions {
            skip_auto_merge_for: Some(SkipAutoMerge::Request),
            ..ExtraOptions::defaults()
        };
        let rendered = format!("{:?}", options);

        assert!(rendered.contains("retry_methods: Some([GET, POST])"));
        assert!(rendered.contains("retry_status_codes: Some([])"));
        assert!(rendered.contains("response_type: Some(Json)"));
        assert!(rendered.contains("skip_auto_merge_for: Some(Request)"));
        assert!(rendered.contains("retry_delay"));
        assert!(rendered.contains("plugins: None"));
    }
}
