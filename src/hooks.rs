//! Lifecycle hooks.
//!
//! A hook is an async function registered for one [`HookEvent`]. Hooks come from the
//! client's base config, from the per-call config and from every plugin. For each call
//! they are composed into one ordered group per event, which runs either sequentially
//! or all at once depending on [`HooksExecutionMode`].

use crate::request::RequestHandle;
use crate::response::ResponseInfo;
use crate::stream::StreamProgress;
use crate::{Error, Result};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The lifecycle events hooks can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookEvent {
    /// Before validation and deduplication; the request can still be edited.
    BeforeRequest,
    /// Right before the transport is called.
    Request,
    /// The attempt failed without a response (abort, timeout, network, validation).
    RequestError,
    /// A chunk of the request body was sent.
    RequestStream,
    /// A response was received, successful or not.
    Response,
    /// A non-2xx response was received.
    ResponseError,
    /// A chunk of the response body was received.
    ResponseStream,
    /// A retry was granted and is about to wait for its delay.
    Retry,
    /// The call succeeded.
    Success,
    /// The attempt failed, for any reason.
    Error,
}

impl HookEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [HookEvent; 10] = [
        HookEvent::BeforeRequest,
        HookEvent::Request,
        HookEvent::RequestError,
        HookEvent::RequestStream,
        HookEvent::Response,
        HookEvent::ResponseError,
        HookEvent::ResponseStream,
        HookEvent::Retry,
        HookEvent::Success,
        HookEvent::Error,
    ];

    /// The event's name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::BeforeRequest => "beforeRequest",
            HookEvent::Request => "request",
            HookEvent::RequestError => "requestError",
            HookEvent::RequestStream => "requestStream",
            HookEvent::Response => "response",
            HookEvent::ResponseError => "responseError",
            HookEvent::ResponseStream => "responseStream",
            HookEvent::Retry => "retry",
            HookEvent::Success => "success",
            HookEvent::Error => "error",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook gets to see.
///
/// Fields that do not apply to the event are `None`.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The event being dispatched.
    pub event: HookEvent,
    /// The fully resolved request URL.
    pub url: String,
    /// The request of the current attempt.
    pub request: RequestHandle,
    /// The attempt number, starting at 1.
    pub attempt: usize,
    /// The response, once one was received.
    pub response: Option<ResponseInfo>,
    /// The parsed success payload.
    pub data: Option<serde_json::Value>,
    /// The error of a failed attempt.
    pub error: Option<Error>,
    /// Progress of a streamed request or response body.
    pub progress: Option<StreamProgress>,
    /// The delay before the next attempt, for retry hooks.
    pub retry_delay: Option<Duration>,
}

impl HookContext {
    pub(crate) fn new(event: HookEvent, request: &RequestHandle, attempt: usize) -> Self {
        Self {
            event,
            url: request.url(),
            request: request.clone(),
            attempt,
            response: None,
            data: None,
            error: None,
            progress: None,
            retry_delay: None,
        }
    }

    pub(crate) fn with_response(mut self, response: Option<ResponseInfo>) -> Self {
        self.response = response;
        self
    }

    pub(crate) fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    pub(crate) fn with_progress(mut self, progress: StreamProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

/// A type-erased hook.
pub type Hook = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Hooks registered per lifecycle event, in registration order.
///
/// # Examples
///
/// ```
/// use callhook::{HookEvent, Hooks};
///
/// let hooks = Hooks::new()
///     .on(HookEvent::Request, |ctx| async move {
///         ctx.request.set_header("x-request-attempt", ctx.attempt.to_string())
///     })
///     .on(HookEvent::Error, |ctx| async move {
///         eprintln!("call to {} failed: {:?}", ctx.url, ctx.error);
///         Ok(())
///     });
///
/// assert_eq!(hooks.get(HookEvent::Request).len(), 1);
/// assert!(hooks.get(HookEvent::Success).is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    registry: BTreeMap<HookEvent, Vec<Hook>>,
}

impl Hooks {
    /// Creates an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for `event`, returning the updated set.
    pub fn on<F, Fut>(mut self, event: HookEvent, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.add(event, hook);
        self
    }

    /// Registers `hook` for `event`.
    pub fn add<F, Fut>(&mut self, event: HookEvent, hook: F)
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let hook: Hook = Arc::new(move |ctx| hook(ctx).boxed());
        self.registry.entry(event).or_default().push(hook);
    }

    /// The hooks registered for `event`.
    pub fn get(&self, event: HookEvent) -> &[Hook] {
        self.registry.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if no hook is registered for any event.
    pub fn is_empty(&self) -> bool {
        self.registry.values().all(Vec::is_empty)
    }

    pub(crate) fn extend_from(&mut self, other: &Hooks) {
        for (event, hooks) in &other.registry {
            self.registry
                .entry(*event)
                .or_default()
                .extend(hooks.iter().cloned());
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.registry
                    .iter()
                    .map(|(event, hooks)| (event.as_str(), hooks.len())),
            )
            .finish()
    }
}

/// How the hooks of one event group run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HooksExecutionMode {
    /// Start every hook at once and wait for all of them. The first failure is
    /// reported; the remaining hooks are not awaited further.
    #[default]
    Parallel,
    /// Run hooks one after another, stopping at the first failure.
    Sequential,
}

impl FromStr for HooksExecutionMode {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "parallel" => Ok(HooksExecutionMode::Parallel),
            "sequential" => Ok(HooksExecutionMode::Sequential),
            other => Err(Error::ConfigurationError(format!(
                "Unknown hooks execution mode '{}'",
                other
            ))),
        }
    }
}

/// Whether the config's own hooks run before or after plugin hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HooksRegistrationOrder {
    /// Base and per-call hooks first, then plugin hooks.
    #[default]
    MainFirst,
    /// Plugin hooks first, then base and per-call hooks.
    PluginsFirst,
}

/// The hooks of one call, composed into one group per event.
#[derive(Clone, Default)]
pub(crate) struct ComposedHooks {
    groups: Arc<BTreeMap<HookEvent, Vec<Hook>>>,
    mode: HooksExecutionMode,
}

impl ComposedHooks {
    pub(crate) fn compose(
        main: &Hooks,
        plugins: &[Hooks],
        order: HooksRegistrationOrder,
        mode: HooksExecutionMode,
    ) -> Self {
        let mut merged = Hooks::new();
        if order == HooksRegistrationOrder::MainFirst {
            merged.extend_from(main);
        }
        for hooks in plugins {
            merged.extend_from(hooks);
        }
        if order == HooksRegistrationOrder::PluginsFirst {
            merged.extend_from(main);
        }

        Self {
            groups: Arc::new(merged.registry),
            mode,
        }
    }

    pub(crate) fn has(&self, event: HookEvent) -> bool {
        self.groups.get(&event).is_some_and(|hooks| !hooks.is_empty())
    }

    /// Runs the group for `ctx.event`.
    pub(crate) async fn run(&self, ctx: HookContext) -> Result<()> {
        let Some(hooks) = self.groups.get(&ctx.event) else {
            return Ok(());
        };

        match self.mode {
            HooksExecutionMode::Sequential => {
                for hook in hooks {
                    hook(ctx.clone()).await?;
                }
                Ok(())
            }
            HooksExecutionMode::Parallel => try_join_all(hooks.iter().map(|hook| hook(ctx.clone())))
                .await
                .map(|_| ()),
        }
    }
}
