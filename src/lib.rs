//! # Callhook - an HTTP call pipeline with plugins, hooks, dedupe and retries
//!
//! Callhook runs every HTTP call through one pipeline: the client's base config and
//! the per-call config are merged, plugins rewrite the call, lifecycle hooks observe
//! and adjust it, concurrent duplicates are cancelled or shared, failures are retried
//! with backoff, and the final result is handed back in the shape the caller asked for.
//! It is built on top of `reqwest`, with pluggable transports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use callhook::{CallConfig, Client, HookEvent, Hooks, Outcome, Params};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Widget {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callhook::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .config(
//!             CallConfig::new()
//!                 .retry_attempts(2)
//!                 .hooks(Hooks::new().on(HookEvent::Request, |ctx| async move {
//!                     ctx.request.set_header("x-attempt", ctx.attempt.to_string())
//!                 })),
//!         )
//!         .build()?;
//!
//!     let output = client
//!         .call::<Widget>("/widgets/:id", CallConfig::new().params(Params::named([("id", 42)])))
//!         .await?;
//!
//!     if let Some(Outcome::Success { data, response }) = output.into_outcome() {
//!         println!("{:?} in {:?}", data, response.latency);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Layered configuration** - Defaults, base config (static or computed per call) and per-call config, merged field by field
//! - **Plugins** - Rewrite the URL, request or options before a call, and contribute hooks
//! - **Lifecycle hooks** - Before request, request, response, success, error, retry and streaming progress events
//! - **Deduplication** - Cancel superseded calls or share one in-flight transport call
//! - **Retries** - Linear or exponential backoff, method and status allow-lists, custom conditions
//! - **Result modes** - Full outcome, data only or response only, optionally returning errors as `Err`
//! - **Validation** - Schemas for request body, headers, method, params, query and response payloads
//! - **Logging** - Structured logging with `tracing`
//!
//! ## Result Modes
//!
//! By default a call never returns `Err`: failures are part of the [`Outcome`].
//!
//! ```no_run
//! use callhook::{CallConfig, Client, Error, ResultMode};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! let config = CallConfig::new().result_mode(ResultMode::OnlySuccessWithException);
//! match client.call::<serde_json::Value>("/endpoint", config).await {
//!     Ok(output) => println!("Success: {:?}", output.into_data()),
//!     Err(Error::Http { status, message, .. }) => eprintln!("HTTP error {}: {}", status, message),
//!     Err(e) => eprintln!("{}: {}", e.name(), e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Strategies
//!
//! ```no_run
//! use callhook::{CallConfig, Client, RetryStrategy};
//! use callhook::retry::{OrCondition, RetryOn5xx, RetryOnTimeout};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), callhook::Error> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com")?
//!     .config(
//!         CallConfig::new()
//!             .retry_attempts(5)
//!             .retry_strategy(RetryStrategy::Exponential)
//!             .retry_delay(Duration::from_millis(100))
//!             .retry_max_delay(Duration::from_secs(30))
//!             .retry_jitter(true)
//!             .retry_condition(OrCondition::new(vec![
//!                 Box::new(RetryOn5xx),
//!                 Box::new(RetryOnTimeout),
//!             ])),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod cancel;
mod client;
pub mod config;
mod dedupe;
mod error;
mod hooks;
pub mod plugin;
mod request;
mod resolver;
mod response;
pub mod retry;
mod schema;
pub mod stream;
pub mod transport;
pub mod url;

pub use cancel::{AbortController, AbortSignal};
pub use client::{Client, ClientBuilder};
pub use config::{CallConfig, ExtraOptions, RequestInit, ResponseType, SkipAutoMerge};
pub use dedupe::DedupeStrategy;
pub use error::{Error, ErrorKind, Result};
pub use hooks::{Hook, HookContext, HookEvent, Hooks, HooksExecutionMode, HooksRegistrationOrder};
pub use plugin::Plugin;
pub use request::{RequestBody, RequestDescriptor, RequestHandle};
pub use resolver::{CallOutput, ErrorContext, Outcome, ResultMode, ThrowOnError};
pub use response::ResponseInfo;
pub use retry::{RetryCondition, RetryDelay, RetryStrategy};
pub use schema::{Schema, SchemaSet, SchemaTarget};
pub use stream::StreamProgress;
pub use self::url::Params;
