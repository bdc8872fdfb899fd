//! Example demonstrating plugins, lifecycle hooks and request deduplication.
//!
//! This example shows how to:
//! - Write a plugin that rewrites calls and contributes hooks
//! - Observe a call through lifecycle hooks
//! - Share one in-flight request between concurrent identical calls
//!
//! Run with: `cargo run --example plugins_and_dedupe`

use async_trait::async_trait;
use callhook::plugin::{Plugin, PluginInitContext, PluginInitResult};
use callhook::{CallConfig, Client, DedupeStrategy, Error, HookEvent, Hooks, Result};
use std::sync::Arc;

/// Tags every request with the attempt number.
struct AttemptHeader;

#[async_trait]
impl Plugin for AttemptHeader {
    fn id(&self) -> &str {
        "attempt-header"
    }

    fn version(&self) -> Option<&str> {
        Some("1.0.0")
    }

    async fn init(&self, ctx: PluginInitContext) -> Result<PluginInitResult> {
        tracing::info!(url = %ctx.url, attempt = ctx.attempt, "Preparing call");
        Ok(PluginInitResult::default())
    }

    fn hooks(&self) -> Hooks {
        Hooks::new().on(HookEvent::Request, |ctx| async move {
            ctx.request.set_header("x-attempt", ctx.attempt.to_string())
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("callhook=debug,plugins_and_dedupe=info")
        .init();

    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(AttemptHeader)];
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .config(
            CallConfig::new()
                .plugins(plugins)
                .dedupe_strategy(DedupeStrategy::Defer)
                .hook(HookEvent::Response, |ctx| async move {
                    if let Some(response) = &ctx.response {
                        println!("{} answered {} in {:?}", ctx.url, response.status, response.latency);
                    }
                    Ok(())
                }),
        )
        .build()?;

    println!("=== Three identical calls, one request ===");
    let (a, b, c) = tokio::join!(
        client.get::<serde_json::Value>("/todos/1"),
        client.get::<serde_json::Value>("/todos/1"),
        client.get::<serde_json::Value>("/todos/1"),
    );
    for output in [a?, b?, c?] {
        println!("Title: {:?}", output.into_data().and_then(|todo| todo["title"].as_str().map(str::to_owned)));
    }
    println!("In flight afterwards: {:?}", client.in_flight_keys());

    Ok(())
}
