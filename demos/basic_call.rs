//! Basic example demonstrating simple GET and POST calls.
//!
//! This example shows how to:
//! - Create a client with a base URL and retries
//! - Make GET calls with path parameters
//! - Make POST calls with a JSON body
//! - Pick the result mode of a call
//!
//! Run with: `cargo run --example basic_call`

use callhook::{CallConfig, Client, Error, Outcome, Params, ResultMode, RetryStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("callhook=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .config(
            CallConfig::new()
                .retry_attempts(2)
                .retry_strategy(RetryStrategy::Exponential)
                .retry_delay(Duration::from_millis(200)),
        )
        .build()?;

    println!("=== GET with path parameters ===");
    let output = client
        .call::<Post>("/posts/:id", CallConfig::new().params(Params::named([("id", 1)])))
        .await?;

    match output.into_outcome() {
        Some(Outcome::Success { data, response }) => {
            println!("Post ID: {}", data.id);
            println!("Title: {}", data.title);
            println!("Request latency: {:?}", response.latency);
            println!("Status code: {}", response.status);
        }
        Some(Outcome::HttpError { error, .. }) => println!("HTTP error: {}", error),
        Some(Outcome::TransportError { error }) => println!("{}: {}", error.name(), error),
        None => {}
    }
    println!();

    println!("=== POST with a JSON body ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    if let Some(post) = client.post::<Post, _>("/posts", &new_post).await?.into_data() {
        println!("Created post ID: {}", post.id);
        println!("Title: {}", post.title);
    }
    println!();

    println!("=== Errors as Err ===");
    let config = CallConfig::new().result_mode(ResultMode::OnlySuccessWithException);
    match client.call::<Post>("/posts/does-not-exist", config).await {
        Ok(output) => println!("Unexpected success: {:?}", output.into_data()),
        Err(e) => println!("{} (status {:?})", e, e.status()),
    }

    Ok(())
}
