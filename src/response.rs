//! The response of an attempt, fully buffered.
//!
//! [`ResponseInfo`] keeps the status, headers and raw body of whatever the transport
//! returned. Bodies are buffered so the same response can be handed to every caller
//! that was deduplicated onto one transport call, and read as often as needed.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A received HTTP response.
///
/// # Examples
///
/// ```
/// # use callhook::ResponseInfo;
/// # use http::{HeaderMap, HeaderValue, StatusCode};
/// # use std::time::Duration;
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("application/json"));
///
/// let response = ResponseInfo::new(
///     StatusCode::OK,
///     headers,
///     "https://api.example.com/widgets/42",
///     r#"{"id":42}"#,
///     Duration::from_millis(12),
/// );
///
/// assert!(response.is_success());
/// assert_eq!(response.header("content-type"), Some("application/json"));
/// assert_eq!(response.json::<serde_json::Value>().unwrap()["id"], 42);
/// ```
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The URL the response came from.
    pub url: String,

    /// The raw response body.
    pub body: Bytes,

    /// Time from the start of the attempt until the body was fully read.
    pub latency: Duration,
}

impl ResponseInfo {
    /// Creates a new `ResponseInfo`.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        latency: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            body: body.into(),
            latency,
        }
    }

    /// Returns `true` for 2xx responses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body deserialized from JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}
