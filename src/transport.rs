//! The network primitive the pipeline drives.
//!
//! A [`Transport`] sends one request and returns the status, headers and a byte
//! stream of the body. The default is [`ReqwestTransport`]; tests and embedders can
//! supply their own.

use crate::stream::BodyStream;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use tokio_util::sync::CancellationToken;

/// A request body as handed to the transport.
pub enum TransportBody {
    /// The whole body in memory.
    Full(Bytes),
    /// A body streamed in chunks, of the given total length.
    Stream {
        /// The chunks.
        stream: BodyStream,
        /// The total length in bytes.
        length: u64,
    },
}

/// One request to send.
pub struct TransportRequest {
    /// The fully resolved URL.
    pub url: String,
    /// The HTTP method.
    pub method: Method,
    /// The request headers.
    pub headers: HeaderMap,
    /// The body, if any.
    pub body: Option<TransportBody>,
    /// Cancelled when the attempt is aborted or times out. The pipeline fails the
    /// response body with an abort error once it fires.
    pub cancellation: CancellationToken,
}

/// A received response whose body has not been read yet.
pub struct TransportResponse {
    /// The status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The final URL, after redirects.
    pub url: String,
    /// The body.
    pub body: BodyStream,
}

/// Sends requests.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use callhook::transport::{Transport, TransportRequest, TransportResponse};
/// use callhook::Result;
/// use futures::stream::{self, StreamExt};
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysNoContent;
///
/// #[async_trait]
/// impl Transport for AlwaysNoContent {
///     async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
///         Ok(TransportResponse {
///             status: StatusCode::NO_CONTENT,
///             headers: HeaderMap::new(),
///             url: request.url,
///             body: stream::empty().boxed(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, returning once the response head was received.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// The default transport, backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest {
            url,
            method,
            mut headers,
            body,
            cancellation,
        } = request;

        let body = match body {
            Some(TransportBody::Full(bytes)) => Some(reqwest::Body::from(bytes)),
            Some(TransportBody::Stream { stream, length }) => {
                if !headers.contains_key(header::CONTENT_LENGTH) {
                    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
                }
                Some(reqwest::Body::wrap_stream(stream))
            }
            None => None,
        };

        let mut builder = self.client.request(method, url.as_str()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            _ = cancellation.cancelled() => {
                return Err(Error::aborted("The operation was aborted"));
            }
            response = builder.send() => response?,
        };

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes_stream().map_err(Error::from).boxed();

        Ok(TransportResponse {
            status,
            headers,
            url,
            body,
        })
    }
}
