//! The request a single attempt sends.

use crate::cancel::AbortSignal;
use crate::{Error, Result};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// A request body, as supplied by the caller.
///
/// Bodies are kept in memory so that retries can resend them.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; sets `content-type: application/json` unless already set.
    Json(serde_json::Value),
    /// Sent as-is; sets `content-type: text/plain;charset=UTF-8` unless already set.
    Text(String),
    /// Raw bytes; no content type is implied.
    Bytes(Bytes),
}

impl RequestBody {
    /// Serializes `value` into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    pub(crate) fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Json(_) => Some("application/json"),
            RequestBody::Text(_) => Some("text/plain;charset=UTF-8"),
            RequestBody::Bytes(_) => None,
        }
    }

    pub(crate) fn into_bytes(self) -> Result<Bytes> {
        match self {
            RequestBody::Json(value) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| Error::SerializationFailed(e.to_string())),
            RequestBody::Text(text) => Ok(Bytes::from(text)),
            RequestBody::Bytes(bytes) => Ok(bytes),
        }
    }
}

/// Everything the transport needs to send one attempt.
///
/// Owned by exactly one attempt. Validation and plugins produce a new descriptor
/// rather than editing one that was already handed out.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The fully resolved URL.
    pub url: String,
    /// The HTTP method.
    pub method: Method,
    /// The request headers.
    pub headers: HeaderMap,
    /// The encoded body.
    pub body: Option<Bytes>,
    /// The caller supplied cancellation signal, if any.
    pub signal: Option<AbortSignal>,
}

impl RequestDescriptor {
    pub(crate) fn build(
        url: String,
        method: Method,
        mut headers: HeaderMap,
        body: Option<RequestBody>,
        signal: Option<AbortSignal>,
    ) -> Result<Self> {
        let body = match body {
            Some(body) => {
                if let Some(content_type) = body.content_type() {
                    if !headers.contains_key(header::CONTENT_TYPE) {
                        headers.insert(
                            header::CONTENT_TYPE,
                            HeaderValue::from_static(content_type),
                        );
                    }
                }
                Some(body.into_bytes()?)
            }
            None => None,
        };

        Ok(Self {
            url,
            method,
            headers,
            body,
            signal,
        })
    }
}

/// Shared, lockable access to the request of the current attempt.
///
/// Hooks receive a handle so they can adjust headers, method or body before the
/// request is sent. Edits made after the send are ignored.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    inner: Arc<Mutex<RequestDescriptor>>,
}

impl RequestHandle {
    pub(crate) fn new(request: RequestDescriptor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(request)),
        }
    }

    /// Returns a copy of the current request.
    pub fn snapshot(&self) -> RequestDescriptor {
        self.inner.lock().clone()
    }

    /// The current method.
    pub fn method(&self) -> Method {
        self.inner.lock().method.clone()
    }

    /// The current URL.
    pub fn url(&self) -> String {
        self.inner.lock().url.clone()
    }

    /// Returns the value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<String> {
        let request = self.inner.lock();
        request.headers.get(name)?.to_str().ok().map(str::to_owned)
    }

    /// Sets a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn set_header(&self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.inner.lock().headers.insert(name, value);
        Ok(())
    }

    /// Applies an arbitrary edit to the request.
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut RequestDescriptor),
    {
        edit(&mut *self.inner.lock());
    }

    pub(crate) fn replace(&self, request: RequestDescriptor) {
        *self.inner.lock() = request;
    }
}
