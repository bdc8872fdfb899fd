//! Error types for HTTP calls.
//!
//! Every failure a call can produce is one [`Error`] value. The variants follow the
//! taxonomy the pipeline reasons about: HTTP errors (a non-2xx response was received),
//! aborts, timeouts, validation failures, and everything else. [`Error::kind`] gives the
//! coarse classification; the variants keep the details for debugging.
//!
//! `Error` is `Clone` so that one in-flight transport result can be handed to every
//! caller that was deduplicated onto it.

use crate::hooks::HookEvent;
use crate::schema::SchemaTarget;
use http::{HeaderMap, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// The main error type for HTTP calls.
///
/// # Examples
///
/// ```no_run
/// use callhook::{CallConfig, Client, Error, ErrorKind};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let output = client
///     .call::<serde_json::Value>("/endpoint", CallConfig::new())
///     .await?;
///
/// if let Some(error) = output.into_outcome().as_ref().and_then(|o| o.error()) {
///     match error.kind() {
///         ErrorKind::Http => eprintln!("HTTP error {:?}: {}", error.status(), error),
///         ErrorKind::Timeout => eprintln!("Timed out"),
///         _ => eprintln!("Other error: {}", error),
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The server returned a non-2xx HTTP status code.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `message` - The error message (payload `message`, configured default, or reason phrase)
    /// * `error_data` - The parsed error payload, if the body could be parsed
    /// * `raw_response` - The raw response body
    /// * `headers` - The response headers
    #[error("{message}")]
    Http {
        /// The HTTP status code
        status: StatusCode,
        /// Human readable message
        message: String,
        /// The parsed (and possibly validated) error payload
        error_data: Option<serde_json::Value>,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The request was cancelled, either by the caller or because a newer
    /// deduplicated request superseded it.
    #[error("{message}")]
    Aborted {
        /// The abort reason
        message: String,
    },

    /// The configured timeout elapsed before the attempt completed.
    #[error("{message}")]
    Timeout {
        /// Human readable message
        message: String,
        /// The timeout that fired
        after: Duration,
    },

    /// A schema rejected part of the request or the response.
    #[error("{message}")]
    Validation {
        /// What was being validated
        target: SchemaTarget,
        /// The issue reported by the schema
        message: String,
    },

    /// A network-level error from the default reqwest transport.
    #[error("{message}")]
    Network {
        /// Human readable message
        message: String,
        /// The underlying reqwest error
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// A failure reported by a custom transport.
    #[error("{message}")]
    Transport {
        /// Human readable message
        message: String,
    },

    /// A lifecycle hook failed.
    #[error("{message}")]
    Hook {
        /// The lifecycle event the hook was registered for
        event: HookEvent,
        /// Human readable message
        message: String,
    },

    /// A plugin's `init` failed.
    #[error("Plugin '{id}' failed to initialize: {message}")]
    Plugin {
        /// The plugin id
        id: String,
        /// Human readable message
        message: String,
    },

    /// Failed to deserialize the response body into the expected type.
    ///
    /// This error preserves both the raw response text and the serde error message,
    /// making it easy to debug deserialization issues in production.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid configuration was provided.
    ///
    /// This indicates a problem with how the client or call was configured,
    /// such as an unknown retry strategy or an invalid header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A non-2xx response was received.
    Http,
    /// The governing cancellation token fired.
    Abort,
    /// The derived timeout fired.
    Timeout,
    /// A schema rejected a value.
    Validation,
    /// Anything else: network failures, hook and plugin failures, decoding errors.
    Other,
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Network {
            message: error.to_string(),
            source: Arc::new(error),
        }
    }
}

impl Error {
    /// Creates an abort error with the given reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Error::Aborted {
            message: reason.into(),
        }
    }

    /// Creates a timeout error for the given duration.
    pub fn timeout(after: Duration) -> Self {
        Error::Timeout {
            message: format!("Request timed out after {}ms", after.as_millis()),
            after,
        }
    }

    /// Creates a validation error for the given target.
    pub fn validation(target: SchemaTarget, message: impl Into<String>) -> Self {
        Error::Validation {
            target,
            message: message.into(),
        }
    }

    /// Creates a hook error. Hooks return this to fail a call.
    pub fn hook(event: HookEvent, message: impl Into<String>) -> Self {
        Error::Hook {
            event,
            message: message.into(),
        }
    }

    /// Creates a plugin error. Plugins return this from `init` to fail a call.
    pub fn plugin(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates an error for a custom transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    /// Returns the coarse classification of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use callhook::{Error, ErrorKind};
    /// use std::time::Duration;
    ///
    /// assert_eq!(Error::aborted("stop").kind(), ErrorKind::Abort);
    /// assert_eq!(Error::timeout(Duration::from_secs(1)).kind(), ErrorKind::Timeout);
    /// assert_eq!(Error::transport("boom").kind(), ErrorKind::Other);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http { .. } => ErrorKind::Http,
            Error::Aborted { .. } => ErrorKind::Abort,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Network { .. }
            | Error::Transport { .. }
            | Error::Hook { .. }
            | Error::Plugin { .. }
            | Error::DeserializationFailed { .. }
            | Error::SerializationFailed(_)
            | Error::ConfigurationError(_)
            | Error::InvalidUrl(_) => ErrorKind::Other,
        }
    }

    /// Returns a stable name for the error, suitable for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Http { .. } => "HTTPError",
            Error::Aborted { .. } => "AbortError",
            Error::Timeout { .. } => "TimeoutError",
            Error::Validation { .. } => "ValidationError",
            Error::Network { .. } => "NetworkError",
            Error::Transport { .. } => "TransportError",
            Error::Hook { .. } => "HookError",
            Error::Plugin { .. } => "PluginError",
            Error::DeserializationFailed { .. } => "DeserializationError",
            Error::SerializationFailed(_) => "SerializationError",
            Error::ConfigurationError(_) => "ConfigurationError",
            Error::InvalidUrl(_) => "InvalidUrlError",
        }
    }

    /// Replaces the human readable message, keeping everything else intact.
    ///
    /// URL parse errors have no message field of their own; they become an
    /// [`Error::Transport`] carrying the new message.
    ///
    /// # Examples
    ///
    /// ```
    /// use callhook::{Error, ErrorKind};
    ///
    /// let error = Error::aborted("superseded").with_message("cancelled by user");
    /// assert_eq!(error.to_string(), "cancelled by user");
    /// assert_eq!(error.kind(), ErrorKind::Abort);
    /// ```
    pub fn with_message(mut self, new_message: impl Into<String>) -> Self {
        let new_message = new_message.into();
        if let Error::InvalidUrl(_) = self {
            return Error::Transport {
                message: new_message,
            };
        }
        match &mut self {
            Error::Http { message, .. }
            | Error::Aborted { message }
            | Error::Timeout { message, .. }
            | Error::Validation { message, .. }
            | Error::Network { message, .. }
            | Error::Transport { message }
            | Error::Hook { message, .. }
            | Error::Plugin { message, .. }
            | Error::SerializationFailed(message)
            | Error::ConfigurationError(message) => *message = new_message,
            Error::DeserializationFailed { serde_error, .. } => *serde_error = new_message,
            Error::InvalidUrl(_) => {}
        }
        self
    }

    /// Returns the HTTP status code if this error has one.
    ///
    /// Returns `Some(status)` for `Http` and `DeserializationFailed` errors,
    /// `None` for other error types.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Http { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the parsed error payload of an HTTP error.
    pub fn error_data(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Http { error_data, .. } => error_data.as_ref(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for HTTP calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: StatusCode) -> Error {
        Error::Http {
            status,
            message: "Service Unavailable".to_string(),
            error_data: Some(serde_json::json!({ "code": 7 })),
            raw_response: r#"{"code":7}"#.to_string(),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(http_error(StatusCode::SERVICE_UNAVAILABLE).kind(), ErrorKind::Http);
        assert_eq!(
            Error::validation(SchemaTarget::Body, "bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::hook(HookEvent::Success, "no").kind(), ErrorKind::Other);
        assert_eq!(
            Error::ConfigurationError("x".to_string()).kind(),
            ErrorKind::Other
        );
    }

    #[test]
    fn test_with_message_keeps_payload() {
        let error = http_error(StatusCode::SERVICE_UNAVAILABLE).with_message("try later");

        assert_eq!(error.to_string(), "try later");
        assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(error.error_data(), Some(&serde_json::json!({ "code": 7 })));
        assert_eq!(error.raw_response(), Some(r#"{"code":7}"#));
    }

    #[test]
    fn test_names() {
        assert_eq!(http_error(StatusCode::NOT_FOUND).name(), "HTTPError");
        assert_eq!(Error::aborted("x").name(), "AbortError");
        assert_eq!(Error::timeout(Duration::from_millis(5)).name(), "TimeoutError");
        assert_eq!(
            Error::timeout(Duration::from_millis(5)).to_string(),
            "Request timed out after 5ms"
        );
    }
}
