//! Outcome normalization and result-mode projection.
//!
//! Every call ends in exactly one [`Outcome`]. The caller picks how it is handed back
//! through [`ResultMode`], and may ask for errors to be returned as `Err` through
//! [`ThrowOnError`].

use crate::request::RequestDescriptor;
use crate::response::ResponseInfo;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Everything known about a failed attempt.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The error.
    pub error: Error,
    /// The response, when the failure is an HTTP error.
    pub response: Option<ResponseInfo>,
    /// The request of the failed attempt.
    pub request: RequestDescriptor,
    /// The attempt number, starting at 1.
    pub attempt: usize,
}

/// The final result of one call.
///
/// Data and error are never both present.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// A 2xx response was received and parsed.
    Success {
        /// The parsed payload.
        data: T,
        /// The response.
        response: ResponseInfo,
    },
    /// A non-2xx response was received.
    ///
    /// If a `ResponseError` or `Error` hook fails while this response is being
    /// reported, the hook's error replaces the HTTP error and the call resolves to
    /// [`Outcome::TransportError`] instead. The response is still visible to those
    /// hooks and to a [`ThrowOnError`] predicate through [`ErrorContext::response`].
    HttpError {
        /// The [`Error::Http`] describing the response.
        error: Error,
        /// The response.
        response: ResponseInfo,
    },
    /// The call failed without a usable response, or a hook failed.
    TransportError {
        /// The error.
        error: Error,
    },
}

impl<T> Outcome<T> {
    pub(crate) fn from_error(ctx: ErrorContext) -> Self {
        match (ctx.error, ctx.response) {
            (error @ Error::Http { .. }, Some(response)) => Outcome::HttpError { error, response },
            (error, _) => Outcome::TransportError { error },
        }
    }

    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The payload of a successful call.
    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The error of a failed call.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::HttpError { error, .. } | Outcome::TransportError { error } => Some(error),
        }
    }

    /// The response, if one was received.
    pub fn response(&self) -> Option<&ResponseInfo> {
        match self {
            Outcome::Success { response, .. } | Outcome::HttpError { response, .. } => {
                Some(response)
            }
            Outcome::TransportError { .. } => None,
        }
    }

    /// Converts into a `Result` of the payload.
    ///
    /// # Errors
    ///
    /// Returns the call's error if it failed.
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Success { data, .. } => Ok(data),
            Outcome::HttpError { error, .. } | Outcome::TransportError { error } => Err(error),
        }
    }

    /// Projects the outcome into the shape selected by `mode`.
    ///
    /// This is a pure function of the outcome and the mode. The `*WithException`
    /// modes return the error as `Err`; the others never fail.
    ///
    /// # Errors
    ///
    /// Returns the outcome's error for failed outcomes under a `*WithException` mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use callhook::{Error, Outcome, ResultMode};
    ///
    /// let failed: Outcome<u32> = Outcome::TransportError { error: Error::aborted("gone") };
    ///
    /// assert!(failed.clone().project(ResultMode::OnlySuccessWithException).is_err());
    /// let data = failed.project(ResultMode::OnlySuccess).unwrap().into_data();
    /// assert_eq!(data, None);
    /// ```
    pub fn project(self, mode: ResultMode) -> Result<CallOutput<T>> {
        if mode.throws() {
            if let Outcome::HttpError { error, .. } | Outcome::TransportError { error } = self {
                return Err(error);
            }
        }

        Ok(match mode {
            ResultMode::All | ResultMode::AllWithException => CallOutput::Full(self),
            ResultMode::OnlySuccess | ResultMode::OnlySuccessWithException => match self {
                Outcome::Success { data, .. } => CallOutput::Data(Some(data)),
                _ => CallOutput::Data(None),
            },
            ResultMode::OnlyResponse | ResultMode::OnlyResponseWithException => match self {
                Outcome::Success { response, .. } | Outcome::HttpError { response, .. } => {
                    CallOutput::Response(Some(response))
                }
                Outcome::TransportError { .. } => CallOutput::Response(None),
            },
        })
    }
}

/// The shape a call's outcome is returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultMode {
    /// The full [`Outcome`].
    #[default]
    All,
    /// The full [`Outcome`] on success; the error as `Err` otherwise.
    AllWithException,
    /// The payload, or `None` on failure.
    OnlySuccess,
    /// The payload; the error as `Err` otherwise.
    OnlySuccessWithException,
    /// The response, or `None` if none was received.
    OnlyResponse,
    /// The response on success; the error as `Err` otherwise.
    OnlyResponseWithException,
}

impl ResultMode {
    /// Returns `true` if the mode itself implies returning errors as `Err`.
    pub fn throws(&self) -> bool {
        matches!(
            self,
            ResultMode::AllWithException
                | ResultMode::OnlySuccessWithException
                | ResultMode::OnlyResponseWithException
        )
    }
}

impl FromStr for ResultMode {
    type Err = Error;

    /// Parses the camelCase mode name, e.g. `"onlySuccessWithException"`.
    fn from_str(name: &str) -> Result<Self> {
        let mode = match name {
            "all" => ResultMode::All,
            "allWithException" => ResultMode::AllWithException,
            "onlySuccess" => ResultMode::OnlySuccess,
            "onlySuccessWithException" => ResultMode::OnlySuccessWithException,
            "onlyResponse" => ResultMode::OnlyResponse,
            "onlyResponseWithException" => ResultMode::OnlyResponseWithException,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "Unknown result mode '{}'",
                    other
                )))
            }
        };
        Ok(mode)
    }
}

/// A projected outcome.
#[derive(Debug, Clone)]
pub enum CallOutput<T> {
    /// [`ResultMode::All`] / [`ResultMode::AllWithException`].
    Full(Outcome<T>),
    /// [`ResultMode::OnlySuccess`] / [`ResultMode::OnlySuccessWithException`].
    Data(Option<T>),
    /// [`ResultMode::OnlyResponse`] / [`ResultMode::OnlyResponseWithException`].
    Response(Option<ResponseInfo>),
}

impl<T> CallOutput<T> {
    /// The full outcome, if the output carries one.
    pub fn into_outcome(self) -> Option<Outcome<T>> {
        match self {
            CallOutput::Full(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// The payload, if the output carries one.
    pub fn into_data(self) -> Option<T> {
        match self {
            CallOutput::Full(outcome) => outcome.into_result().ok(),
            CallOutput::Data(data) => data,
            CallOutput::Response(_) => None,
        }
    }

    /// The response, if the output carries one.
    pub fn into_response(self) -> Option<ResponseInfo> {
        match self {
            CallOutput::Full(outcome) => outcome.response().cloned(),
            CallOutput::Data(_) => None,
            CallOutput::Response(response) => response,
        }
    }
}

/// Whether a failed call returns its error as `Err` regardless of result mode.
#[derive(Clone, Default)]
pub enum ThrowOnError {
    /// Follow the result mode.
    #[default]
    Never,
    /// Always return errors as `Err`.
    Always,
    /// Return the error as `Err` when the predicate holds.
    When(Arc<dyn Fn(&ErrorContext) -> bool + Send + Sync>),
}

impl ThrowOnError {
    /// Creates a predicate policy.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&ErrorContext) -> bool + Send + Sync + 'static,
    {
        ThrowOnError::When(Arc::new(predicate))
    }

    /// Evaluates the policy for `ctx`.
    pub fn should_throw(&self, ctx: &ErrorContext) -> bool {
        match self {
            ThrowOnError::Never => false,
            ThrowOnError::Always => true,
            ThrowOnError::When(predicate) => predicate(ctx),
        }
    }
}

impl From<bool> for ThrowOnError {
    fn from(throw: bool) -> Self {
        if throw {
            ThrowOnError::Always
        } else {
            ThrowOnError::Never
        }
    }
}

impl fmt::Debug for ThrowOnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrowOnError::Never => f.write_str("Never"),
            ThrowOnError::Always => f.write_str("Always"),
            ThrowOnError::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Builds the [`Error::Http`] for a non-2xx response.
///
/// The message is the payload's top-level `"message"` string, else
/// `default_message`, else the status' reason phrase.
pub(crate) fn http_error(
    response: &ResponseInfo,
    error_data: Option<serde_json::Value>,
    default_message: Option<&str>,
) -> Error {
    let message = error_data
        .as_ref()
        .and_then(|data| data.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .or_else(|| default_message.map(str::to_owned))
        .unwrap_or_else(|| {
            response
                .status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    Error::Http {
        status: response.status,
        message,
        error_data,
        raw_response: response.text(),
        headers: response.headers.clone(),
    }
}

/// Resolves a failed call according to the throw policy and result mode.
pub(crate) fn resolve_error<T>(
    ctx: ErrorContext,
    mode: ResultMode,
    throw_on_error: &ThrowOnError,
) -> Result<CallOutput<T>> {
    if throw_on_error.should_throw(&ctx) {
        return Err(ctx.error);
    }
    Outcome::from_error(ctx).project(mode)
}
