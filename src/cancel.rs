//! Cancellation primitives.
//!
//! An [`AbortController`] owns a cancellation token and the reason it was aborted with;
//! the matching [`AbortSignal`] is the read-only half handed to calls, hooks and
//! transports.
//!
//! Every attempt is governed by three sources: the caller's signal, a timeout derived
//! from the configured duration, and an internal controller that the dedupe engine
//! aborts when a newer call supersedes this one. Any of them firing ends the attempt
//! with an abort or timeout error.

use crate::{Error, Result};
use std::future::{pending, Future};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub(crate) const DEFAULT_ABORT_REASON: &str = "The operation was aborted";

/// Owner of a cancellation token.
///
/// # Examples
///
/// ```
/// use callhook::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.is_aborted());
///
/// controller.abort("user navigated away");
/// assert!(signal.is_aborted());
/// assert_eq!(signal.reason().as_deref(), Some("user navigated away"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl AbortController {
    /// Creates a controller that has not been aborted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
            reason: self.reason.clone(),
        }
    }

    /// Aborts the controller. The first reason wins; later calls are no-ops.
    pub fn abort(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }
}

/// Read-only view of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl AbortSignal {
    /// Returns `true` once the controller has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The abort reason, if the controller has been aborted.
    pub fn reason(&self) -> Option<String> {
        if !self.is_aborted() {
            return None;
        }
        Some(
            self.reason
                .get()
                .cloned()
                .unwrap_or_else(|| DEFAULT_ABORT_REASON.to_string()),
        )
    }

    /// Completes when the controller is aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    /// The underlying token, for transports that integrate with `tokio-util` directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn abort_error(&self) -> Error {
        Error::aborted(
            self.reason()
                .unwrap_or_else(|| DEFAULT_ABORT_REASON.to_string()),
        )
    }
}

/// The governing signals of one attempt.
#[derive(Debug, Clone)]
pub(crate) struct AttemptSignals {
    caller: Option<AbortSignal>,
    internal: AbortController,
    transport: CancellationToken,
    timeout: Option<(Duration, Instant)>,
}

impl AttemptSignals {
    pub(crate) fn new(caller: Option<AbortSignal>, timeout: Option<Duration>) -> Self {
        Self {
            caller,
            internal: AbortController::new(),
            transport: CancellationToken::new(),
            timeout: timeout.map(|after| (after, Instant::now() + after)),
        }
    }

    /// The controller the dedupe engine aborts when this attempt is superseded.
    pub(crate) fn internal(&self) -> &AbortController {
        &self.internal
    }

    /// Token handed to the transport; cancelled when any source fires.
    pub(crate) fn transport_token(&self) -> CancellationToken {
        self.transport.clone()
    }

    /// Whether the caller or the dedupe engine aborted the attempt.
    ///
    /// A fired timeout does not count: timed-out attempts stay eligible for retry.
    pub(crate) fn is_aborted(&self) -> bool {
        self.internal.signal().is_aborted()
            || self.caller.as_ref().is_some_and(AbortSignal::is_aborted)
    }

    /// Fails fast if the attempt was aborted before it started.
    pub(crate) fn check(&self) -> Result<()> {
        if let Some(caller) = self.caller.as_ref().filter(|signal| signal.is_aborted()) {
            return Err(caller.abort_error());
        }
        let internal = self.internal.signal();
        if internal.is_aborted() {
            return Err(internal.abort_error());
        }
        Ok(())
    }

    /// Runs `future` until it completes or one of the governing sources fires.
    pub(crate) async fn guard<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let internal = self.internal.signal();
        let caller = async {
            match &self.caller {
                Some(signal) => signal.aborted().await,
                None => pending().await,
            }
        };
        let deadline = async {
            match self.timeout {
                Some((_, deadline)) => tokio::time::sleep_until(deadline).await,
                None => pending().await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = caller => Err(self.caller.as_ref().map_or_else(
                || Error::aborted(DEFAULT_ABORT_REASON),
                AbortSignal::abort_error,
            )),
            _ = internal.aborted() => Err(internal.abort_error()),
            _ = deadline => Err(Error::timeout(
                self.timeout.map(|(after, _)| after).unwrap_or_default(),
            )),
            result = future => result,
        };

        if matches!(result, Err(Error::Aborted { .. } | Error::Timeout { .. })) {
            self.transport.cancel();
        }
        result
    }

    /// Waits out a retry delay, returning early with an abort error if the caller
    /// cancels in the meantime.
    pub(crate) async fn sleep(&self, delay: Duration) -> Result<()> {
        match &self.caller {
            Some(signal) => tokio::select! {
                _ = signal.aborted() => Err(signal.abort_error()),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}
