//! Retry strategies and conditions for handling transient failures.
//!
//! After a failed attempt the pipeline builds a [`RetryPlan`] from the call's
//! [`RetryPolicy`], the [`RetryState`] of the call and the [`ErrorContext`] of the
//! failure. The plan decides whether another attempt is made and how long to wait.

use crate::resolver::ErrorContext;
use crate::{Error, ErrorKind};
use http::Method;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How the delay between attempts grows.
///
/// # Examples
///
/// ```
/// use callhook::RetryStrategy;
///
/// let strategy: RetryStrategy = "exponential".parse().unwrap();
/// assert_eq!(strategy, RetryStrategy::Exponential);
///
/// // Unknown names are configuration errors.
/// assert!("fibonacci".parse::<RetryStrategy>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Wait the configured delay (fixed, or computed from the attempt number).
    #[default]
    Linear,

    /// Wait `min(delay * 2^attempt, max_delay)`.
    Exponential,
}

impl FromStr for RetryStrategy {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "linear" => Ok(RetryStrategy::Linear),
            "exponential" => Ok(RetryStrategy::Exponential),
            other => Err(Error::ConfigurationError(format!(
                "Unknown retry strategy '{}'",
                other
            ))),
        }
    }
}

/// The base delay between attempts.
#[derive(Clone)]
pub enum RetryDelay {
    /// The same delay before every retry.
    Fixed(Duration),

    /// A delay computed from the attempt number (1 = the first failed attempt).
    PerAttempt(Arc<dyn Fn(usize) -> Duration + Send + Sync>),
}

impl RetryDelay {
    /// Creates a delay computed from the attempt number.
    pub fn per_attempt<F>(delay_fn: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        RetryDelay::PerAttempt(Arc::new(delay_fn))
    }

    /// The delay for `attempt`.
    pub fn for_attempt(&self, attempt: usize) -> Duration {
        match self {
            RetryDelay::Fixed(delay) => *delay,
            RetryDelay::PerAttempt(delay_fn) => delay_fn(attempt),
        }
    }
}

impl From<Duration> for RetryDelay {
    fn from(delay: Duration) -> Self {
        RetryDelay::Fixed(delay)
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDelay::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            RetryDelay::PerAttempt(_) => f.write_str("PerAttempt(..)"),
        }
    }
}

/// Trait for deciding whether a failed attempt may be retried.
///
/// The condition is one of several checks; attempts left, the request method and
/// the status allow-list are checked by the [`RetryPlan`] as well. Closures taking
/// an [`ErrorContext`] implement this trait.
///
/// # Examples
///
/// ```
/// use callhook::{ErrorContext, RetryCondition};
///
/// struct RetryOnRateLimit;
///
/// impl RetryCondition for RetryOnRateLimit {
///     fn should_retry(&self, ctx: &ErrorContext) -> bool {
///         ctx.response.as_ref().is_some_and(|r| r.status.as_u16() == 429)
///     }
/// }
/// ```
pub trait RetryCondition: Send + Sync {
    /// Returns `true` if the failure described by `ctx` may be retried.
    fn should_retry(&self, ctx: &ErrorContext) -> bool;
}

impl<F> RetryCondition for F
where
    F: Fn(&ErrorContext) -> bool + Send + Sync,
{
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        self(ctx)
    }
}

/// Allows every failure. This is the default condition.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysRetry;

impl RetryCondition for AlwaysRetry {
    fn should_retry(&self, _ctx: &ErrorContext) -> bool {
        true
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryCondition for RetryOn5xx {
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        matches!(ctx.error.status(), Some(status) if status.is_server_error())
    }
}

/// Retry only on timeout errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryCondition for RetryOnTimeout {
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        ctx.error.kind() == ErrorKind::Timeout
    }
}

/// Retry only on network/connection errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryCondition for RetryOnConnectionError {
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        matches!(ctx.error, Error::Network { .. } | Error::Transport { .. })
    }
}

/// Combine multiple retry conditions with OR logic.
///
/// Retries if ANY of the conditions return `true`.
///
/// # Examples
///
/// ```
/// use callhook::retry::{OrCondition, RetryOn5xx, RetryOnTimeout};
///
/// // Retry on 5xx errors OR timeouts
/// let condition = OrCondition::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrCondition {
    conditions: Vec<Box<dyn RetryCondition>>,
}

impl OrCondition {
    /// Creates a new `OrCondition` from a list of conditions.
    pub fn new(conditions: Vec<Box<dyn RetryCondition>>) -> Self {
        Self { conditions }
    }
}

impl RetryCondition for OrCondition {
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        self.conditions.iter().any(|c| c.should_retry(ctx))
    }
}

/// Combine multiple retry conditions with AND logic.
///
/// Retries only if ALL of the conditions return `true`.
pub struct AndCondition {
    conditions: Vec<Box<dyn RetryCondition>>,
}

impl AndCondition {
    /// Creates a new `AndCondition` from a list of conditions.
    pub fn new(conditions: Vec<Box<dyn RetryCondition>>) -> Self {
        Self { conditions }
    }
}

impl RetryCondition for AndCondition {
    fn should_retry(&self, ctx: &ErrorContext) -> bool {
        self.conditions.iter().all(|c| c.should_retry(ctx))
    }
}

/// The methods retried when none are configured.
pub fn default_retry_methods() -> Vec<Method> {
    vec![Method::GET, Method::POST]
}

/// The fully resolved retry settings of a call.
#[derive(Clone)]
pub struct RetryPolicy {
    /// How many retries may follow the first attempt.
    pub attempts: usize,
    /// How the delay grows.
    pub strategy: RetryStrategy,
    /// The base delay.
    pub delay: RetryDelay,
    /// Upper bound for exponential delays.
    pub max_delay: Duration,
    /// Scale each delay by a random factor in `[0.5, 1.0]`.
    pub jitter: bool,
    /// The user condition.
    pub condition: Arc<dyn RetryCondition>,
    /// Methods that may be retried.
    pub methods: Vec<Method>,
    /// Statuses that may be retried; empty allows any.
    pub status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 0,
            strategy: RetryStrategy::Linear,
            delay: RetryDelay::Fixed(Duration::from_secs(1)),
            max_delay: Duration::from_secs(10),
            jitter: false,
            condition: Arc::new(AlwaysRetry),
            methods: default_retry_methods(),
            status_codes: Vec::new(),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("strategy", &self.strategy)
            .field("delay", &self.delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("methods", &self.methods)
            .field("status_codes", &self.status_codes)
            .finish()
    }
}

/// Per-call retry bookkeeping, threaded through the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// The number of the current attempt, starting at 1.
    pub attempt_count: usize,
}

impl RetryState {
    /// The state of the first attempt.
    pub fn new() -> Self {
        Self { attempt_count: 1 }
    }

    /// The state of the next attempt.
    pub fn next(self) -> Self {
        Self {
            attempt_count: self.attempt_count + 1,
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// The retry decision for one failed attempt.
pub struct RetryPlan<'a> {
    policy: &'a RetryPolicy,
    state: RetryState,
    ctx: &'a ErrorContext,
}

/// Builds the retry plan for the failure described by `ctx`.
pub fn create_retry_strategy<'a>(
    policy: &'a RetryPolicy,
    state: RetryState,
    ctx: &'a ErrorContext,
) -> RetryPlan<'a> {
    RetryPlan { policy, state, ctx }
}

impl RetryPlan<'_> {
    /// The number of the attempt that just failed.
    pub fn current_attempt_count(&self) -> usize {
        self.state.attempt_count
    }

    /// The delay before the next attempt.
    pub fn delay(&self) -> Duration {
        let attempt = self.state.attempt_count;
        let base = self.policy.delay.for_attempt(attempt);
        let delay = match self.policy.strategy {
            RetryStrategy::Linear => base,
            RetryStrategy::Exponential => {
                let multiplier = 2u32.saturating_pow(attempt.min(u32::MAX as usize) as u32);
                base.saturating_mul(multiplier).min(self.policy.max_delay)
            }
        };

        if self.policy.jitter {
            // Add jitter: random value between 50% and 100% of the delay
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(jitter_factor)
        } else {
            delay
        }
    }

    /// Returns `true` if another attempt should be made.
    pub fn should_attempt_retry(&self) -> bool {
        if self.state.attempt_count > self.policy.attempts {
            return false;
        }
        if !self.policy.condition.should_retry(self.ctx) {
            return false;
        }
        if !self.policy.methods.contains(&self.ctx.request.method) {
            return false;
        }
        match &self.ctx.response {
            Some(response) if !self.policy.status_codes.is_empty() => self
                .policy
                .status_codes
                .contains(&response.status.as_u16()),
            _ => true,
        }
    }
}
