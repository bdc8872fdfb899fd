//! Request deduplication.
//!
//! Calls that share a dedupe key are correlated through a cache owned by the client.
//! With [`DedupeStrategy::Cancel`] a new call aborts the one already in flight; with
//! [`DedupeStrategy::Defer`] it awaits the in-flight send instead of issuing its own.
//!
//! Every read-then-write of the cache happens under one lock with no suspension in
//! between. Entries record the attempt that registered them, and only that attempt
//! removes them, so a superseded call never deletes its successor's entry.

use crate::cancel::AbortController;
use crate::config::ExtraOptions;
use crate::request::RequestDescriptor;
use crate::response::ResponseInfo;
use crate::{Error, Result};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// How calls with the same dedupe key are correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeStrategy {
    /// No deduplication.
    #[default]
    None,
    /// A new call aborts the in-flight call with the same key.
    Cancel,
    /// A new call shares the result of the in-flight call with the same key.
    Defer,
}

impl FromStr for DedupeStrategy {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(DedupeStrategy::None),
            "cancel" => Ok(DedupeStrategy::Cancel),
            "defer" => Ok(DedupeStrategy::Defer),
            other => Err(Error::ConfigurationError(format!(
                "Unknown dedupe strategy '{}'",
                other
            ))),
        }
    }
}

pub(crate) type SharedSend = Shared<BoxFuture<'static, Result<ResponseInfo>>>;

struct DedupeEntry {
    owner: u64,
    controller: AbortController,
    in_flight: Option<SharedSend>,
}

/// The in-flight calls of one client, by dedupe key.
#[derive(Clone, Default)]
pub(crate) struct DedupeCache {
    entries: Arc<Mutex<HashMap<String, DedupeEntry>>>,
}

/// The send an attempt should await, and the cache entry it holds while doing so.
pub(crate) struct Admitted {
    pub(crate) send: BoxFuture<'static, Result<ResponseInfo>>,
    pub(crate) guard: Option<DedupeGuard>,
    /// The attempt joined another call's send.
    pub(crate) joined: bool,
}

impl DedupeCache {
    /// The keys currently in the cache.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Passes an attempt through the dedupe gate.
    ///
    /// `send` is the attempt's own transport send; it is dropped unpolled when the
    /// attempt joins another call's send.
    pub(crate) async fn admit(
        &self,
        strategy: DedupeStrategy,
        key: Option<String>,
        owner: u64,
        controller: &AbortController,
        send: BoxFuture<'static, Result<ResponseInfo>>,
    ) -> Admitted {
        let Some(key) = key.filter(|_| strategy != DedupeStrategy::None) else {
            return Admitted {
                send,
                guard: None,
                joined: false,
            };
        };

        // Back-to-back calls from one task reach the lock in issue order.
        tokio::task::yield_now().await;

        let guard = DedupeGuard {
            cache: self.clone(),
            key: key.clone(),
            owner,
        };
        let mut entries = self.entries.lock();

        match strategy {
            DedupeStrategy::None => {
                drop(entries);
                drop(guard);
                Admitted {
                    send,
                    guard: None,
                    joined: false,
                }
            }
            DedupeStrategy::Cancel => {
                if let Some(previous) = entries.get(&key) {
                    debug!(key = %key, "Cancelling superseded request");
                    previous.controller.abort(format!(
                        "Duplicate request cancelled: a newer request with key '{}' was issued",
                        key
                    ));
                }
                entries.insert(
                    key,
                    DedupeEntry {
                        owner,
                        controller: controller.clone(),
                        in_flight: None,
                    },
                );
                Admitted {
                    send,
                    guard: Some(guard),
                    joined: false,
                }
            }
            DedupeStrategy::Defer => {
                if let Some(in_flight) = entries.get(&key).and_then(|entry| entry.in_flight.clone()) {
                    debug!(key = %key, "Joining in-flight request");
                    drop(entries);
                    drop(guard);
                    return Admitted {
                        send: in_flight.boxed(),
                        guard: None,
                        joined: true,
                    };
                }

                let cache = self.clone();
                let release_key = key.clone();
                let shared = async move {
                    let result = send.await;
                    cache.remove(&release_key, owner);
                    result
                }
                .boxed()
                .shared();

                entries.insert(
                    key,
                    DedupeEntry {
                        owner,
                        controller: controller.clone(),
                        in_flight: Some(shared.clone()),
                    },
                );
                Admitted {
                    send: shared.boxed(),
                    guard: Some(guard),
                    joined: false,
                }
            }
        }
    }

    fn remove(&self, key: &str, owner: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.owner == owner) {
            entries.remove(key);
        }
    }
}

/// Removes the cache entry an attempt registered when the attempt ends, however it ends.
pub(crate) struct DedupeGuard {
    cache: DedupeCache,
    key: String,
    owner: u64,
}

impl Drop for DedupeGuard {
    fn drop(&mut self) {
        self.cache.remove(&self.key, self.owner);
    }
}

/// The dedupe key of an attempt, if deduplication applies.
///
/// An explicit key wins. Otherwise the key is the full URL followed by a
/// deterministic rendering of the request and the options.
pub(crate) fn dedupe_key(
    strategy: DedupeStrategy,
    request: &RequestDescriptor,
    options: &ExtraOptions,
) -> Option<String> {
    if strategy == DedupeStrategy::None {
        return None;
    }
    if let Some(key) = &options.dedupe_key {
        return Some(key.clone());
    }

    let headers: BTreeMap<&str, String> = request
        .headers
        .iter()
        .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect();
    let fingerprint = serde_json::json!({
        "method": request.method.as_str(),
        "headers": headers,
        "body": request.body.as_ref().map(|body| String::from_utf8_lossy(body).into_owned()),
        "options": options.fingerprint(),
    });
    Some(format!("{}|{}", request.url, fingerprint))
}
