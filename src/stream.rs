//! Progress instrumentation for request and response bodies.
//!
//! [`instrument`] wraps a body stream and reports a [`StreamProgress`] after every
//! chunk. The wrapped stream yields exactly the bytes, the errors and the end of
//! stream of the original.

use crate::cancel::DEFAULT_ABORT_REASON;
use crate::hooks::{ComposedHooks, HookContext};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use http::{header, HeaderMap};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A body as a stream of byte chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Chunk size used when an in-memory request body is streamed.
pub(crate) const REQUEST_CHUNK_SIZE: usize = 64 * 1024;

/// Progress of a streamed body, reported once per chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamProgress {
    /// The chunk that was just transferred.
    pub chunk: Bytes,
    /// Bytes transferred so far, this chunk included.
    pub transferred_bytes: u64,
    /// The expected total, or 0 when unknown.
    pub total_bytes: u64,
    /// `round(transferred / total * 100)`, or 0 when the total is unknown.
    pub progress_percent: u32,
}

/// Computes the progress percentage.
///
/// # Examples
///
/// ```
/// use callhook::stream::progress_percent;
///
/// assert_eq!(progress_percent(1, 3), 33);
/// assert_eq!(progress_percent(2, 3), 67);
/// assert_eq!(progress_percent(10, 0), 0);
/// ```
pub fn progress_percent(transferred: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (transferred as f64 / total as f64 * 100.0).round() as u32
}

/// Reads the `content-length` header.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Determines the total size of `body`.
///
/// The `content-length` header wins. Without one the total is 0 (unknown) unless
/// `force` is set, in which case the body is drained into memory to count it and a
/// replay of the buffered chunks is returned in its place.
pub async fn resolve_total(
    body: BodyStream,
    headers: &HeaderMap,
    force: bool,
) -> Result<(u64, BodyStream)> {
    if let Some(length) = content_length(headers) {
        return Ok((length, body));
    }
    if !force {
        return Ok((0, body));
    }

    let chunks: Vec<Bytes> = body.try_collect().await?;
    let total = chunks.iter().map(|chunk| chunk.len() as u64).sum();
    Ok((total, stream::iter(chunks.into_iter().map(Ok)).boxed()))
}

/// Wraps `body` so that `on_progress` runs after every chunk.
///
/// The chunk is only passed downstream once `on_progress` has completed; if it
/// fails, the stream yields that error in place of the chunk.
pub fn instrument<F, Fut>(body: BodyStream, total: u64, on_progress: F) -> BodyStream
where
    F: Fn(StreamProgress) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut transferred = 0_u64;
    body.then(move |item| {
        let report = match &item {
            Ok(chunk) => {
                transferred += chunk.len() as u64;
                Some(on_progress(StreamProgress {
                    chunk: chunk.clone(),
                    transferred_bytes: transferred,
                    total_bytes: total,
                    progress_percent: progress_percent(transferred, total),
                }))
            }
            Err(_) => None,
        };
        async move {
            if let Some(report) = report {
                report.await?;
            }
            item
        }
    })
    .boxed()
}

/// Instruments `body` with the hook group of `ctx.event`.
pub(crate) fn instrument_with_hooks(
    body: BodyStream,
    total: u64,
    hooks: ComposedHooks,
    ctx: HookContext,
) -> BodyStream {
    instrument(body, total, move |progress| {
        let hooks = hooks.clone();
        let ctx = ctx.clone().with_progress(progress);
        async move { hooks.run(ctx).await }
    })
}

/// Splits an in-memory body into a stream of chunks.
pub(crate) fn chunked(body: Bytes, chunk_size: usize) -> BodyStream {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect();
    stream::iter(chunks.into_iter().map(Ok)).boxed()
}

/// Fails the body with an abort error once `cancellation` fires.
///
/// A body cut short by cancellation must never read as a complete one: every reader
/// of a shared send sees the error instead of the truncated bytes.
pub(crate) fn abort_on_cancel(body: BodyStream, cancellation: CancellationToken) -> BodyStream {
    stream::unfold(Some(body), move |body| {
        let cancellation = cancellation.clone();
        async move {
            let mut body = body?;
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    Some((Err(Error::aborted(DEFAULT_ABORT_REASON)), None))
                }
                chunk = body.next() => chunk.map(|chunk| (chunk, Some(body))),
            }
        }
    })
    .boxed()
}

/// Reads a body stream to the end.
pub(crate) async fn read_to_end(mut body: BodyStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}
