//! Cursor-based update feed.
//!
//! Turns the platform's at-least-once retrieval call into an ordered,
//! cancellation-safe stream of decoded updates. The flow is sequential by
//! design: exactly one retrieval call is in flight at a time, every wait is
//! a cooperative suspension point, and only this loop ever moves the
//! cursor.
//!
//! Recovery policy, by failure class:
//! - transport failure: report, stay at the same cursor, refetch;
//! - platform refusal (`ok=false`): report, back off, refetch;
//! - schema failure: resync — skip past whatever could not be parsed
//!   rather than livelock on it.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wiregram_core::{
    errors::SchemaError,
    schema::SchemaRegistry,
    update::{Update, UpdateKind},
    wire::{shape_of, WireValue},
    Error, Result,
};

use crate::{call, transport::Transport};

/// Sentinel cursor asking for the single most recent pending item only.
const RESYNC_OFFSET: i64 = -1;

/// Maps the consecutive-empty-fetch count (1-based) to the wait before the
/// next fetch.
pub type BackoffFn = Box<dyn Fn(u32) -> Duration + Send + Sync>;

/// Receives the recoverable errors the loop absorbed instead of dying.
/// Cursor persistence, metrics, and alerting all live behind this seam.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, error: &Error);
}

/// Default sink: log and keep going.
pub struct LogSink;

impl ErrorSink for LogSink {
    fn on_error(&self, error: &Error) {
        warn!("update feed: {error}");
    }
}

/// Shape of the retrieval call.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub limit: u32,
    /// Long-poll timeout handed to the server.
    pub timeout: Duration,
    pub allowed: Vec<UpdateKind>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            timeout: Duration::from_secs(25),
            allowed: UpdateKind::KNOWN.to_vec(),
        }
    }
}

/// Parameters of the retrieval call.
#[derive(Clone, Debug, Default, serde::Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_updates: Vec<String>,
}

pub struct UpdateFeed {
    transport: Arc<dyn Transport>,
    registry: Arc<SchemaRegistry>,
    cfg: FeedConfig,
    backoff: BackoffFn,
    errors: Arc<dyn ErrorSink>,
    cancel: CancellationToken,
    cursor: Option<i64>,
    empty_fetches: u32,
}

impl UpdateFeed {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<SchemaRegistry>,
        cfg: FeedConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            cfg,
            backoff: Box::new(|_| Duration::from_secs(1)),
            errors: Arc::new(LogSink),
            cancel: CancellationToken::new(),
            cursor: None,
            empty_fetches: 0,
        }
    }

    pub fn with_backoff(mut self, f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Box::new(f);
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.errors = sink;
        self
    }

    /// Resume from a cursor the caller persisted from a previous session.
    pub fn with_cursor(mut self, offset: i64) -> Self {
        self.cursor = Some(offset);
        self
    }

    /// Token that asks the running feed to wind down. Cancellation is
    /// cooperative: it is observed at the next wait and leads through the
    /// drain call, never to an abrupt stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled or until `sink` closes. Each decoded update is
    /// handed off in increasing-id order; the cursor advances only after
    /// the hand-off, so a crash never skips an undelivered item.
    pub async fn run(mut self, sink: mpsc::Sender<Update>) -> Result<()> {
        debug!("update feed started");

        'feed: loop {
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => break 'feed,
                fetched = self.fetch(self.cursor, self.cfg.limit, self.cfg.timeout) => fetched,
            };

            let items = match fetched {
                Ok(items) => items,
                Err(err @ Error::Transport(_)) => {
                    // Same cursor: the batch is simply refetched, nothing
                    // is lost.
                    self.errors.on_error(&err);
                    continue;
                }
                Err(err @ Error::Api { .. }) => {
                    // The platform refused the call (bad token, ...). Not a
                    // per-item problem, so no resync; just don't hammer.
                    self.errors.on_error(&err);
                    self.empty_fetches += 1;
                    if self.wait_backoff().await.is_break() {
                        break 'feed;
                    }
                    continue;
                }
                Err(err) => {
                    // The response body itself was unusable. Skip past it
                    // the same way a poison item is skipped.
                    self.errors.on_error(&err);
                    self.resync().await;
                    continue;
                }
            };

            if items.is_empty() {
                self.empty_fetches += 1;
                if self.wait_backoff().await.is_break() {
                    break 'feed;
                }
                continue;
            }
            self.empty_fetches = 0;

            for item in &items {
                let update = match Update::decode(&self.registry, item) {
                    Ok(update) => update,
                    Err(err) => {
                        self.errors.on_error(&err.into());
                        self.resync().await;
                        continue 'feed;
                    }
                };

                let id = update.id;
                let cancel = self.cancel.clone();
                tokio::select! {
                    biased;
                    sent = sink.send(update) => {
                        if sent.is_err() {
                            // Downstream is gone for good: acknowledge what
                            // was handed off, then close.
                            self.drain().await;
                            return Ok(());
                        }
                        self.cursor = Some(id + 1);
                    }
                    _ = cancel.cancelled() => break 'feed,
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    async fn wait_backoff(&self) -> std::ops::ControlFlow<()> {
        let wait = (self.backoff)(self.empty_fetches);
        tokio::select! {
            _ = self.cancel.cancelled() => std::ops::ControlFlow::Break(()),
            _ = time::sleep(wait) => std::ops::ControlFlow::Continue(()),
        }
    }

    async fn fetch(
        &self,
        offset: Option<i64>,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<WireValue>> {
        let params = GetUpdates {
            offset,
            limit: Some(limit),
            timeout: Some(timeout.as_secs()),
            allowed_updates: self
                .cfg
                .allowed
                .iter()
                .filter_map(|kind| kind.wire_key())
                .map(str::to_string)
                .collect(),
        };
        let body = serde_json::to_value(&params)?;
        let result =
            call::invoke(self.transport.as_ref(), &self.registry, "getUpdates", body).await?;
        match result {
            WireValue::Array(items) => Ok(items),
            other => Err(SchemaError::Shape {
                expected: "array",
                found: shape_of(&other),
            }
            .into()),
        }
    }

    /// Skip-ahead recovery: ask only for the newest pending item and
    /// restart just past it. The unparseable span is lost deliberately;
    /// refetching the same cursor would livelock on the poison item.
    async fn resync(&mut self) {
        match self.fetch(Some(RESYNC_OFFSET), 1, Duration::ZERO).await {
            Ok(items) => match items.last() {
                Some(item) => match item.get("update_id").and_then(WireValue::as_i64) {
                    Some(id) => {
                        debug!(cursor = id + 1, "resynced past unparseable items");
                        self.cursor = Some(id + 1);
                    }
                    None => self
                        .errors
                        .on_error(&SchemaError::Missing("update_id".to_string()).into()),
                },
                // Nothing pending beyond the span we just abandoned; the
                // sentinel call already dropped it server-side.
                None => {}
            },
            Err(err) => self.errors.on_error(&err),
        }
    }

    /// The final acknowledgement: the offset in this one call tells the
    /// server everything below it was handed off. Skipping it on shutdown
    /// would redeliver those items to the next session.
    async fn drain(&self) {
        if let Err(err) = self.fetch(self.cursor, 1, Duration::ZERO).await {
            self.errors.on_error(&err);
        }
        debug!("update feed closed");
    }
}
