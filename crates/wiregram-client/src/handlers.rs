//! Concurrent, isolated fan-out of updates to application handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use wiregram_core::{update::Update, Error, Result};

use crate::feed::ErrorSink;

#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: Update) -> Result<()>;
}

/// Fans every update out to every registered handler.
///
/// Handlers for one update run concurrently with each other and with
/// handlers for later updates; dispatch never waits for the previous
/// update's handlers to settle. A failing handler is reported to the error
/// sink and cannot abort its siblings or the feed. The total in-flight
/// handler population is bounded by the semaphore, so a slow handler
/// exerts backpressure instead of piling up tasks without limit.
pub struct HandlerGroup {
    handlers: Vec<Arc<dyn UpdateHandler>>,
    errors: Arc<dyn ErrorSink>,
    permits: Arc<Semaphore>,
}

impl HandlerGroup {
    pub fn new(concurrency: usize, errors: Arc<dyn ErrorSink>) -> Self {
        Self {
            handlers: Vec::new(),
            errors,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn UpdateHandler>) {
        self.handlers.push(handler);
    }

    /// Fire-and-forget dispatch of one update to every handler. Returns as
    /// soon as the tasks are spawned; there is no per-update join.
    pub fn dispatch(&self, update: &Update) {
        for handler in &self.handlers {
            let handler = handler.clone();
            let update = update.clone();
            let errors = self.errors.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return; // semaphore closed: shutting down
                };
                if let Err(err) = handler.handle(update).await {
                    errors.on_error(&Error::Handler(err.to_string()));
                }
            });
        }
    }

    /// Drive a feed channel to completion: dispatch every received update,
    /// return when the feed closes its sending side.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::Receiver<Update>) {
        while let Some(update) = updates.recv().await {
            self.dispatch(&update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiregram_core::update::UpdateKind;

    fn update(id: i64) -> Update {
        Update {
            id,
            kind: UpdateKind::Unknown,
            payload: None,
        }
    }

    struct Failing;

    #[async_trait]
    impl UpdateHandler for Failing {
        async fn handle(&self, _update: Update) -> Result<()> {
            Err(Error::Handler("boom".to_string()))
        }
    }

    struct Counting {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UpdateHandler for Counting {
        async fn handle(&self, _update: Update) -> Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn settle(done: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("handlers did not settle");
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_handler_does_not_abort_its_siblings() {
        let errors = Arc::new(RecordingSink::default());
        let seen = Arc::new(AtomicUsize::new(0));

        let mut group = HandlerGroup::new(4, errors.clone());
        group.register(Arc::new(Failing));
        group.register(Arc::new(Counting { seen: seen.clone() }));

        group.dispatch(&update(1));

        let errors_probe = errors.clone();
        let seen_probe = seen.clone();
        settle(move || seen_probe.load(Ordering::SeqCst) == 1 && errors_probe.messages().len() == 1)
            .await;
        assert!(errors.messages()[0].contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn updates_overlap_without_waiting_for_earlier_ones() {
        struct Slow {
            seen: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl UpdateHandler for Slow {
            async fn handle(&self, _update: Update) -> Result<()> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                self.seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let errors = Arc::new(RecordingSink::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let mut group = HandlerGroup::new(8, errors);
        group.register(Arc::new(Slow { seen: seen.clone() }));

        // Dispatch returns immediately even though every invocation sleeps.
        group.dispatch(&update(1));
        group.dispatch(&update(2));
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let seen_probe = seen.clone();
        settle(move || seen_probe.load(Ordering::SeqCst) == 2).await;
    }
}
