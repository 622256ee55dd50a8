//! Running searches on producer tasks.
//!
//! Each producer writes into a bounded channel. A full channel suspends
//! the producer until the consumer catches up, so events are never
//! dropped. The sender is owned by the task and closes the channel on
//! every exit path.

use crate::backend::{BackendError, EventSink, SearchEvent, SearchOptions, SearchResult, Streamer};
use crate::query::{Basic, Plan};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Events of one running search
pub struct SearchStream {
    events: mpsc::Receiver<SearchEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), BackendError>>,
}

/// Run `query` on a producer task.
///
/// At most `capacity` events are buffered (minimum 1). Canceling `cancel`
/// stops the producer; events already received stay valid. Dropping the
/// stream stops the producer without canceling `cancel` itself.
pub fn spawn_stream<S>(
    streamer: Arc<S>,
    query: Basic,
    options: SearchOptions,
    capacity: usize,
    cancel: CancellationToken,
) -> SearchStream
where
    S: Streamer + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = cancel.child_token();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        let outcome = tokio::select! {
            biased;
            _ = task_cancel.cancelled() => Err(BackendError::Canceled),
            outcome = streamer.stream_search(&task_cancel, &query, &options, &tx) => outcome,
        };
        drop(tx);
        debug!("Search stream finished: {:?}", outcome.as_ref().map(|_| ()));
        outcome
    });

    SearchStream {
        events: rx,
        cancel,
        task,
    }
}

impl SearchStream {
    /// Next event, or `None` once the producer has finished
    pub async fn next(&mut self) -> Option<SearchEvent> {
        self.events.recv().await
    }

    /// Ask the producer to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discard remaining events and return the producer's outcome
    pub async fn finish(mut self) -> Result<(), BackendError> {
        while self.events.recv().await.is_some() {}
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(e) => Err(BackendError::Task(e.to_string())),
        }
    }

    /// Merge all events into one result
    pub async fn collect(mut self) -> Result<SearchResult, BackendError> {
        let mut merged = SearchResult::default();
        while let Some(event) = self.events.recv().await {
            merged.merge(event.result);
        }
        self.finish().await?;
        Ok(merged)
    }
}

impl Drop for SearchStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An event tagged with the plan entry it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEvent {
    pub entry: usize,
    pub event: SearchEvent,
}

struct EntrySink {
    entry: usize,
    tx: mpsc::Sender<PlanEvent>,
}

#[async_trait]
impl EventSink for EntrySink {
    async fn send(&self, event: SearchEvent) -> Result<(), BackendError> {
        self.tx
            .send(PlanEvent {
                entry: self.entry,
                event,
            })
            .await
            .map_err(|_| BackendError::Canceled)
    }
}

/// Events of all entries of a running plan
pub struct PlanStream {
    events: mpsc::Receiver<PlanEvent>,
    cancel: CancellationToken,
    tasks: JoinSet<(usize, Result<(), BackendError>)>,
    entries: usize,
}

/// Run every plan entry on its own producer task.
///
/// Events of one entry arrive in order; events of different entries
/// interleave freely. A failing entry does not stop its siblings.
pub fn spawn_plan<S>(
    streamer: Arc<S>,
    plan: &Plan,
    options: &SearchOptions,
    capacity: usize,
    cancel: CancellationToken,
) -> PlanStream
where
    S: Streamer + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let mut tasks = JoinSet::new();

    for (entry, basic) in plan.iter().cloned().enumerate() {
        let streamer = Arc::clone(&streamer);
        let options = options.clone();
        let cancel = cancel.clone();
        let sink = EntrySink {
            entry,
            tx: tx.clone(),
        };

        tasks.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(BackendError::Canceled),
                outcome = streamer.stream_search(&cancel, &basic, &options, &sink) => outcome,
            };
            match &outcome {
                Err(BackendError::Canceled) | Ok(()) => {}
                Err(e) => warn!("Plan entry {} failed: {}", entry, e),
            }
            (entry, outcome)
        });
    }
    drop(tx);

    debug!("Spawned {} plan entries", plan.len());

    PlanStream {
        events: rx,
        cancel,
        tasks,
        entries: plan.len(),
    }
}

impl PlanStream {
    /// Next event from any entry, or `None` once all entries have finished
    pub async fn next(&mut self) -> Option<PlanEvent> {
        self.events.recv().await
    }

    /// Ask every entry to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discard remaining events and return each entry's outcome, indexed by entry
    pub async fn finish(mut self) -> Vec<Result<(), BackendError>> {
        while self.events.recv().await.is_some() {}

        let mut outcomes: Vec<Option<Result<(), BackendError>>> =
            (0..self.entries).map(|_| None).collect();
        let mut join_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((entry, outcome)) => outcomes[entry] = Some(outcome),
                Err(e) => join_error = Some(e.to_string()),
            }
        }

        outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    Err(BackendError::Task(
                        join_error.clone().unwrap_or_else(|| "task vanished".to_string()),
                    ))
                })
            })
            .collect()
    }

    /// Merge the events of all entries into one result, alongside each
    /// entry's outcome
    pub async fn collect(mut self) -> (SearchResult, Vec<Result<(), BackendError>>) {
        let mut merged = SearchResult::default();
        while let Some(event) = self.events.recv().await {
            merged.merge(event.event.result);
        }
        let outcomes = self.finish().await;
        (merged, outcomes)
    }
}
