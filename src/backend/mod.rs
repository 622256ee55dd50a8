//! Search backends and the streaming contract the rest of the crate uses.
//!
//! A backend either answers a Basic query in one call ([`Searcher`]) or
//! delivers partial results as they become available ([`Streamer`]).
//! [`StreamSearchAdapter`] presents a one-shot backend as a streamer, so
//! callers only ever drive streams.

pub mod adapter;
pub mod client;
pub mod protocol;
pub mod stream;

pub use adapter::StreamSearchAdapter;
pub use client::IndexClient;
pub use protocol::{FileMatch, LineFragment, LineMatch, SearchOptions, SearchRequest, SearchResult, Stats};
pub use stream::{spawn_plan, spawn_stream, PlanEvent, PlanStream, SearchStream};

use crate::query::Basic;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A partial result delivered by a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEvent {
    pub result: SearchResult,
}

impl From<SearchResult> for SearchEvent {
    fn from(result: SearchResult) -> Self {
        Self { result }
    }
}

/// Per-request backend failure
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("search canceled")]
    Canceled,

    #[error("search task failed: {0}")]
    Task(String),
}

/// No transport client could be built for a backend address.
///
/// This is a configuration fault; callers treat it as fatal at startup.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    #[error("invalid backend address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Backend answering a query in one call
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
    ) -> Result<SearchResult, BackendError>;
}

/// Backend delivering results as a sequence of events.
///
/// Events are passed to `sink` in order. The call returns once the search
/// completes or fails; no event is sent after it returns.
#[async_trait]
pub trait Streamer: Send + Sync {
    async fn stream_search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
        sink: &dyn EventSink,
    ) -> Result<(), BackendError>;
}

/// Backend supporting both call styles
pub trait StreamSearcher: Searcher + Streamer {}

impl<T: Searcher + Streamer> StreamSearcher for T {}

/// Receiver of stream events.
///
/// `send` may wait for the consumer; that wait is how backpressure reaches
/// the backend.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: SearchEvent) -> Result<(), BackendError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<SearchEvent> {
    async fn send(&self, event: SearchEvent) -> Result<(), BackendError> {
        // Receiver gone means nobody wants more results
        mpsc::Sender::send(self, event)
            .await
            .map_err(|_| BackendError::Canceled)
    }
}

/// Sink calling a closure for each event
pub struct StreamFunc<F>(pub F);

#[async_trait]
impl<F> EventSink for StreamFunc<F>
where
    F: Fn(SearchEvent) + Send + Sync,
{
    async fn send(&self, event: SearchEvent) -> Result<(), BackendError> {
        (self.0)(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_stream_func_collects() {
        let seen = Mutex::new(Vec::new());
        let sink = StreamFunc(|event: SearchEvent| seen.lock().unwrap().push(event));
        sink.send(SearchResult::default().into()).await.unwrap();
        sink.send(SearchResult::default().into()).await.unwrap();
        drop(sink);
        assert_eq!(seen.into_inner().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sender_sink_closed_receiver() {
        let (tx, rx) = mpsc::channel::<SearchEvent>(1);
        drop(rx);
        let err = EventSink::send(&tx, SearchResult::default().into()).await.unwrap_err();
        assert!(matches!(err, BackendError::Canceled));
    }
}
