use crate::backend::{BackendError, EventSink, SearchOptions, SearchResult, Searcher, Streamer};
use crate::query::Basic;
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Presents a one-shot [`Searcher`] as a [`Streamer`].
///
/// A successful search is delivered as exactly one event holding the whole
/// result. A failed or canceled search delivers nothing.
#[derive(Debug, Clone)]
pub struct StreamSearchAdapter<S> {
    inner: S,
}

impl<S> StreamSearchAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Searcher> Searcher for StreamSearchAdapter<S> {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
    ) -> Result<SearchResult, BackendError> {
        self.inner.search(cancel, query, options).await
    }
}

#[async_trait]
impl<S: Searcher> Streamer for StreamSearchAdapter<S> {
    async fn stream_search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
        sink: &dyn EventSink,
    ) -> Result<(), BackendError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Canceled),
            result = self.inner.search(cancel, query, options) => result?,
        };

        debug!(
            "Adapter delivering single result with {} file(s)",
            result.files.len()
        );
        sink.send(result.into()).await
    }
}

impl<S: fmt::Display> fmt::Display for StreamSearchAdapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream_search_adapter{{{}}}", self.inner)
    }
}
