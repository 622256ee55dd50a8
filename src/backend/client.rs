//! Client for a remote index service

use crate::backend::protocol::{Frame, FrameDecoder, SearchOptions, SearchRequest, SearchResult};
use crate::backend::{BackendError, EventSink, Searcher, Streamer, TransportBuildError};
use crate::config::BackendConfig;
use crate::query::Basic;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const SEARCH_PATH: &str = "/api/search";
const STREAM_PATH: &str = "/api/stream";

/// Client for the index service.
///
/// Answers one-shot searches on `/api/search` and streams partial results
/// from `/api/stream`.
#[derive(Debug, Clone)]
pub struct IndexClient {
    http: Client,
    address: String,
    base: String,
    /// Applied to one-shot searches only; streams are bounded by cancellation
    request_timeout: Option<Duration>,
}

impl IndexClient {
    /// Build a client for `address` using the configured timeouts
    pub fn new(address: &str, config: &BackendConfig) -> Result<Self, TransportBuildError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let mut client = Self::with_http_client(address, http)?;
        client.request_timeout = Some(config.request_timeout);
        Ok(client)
    }

    /// Build a client around an existing HTTP client
    pub fn with_http_client(address: &str, http: Client) -> Result<Self, TransportBuildError> {
        let base = normalize_address(address)?;
        Ok(Self {
            http,
            address: address.to_string(),
            base: base.as_str().trim_end_matches('/').to_string(),
            request_timeout: None,
        })
    }

    /// The address as given by the caller
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(
        &self,
        path: &str,
        request: &SearchRequest,
        timeout: Option<Duration>,
    ) -> Result<Response, BackendError> {
        let mut builder = self.http.post(self.endpoint(path)).json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|source| BackendError::Transport {
            address: self.address.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, message });
        }

        Ok(response)
    }
}

/// Turn `host:port` or `scheme://host:port` into a base URL.
///
/// A missing scheme defaults to `http`.
pub fn normalize_address(address: &str) -> Result<Url, TransportBuildError> {
    let invalid = |reason: String| TransportBuildError::Address {
        address: address.to_string(),
        reason,
    };

    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("address is empty".to_string()));
    }

    // Only slashes after the authority are trimmed
    let with_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let rest = rest.trim_end_matches('/');
            if rest.is_empty() {
                return Err(invalid("missing host".to_string()));
            }
            format!("{}://{}", scheme, rest)
        }
        None => format!("http://{}", trimmed.trim_end_matches('/')),
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

#[async_trait]
impl Searcher for IndexClient {
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
    ) -> Result<SearchResult, BackendError> {
        let request = SearchRequest {
            query: query.clone(),
            options: options.clone(),
        };

        let call = async {
            let response = self.post(SEARCH_PATH, &request, self.request_timeout).await?;
            response
                .json::<SearchResult>()
                .await
                .map_err(|e| BackendError::Protocol(e.to_string()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Canceled),
            result = call => result,
        }
    }
}

#[async_trait]
impl Streamer for IndexClient {
    async fn stream_search(
        &self,
        cancel: &CancellationToken,
        query: &Basic,
        options: &SearchOptions,
        sink: &dyn EventSink,
    ) -> Result<(), BackendError> {
        let request = SearchRequest {
            query: query.clone(),
            options: options.clone(),
        };

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Canceled),
            response = self.post(STREAM_PATH, &request, None) => response?,
        };

        let mut decoder = FrameDecoder::new();
        let mut events = 0usize;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BackendError::Canceled),
                chunk = response.chunk() => chunk.map_err(|source| BackendError::Transport {
                    address: self.address.clone(),
                    source,
                })?,
            };

            let Some(chunk) = chunk else {
                return Err(BackendError::Protocol(format!(
                    "stream ended before done frame ({} bytes pending)",
                    decoder.pending()
                )));
            };
            decoder.push(&chunk);

            while let Some(frame) = decoder
                .next_frame()
                .map_err(|e| BackendError::Protocol(e.to_string()))?
            {
                match frame {
                    Frame::Result(result) => {
                        trace!("Stream frame with {} file(s)", result.files.len());
                        events += 1;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(BackendError::Canceled),
                            sent = sink.send(result.into()) => sent?,
                        }
                    }
                    Frame::Error { message } => return Err(BackendError::Backend(message)),
                    Frame::Done => {
                        debug!("Stream from {} done after {} event(s)", self.address, events);
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl fmt::Display for IndexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index_client{{{}}}", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_port_gets_http() {
        let url = normalize_address("localhost:6070").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(6070));
    }

    #[test]
    fn test_explicit_scheme_kept() {
        let url = normalize_address("https://index.internal:443/").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("index.internal"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(normalize_address("").is_err());
        assert!(normalize_address("   ").is_err());
        assert!(normalize_address("ftp://host:21").is_err());
        assert!(normalize_address("http://").is_err());
        assert!(normalize_address("https:///").is_err());
        assert!(normalize_address("/").is_err());
    }

    #[test]
    fn test_trailing_slashes_after_host() {
        let url = normalize_address("http://index:6070//").unwrap();
        assert_eq!(url.host_str(), Some("index"));
        assert_eq!(url.port(), Some(6070));
    }

    #[test]
    fn test_endpoints_and_display() {
        let client = IndexClient::with_http_client("127.0.0.1:6070/", Client::new()).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:6070");
        assert_eq!(client.endpoint(SEARCH_PATH), "http://127.0.0.1:6070/api/search");
        assert_eq!(client.to_string(), "index_client{127.0.0.1:6070/}");
    }

    #[test]
    fn test_new_from_config() {
        let client = IndexClient::new("index:6070", &BackendConfig::default()).unwrap();
        assert_eq!(client.address(), "index:6070");
        assert_eq!(client.request_timeout, Some(BackendConfig::default().request_timeout));
    }
}
