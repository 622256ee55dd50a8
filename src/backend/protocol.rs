//! Wire types for the index service.
//!
//! The synchronous endpoint exchanges plain JSON bodies. The streaming
//! endpoint answers with a sequence of length-prefixed JSON frames:
//! - 4 bytes (little-endian u32): frame length
//! - N bytes: JSON-encoded [`Frame`]

use crate::query::Basic;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

/// Frames larger than this are rejected
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Limits passed along with every search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Wall clock budget for the whole search, e.g. "20s"
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_wall_time: Option<Duration>,
    /// Stop a shard after this many matches (0 = backend default)
    pub shard_max_match_count: usize,
    /// Stop the search after this many matches (0 = backend default)
    pub total_max_match_count: usize,
    /// Number of files returned with line matches (0 = all)
    pub max_doc_display_count: usize,
    /// Return whole file contents instead of line fragments
    pub whole: bool,
}

/// Body of both search endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Basic,
    pub options: SearchOptions,
}

/// Aggregate counters reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub file_count: usize,
    pub match_count: usize,
    pub files_considered: usize,
    pub files_skipped: usize,
    pub shards_scanned: usize,
}

impl Stats {
    /// Merge counters from another partial result
    pub fn add(&mut self, other: &Stats) {
        self.file_count += other.file_count;
        self.match_count += other.match_count;
        self.files_considered += other.files_considered;
        self.files_skipped += other.files_skipped;
        self.shards_scanned += other.shards_scanned;
    }
}

/// Byte span of a match within a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFragment {
    pub offset: usize,
    pub match_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMatch {
    pub line: String,
    /// 1-based
    pub line_number: u32,
    #[serde(default)]
    pub line_fragments: Vec<LineFragment>,
}

/// All matches within one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    pub repository: String,
    pub file_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub line_matches: Vec<LineMatch>,
}

/// A complete or partial search result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub stats: Stats,
    pub files: Vec<FileMatch>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Append another partial result
    pub fn merge(&mut self, other: SearchResult) {
        self.stats.add(&other.stats);
        self.files.extend(other.files);
    }
}

/// One frame of the streaming endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Partial result
    Result(SearchResult),
    /// Search failed; no further frames follow
    Error { message: String },
    /// Search finished
    Done,
}

/// Write a frame with length prefix
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> std::io::Result<()> {
    let json = serde_json::to_vec(frame).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })?;

    let len = u32::try_from(json.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "Frame too large")
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Encode a sequence of frames into one body
pub fn encode_frames(frames: &[Frame]) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    for frame in frames {
        write_frame(&mut buf, frame)?;
    }
    Ok(buf)
}

/// Incremental frame decoder for a body that arrives in arbitrary chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet decoded
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete frame, or `None` if more bytes are needed
    pub fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
        let Some(len_bytes) = self.buf.get(..4) else {
            return Ok(None);
        };
        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(len_bytes);
        let len = u32::from_le_bytes(len_buf) as usize;

        // Sanity check: don't buffer more than 100MB
        if len > MAX_FRAME_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Frame too large",
            ));
        }

        if self.buf.len() < 4 + len {
            return Ok(None);
        }

        let frame = serde_json::from_slice(&self.buf[4..4 + len]).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        self.buf.drain(..4 + len);

        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Node;

    fn sample_result() -> SearchResult {
        SearchResult {
            stats: Stats {
                file_count: 1,
                match_count: 2,
                ..Stats::default()
            },
            files: vec![FileMatch {
                repository: "github.com/acme/api".to_string(),
                file_name: "src/main.rs".to_string(),
                language: "Rust".to_string(),
                branches: vec!["HEAD".to_string()],
                line_matches: vec![LineMatch {
                    line: "fn main() {".to_string(),
                    line_number: 42,
                    line_fragments: vec![LineFragment {
                        offset: 3,
                        match_length: 4,
                    }],
                }],
            }],
        }
    }

    #[test]
    fn test_decode_across_chunks() {
        let body = encode_frames(&[Frame::Result(sample_result()), Frame::Done]).unwrap();

        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in body.chunks(7) {
            decoder.push(chunk);
            while let Some(frame) = decoder.next_frame().unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames, vec![Frame::Result(sample_result()), Frame::Done]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_incomplete_frame_waits() {
        let body = encode_frames(&[Frame::Done]).unwrap();
        let mut decoder = FrameDecoder::new();
        decoder.push(&body[..body.len() - 1]);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.push(&body[body.len() - 1..]);
        assert_eq!(decoder.next_frame().unwrap(), Some(Frame::Done));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&(MAX_FRAME_LEN as u32 + 1).to_le_bytes());
        assert!(decoder.next_frame().is_err());
    }

    #[test]
    fn test_frame_tags() {
        let json = serde_json::to_string(&Frame::Error {
            message: "shard down".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"error","message":"shard down"}"#);
        assert_eq!(serde_json::to_string(&Frame::Done).unwrap(), r#"{"type":"done"}"#);
    }

    #[test]
    fn test_options_wall_time_humantime() {
        let options: SearchOptions =
            serde_json::from_str(r#"{"max_wall_time":"1m 30s","whole":true}"#).unwrap();
        assert_eq!(options.max_wall_time, Some(Duration::from_secs(90)));
        assert!(options.whole);
        assert_eq!(options.total_max_match_count, 0);
    }

    #[test]
    fn test_request_carries_basic() {
        let request = SearchRequest {
            query: crate::query::Basic {
                parameters: vec![crate::query::Parameter::new("repo", "api")],
                pattern: Some(Node::pattern("main")),
            },
            options: SearchOptions::default(),
        };
        let json = serde_json::to_string(&request).unwrap();
        let decoded: SearchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_merge_results() {
        let mut total = SearchResult::default();
        total.merge(sample_result());
        total.merge(sample_result());
        assert_eq!(total.stats.match_count, 4);
        assert_eq!(total.files.len(), 2);
    }
}
