//! # searchq - code search query compiler
//!
//! searchq turns code search query text such as
//! `repo:acme file:\.rs$ (parse or lex) not test` into a plan of simple
//! queries an index service can run, and streams the matches back.
//!
//! ## Architecture
//!
//! - [`query`] - Parsing, DNF expansion, partitioning, validation and
//!   printing queries back to text
//! - [`backend`] - Index service client, streaming contract and the
//!   adapter for one-shot backends
//! - [`config`] - TOML configuration
//! - [`output`] - Terminal rendering of plans and matches
//! - [`utils`] - Quoting and glob translation
//!
//! ## Quick Start
//!
//! ```
//! use searchq::query::{pipeline, ParserOptions};
//!
//! let plan = pipeline("repo:acme (parse or lex)", &ParserOptions::default()).unwrap();
//! assert_eq!(plan.human_strings(), vec!["repo:acme parse", "repo:acme lex"]);
//! ```
//!
//! Every entry of a plan is run independently and the results are
//! unioned. [`backend::spawn_plan`] runs the entries concurrently over any
//! [`backend::Streamer`].

pub mod backend;
pub mod config;
pub mod output;
pub mod query;
pub mod utils;
