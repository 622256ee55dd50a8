//! Utility functions shared by the parser and the printer.
//!
//! ## Modules
//!
//! - [`quote`] - Quoting and scanning of double-quoted query values
//! - [`glob`] - Glob to regular expression translation (globbing dialect)
//!
//! ## Key Functions
//!
//! ```
//! use searchq::utils::{quote, scan_quoted};
//!
//! let quoted = quote("foo \"bar\"");
//! let (value, used) = scan_quoted(&quoted).unwrap();
//! assert_eq!(value, "foo \"bar\"");
//! assert_eq!(used, quoted.len());
//! ```

pub mod glob;
pub mod quote;

pub use glob::*;
pub use quote::*;
