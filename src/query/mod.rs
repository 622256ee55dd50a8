//! Query compilation: text to node tree to a plan of Basic queries, and back
//! to text.

pub mod dnf;
pub mod error;
pub mod fields;
pub mod parser;
pub mod partition;
pub mod pipeline;
pub mod printer;
pub mod types;
pub mod validate;

pub use dnf::dnf;
pub use error::{PartitionError, QueryError, SyntaxError, ValidationError};
pub use parser::{parse, ParserOptions, SearchType};
pub use partition::partition_search_pattern;
pub use pipeline::{pipeline, Plan};
pub use printer::{string_human, structural};
pub use types::{Annotation, Basic, Kind, Labels, Node, Operator, Parameter, Pattern, Range};
pub use validate::validate;
