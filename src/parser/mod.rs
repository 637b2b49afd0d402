//! Source-location utilities shared by the AST and by error reporting.
//!
//! Parsing the query text itself is an external concern (see the crate-level
//! docs); this module only keeps the position/span bookkeeping that incoming
//! [`Document`](crate::ast::Document)s are expected to carry, so that
//! compiled plans can report accurate error locations.

mod utils;

pub use self::utils::{Span, SourcePosition, Spanning};
