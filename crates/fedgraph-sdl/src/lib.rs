//! # Fedgraph SDL
//!
//! The schema-description side of federation. Subgraphs publish their
//! fragment as SDL text; this crate turns that text into a
//! [`SchemaFragment`](fedgraph_kernel::SchemaFragment) and prints a
//! composed [`UnifiedSchema`](fedgraph_kernel::UnifiedSchema) back out as
//! a single document with `@join__type` / `@join__field` annotations.

pub mod error;
pub mod lex;
pub mod parse;
pub mod print;

pub use error::{Result, SdlError};
pub use parse::{Parser, parse_fragment};
pub use print::print_supergraph;
