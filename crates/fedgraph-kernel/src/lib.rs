//! # Fedgraph Kernel
//!
//! Entity federation core: how subgraphs declare ownership of an entity
//! type, how other subgraphs extend it through `@external` key fields, and
//! how independently authored fragments compose into one unified schema.
//!
//! This crate is pure. It performs no I/O; parsing schema text and
//! resolving references at query time live in sibling crates.
//!
//! ## Architecture
//!
//! ```text
//! SchemaFragment        ← One subgraph's types, keys, externals, resolvers
//!     │
//! KeySelection          ← Parsed `@key(fields: "...")`, syntax only
//!     │
//! KeyDescriptor         ← Key resolved to scalar leaves
//!     │
//! merge                 ← Ownership, field folding, key attachment
//!     │
//! validate              ← Global invariants, all reported together
//!     │
//! UnifiedSchema         ← Immutable result, fingerprinted
//! ```

pub mod error;
pub mod fragment;
pub mod key;
pub mod merge;
pub mod name;
pub mod report;
pub mod unified;
pub mod validate;

pub use error::{CompositionError, MergeError};
pub use fragment::{
    ArgumentDefinition, FieldDefinition, FragmentError, ObjectTypeDef, SchemaFragment, TypeRef,
};
pub use key::{FieldCatalog, KeyDescriptor, KeySegment, KeySelection, ParseError, parse_key};
pub use merge::merge;
pub use name::{BUILTIN_SCALARS, ROOT_OPERATION_TYPES, SubgraphId, TypeName};
pub use report::{CompositionReport, Diagnostic, Verdict};
pub use unified::{ExternalDeclaration, Fingerprint, UnifiedField, UnifiedSchema, UnifiedType};
pub use validate::validate;
