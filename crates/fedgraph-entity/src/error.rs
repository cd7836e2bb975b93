//! Error types for entity loading and reference resolution.

use fedgraph_kernel::TypeName;
use std::time::Duration;

/// Why a reference does not match its entity's key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("representation is not a JSON object")]
    NotAnObject,

    #[error("representation has no `__typename`")]
    MissingTypename,

    #[error("missing key field `{path}`")]
    MissingField { path: String },

    #[error("unexpected field `{path}`")]
    UnexpectedField { path: String },

    #[error("key field `{path}` must be an object")]
    ExpectedObject { path: String },

    #[error("key field `{path}` must be a non-null scalar, found {found}")]
    ExpectedScalar { path: String, found: &'static str },
}

/// Failure to resolve a single reference. Never used for "not found".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The caller passed a reference that does not match the key shape.
    #[error("invalid reference for {typename}: {reason}")]
    InvalidReference {
        typename: String,
        #[source]
        reason: ShapeError,
    },

    /// The type is not an entity in the composed schema.
    #[error("{typename} is not a resolvable entity type")]
    NotAnEntity { typename: TypeName },

    /// No resolver is registered for the entity type.
    #[error("no reference resolver registered for {typename}")]
    NoResolver { typename: TypeName },

    /// The resolver did not answer within the caller's timeout.
    #[error("resolving {typename} timed out after {}ms", .after.as_millis())]
    Timeout { typename: TypeName, after: Duration },

    /// The resolver failed or panicked.
    #[error("resolver for {typename} failed: {message}")]
    Failed { typename: TypeName, message: String },
}

impl ResolveError {
    pub fn invalid(typename: impl Into<String>, reason: ShapeError) -> Self {
        Self::InvalidReference {
            typename: typename.into(),
            reason,
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidReference { .. } => "invalid_reference",
            Self::NotAnEntity { .. } => "not_an_entity",
            Self::NoResolver { .. } => "no_resolver",
            Self::Timeout { .. } => "timeout",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Entity data that cannot back a resolver. Fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("record {index} has no `__typename`")]
    MissingTypename { index: usize },

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} of type {typename} has no usable key: {reason}")]
    MissingKey {
        typename: TypeName,
        index: usize,
        #[source]
        reason: ShapeError,
    },

    #[error("duplicate key {key} for {typename} (records {first} and {second})")]
    DuplicateKey {
        typename: TypeName,
        key: String,
        first: usize,
        second: usize,
    },

    #[error("entity data must be an array of records or a map of type name to records")]
    UnexpectedLayout,

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{path}: {message}")]
    Io { path: String, message: String },
}
