//! Identifiers shared across the federation namespace.
//!
//! A [`TypeName`] is unique within the unified schema; a [`SubgraphId`]
//! names one independently deployed service contributing a fragment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalars every subgraph may reference without declaring them.
pub const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// Root operation types. These are shared by all subgraphs and never owned.
pub const ROOT_OPERATION_TYPES: &[&str] = &["Query", "Mutation", "Subscription"];

/// Name of an object or scalar type in the unified namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the built-in GraphQL scalars.
    pub fn is_builtin_scalar(&self) -> bool {
        BUILTIN_SCALARS.contains(&self.0.as_str())
    }

    /// Whether this names a root operation type (`Query`, `Mutation`, `Subscription`).
    pub fn is_root_operation(&self) -> bool {
        ROOT_OPERATION_TYPES.contains(&self.0.as_str())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier for a subgraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubgraphId(pub String);

impl SubgraphId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubgraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubgraphId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Render a list of subgraph ids for diagnostics: `a, b, c`.
pub(crate) fn join_ids(ids: &[SubgraphId]) -> String {
    ids.iter()
        .map(SubgraphId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_and_root_classification() {
        assert!(TypeName::new("ID").is_builtin_scalar());
        assert!(!TypeName::new("Link").is_builtin_scalar());
        assert!(TypeName::new("Query").is_root_operation());
        assert!(!TypeName::new("Speaker").is_root_operation());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_value(SubgraphId::new("speakers")).unwrap();
        assert_eq!(json, serde_json::json!("speakers"));
    }
}
