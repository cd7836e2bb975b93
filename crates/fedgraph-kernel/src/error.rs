//! Composition error types.

use crate::name::{SubgraphId, TypeName, join_ids};
use serde::{Deserialize, Serialize};

/// A violated composition invariant.
///
/// Variants carry the offending type, the subgraphs involved, and the
/// invariant that failed, so each one is actionable on its own.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, thiserror::Error,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeError {
    /// More than one fragment declares the type without `extend`.
    #[error("type {type_name} is owned by more than one subgraph: {}", join_ids(.subgraphs))]
    DuplicateOwner {
        type_name: TypeName,
        subgraphs: Vec<SubgraphId>,
    },

    /// Only extensions mention the type.
    #[error("type {type_name} is extended by {} but no subgraph owns it", join_ids(.extended_by))]
    MissingOwner {
        type_name: TypeName,
        extended_by: Vec<SubgraphId>,
    },

    /// Two definitions of the same field disagree and neither may win.
    #[error("field {type_name}.{field} conflicts between {}: {detail}", join_ids(.subgraphs))]
    ConflictingField {
        type_name: TypeName,
        field: String,
        subgraphs: Vec<SubgraphId>,
        detail: String,
    },

    /// The key does not resolve to scalar leaves on the type.
    #[error("invalid key on {type_name} declared by {subgraph}: {reason}")]
    InvalidKeyPath {
        type_name: TypeName,
        subgraph: SubgraphId,
        reason: String,
    },

    /// An extension declares a different key than the one the type carries.
    #[error("subgraph {subgraph} keys {type_name} by `{found}` but the type is keyed by `{expected}`")]
    KeyMismatch {
        type_name: TypeName,
        subgraph: SubgraphId,
        expected: String,
        found: String,
    },

    /// An `@external` field with no owning declaration to match.
    #[error("subgraph {subgraph} marks {type_name}.{field} @external but the owner does not declare it")]
    UnmatchedExternal {
        type_name: TypeName,
        field: String,
        subgraph: SubgraphId,
    },

    /// An entity owner has no reference resolver registered.
    #[error("entity {type_name} has a key but its owner {subgraph} registered no reference resolver")]
    MissingResolver {
        type_name: TypeName,
        subgraph: SubgraphId,
    },

    /// A field refers to a type no subgraph defines.
    #[error("field {type_name}.{field} refers to undefined type {referenced}")]
    UnknownType {
        type_name: TypeName,
        field: String,
        referenced: TypeName,
    },

    /// Two fragments claim the same subgraph id.
    #[error("subgraph {subgraph} supplied more than one fragment")]
    DuplicateSubgraph { subgraph: SubgraphId },
}

impl MergeError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateOwner { .. } => "duplicate_owner",
            Self::MissingOwner { .. } => "missing_owner",
            Self::ConflictingField { .. } => "conflicting_field",
            Self::InvalidKeyPath { .. } => "invalid_key_path",
            Self::KeyMismatch { .. } => "key_mismatch",
            Self::UnmatchedExternal { .. } => "unmatched_external",
            Self::MissingResolver { .. } => "missing_resolver",
            Self::UnknownType { .. } => "unknown_type",
            Self::DuplicateSubgraph { .. } => "duplicate_subgraph",
        }
    }

    /// The type the error is about, if any.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Self::DuplicateOwner { type_name, .. }
            | Self::MissingOwner { type_name, .. }
            | Self::ConflictingField { type_name, .. }
            | Self::InvalidKeyPath { type_name, .. }
            | Self::KeyMismatch { type_name, .. }
            | Self::UnmatchedExternal { type_name, .. }
            | Self::MissingResolver { type_name, .. }
            | Self::UnknownType { type_name, .. } => Some(type_name),
            Self::DuplicateSubgraph { .. } => None,
        }
    }

    /// The field the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ConflictingField { field, .. }
            | Self::UnmatchedExternal { field, .. }
            | Self::UnknownType { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Every subgraph implicated by the error.
    pub fn subgraphs(&self) -> Vec<&SubgraphId> {
        match self {
            Self::DuplicateOwner { subgraphs, .. } | Self::ConflictingField { subgraphs, .. } => {
                subgraphs.iter().collect()
            }
            Self::MissingOwner { extended_by, .. } => extended_by.iter().collect(),
            Self::InvalidKeyPath { subgraph, .. }
            | Self::KeyMismatch { subgraph, .. }
            | Self::UnmatchedExternal { subgraph, .. }
            | Self::MissingResolver { subgraph, .. }
            | Self::DuplicateSubgraph { subgraph } => vec![subgraph],
            Self::UnknownType { .. } => Vec::new(),
        }
    }
}

/// Composition failed; nothing was produced.
///
/// Holds every error found in one pass, sorted and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("composition failed with {} error(s): {}", .errors.len(), summarize(.errors))]
pub struct CompositionError {
    pub errors: Vec<MergeError>,
}

impl CompositionError {
    pub fn new(mut errors: Vec<MergeError>) -> Self {
        errors.sort();
        errors.dedup();
        Self { errors }
    }

    /// Whether any error has the given code.
    pub fn has(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }
}

fn summarize(errors: &[MergeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_owner_lists_subgraphs() {
        let err = MergeError::DuplicateOwner {
            type_name: TypeName::new("Slot"),
            subgraphs: vec![SubgraphId::new("schedule"), SubgraphId::new("rooms")],
        };
        assert_eq!(
            err.to_string(),
            "type Slot is owned by more than one subgraph: schedule, rooms"
        );
        assert_eq!(err.code(), "duplicate_owner");
    }

    #[test]
    fn composition_error_sorts_and_dedups() {
        let missing = MergeError::MissingResolver {
            type_name: TypeName::new("Speaker"),
            subgraph: SubgraphId::new("speakers"),
        };
        let duplicate = MergeError::DuplicateOwner {
            type_name: TypeName::new("Slot"),
            subgraphs: vec![SubgraphId::new("a"), SubgraphId::new("b")],
        };
        let err = CompositionError::new(vec![missing.clone(), duplicate.clone(), missing]);
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.errors[0].code(), "duplicate_owner");
        assert!(err.has("missing_resolver"));
    }

    #[test]
    fn composition_error_message_lists_every_error() {
        let err = CompositionError::new(vec![
            MergeError::UnknownType {
                type_name: TypeName::new("Talk"),
                field: "slot".to_string(),
                referenced: TypeName::new("Slot"),
            },
            MergeError::MissingResolver {
                type_name: TypeName::new("Speaker"),
                subgraph: SubgraphId::new("speakers"),
            },
        ]);
        insta::assert_snapshot!(
            err.to_string(),
            @"composition failed with 2 error(s): entity Speaker has a key but its owner speakers registered no reference resolver; field Talk.slot refers to undefined type Slot"
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = MergeError::DuplicateSubgraph {
            subgraph: SubgraphId::new("speakers"),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "duplicate_subgraph");
        assert_eq!(json["subgraph"], "speakers");
    }
}
