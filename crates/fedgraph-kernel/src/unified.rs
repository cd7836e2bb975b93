//! The unified schema produced by composition.
//!
//! Immutable between derivations: a hot reload composes a new one and
//! compares [`fingerprint`](UnifiedSchema::fingerprint)s.

use crate::fragment::{FieldDefinition, TypeRef};
use crate::key::{FieldCatalog, KeyDescriptor};
use crate::name::{SubgraphId, TypeName};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A non-owning subgraph's `@external` declaration of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDeclaration {
    pub subgraph: SubgraphId,
    pub type_ref: TypeRef,
}

/// One field of a unified type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedField {
    /// The winning definition. Owned definitions win over external ones.
    pub definition: FieldDefinition,

    /// Subgraph obliged to resolve this field. `None` when the field is only
    /// ever declared `@external`.
    pub resolved_by: Option<SubgraphId>,

    /// `@external` declarations by non-owning subgraphs, in fragment order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub externals: Vec<ExternalDeclaration>,
}

impl UnifiedField {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// A type after merging every fragment that mentions it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedType {
    pub name: TypeName,

    /// Subgraphs declaring the type without `extend`, in fragment order.
    /// A valid non-root type has exactly one.
    pub owners: Vec<SubgraphId>,

    /// Subgraphs declaring the type with `extend`, in fragment order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended_by: Vec<SubgraphId>,

    /// Union of owned and external fields in first-seen order.
    pub fields: Vec<UnifiedField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyDescriptor>,

    /// Whether the owner registered a reference resolver for this type.
    #[serde(default)]
    pub resolver_registered: bool,
}

impl UnifiedType {
    /// The single owner, if ownership is unambiguous.
    pub fn owner(&self) -> Option<&SubgraphId> {
        match self.owners.as_slice() {
            [owner] => Some(owner),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_root_operation()
    }

    /// An entity is a type with a key.
    pub fn is_entity(&self) -> bool {
        self.key.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&UnifiedField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn has_external_fields(&self) -> bool {
        self.fields.iter().any(|f| !f.externals.is_empty())
    }
}

/// Deterministic fingerprint of a unified schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The composed schema: every type, its owner, fields and key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSchema {
    pub types: BTreeMap<TypeName, UnifiedType>,

    /// Custom scalars declared by any subgraph.
    #[serde(default)]
    pub scalars: BTreeSet<TypeName>,

    /// Contributing subgraphs in fragment order.
    pub subgraphs: Vec<SubgraphId>,
}

impl UnifiedSchema {
    pub fn get(&self, name: &TypeName) -> Option<&UnifiedType> {
        self.types.get(name)
    }

    /// Entity types, i.e. types carrying a key.
    pub fn entities(&self) -> impl Iterator<Item = &UnifiedType> {
        self.types.values().filter(|t| t.is_entity())
    }

    /// Whether `name` is a built-in or declared scalar.
    pub fn is_scalar(&self, name: &TypeName) -> bool {
        name.is_builtin_scalar() || self.scalars.contains(name)
    }

    /// Whether `name` is defined anywhere in the schema.
    pub fn is_defined(&self, name: &TypeName) -> bool {
        self.is_scalar(name) || self.types.contains_key(name)
    }

    /// SHA-256 over the canonical serialized form.
    ///
    /// Maps are ordered and field order is first-seen, so two compositions
    /// of the same fragments in the same order always agree.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(b"unified-schema:v1\n");
        match serde_json::to_vec(self) {
            Ok(bytes) => hasher.update(&bytes),
            Err(_) => hasher.update(b"<unserializable>"),
        }
        let hash = hasher.finalize();
        Fingerprint(format!("{hash:x}"))
    }
}

impl FieldCatalog for UnifiedSchema {
    fn field(&self, type_name: &TypeName, field: &str) -> Option<&FieldDefinition> {
        self.types
            .get(type_name)?
            .field(field)
            .map(|f| &f.definition)
    }

    fn has_type(&self, type_name: &TypeName) -> bool {
        self.types.contains_key(type_name)
    }

    fn is_leaf_type(&self, type_name: &TypeName) -> bool {
        self.is_scalar(type_name)
    }
}
