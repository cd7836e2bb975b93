//! Schema fragments: the partial schema one subgraph publishes.
//!
//! A fragment is produced once per subgraph at startup and is immutable
//! thereafter. It records which types the subgraph owns, which it extends,
//! which fields it only references (`@external`), and which entity types it
//! can hydrate from a reference (`resolvers`).

use crate::key::{FieldCatalog, KeySelection, ParseError};
use crate::name::{SubgraphId, TypeName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

fn default_true() -> bool {
    true
}

/// Reference to a named type, possibly wrapped in one list.
///
/// `[Link!]!` is `{ name: Link, list: true, nullable: false, item_nullable: false }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub name: TypeName,
    #[serde(default)]
    pub list: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Nullability of list items; meaningless unless `list` is set.
    #[serde(default = "default_true")]
    pub item_nullable: bool,
}

impl TypeRef {
    /// A nullable reference to `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: TypeName::new(name),
            list: false,
            nullable: true,
            item_nullable: true,
        }
    }

    /// A nullable list of nullable `name`.
    pub fn list_of(name: impl Into<String>) -> Self {
        Self {
            list: true,
            ..Self::named(name)
        }
    }

    /// Mark the outer type non-null.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark list items non-null.
    pub fn items_required(mut self) -> Self {
        self.item_nullable = false;
        self
    }

    /// Same named type and list-ness; nullability may differ.
    pub fn compatible_with(&self, other: &TypeRef) -> bool {
        self.name == other.name && self.list == other.list
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "[{}", self.name)?;
            if !self.item_nullable {
                f.write_str("!")?;
            }
            f.write_str("]")?;
        } else {
            write!(f, "{}", self.name)?;
        }
        if !self.nullable {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// An argument on a field, e.g. `id: ID!` in `speaker(id: ID!)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentDefinition {
    pub name: String,
    pub type_ref: TypeRef,
}

/// One field as declared by one subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    pub type_ref: TypeRef,
    /// Declared `@external`: the field belongs to the owner and is only referenced here.
    #[serde(default)]
    pub is_external: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentDefinition>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            is_external: false,
            arguments: Vec::new(),
        }
    }

    /// Mark this field `@external`.
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.arguments.push(ArgumentDefinition {
            name: name.into(),
            type_ref,
        });
        self
    }

    pub fn is_list(&self) -> bool {
        self.type_ref.list
    }

    pub fn is_nullable(&self) -> bool {
        self.type_ref.nullable
    }
}

/// An object type as declared (or extended) by one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeDef {
    pub name: TypeName,
    pub fields: Vec<FieldDefinition>,
    /// Raw `@key(fields: "...")` argument, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub is_extension: bool,
}

impl ObjectTypeDef {
    /// A type this fragment owns.
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            name: TypeName::new(name),
            fields: Vec::new(),
            key: None,
            is_extension: false,
        }
    }

    /// An `extend type` declaration.
    pub fn extension(name: impl Into<String>) -> Self {
        Self {
            is_extension: true,
            ..Self::owned(name)
        }
    }

    pub fn with_key(mut self, fields: impl Into<String>) -> Self {
        self.key = Some(fields.into());
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Errors detected while assembling a single fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FragmentError {
    #[error("subgraph {subgraph} declares type {type_name} more than once")]
    DuplicateType {
        subgraph: SubgraphId,
        type_name: TypeName,
    },

    #[error("subgraph {subgraph} declares field {type_name}.{field} more than once")]
    DuplicateField {
        subgraph: SubgraphId,
        type_name: TypeName,
        field: String,
    },

    #[error("subgraph {subgraph}: malformed key on {type_name}: {source}")]
    MalformedKey {
        subgraph: SubgraphId,
        type_name: TypeName,
        #[source]
        source: ParseError,
    },
}

/// The self-contained schema description authored by one subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFragment {
    pub subgraph: SubgraphId,
    pub types: BTreeMap<TypeName, ObjectTypeDef>,
    /// Custom scalars declared by this subgraph.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub scalars: BTreeSet<TypeName>,
    /// Entity types for which this subgraph registered a reference resolver.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub resolvers: BTreeSet<TypeName>,
}

impl SchemaFragment {
    pub fn new(subgraph: impl Into<String>) -> Self {
        Self {
            subgraph: SubgraphId::new(subgraph),
            types: BTreeMap::new(),
            scalars: BTreeSet::new(),
            resolvers: BTreeSet::new(),
        }
    }

    /// Add one type declaration, rejecting duplicate type or field names.
    ///
    /// The key declaration is checked for syntax only; resolving it against
    /// fields is a composition concern because nested key segments may live
    /// on types declared by other subgraphs.
    pub fn add_type(&mut self, def: ObjectTypeDef) -> Result<(), FragmentError> {
        if self.types.contains_key(&def.name) {
            return Err(FragmentError::DuplicateType {
                subgraph: self.subgraph.clone(),
                type_name: def.name,
            });
        }

        let mut seen = BTreeSet::new();
        for field in &def.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FragmentError::DuplicateField {
                    subgraph: self.subgraph.clone(),
                    type_name: def.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if let Some(raw) = &def.key {
            KeySelection::parse(raw).map_err(|source| FragmentError::MalformedKey {
                subgraph: self.subgraph.clone(),
                type_name: def.name.clone(),
                source,
            })?;
        }

        self.types.insert(def.name.clone(), def);
        Ok(())
    }

    /// Builder form of [`add_type`](Self::add_type).
    pub fn with_type(mut self, def: ObjectTypeDef) -> Result<Self, FragmentError> {
        self.add_type(def)?;
        Ok(self)
    }

    pub fn with_scalar(mut self, name: impl Into<String>) -> Self {
        self.scalars.insert(TypeName::new(name));
        self
    }

    pub fn with_resolver(mut self, type_name: impl Into<String>) -> Self {
        self.resolvers.insert(TypeName::new(type_name));
        self
    }

    pub fn get(&self, name: &TypeName) -> Option<&ObjectTypeDef> {
        self.types.get(name)
    }
}

impl FieldCatalog for SchemaFragment {
    fn field(&self, type_name: &TypeName, field: &str) -> Option<&FieldDefinition> {
        self.types.get(type_name)?.field(field)
    }

    fn has_type(&self, type_name: &TypeName) -> bool {
        self.types.contains_key(type_name)
    }

    fn is_leaf_type(&self, type_name: &TypeName) -> bool {
        type_name.is_builtin_scalar() || self.scalars.contains(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_display() {
        assert_eq!(TypeRef::named("ID").required().to_string(), "ID!");
        assert_eq!(TypeRef::list_of("Slot").to_string(), "[Slot]");
        assert_eq!(
            TypeRef::list_of("Link").items_required().required().to_string(),
            "[Link!]!"
        );
    }

    #[test]
    fn compatibility_ignores_nullability() {
        let a = TypeRef::named("String");
        let b = TypeRef::named("String").required();
        assert!(a.compatible_with(&b));
        assert_ne!(a, b);
        assert!(!a.compatible_with(&TypeRef::list_of("String")));
    }

    #[test]
    fn duplicate_field_rejected() {
        let def = ObjectTypeDef::owned("Slot")
            .with_field(FieldDefinition::new("slotId", TypeRef::named("ID")))
            .with_field(FieldDefinition::new("slotId", TypeRef::named("ID")));
        let err = SchemaFragment::new("schedule").with_type(def).unwrap_err();
        assert!(matches!(err, FragmentError::DuplicateField { .. }));
    }

    #[test]
    fn malformed_key_is_fatal_at_load() {
        let def = ObjectTypeDef::owned("Speaker")
            .with_key("link { href")
            .with_field(FieldDefinition::new("link", TypeRef::named("Link")));
        let err = SchemaFragment::new("speakers").with_type(def).unwrap_err();
        assert!(matches!(
            err,
            FragmentError::MalformedKey {
                source: ParseError::UnbalancedBraces { .. },
                ..
            }
        ));
    }

    #[test]
    fn duplicate_type_rejected() {
        let mut fragment = SchemaFragment::new("schedule");
        fragment.add_type(ObjectTypeDef::owned("Slot")).unwrap();
        let err = fragment.add_type(ObjectTypeDef::owned("Slot")).unwrap_err();
        assert!(matches!(err, FragmentError::DuplicateType { .. }));
    }
}
