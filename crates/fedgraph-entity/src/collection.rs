//! Entity collections: the ground-truth records a subgraph resolves from.
//!
//! Loaded once, read-only thereafter. Loading enforces that every record of
//! a keyed type carries its key and that keys are unique per type, then
//! indexes records by the canonical form of their key.

use crate::error::{CollectionError, ShapeError};
use crate::reference::{ReferenceObject, TYPENAME_FIELD, canonical_json, project_key};
use fedgraph_kernel::{KeyDescriptor, TypeName, UnifiedSchema};
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Entity keys by type, as composed.
pub type EntityKeys = BTreeMap<TypeName, KeyDescriptor>;

/// Keys of every entity type in a composed schema.
pub fn entity_keys(schema: &UnifiedSchema) -> EntityKeys {
    schema
        .entities()
        .filter_map(|ty| ty.key.clone().map(|key| (ty.name.clone(), key)))
        .collect()
}

/// A fully hydrated record of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub typename: TypeName,
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(typename: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            typename: TypeName::new(typename),
            fields,
        }
    }

    /// Build from a JSON object carrying `__typename`.
    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        let reference = ReferenceObject::from_representation(value)?;
        Ok(Self {
            typename: reference.typename,
            fields: reference.fields,
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The record as a JSON object with `__typename`.
    pub fn to_value(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert(
            TYPENAME_FIELD.to_string(),
            Value::String(self.typename.to_string()),
        );
        Value::Object(out)
    }
}

impl Serialize for Entity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(TYPENAME_FIELD, self.typename.as_str())?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One subgraph's read-only entity store.
#[derive(Debug, Default)]
pub struct EntityCollection {
    records: Vec<Entity>,
    keys: EntityKeys,
    /// Type → canonical key → record index.
    index: HashMap<TypeName, HashMap<String, usize>>,
}

impl EntityCollection {
    /// Load records, enforcing key presence and per-type uniqueness.
    ///
    /// Records of types without a key are kept but not indexed.
    pub fn load(records: Vec<Entity>, keys: &EntityKeys) -> Result<Self, CollectionError> {
        let mut index: HashMap<TypeName, HashMap<String, usize>> = HashMap::new();

        for (i, record) in records.iter().enumerate() {
            let Some(key) = keys.get(&record.typename) else {
                continue;
            };
            let projected =
                project_key(&record.fields, key).map_err(|reason| CollectionError::MissingKey {
                    typename: record.typename.clone(),
                    index: i,
                    reason,
                })?;
            let canonical = canonical_json(&projected);

            let by_key = index.entry(record.typename.clone()).or_default();
            if let Some(&first) = by_key.get(&canonical) {
                return Err(CollectionError::DuplicateKey {
                    typename: record.typename.clone(),
                    key: canonical,
                    first,
                    second: i,
                });
            }
            by_key.insert(canonical, i);
        }

        tracing::debug!(
            records = records.len(),
            indexed_types = index.len(),
            "entity collection loaded"
        );

        Ok(Self {
            records,
            keys: keys.clone(),
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in load order.
    pub fn records(&self) -> &[Entity] {
        &self.records
    }

    /// Records of one type, in load order.
    pub fn of_type<'a>(&'a self, typename: &'a TypeName) -> impl Iterator<Item = &'a Entity> + 'a {
        self.records.iter().filter(move |r| &r.typename == typename)
    }

    /// The key this collection was indexed with for `typename`.
    pub fn key(&self, typename: &TypeName) -> Option<&KeyDescriptor> {
        self.keys.get(typename)
    }

    pub(crate) fn by_canonical_key(&self, typename: &TypeName, canonical: &str) -> Option<&Entity> {
        let i = *self.index.get(typename)?.get(canonical)?;
        self.records.get(i)
    }
}
