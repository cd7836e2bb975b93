//! Lookup by key.
//!
//! Resolvers find records through [`EntityLookup`], so the backing strategy
//! can change without touching the resolver contract. The indexed
//! [`EntityCollection`] is the production implementation; [`scan`] is the
//! linear first-match search it replaces.

use crate::collection::{Entity, EntityCollection};
use crate::error::ShapeError;
use crate::reference::{ReferenceObject, project_key};
use fedgraph_kernel::KeyDescriptor;
use serde_json::Value;

pub trait EntityLookup: Send + Sync {
    /// The record whose key equals the reference's, if any.
    ///
    /// The reference must already match the key's shape.
    fn find(
        &self,
        reference: &ReferenceObject,
        key: &KeyDescriptor,
    ) -> Result<Option<&Entity>, ShapeError>;
}

impl EntityLookup for EntityCollection {
    fn find(
        &self,
        reference: &ReferenceObject,
        key: &KeyDescriptor,
    ) -> Result<Option<&Entity>, ShapeError> {
        let canonical = reference.canonical_key(key)?;
        Ok(self.by_canonical_key(&reference.typename, &canonical))
    }
}

/// Linear search: the first record of the reference's type whose key
/// projection deep-equals the reference. Records without a usable key
/// never match.
pub fn scan<'a>(
    records: &'a [Entity],
    reference: &ReferenceObject,
    key: &KeyDescriptor,
) -> Result<Option<&'a Entity>, ShapeError> {
    reference.check_shape(key)?;
    let wanted = Value::Object(reference.fields.clone());
    Ok(records.iter().find(|record| {
        record.typename == reference.typename
            && project_key(&record.fields, key).is_ok_and(|projected| projected == wanted)
    }))
}
