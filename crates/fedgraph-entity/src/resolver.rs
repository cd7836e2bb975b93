//! The reference resolver contract.
//!
//! Each subgraph supplies one [`ReferenceResolver`] per entity type it owns.
//! Given a reference carrying only key fields, it returns the full entity or
//! [`Resolution::NotFound`]. Not finding an entity is an answer, not an
//! error; errors are reserved for contract violations and failures.

use crate::collection::{Entity, EntityCollection};
use crate::error::ResolveError;
use crate::lookup::EntityLookup;
use crate::reference::ReferenceObject;
use fedgraph_kernel::{KeyDescriptor, TypeName};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "entity", rename_all = "snake_case")]
pub enum Resolution {
    Found(Entity),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Found(entity) => Some(entity),
            Self::NotFound => None,
        }
    }

    /// Nullable-field view for the gateway: `None` when not found.
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Found(entity) => Some(entity),
            Self::NotFound => None,
        }
    }
}

/// Request-scoped context passed with every resolution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Upper bound on a single resolution. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait ReferenceResolver: Send + Sync {
    /// Hydrate one reference. Must not fail for the ordinary not-found case.
    fn resolve_reference(
        &self,
        reference: &ReferenceObject,
        ctx: &RequestContext,
    ) -> Result<Resolution, ResolveError>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&ReferenceObject, &RequestContext) -> Result<Resolution, ResolveError> + Send + Sync,
{
    fn resolve_reference(
        &self,
        reference: &ReferenceObject,
        ctx: &RequestContext,
    ) -> Result<Resolution, ResolveError> {
        self(reference, ctx)
    }
}

/// Stock resolver: looks one entity type up in a collection by its key.
pub struct CollectionResolver<L = EntityCollection> {
    typename: TypeName,
    key: KeyDescriptor,
    lookup: Arc<L>,
}

impl<L: EntityLookup> CollectionResolver<L> {
    pub fn new(typename: TypeName, key: KeyDescriptor, lookup: Arc<L>) -> Self {
        Self {
            typename,
            key,
            lookup,
        }
    }

    pub fn typename(&self) -> &TypeName {
        &self.typename
    }
}

impl<L: EntityLookup> ReferenceResolver for CollectionResolver<L> {
    fn resolve_reference(
        &self,
        reference: &ReferenceObject,
        ctx: &RequestContext,
    ) -> Result<Resolution, ResolveError> {
        if reference.typename != self.typename {
            return Err(ResolveError::NoResolver {
                typename: reference.typename.clone(),
            });
        }

        let found = self
            .lookup
            .find(reference, &self.key)
            .map_err(|reason| ResolveError::invalid(reference.typename.as_str(), reason))?;

        tracing::debug!(
            request_id = %ctx.request_id,
            typename = %self.typename,
            found = found.is_some(),
            "resolved reference"
        );

        Ok(match found {
            Some(entity) => Resolution::Found(entity.clone()),
            None => Resolution::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::entity_keys;
    use crate::error::ShapeError;
    use fedgraph_kernel::{FieldDefinition, ObjectTypeDef, SchemaFragment, TypeRef, merge};
    use serde_json::json;

    fn speaker_resolver(records: Vec<serde_json::Value>) -> CollectionResolver {
        let fragment = SchemaFragment::new("speakers")
            .with_type(
                ObjectTypeDef::owned("Speaker")
                    .with_key("link { href }")
                    .with_field(FieldDefinition::new("firstName", TypeRef::named("String")))
                    .with_field(FieldDefinition::new("link", TypeRef::named("Link"))),
            )
            .unwrap()
            .with_type(
                ObjectTypeDef::owned("Link")
                    .with_field(FieldDefinition::new("href", TypeRef::named("String"))),
            )
            .unwrap()
            .with_resolver("Speaker");
        let keys = entity_keys(&merge(&[fragment]).unwrap());
        let records = records
            .into_iter()
            .map(|v| Entity::from_value(v).unwrap())
            .collect();
        let collection = EntityCollection::load(records, &keys).unwrap();
        let typename = TypeName::new("Speaker");
        CollectionResolver::new(typename.clone(), keys[&typename].clone(), Arc::new(collection))
    }

    fn reference(value: serde_json::Value) -> ReferenceObject {
        ReferenceObject::from_representation(value).unwrap()
    }

    #[test]
    fn finds_record_by_nested_key() {
        let resolver = speaker_resolver(vec![
            json!({"__typename": "Speaker", "firstName": "Ada", "link": {"href": "x"}}),
        ]);
        let resolution = resolver
            .resolve_reference(
                &reference(json!({"__typename": "Speaker", "link": {"href": "x"}})),
                &RequestContext::new(),
            )
            .unwrap();
        assert_eq!(
            resolution.entity().and_then(|e| e.get("firstName")),
            Some(&json!("Ada"))
        );
    }

    #[test]
    fn empty_collection_is_not_found() {
        let resolver = speaker_resolver(Vec::new());
        let resolution = resolver
            .resolve_reference(
                &reference(json!({"__typename": "Speaker", "link": {"href": "x"}})),
                &RequestContext::new(),
            )
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[test]
    fn extra_fields_are_invalid_reference() {
        let resolver = speaker_resolver(Vec::new());
        let err = resolver
            .resolve_reference(
                &reference(json!({
                    "__typename": "Speaker",
                    "link": {"href": "x"},
                    "firstName": "Ada",
                })),
                &RequestContext::new(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::InvalidReference {
                typename: "Speaker".into(),
                reason: ShapeError::UnexpectedField {
                    path: "firstName".into()
                },
            }
        );
    }

    #[test]
    fn closures_are_resolvers() {
        let always_missing =
            |_: &ReferenceObject, _: &RequestContext| -> Result<Resolution, ResolveError> {
                Ok(Resolution::NotFound)
            };
        let r = reference(json!({"__typename": "Talk", "id": "1"}));
        assert_eq!(
            always_missing.resolve_reference(&r, &RequestContext::new()),
            Ok(Resolution::NotFound)
        );
    }

    #[test]
    fn resolution_serializes_with_status() {
        assert_eq!(
            serde_json::to_value(Resolution::NotFound).unwrap(),
            json!({"status": "not_found"})
        );
    }
}
