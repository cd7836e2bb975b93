//! Per-subgraph resolver registry.

use crate::collection::{EntityCollection, EntityKeys};
use crate::error::ResolveError;
use crate::resolver::{CollectionResolver, ReferenceResolver};
use fedgraph_kernel::{SchemaFragment, SubgraphId, TypeName};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Anything that can hand out the resolver for an entity type.
pub trait ResolverSource {
    fn resolver_for(&self, typename: &TypeName) -> Result<Arc<dyn ReferenceResolver>, ResolveError>;
}

/// The reference resolvers one subgraph registered, by entity type.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    subgraph: SubgraphId,
    resolvers: BTreeMap<TypeName, Arc<dyn ReferenceResolver>>,
}

impl ResolverRegistry {
    pub fn new(subgraph: impl Into<String>) -> Self {
        Self {
            subgraph: SubgraphId::new(subgraph),
            resolvers: BTreeMap::new(),
        }
    }

    pub fn subgraph(&self) -> &SubgraphId {
        &self.subgraph
    }

    /// Register (or replace) the resolver for `typename`.
    pub fn register(
        &mut self,
        typename: impl Into<String>,
        resolver: Arc<dyn ReferenceResolver>,
    ) -> &mut Self {
        self.resolvers.insert(TypeName::new(typename), resolver);
        self
    }

    /// Register a [`CollectionResolver`] for each listed type that has a key.
    ///
    /// Returns the listed types that are not entities.
    pub fn register_collection(
        &mut self,
        types: &[TypeName],
        keys: &EntityKeys,
        collection: Arc<EntityCollection>,
    ) -> Vec<TypeName> {
        let mut unkeyed = Vec::new();
        for typename in types {
            match keys.get(typename) {
                Some(key) => {
                    let resolver =
                        CollectionResolver::new(typename.clone(), key.clone(), Arc::clone(&collection));
                    self.resolvers.insert(typename.clone(), Arc::new(resolver));
                }
                None => unkeyed.push(typename.clone()),
            }
        }
        unkeyed
    }

    pub fn get(&self, typename: &TypeName) -> Option<&Arc<dyn ReferenceResolver>> {
        self.resolvers.get(typename)
    }

    pub fn contains(&self, typename: &TypeName) -> bool {
        self.resolvers.contains_key(typename)
    }

    /// Registered entity types, in name order.
    pub fn types(&self) -> impl Iterator<Item = &TypeName> {
        self.resolvers.keys()
    }

    /// Record the registered types on the subgraph's fragment, so the
    /// validator can check every owned entity has a resolver.
    pub fn annotate(&self, fragment: &mut SchemaFragment) {
        fragment.resolvers.extend(self.resolvers.keys().cloned());
    }
}

impl ResolverSource for ResolverRegistry {
    fn resolver_for(&self, typename: &TypeName) -> Result<Arc<dyn ReferenceResolver>, ResolveError> {
        self.get(typename)
            .cloned()
            .ok_or_else(|| ResolveError::NoResolver {
                typename: typename.clone(),
            })
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("subgraph", &self.subgraph)
            .field("types", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceObject;
    use crate::resolver::{RequestContext, Resolution};

    fn not_found(_: &ReferenceObject, _: &RequestContext) -> Result<Resolution, ResolveError> {
        Ok(Resolution::NotFound)
    }

    #[test]
    fn annotates_fragment_resolvers() {
        let mut registry = ResolverRegistry::new("speakers");
        registry.register("Speaker", Arc::new(not_found));

        let mut fragment = SchemaFragment::new("speakers");
        registry.annotate(&mut fragment);
        assert!(fragment.resolvers.contains(&TypeName::new("Speaker")));
    }

    #[test]
    fn missing_resolver_is_an_error() {
        let registry = ResolverRegistry::new("speakers");
        let err = registry.resolver_for(&TypeName::new("Speaker")).err();
        assert_eq!(
            err,
            Some(ResolveError::NoResolver {
                typename: TypeName::new("Speaker")
            })
        );
    }

    #[test]
    fn unkeyed_types_are_reported() {
        let mut registry = ResolverRegistry::new("speakers");
        let unkeyed = registry.register_collection(
            &[TypeName::new("Link")],
            &EntityKeys::new(),
            Arc::new(EntityCollection::default()),
        );
        assert_eq!(unkeyed, vec![TypeName::new("Link")]);
        assert_eq!(registry.types().count(), 0);
    }
}
