//! The federation context object.
//!
//! Holds one composition and the subgraphs it was composed from. Nothing
//! here is global: a reload composes a fresh context and the caller decides
//! whether to swap it in.

use crate::batch::{ResolveResult, resolve_batch};
use crate::collection::{EntityKeys, entity_keys};
use crate::error::ResolveError;
use crate::registry::{ResolverRegistry, ResolverSource};
use crate::resolver::{ReferenceResolver, RequestContext};
use fedgraph_kernel::{
    CompositionError, CompositionReport, Fingerprint, SchemaFragment, SubgraphId, TypeName,
    UnifiedSchema, merge,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One subgraph: its published fragment and its resolvers.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub fragment: SchemaFragment,
    pub registry: ResolverRegistry,
}

impl Subgraph {
    pub fn new(fragment: SchemaFragment, registry: ResolverRegistry) -> Self {
        Self { fragment, registry }
    }

    pub fn id(&self) -> &SubgraphId {
        &self.fragment.subgraph
    }

    /// The fragment as composed: annotated with the registered resolvers.
    pub fn annotated_fragment(&self) -> SchemaFragment {
        let mut fragment = self.fragment.clone();
        self.registry.annotate(&mut fragment);
        fragment
    }
}

/// Entity keys the given fragments compose to.
///
/// Collection-backed resolvers need composed keys before the final
/// composition can run, so fragments passed here should already list the
/// resolvers their subgraphs are about to register.
pub fn composed_keys(fragments: &[SchemaFragment]) -> Result<EntityKeys, CompositionError> {
    merge(fragments).map(|schema| entity_keys(&schema))
}

/// Outcome of a hot reload.
#[derive(Debug)]
pub struct Reload {
    pub context: FederationContext,
    /// Whether the composed schema differs from the previous one.
    pub changed: bool,
}

#[derive(Debug)]
pub struct FederationContext {
    schema: Arc<UnifiedSchema>,
    fingerprint: Fingerprint,
    subgraphs: BTreeMap<SubgraphId, Subgraph>,
}

impl FederationContext {
    /// Compose subgraphs, in the given order, into a context.
    pub fn compose(subgraphs: Vec<Subgraph>) -> Result<Self, CompositionError> {
        let fragments: Vec<SchemaFragment> =
            subgraphs.iter().map(Subgraph::annotated_fragment).collect();
        let schema = merge(&fragments)?;
        let fingerprint = schema.fingerprint();

        tracing::info!(
            subgraphs = subgraphs.len(),
            fingerprint = %fingerprint,
            "federation context composed"
        );

        Ok(Self {
            schema: Arc::new(schema),
            fingerprint,
            subgraphs: subgraphs
                .into_iter()
                .map(|s| (s.id().clone(), s))
                .collect(),
        })
    }

    /// Compose a replacement. On failure the current context stays valid.
    pub fn reload(&self, subgraphs: Vec<Subgraph>) -> Result<Reload, CompositionError> {
        let context = Self::compose(subgraphs)?;
        let changed = context.fingerprint != self.fingerprint;
        tracing::info!(changed, "federation context reloaded");
        Ok(Reload { context, changed })
    }

    pub fn schema(&self) -> &Arc<UnifiedSchema> {
        &self.schema
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn subgraph(&self, id: &SubgraphId) -> Option<&Subgraph> {
        self.subgraphs.get(id)
    }

    pub fn report(&self) -> CompositionReport {
        CompositionReport::accepted(&self.schema)
    }

    /// Resolve a batch of `_Any` representations, each routed to the
    /// owner of its type.
    pub async fn resolve(
        &self,
        representations: Vec<Value>,
        ctx: &RequestContext,
    ) -> Vec<ResolveResult> {
        resolve_batch(self, representations, ctx).await
    }
}

impl ResolverSource for FederationContext {
    fn resolver_for(&self, typename: &TypeName) -> Result<Arc<dyn ReferenceResolver>, ResolveError> {
        let not_entity = || ResolveError::NotAnEntity {
            typename: typename.clone(),
        };
        let ty = self
            .schema
            .get(typename)
            .filter(|ty| ty.is_entity())
            .ok_or_else(not_entity)?;
        let owner = ty.owner().ok_or_else(not_entity)?;
        let subgraph = self
            .subgraphs
            .get(owner)
            .ok_or_else(|| ResolveError::NoResolver {
                typename: typename.clone(),
            })?;
        subgraph.registry.resolver_for(typename)
    }
}
