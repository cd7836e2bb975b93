//! Building fragments, collections and the federation context from config.

use crate::config::{GatewayConfig, SubgraphConfig};
use fedgraph_entity::{
    CollectionError, Entity, EntityCollection, FederationContext, ResolverRegistry, Subgraph,
    composed_keys, load_entities,
};
use fedgraph_kernel::{CompositionError, SchemaFragment, SubgraphId, TypeName};
use fedgraph_sdl::{SdlError, parse_fragment};
use std::fs;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to read schema for subgraph `{subgraph}` ({path}): {message}")]
    SchemaIo {
        subgraph: String,
        path: String,
        message: String,
    },

    #[error("invalid schema for subgraph `{subgraph}`: {source}")]
    Schema {
        subgraph: String,
        #[source]
        source: SdlError,
    },

    #[error("invalid data for subgraph `{subgraph}`: {source}")]
    Data {
        subgraph: String,
        #[source]
        source: CollectionError,
    },

    #[error("subgraph `{subgraph}` registers a resolver for {typename}, which has no key")]
    UnkeyedResolver { subgraph: String, typename: TypeName },

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// One configured subgraph with its schema parsed.
#[derive(Debug)]
pub struct LoadedSubgraph {
    pub config: SubgraphConfig,
    /// Parsed fragment, with the configured resolvers declared.
    pub fragment: SchemaFragment,
}

impl LoadedSubgraph {
    fn resolver_types(&self) -> Vec<TypeName> {
        self.config.resolvers.iter().map(TypeName::new).collect()
    }
}

/// Parse every subgraph's schema.
pub fn load_fragments(config: &GatewayConfig) -> Result<Vec<LoadedSubgraph>, GatewayError> {
    config
        .subgraphs
        .iter()
        .map(|subgraph| {
            let sdl = fs::read_to_string(&subgraph.schema).map_err(|e| GatewayError::SchemaIo {
                subgraph: subgraph.name.clone(),
                path: subgraph.schema.display().to_string(),
                message: e.to_string(),
            })?;
            let mut fragment =
                parse_fragment(&subgraph.name, &sdl).map_err(|source| GatewayError::Schema {
                    subgraph: subgraph.name.clone(),
                    source,
                })?;
            fragment
                .resolvers
                .extend(subgraph.resolvers.iter().map(TypeName::new));
            tracing::debug!(
                subgraph = %subgraph.name,
                types = fragment.types.len(),
                "subgraph schema loaded"
            );
            Ok(LoadedSubgraph {
                config: subgraph.clone(),
                fragment,
            })
        })
        .collect()
}

pub fn subgraph_ids(loaded: &[LoadedSubgraph]) -> Vec<SubgraphId> {
    loaded.iter().map(|s| s.fragment.subgraph.clone()).collect()
}

pub fn fragments(loaded: &[LoadedSubgraph]) -> Vec<SchemaFragment> {
    loaded.iter().map(|s| s.fragment.clone()).collect()
}

fn load_data(subgraph: &SubgraphConfig) -> Result<Vec<Entity>, GatewayError> {
    let Some(path) = &subgraph.data else {
        if !subgraph.resolvers.is_empty() {
            tracing::warn!(
                subgraph = %subgraph.name,
                "subgraph registers resolvers without data; every reference will be not found"
            );
        }
        return Ok(Vec::new());
    };
    load_entities(path).map_err(|source| GatewayError::Data {
        subgraph: subgraph.name.clone(),
        source,
    })
}

/// Load data, wire collection resolvers and compose the context.
pub fn build_context(loaded: Vec<LoadedSubgraph>) -> Result<FederationContext, GatewayError> {
    let keys = composed_keys(&fragments(&loaded))?;

    let mut subgraphs = Vec::with_capacity(loaded.len());
    for subgraph in loaded {
        let records = load_data(&subgraph.config)?;
        let collection =
            EntityCollection::load(records, &keys).map_err(|source| GatewayError::Data {
                subgraph: subgraph.config.name.clone(),
                source,
            })?;

        let mut registry = ResolverRegistry::new(subgraph.config.name.as_str());
        let unkeyed =
            registry.register_collection(&subgraph.resolver_types(), &keys, Arc::new(collection));
        if let Some(typename) = unkeyed.into_iter().next() {
            return Err(GatewayError::UnkeyedResolver {
                subgraph: subgraph.config.name,
                typename,
            });
        }
        subgraphs.push(Subgraph::new(subgraph.fragment, registry));
    }

    Ok(FederationContext::compose(subgraphs)?)
}
