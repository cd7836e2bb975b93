//! # Fedgraph Entity
//!
//! Query-time half of federation: turning a reference that carries only key
//! fields back into the full entity held by the owning subgraph.
//!
//! ## Architecture
//!
//! ```text
//! ReferenceObject       ← `_Any` representation: __typename + key fields
//!     │
//! ReferenceResolver     ← Per entity type; Found | NotFound | error
//!     │
//! EntityLookup          ← Lookup by canonical key (index) or linear scan
//!     │
//! EntityCollection      ← Read-only records, key-unique per type
//! ```
//!
//! [`FederationContext`] ties a composed schema to the subgraphs' resolver
//! registries and routes each reference to its owner; [`resolve_batch`]
//! runs many resolutions in parallel, each isolated and bounded.

pub mod batch;
pub mod collection;
pub mod context;
pub mod error;
pub mod load;
pub mod lookup;
pub mod reference;
pub mod registry;
pub mod resolver;

pub use batch::{ResolveResult, resolve_batch};
pub use collection::{Entity, EntityCollection, EntityKeys, entity_keys};
pub use context::{FederationContext, Reload, Subgraph, composed_keys};
pub use error::{CollectionError, ResolveError, ShapeError};
pub use load::{load_entities, parse_entities, read_entities_jsonl};
pub use lookup::{EntityLookup, scan};
pub use reference::{ReferenceObject, TYPENAME_FIELD, canonical_json, project_key};
pub use registry::{ResolverRegistry, ResolverSource};
pub use resolver::{CollectionResolver, ReferenceResolver, RequestContext, Resolution};
