//! Bounded, parallel batch resolution.
//!
//! Every representation in a batch resolves on its own blocking task under
//! the caller's timeout. Failures stay with their reference: an invalid,
//! unroutable, slow or panicking resolution never aborts its siblings, and
//! results come back in input order.

use crate::error::ResolveError;
use crate::reference::ReferenceObject;
use crate::registry::ResolverSource;
use crate::resolver::{RequestContext, Resolution};
use serde_json::Value;
use tokio::task::JoinSet;

pub type ResolveResult = Result<Resolution, ResolveError>;

/// Resolve gateway `_Any` representations through `source`.
pub async fn resolve_batch<S>(
    source: &S,
    representations: Vec<Value>,
    ctx: &RequestContext,
) -> Vec<ResolveResult>
where
    S: ResolverSource + ?Sized,
{
    let total = representations.len();
    let mut results: Vec<Option<ResolveResult>> = (0..total).map(|_| None).collect();
    let mut tasks = JoinSet::new();

    for (i, representation) in representations.into_iter().enumerate() {
        let reference = match ReferenceObject::from_representation(representation) {
            Ok(reference) => reference,
            Err(reason) => {
                results[i] = Some(Err(ResolveError::invalid("<unknown>", reason)));
                continue;
            }
        };
        let resolver = match source.resolver_for(&reference.typename) {
            Ok(resolver) => resolver,
            Err(e) => {
                results[i] = Some(Err(e));
                continue;
            }
        };

        let ctx = ctx.clone();
        tasks.spawn(async move {
            let typename = reference.typename.clone();
            let timeout = ctx.timeout;
            let request_id = ctx.request_id;
            let work = tokio::task::spawn_blocking(move || {
                resolver.resolve_reference(&reference, &ctx)
            });

            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(
                            request_id = %request_id,
                            typename = %typename,
                            timeout_ms = limit.as_millis() as u64,
                            "reference resolution timed out"
                        );
                        return (
                            i,
                            Err(ResolveError::Timeout {
                                typename,
                                after: limit,
                            }),
                        );
                    }
                },
                None => work.await,
            };

            let result = joined.unwrap_or_else(|e| {
                Err(ResolveError::Failed {
                    typename: typename.clone(),
                    message: e.to_string(),
                })
            });
            (i, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, result)) => results[i] = Some(result),
            // The outer task only awaits; it fails only when the runtime
            // shuts down, leaving that slot unfilled below.
            Err(e) => tracing::warn!(error = %e, "resolution task aborted"),
        }
    }

    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(ResolveError::Failed {
                    typename: "<unknown>".into(),
                    message: "resolution task aborted".to_string(),
                })
            })
        })
        .collect()
}
