//! Schema merger.
//!
//! Glues the fragments of every subgraph into one unified schema:
//!
//! 1. group declarations by type name, fragment order preserved
//! 2. determine the single owner of every non-root type
//! 3. fold fields: owned definitions win, `@external` ones are recorded
//!    against the owned field, extension-introduced fields are resolved by
//!    the extending subgraph
//! 4. attach the key, resolved against the owner's declarations
//! 5. run the validator over the candidate
//!
//! Every error from every step is collected. Any error aborts the whole
//! merge: no partial schema is returned.

use crate::error::{CompositionError, MergeError};
use crate::fragment::{ObjectTypeDef, SchemaFragment};
use crate::key::{KeyDescriptor, KeySelection};
use crate::name::{SubgraphId, TypeName};
use crate::unified::{ExternalDeclaration, UnifiedField, UnifiedSchema, UnifiedType};
use crate::validate::validate;
use std::collections::{BTreeMap, BTreeSet};

/// One fragment's declaration of one type.
struct Contribution<'a> {
    fragment: &'a SchemaFragment,
    def: &'a ObjectTypeDef,
}

impl Contribution<'_> {
    fn subgraph(&self) -> &SubgraphId {
        &self.fragment.subgraph
    }
}

/// Merge fragments, in the given order, into a unified schema.
pub fn merge(fragments: &[SchemaFragment]) -> Result<UnifiedSchema, CompositionError> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    let mut schema = UnifiedSchema::default();
    let mut contributions: BTreeMap<&TypeName, Vec<Contribution<'_>>> = BTreeMap::new();

    for fragment in fragments {
        if !seen.insert(&fragment.subgraph) {
            errors.push(MergeError::DuplicateSubgraph {
                subgraph: fragment.subgraph.clone(),
            });
            continue;
        }
        schema.subgraphs.push(fragment.subgraph.clone());
        schema.scalars.extend(fragment.scalars.iter().cloned());
        for def in fragment.types.values() {
            contributions
                .entry(&def.name)
                .or_default()
                .push(Contribution { fragment, def });
        }
    }

    for (name, contribs) in &contributions {
        let unified = merge_type(name, contribs, &mut errors);
        tracing::debug!(
            type_name = %name,
            owners = unified.owners.len(),
            extensions = unified.extended_by.len(),
            fields = unified.fields.len(),
            "merged type"
        );
        schema.types.insert((*name).clone(), unified);
    }

    // Keys resolve through the merged types, so attach them in a second pass.
    for (name, contribs) in &contributions {
        let key = attach_key(&schema, name, contribs, &mut errors);
        if let (Some(key), Some(unified)) = (key, schema.types.get_mut(*name)) {
            unified.key = Some(key);
        }
    }

    if let Err(violations) = validate(&schema) {
        errors.extend(violations);
    }

    if errors.is_empty() {
        tracing::info!(
            subgraphs = schema.subgraphs.len(),
            types = schema.types.len(),
            entities = schema.entities().count(),
            "composition accepted"
        );
        Ok(schema)
    } else {
        let err = CompositionError::new(errors);
        tracing::info!(errors = err.errors.len(), "composition rejected");
        Err(err)
    }
}

fn merge_type(
    name: &TypeName,
    contribs: &[Contribution<'_>],
    errors: &mut Vec<MergeError>,
) -> UnifiedType {
    let is_root = name.is_root_operation();
    let (owning, extending): (Vec<&Contribution<'_>>, Vec<&Contribution<'_>>) =
        contribs.iter().partition(|c| !c.def.is_extension);
    let owners: Vec<SubgraphId> = owning.iter().map(|c| c.subgraph().clone()).collect();
    let extended_by: Vec<SubgraphId> = extending.iter().map(|c| c.subgraph().clone()).collect();

    if !is_root {
        if owners.len() > 1 {
            errors.push(MergeError::DuplicateOwner {
                type_name: name.clone(),
                subgraphs: owners.clone(),
            });
        } else if owners.is_empty() {
            errors.push(MergeError::MissingOwner {
                type_name: name.clone(),
                extended_by: extended_by.clone(),
            });
        }
    }

    let owner = match owning.as_slice() {
        [single] if !is_root => Some(*single),
        _ => None,
    };

    let mut fields: Vec<UnifiedField> = Vec::new();
    for contribution in contribs {
        let subgraph = contribution.subgraph();
        for field in &contribution.def.fields {
            let position = fields.iter().position(|f| f.name() == field.name);

            if field.is_external {
                let declaration = ExternalDeclaration {
                    subgraph: subgraph.clone(),
                    type_ref: field.type_ref.clone(),
                };
                match position {
                    Some(i) => fields[i].externals.push(declaration),
                    None => fields.push(UnifiedField {
                        definition: field.clone(),
                        resolved_by: None,
                        externals: vec![declaration],
                    }),
                }
                continue;
            }

            let Some(i) = position else {
                fields.push(UnifiedField {
                    definition: field.clone(),
                    resolved_by: Some(subgraph.clone()),
                    externals: Vec::new(),
                });
                continue;
            };

            let existing = &mut fields[i];
            let incoming_is_owner = owner.is_some_and(|o| o.subgraph() == subgraph);
            let Some(previous) = existing.resolved_by.clone() else {
                // Only referenced externally so far; this is the owning declaration.
                existing.definition = field.clone();
                existing.resolved_by = Some(subgraph.clone());
                continue;
            };

            if existing.definition.type_ref == field.type_ref {
                if incoming_is_owner {
                    existing.definition = field.clone();
                    existing.resolved_by = Some(subgraph.clone());
                }
                continue;
            }

            // Contributions arrive in fragment order, so a previous owner
            // definition means the owner was listed first.
            let previous_is_owner = owner.is_some_and(|o| o.subgraph() == &previous);
            if previous_is_owner {
                tracing::warn!(
                    type_name = %name,
                    field = %field.name,
                    owner = %previous,
                    ignored = %subgraph,
                    "owner definition wins over conflicting extension field"
                );
                continue;
            }

            errors.push(MergeError::ConflictingField {
                type_name: name.clone(),
                field: field.name.clone(),
                subgraphs: vec![previous, subgraph.clone()],
                detail: format!("{} vs {}", existing.definition.type_ref, field.type_ref),
            });
        }
    }

    let resolver_registered = owner.is_some_and(|o| o.fragment.resolvers.contains(name));

    UnifiedType {
        name: name.clone(),
        owners,
        extended_by,
        fields,
        key: None,
        resolver_registered,
    }
}

fn attach_key(
    schema: &UnifiedSchema,
    name: &TypeName,
    contribs: &[Contribution<'_>],
    errors: &mut Vec<MergeError>,
) -> Option<KeyDescriptor> {
    let unified = schema.get(name)?;
    if unified.is_root() {
        return None;
    }
    // Ownership errors are already reported; without an owner there is
    // nothing to resolve the key against.
    let owner = unified.owner()?;
    let owner_def = contribs.iter().find(|c| c.subgraph() == owner)?.def;

    let mut declared: Vec<(&SubgraphId, KeySelection)> = Vec::new();
    for contribution in contribs {
        let Some(raw) = &contribution.def.key else {
            continue;
        };
        match KeySelection::parse(raw) {
            Ok(selection) => declared.push((contribution.subgraph(), selection)),
            Err(e) => errors.push(MergeError::InvalidKeyPath {
                type_name: name.clone(),
                subgraph: contribution.subgraph().clone(),
                reason: e.to_string(),
            }),
        }
    }

    let chosen = declared
        .iter()
        .position(|(subgraph, _)| *subgraph == owner)
        .or_else(|| (!declared.is_empty()).then_some(0))?;
    let (chosen_from, selection) = &declared[chosen];

    let key = match selection.clone().resolve(name, &owner_def.fields, schema) {
        Ok(key) => key,
        Err(e) => {
            errors.push(MergeError::InvalidKeyPath {
                type_name: name.clone(),
                subgraph: (*chosen_from).clone(),
                reason: e.to_string(),
            });
            return None;
        }
    };

    for (i, (subgraph, selection)) in declared.iter().enumerate() {
        if i != chosen && !selection.matches(&key) {
            errors.push(MergeError::KeyMismatch {
                type_name: name.clone(),
                subgraph: (*subgraph).clone(),
                expected: key.to_string(),
                found: selection.to_string(),
            });
        }
    }

    Some(key)
}
