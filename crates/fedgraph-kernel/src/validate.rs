//! Federation validator.
//!
//! Checks the merge-time invariants of a unified schema. Every check runs
//! over every type and all violations are reported together.

use crate::error::MergeError;
use crate::fragment::{FieldDefinition, TypeRef};
use crate::name::SubgraphId;
use crate::unified::{UnifiedSchema, UnifiedType};

/// Validate a unified schema, returning every violation found.
pub fn validate(schema: &UnifiedSchema) -> Result<(), Vec<MergeError>> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        check_ownership(ty, &mut errors);
        check_key_paths(schema, ty, &mut errors);
        check_resolver(ty, &mut errors);
        check_external_fields(ty, &mut errors);
        check_type_references(schema, ty, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort();
        errors.dedup();
        Err(errors)
    }
}

// A type referenced through external fields needs exactly one owner.
fn check_ownership(ty: &UnifiedType, errors: &mut Vec<MergeError>) {
    if ty.is_root() || !ty.has_external_fields() {
        return;
    }
    match ty.owners.len() {
        1 => {}
        0 => errors.push(MergeError::MissingOwner {
            type_name: ty.name.clone(),
            extended_by: ty.extended_by.clone(),
        }),
        _ => errors.push(MergeError::DuplicateOwner {
            type_name: ty.name.clone(),
            subgraphs: ty.owners.clone(),
        }),
    }
}

// Key leaves must be scalars reachable through fields present on the merged type.
fn check_key_paths(schema: &UnifiedSchema, ty: &UnifiedType, errors: &mut Vec<MergeError>) {
    let Some(key) = &ty.key else {
        return;
    };
    let fields: Vec<FieldDefinition> = ty.fields.iter().map(|f| f.definition.clone()).collect();
    if let Err(e) = key.to_selection().resolve(&ty.name, &fields, schema) {
        errors.push(MergeError::InvalidKeyPath {
            type_name: ty.name.clone(),
            subgraph: responsible_subgraph(ty),
            reason: e.to_string(),
        });
    }
}

// Every owned entity needs a reference resolver on its owner.
fn check_resolver(ty: &UnifiedType, errors: &mut Vec<MergeError>) {
    if ty.is_root() || !ty.is_entity() || ty.resolver_registered {
        return;
    }
    if let Some(owner) = ty.owner() {
        errors.push(MergeError::MissingResolver {
            type_name: ty.name.clone(),
            subgraph: owner.clone(),
        });
    }
}

// External declarations must match an owned field exactly.
fn check_external_fields(ty: &UnifiedType, errors: &mut Vec<MergeError>) {
    if ty.is_root() {
        return;
    }
    let Some(owner) = ty.owner() else {
        return;
    };

    for field in &ty.fields {
        for declaration in &field.externals {
            match &field.resolved_by {
                Some(resolver) if resolver == owner => {
                    if declaration.type_ref != field.definition.type_ref {
                        errors.push(MergeError::ConflictingField {
                            type_name: ty.name.clone(),
                            field: field.name().to_string(),
                            subgraphs: vec![owner.clone(), declaration.subgraph.clone()],
                            detail: format!(
                                "owner declares {}, external declares {}",
                                field.definition.type_ref, declaration.type_ref
                            ),
                        });
                    }
                }
                _ => errors.push(MergeError::UnmatchedExternal {
                    type_name: ty.name.clone(),
                    field: field.name().to_string(),
                    subgraph: declaration.subgraph.clone(),
                }),
            }
        }
    }
}

fn check_type_references(schema: &UnifiedSchema, ty: &UnifiedType, errors: &mut Vec<MergeError>) {
    let mut check = |field: &str, type_ref: &TypeRef| {
        if !schema.is_defined(&type_ref.name) {
            errors.push(MergeError::UnknownType {
                type_name: ty.name.clone(),
                field: field.to_string(),
                referenced: type_ref.name.clone(),
            });
        }
    };

    for field in &ty.fields {
        check(field.name(), &field.definition.type_ref);
        for argument in &field.definition.arguments {
            check(field.name(), &argument.type_ref);
        }
        for declaration in &field.externals {
            check(field.name(), &declaration.type_ref);
        }
    }
}

fn responsible_subgraph(ty: &UnifiedType) -> SubgraphId {
    ty.owners
        .first()
        .or_else(|| ty.extended_by.first())
        .cloned()
        .unwrap_or_default()
}
