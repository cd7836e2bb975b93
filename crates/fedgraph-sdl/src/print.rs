//! Composed schema printer.
//!
//! Renders a [`UnifiedSchema`] as one SDL document for a federation-aware
//! gateway. Custom scalars come first, then types in name order. Each type
//! carries one `@join__type` per contributing subgraph (owner first); a
//! field carries `@join__field` when a subgraph other than the type's
//! owner resolves it, and always on root types.

use fedgraph_kernel::{UnifiedField, UnifiedSchema, UnifiedType};
use std::fmt::Write;

/// Print the composed document. Output is deterministic for a given schema.
pub fn print_supergraph(schema: &UnifiedSchema) -> String {
    let mut blocks: Vec<String> = schema
        .scalars
        .iter()
        .map(|name| format!("scalar {name}"))
        .collect();
    blocks.extend(schema.types.values().map(print_type));

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn print_type(ty: &UnifiedType) -> String {
    let mut out = format!("type {}", ty.name);
    let key = ty.key.as_ref().map(ToString::to_string);

    for graph in ty.owners.iter().chain(&ty.extended_by) {
        match &key {
            Some(key) => {
                let _ = write!(
                    out,
                    " @join__type(graph: {}, key: {})",
                    quote(graph.as_str()),
                    quote(key)
                );
            }
            None => {
                let _ = write!(out, " @join__type(graph: {})", quote(graph.as_str()));
            }
        }
    }

    if ty.fields.is_empty() {
        return out;
    }

    out.push_str(" {\n");
    for field in &ty.fields {
        out.push_str("  ");
        out.push_str(&print_field(ty, field));
        out.push('\n');
    }
    out.push('}');
    out
}

fn print_field(ty: &UnifiedType, field: &UnifiedField) -> String {
    let def = &field.definition;
    let mut out = def.name.clone();

    if !def.arguments.is_empty() {
        let args: Vec<String> = def
            .arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.type_ref))
            .collect();
        let _ = write!(out, "({})", args.join(", "));
    }
    let _ = write!(out, ": {}", def.type_ref);

    if let Some(resolver) = &field.resolved_by {
        let owned_by_type_owner = ty.owner() == Some(resolver);
        if ty.is_root() || !owned_by_type_owner {
            let _ = write!(out, " @join__field(graph: {})", quote(resolver.as_str()));
        }
    }
    out
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
