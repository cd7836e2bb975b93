//! Reference objects and key projection.
//!
//! A reference is a partial entity carrying only its key fields, e.g.
//! `{"__typename": "Speaker", "link": {"href": "x"}}`. Records and
//! references are compared through their projection onto the key, rendered
//! in a canonical form with sorted object keys.

use crate::error::ShapeError;
use fedgraph_kernel::{KeyDescriptor, KeySegment, TypeName};
use serde_json::{Map, Value};

pub const TYPENAME_FIELD: &str = "__typename";

/// A partial entity sent by the gateway to request hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceObject {
    pub typename: TypeName,
    /// Key fields only, nested per the key descriptor.
    pub fields: Map<String, Value>,
}

impl ReferenceObject {
    pub fn new(typename: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            typename: TypeName::new(typename),
            fields,
        }
    }

    /// Parse a gateway `_Any` representation.
    pub fn from_representation(value: Value) -> Result<Self, ShapeError> {
        let Value::Object(mut fields) = value else {
            return Err(ShapeError::NotAnObject);
        };
        let typename = match fields.remove(TYPENAME_FIELD) {
            Some(Value::String(name)) => name,
            _ => return Err(ShapeError::MissingTypename),
        };
        Ok(Self {
            typename: TypeName::new(typename),
            fields,
        })
    }

    /// Back to the `_Any` form.
    pub fn to_representation(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert(
            TYPENAME_FIELD.to_string(),
            Value::String(self.typename.to_string()),
        );
        Value::Object(out)
    }

    /// Check the reference has exactly the key's fields, nested exactly
    /// per the descriptor, with non-null scalar leaves.
    pub fn check_shape(&self, key: &KeyDescriptor) -> Result<(), ShapeError> {
        check_level(&self.fields, key.segments(), "")
    }

    /// Canonical key string. Fails when the shape does not match.
    pub fn canonical_key(&self, key: &KeyDescriptor) -> Result<String, ShapeError> {
        self.check_shape(key)?;
        Ok(canonical_json(&Value::Object(self.fields.clone())))
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn check_level(
    fields: &Map<String, Value>,
    segments: &[KeySegment],
    prefix: &str,
) -> Result<(), ShapeError> {
    if let Some(extra) = fields
        .keys()
        .find(|name| !segments.iter().any(|s| &s.field == *name))
    {
        return Err(ShapeError::UnexpectedField {
            path: join(prefix, extra),
        });
    }

    for segment in segments {
        let path = join(prefix, &segment.field);
        let value = fields
            .get(&segment.field)
            .ok_or_else(|| ShapeError::MissingField { path: path.clone() })?;
        if segment.is_leaf() {
            check_scalar(value, &path)?;
        } else {
            let Value::Object(nested) = value else {
                return Err(ShapeError::ExpectedObject { path });
            };
            check_level(nested, &segment.nested, &path)?;
        }
    }
    Ok(())
}

fn check_scalar(value: &Value, path: &str) -> Result<(), ShapeError> {
    let found = match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => return Ok(()),
        Value::Null => "null",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Err(ShapeError::ExpectedScalar {
        path: path.to_string(),
        found,
    })
}

/// Project a full record onto a key: the nested object of key fields only.
pub fn project_key(record: &Map<String, Value>, key: &KeyDescriptor) -> Result<Value, ShapeError> {
    project_level(record, key.segments(), "").map(Value::Object)
}

fn project_level(
    record: &Map<String, Value>,
    segments: &[KeySegment],
    prefix: &str,
) -> Result<Map<String, Value>, ShapeError> {
    let mut out = Map::new();
    for segment in segments {
        let path = join(prefix, &segment.field);
        let value = record
            .get(&segment.field)
            .ok_or_else(|| ShapeError::MissingField { path: path.clone() })?;
        if segment.is_leaf() {
            check_scalar(value, &path)?;
            out.insert(segment.field.clone(), value.clone());
        } else {
            let Value::Object(nested) = value else {
                return Err(ShapeError::ExpectedObject { path });
            };
            let projected = project_level(nested, &segment.nested, &path)?;
            out.insert(segment.field.clone(), Value::Object(projected));
        }
    }
    Ok(out)
}

/// Serialize with object keys sorted at every level and no whitespace, so
/// structurally equal values always render identically.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
