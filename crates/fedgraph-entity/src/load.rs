//! Entity data files.
//!
//! Three layouts are accepted:
//! - a JSON array of records, each carrying `__typename`
//! - a JSON object mapping type name to an array of records
//! - JSONL (`.jsonl`), one record with `__typename` per line
//!
//! Blank lines and lines starting with `#` are skipped in JSONL.

use crate::collection::Entity;
use crate::error::{CollectionError, ShapeError};
use crate::reference::TYPENAME_FIELD;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn record_error(index: usize, error: ShapeError) -> CollectionError {
    match error {
        ShapeError::MissingTypename => CollectionError::MissingTypename { index },
        _ => CollectionError::NotAnObject { index },
    }
}

/// Parse a JSON document in either the array or the map layout.
pub fn parse_entities(text: &str) -> Result<Vec<Entity>, CollectionError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CollectionError::Parse {
        line: e.line(),
        message: e.to_string(),
    })?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Entity::from_value(item).map_err(|e| record_error(i, e)))
            .collect(),
        Value::Object(by_type) => {
            let mut entities = Vec::new();
            for (typename, records) in by_type {
                let Value::Array(records) = records else {
                    return Err(CollectionError::UnexpectedLayout);
                };
                for record in records {
                    let index = entities.len();
                    let Value::Object(mut fields) = record else {
                        return Err(CollectionError::NotAnObject { index });
                    };
                    fields.remove(TYPENAME_FIELD);
                    entities.push(Entity::new(typename.as_str(), fields));
                }
            }
            Ok(entities)
        }
        _ => Err(CollectionError::UnexpectedLayout),
    }
}

/// Read records from a JSONL reader.
pub fn read_entities_jsonl(reader: impl BufRead) -> Result<Vec<Entity>, CollectionError> {
    let mut entities = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CollectionError::Parse {
            line: line_no + 1,
            message: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| CollectionError::Parse {
            line: line_no + 1,
            message: e.to_string(),
        })?;
        let index = entities.len();
        entities.push(Entity::from_value(value).map_err(|e| record_error(index, e))?);
    }
    Ok(entities)
}

/// Load an entity data file, choosing the layout by extension.
pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<Entity>, CollectionError> {
    let path = path.as_ref();
    let io_error = |e: std::io::Error| CollectionError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let bytes = fs::read(path).map_err(io_error)?;
    let entities = if path.extension().is_some_and(|ext| ext == "jsonl") {
        read_entities_jsonl(BufReader::new(bytes.as_slice()))?
    } else {
        let text = std::str::from_utf8(&bytes).map_err(|e| CollectionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        parse_entities(text)?
    };

    tracing::debug!(path = %path.display(), records = entities.len(), "entity data loaded");
    Ok(entities)
}
