//! Key directive resolution.
//!
//! A key declaration is the `fields` argument of `@key`: a whitespace
//! separated selection of field names, where an object-valued field opens
//! exactly one nested level, e.g. `link { href }` or `roomId slotId`.
//!
//! Resolution happens in two phases:
//!
//! ```text
//! raw "link { href }"
//!     │  KeySelection::parse      syntax only (fragment load)
//! KeySelection
//!     │  KeySelection::resolve    every segment exists, no lists, scalar leaves
//! KeyDescriptor
//! ```
//!
//! Both phases are pure.

use crate::fragment::FieldDefinition;
use crate::name::TypeName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum nesting depth of a key selection (`a { b }` is depth 1).
pub const MAX_KEY_NESTING: usize = 1;

/// Errors produced while parsing or resolving a key declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("key declaration is empty")]
    Empty,

    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("unexpected {token:?} at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("unbalanced braces at offset {offset}")]
    UnbalancedBraces { offset: usize },

    #[error("field {field} opens an empty selection")]
    EmptySelection { field: String },

    #[error("field {field} nests deeper than {max} level", max = MAX_KEY_NESTING)]
    NestingTooDeep { field: String },

    #[error("field {field} is selected more than once")]
    DuplicateField { field: String },

    #[error("{type_name} has no field {field}")]
    UnknownField { type_name: TypeName, field: String },

    #[error("{type_name}.{field} is a list and cannot be part of a key")]
    ListField { type_name: TypeName, field: String },

    #[error("{type_name}.{field} has object type {field_type} and needs a nested selection")]
    NonScalarLeaf {
        type_name: TypeName,
        field: String,
        field_type: TypeName,
    },

    #[error("{type_name}.{field} is a scalar and cannot have a nested selection")]
    ScalarWithSelection { type_name: TypeName, field: String },

    #[error("type {type_name} referenced by the key is not defined")]
    UnknownType { type_name: TypeName },
}

/// One selected field, with its nested selection when object-valued.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeySegment {
    pub field: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<KeySegment>,
}

impl KeySegment {
    pub fn leaf(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            nested: Vec::new(),
        }
    }

    pub fn object(field: impl Into<String>, nested: Vec<KeySegment>) -> Self {
        Self {
            field: field.into(),
            nested,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.nested.is_empty()
    }
}

/// Lookup surface the resolver needs beyond the entity's own fields.
pub trait FieldCatalog {
    /// The field `field` of object type `type_name`, if both exist.
    fn field(&self, type_name: &TypeName, field: &str) -> Option<&FieldDefinition>;

    /// Whether `type_name` is a known object type.
    fn has_type(&self, type_name: &TypeName) -> bool;

    /// Whether `type_name` is a scalar (built-in or declared).
    fn is_leaf_type(&self, type_name: &TypeName) -> bool;
}

/// A syntactically valid key selection, not yet checked against any type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySelection {
    segments: Vec<KeySegment>,
}

/// A resolved entity key: ordered segments whose leaves are all scalars.
///
/// Stored order is declaration order; [`matches`](Self::matches) compares
/// structurally and ignores order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyDescriptor {
    segments: Vec<KeySegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Name(String),
    Open,
    Close,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(raw: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() || c == ',' => {}
            '{' => tokens.push(Token {
                kind: TokenKind::Open,
                offset,
            }),
            '}' => tokens.push(Token {
                kind: TokenKind::Close,
                offset,
            }),
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next == '_' || next.is_ascii_alphanumeric() {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Name(name),
                    offset,
                });
            }
            ch => return Err(ParseError::UnexpectedCharacter { ch, offset }),
        }
    }

    Ok(tokens)
}

fn parse_level(
    tokens: &[Token],
    pos: &mut usize,
    depth: usize,
    end: usize,
) -> Result<Vec<KeySegment>, ParseError> {
    let mut segments: Vec<KeySegment> = Vec::new();

    while let Some(token) = tokens.get(*pos) {
        match &token.kind {
            TokenKind::Name(name) => {
                *pos += 1;
                let mut segment = KeySegment::leaf(name.clone());

                if let Some(Token {
                    kind: TokenKind::Open,
                    offset,
                }) = tokens.get(*pos)
                {
                    if depth >= MAX_KEY_NESTING {
                        return Err(ParseError::NestingTooDeep {
                            field: name.clone(),
                        });
                    }
                    let open_offset = *offset;
                    *pos += 1;
                    segment.nested = parse_level(tokens, pos, depth + 1, end)?;
                    match tokens.get(*pos) {
                        Some(Token {
                            kind: TokenKind::Close,
                            ..
                        }) => *pos += 1,
                        _ => {
                            return Err(ParseError::UnbalancedBraces {
                                offset: if *pos >= tokens.len() { end } else { open_offset },
                            });
                        }
                    }
                    if segment.nested.is_empty() {
                        return Err(ParseError::EmptySelection {
                            field: name.clone(),
                        });
                    }
                }

                if segments.iter().any(|s| s.field == segment.field) {
                    return Err(ParseError::DuplicateField {
                        field: segment.field,
                    });
                }
                segments.push(segment);
            }
            TokenKind::Close if depth > 0 => break,
            TokenKind::Close => {
                return Err(ParseError::UnbalancedBraces {
                    offset: token.offset,
                });
            }
            TokenKind::Open => {
                return Err(ParseError::UnexpectedToken {
                    token: "{".to_string(),
                    offset: token.offset,
                });
            }
        }
    }

    Ok(segments)
}

fn resolve_segments<'a>(
    type_name: &TypeName,
    segments: &[KeySegment],
    lookup: &dyn Fn(&str) -> Option<&'a FieldDefinition>,
    catalog: &'a dyn FieldCatalog,
) -> Result<(), ParseError> {
    for segment in segments {
        let field = lookup(&segment.field).ok_or_else(|| ParseError::UnknownField {
            type_name: type_name.clone(),
            field: segment.field.clone(),
        })?;

        if field.is_list() {
            return Err(ParseError::ListField {
                type_name: type_name.clone(),
                field: segment.field.clone(),
            });
        }

        let field_type = &field.type_ref.name;
        let is_leaf = catalog.is_leaf_type(field_type);

        if segment.is_leaf() {
            if !is_leaf {
                return Err(ParseError::NonScalarLeaf {
                    type_name: type_name.clone(),
                    field: segment.field.clone(),
                    field_type: field_type.clone(),
                });
            }
            continue;
        }

        if is_leaf {
            return Err(ParseError::ScalarWithSelection {
                type_name: type_name.clone(),
                field: segment.field.clone(),
            });
        }
        if !catalog.has_type(field_type) {
            return Err(ParseError::UnknownType {
                type_name: field_type.clone(),
            });
        }

        let nested_lookup = |name: &str| catalog.field(field_type, name);
        resolve_segments(field_type, &segment.nested, &nested_lookup, catalog)?;
    }

    Ok(())
}

impl KeySelection {
    /// Parse a raw key declaration without looking at any type.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let tokens = tokenize(raw)?;
        let mut pos = 0;
        let segments = parse_level(&tokens, &mut pos, 0, raw.len())?;
        if segments.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// Structural equality with a resolved key, ignoring order.
    pub fn matches(&self, key: &KeyDescriptor) -> bool {
        KeyDescriptor {
            segments: self.segments.clone(),
        }
        .matches(key)
    }

    /// Resolve against the entity's available fields.
    ///
    /// `fields` is the entity's own field set; nested segments are looked up
    /// through `catalog`.
    pub fn resolve(
        self,
        type_name: &TypeName,
        fields: &[FieldDefinition],
        catalog: &dyn FieldCatalog,
    ) -> Result<KeyDescriptor, ParseError> {
        let lookup = |name: &str| fields.iter().find(|f| f.name == name);
        resolve_segments(type_name, &self.segments, &lookup, catalog)?;
        Ok(KeyDescriptor {
            segments: self.segments,
        })
    }
}

/// Parse and resolve a key declaration in one step.
pub fn parse_key(
    raw: &str,
    type_name: &TypeName,
    fields: &[FieldDefinition],
    catalog: &dyn FieldCatalog,
) -> Result<KeyDescriptor, ParseError> {
    KeySelection::parse(raw)?.resolve(type_name, fields, catalog)
}

impl KeyDescriptor {
    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// Every root-to-leaf path, in declaration order: `[["link", "href"]]`.
    pub fn leaf_paths(&self) -> Vec<Vec<&str>> {
        fn walk<'a>(
            segments: &'a [KeySegment],
            prefix: &mut Vec<&'a str>,
            out: &mut Vec<Vec<&'a str>>,
        ) {
            for segment in segments {
                prefix.push(&segment.field);
                if segment.is_leaf() {
                    out.push(prefix.clone());
                } else {
                    walk(&segment.nested, prefix, out);
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.segments, &mut Vec::new(), &mut out);
        out
    }

    /// Leaf paths joined with dots: `link.href`.
    pub fn dotted_paths(&self) -> Vec<String> {
        self.leaf_paths().into_iter().map(|p| p.join(".")).collect()
    }

    /// Copy with segments sorted at every level.
    pub fn canonical(&self) -> KeyDescriptor {
        fn sort(segments: &[KeySegment]) -> Vec<KeySegment> {
            let mut sorted: Vec<KeySegment> = segments
                .iter()
                .map(|s| KeySegment::object(s.field.clone(), sort(&s.nested)))
                .collect();
            sorted.sort();
            sorted
        }

        KeyDescriptor {
            segments: sort(&self.segments),
        }
    }

    /// Structural equality, ignoring declaration order.
    pub fn matches(&self, other: &KeyDescriptor) -> bool {
        self.canonical() == other.canonical()
    }

    /// Rebuild the unresolved selection, e.g. to re-check it against a merged type.
    pub fn to_selection(&self) -> KeySelection {
        KeySelection {
            segments: self.segments.clone(),
        }
    }
}

fn write_segments(f: &mut fmt::Formatter<'_>, segments: &[KeySegment]) -> fmt::Result {
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        f.write_str(&segment.field)?;
        if !segment.is_leaf() {
            f.write_str(" { ")?;
            write_segments(f, &segment.nested)?;
            f.write_str(" }")?;
        }
    }
    Ok(())
}

impl fmt::Display for KeySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

impl fmt::Display for KeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{ObjectTypeDef, SchemaFragment, TypeRef};

    fn speakers() -> SchemaFragment {
        SchemaFragment::new("speakers")
            .with_type(
                ObjectTypeDef::owned("Speaker")
                    .with_field(FieldDefinition::new("firstName", TypeRef::named("String")))
                    .with_field(FieldDefinition::new("lastName", TypeRef::named("String")))
                    .with_field(FieldDefinition::new("link", TypeRef::named("Link")))
                    .with_field(FieldDefinition::new("links", TypeRef::list_of("Link")))
                    .with_field(FieldDefinition::new("id", TypeRef::named("ID").required())),
            )
            .unwrap()
            .with_type(
                ObjectTypeDef::owned("Link")
                    .with_field(FieldDefinition::new("href", TypeRef::named("String")))
                    .with_field(FieldDefinition::new("rel", TypeRef::named("String"))),
            )
            .unwrap()
    }

    fn resolve(raw: &str) -> Result<KeyDescriptor, ParseError> {
        let fragment = speakers();
        let speaker = TypeName::new("Speaker");
        let fields = &fragment.get(&speaker).unwrap().fields;
        parse_key(raw, &speaker, fields, &fragment)
    }

    #[test]
    fn nested_key_resolves() {
        let key = resolve("link { href }").unwrap();
        assert_eq!(key.dotted_paths(), vec!["link.href"]);
        assert_eq!(key.to_string(), "link { href }");
    }

    #[test]
    fn declaration_order_is_preserved() {
        let key = resolve("id link { rel href }").unwrap();
        assert_eq!(key.dotted_paths(), vec!["id", "link.rel", "link.href"]);
        assert!(key.matches(&resolve("link { href, rel } id").unwrap()));
        assert_ne!(key, resolve("link { href, rel } id").unwrap());
    }

    #[test]
    fn canonical_reserialization_is_idempotent() {
        for raw in ["id", "link{href}", "  id,\n link { href rel }", "firstName lastName"] {
            let first = resolve(raw).unwrap();
            let second = resolve(&first.to_string()).unwrap();
            assert_eq!(first, second, "round trip of {raw:?}");
        }
    }

    #[test]
    fn rejects_empty_declarations() {
        assert_eq!(resolve("").unwrap_err(), ParseError::Empty);
        assert_eq!(resolve("  ,  ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            resolve("email").unwrap_err(),
            ParseError::UnknownField { field, .. } if field == "email"
        ));
        assert!(matches!(
            resolve("link { title }").unwrap_err(),
            ParseError::UnknownField { type_name, .. } if type_name.as_str() == "Link"
        ));
    }

    #[test]
    fn rejects_lists_and_object_leaves() {
        assert!(matches!(
            resolve("links { href }").unwrap_err(),
            ParseError::ListField { .. }
        ));
        assert!(matches!(
            resolve("link").unwrap_err(),
            ParseError::NonScalarLeaf { .. }
        ));
        assert!(matches!(
            resolve("id { value }").unwrap_err(),
            ParseError::ScalarWithSelection { .. }
        ));
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert!(matches!(
            KeySelection::parse("link { href").unwrap_err(),
            ParseError::UnbalancedBraces { .. }
        ));
        assert_eq!(
            KeySelection::parse("id }").unwrap_err(),
            ParseError::UnbalancedBraces { offset: 3 }
        );
        assert!(matches!(
            KeySelection::parse("{ id }").unwrap_err(),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn rejects_structural_oddities() {
        assert!(matches!(
            KeySelection::parse("a { b { c } }").unwrap_err(),
            ParseError::NestingTooDeep { .. }
        ));
        assert!(matches!(
            KeySelection::parse("link { }").unwrap_err(),
            ParseError::EmptySelection { .. }
        ));
        assert!(matches!(
            KeySelection::parse("id id").unwrap_err(),
            ParseError::DuplicateField { .. }
        ));
        assert!(matches!(
            KeySelection::parse("id.href").unwrap_err(),
            ParseError::UnexpectedCharacter { ch: '.', offset: 2 }
        ));
    }
}
