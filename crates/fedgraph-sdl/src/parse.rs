//! Subgraph SDL parser.
//!
//! Reads the federation dialect a subgraph publishes and builds a
//! [`SchemaFragment`]:
//!
//! ```graphql
//! scalar DateTime
//!
//! type Speaker @key(fields: "link { href }") {
//!   firstName: String
//!   link: Link
//! }
//!
//! extend type Talk @key(fields: "id") {
//!   id: ID! @external
//!   speakers: [Speaker]
//! }
//! ```
//!
//! `@key`, `@extends` and `@external` are interpreted; every other directive
//! is parsed and ignored. Interfaces, unions, enums, inputs, schema and
//! directive definitions are rejected as unsupported.

use crate::error::{Result, SdlError};
use crate::lex::{Token, TokenKind, tokenize};
use fedgraph_kernel::{FieldDefinition, ObjectTypeDef, SchemaFragment, TypeName, TypeRef};

/// Definition keywords this parser rejects.
const UNSUPPORTED_DEFINITIONS: &[&str] = &[
    "schema",
    "directive",
    "interface",
    "union",
    "enum",
    "input",
    "query",
    "mutation",
    "subscription",
    "fragment",
];

/// A directive as written; only its name and string arguments matter here.
struct Directive {
    name: String,
    start: usize,
    arguments: Vec<(String, Option<String>)>,
}

impl Directive {
    fn string_argument(&self, name: &str) -> Option<Option<&str>> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value.as_deref())
    }
}

/// SDL parser state.
pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    fragment: SchemaFragment,
}

impl<'s> Parser<'s> {
    pub fn new(subgraph: &str, source: &'s str) -> Result<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
            fragment: SchemaFragment::new(subgraph),
        })
    }

    /// Parse the entire document.
    pub fn parse(mut self) -> Result<SchemaFragment> {
        while !self.is_at_end() {
            self.parse_definition()?;
        }
        Ok(self.fragment)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn current(&self) -> &Token {
        // tokenize always ends with Eof and advance never moves past it.
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn check_name(&self, name: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Name(n) if n == name)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {}", kind.describe())))
        }
    }

    fn expect_name(&mut self) -> Result<(String, usize)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Name(name) => {
                self.advance();
                Ok((name, token.start))
            }
            _ => Err(self.unexpected("expected a name")),
        }
    }

    fn unexpected(&self, expectation: &str) -> SdlError {
        let token = self.current();
        SdlError::parse(
            self.source,
            token.start,
            format!("{expectation}, found {}", token.kind.describe()),
        )
    }

    fn skip_description(&mut self) {
        if self.check(&TokenKind::Str(String::new())) {
            self.advance();
        }
    }

    fn parse_definition(&mut self) -> Result<()> {
        self.skip_description();
        let (keyword, start) = self.expect_name()?;

        match keyword.as_str() {
            "scalar" => {
                let (name, _) = self.expect_name()?;
                self.parse_directives()?;
                self.fragment.scalars.insert(TypeName::new(name));
                Ok(())
            }
            "type" => self.parse_object_type(false),
            "extend" => {
                let (kind, kind_start) = self.expect_name()?;
                match kind.as_str() {
                    "type" => self.parse_object_type(true),
                    "scalar" => {
                        self.expect_name()?;
                        self.parse_directives()?;
                        Ok(())
                    }
                    other => Err(SdlError::unsupported(
                        self.source,
                        kind_start,
                        format!("extend {other}"),
                    )),
                }
            }
            other if UNSUPPORTED_DEFINITIONS.contains(&other) => {
                Err(SdlError::unsupported(self.source, start, other))
            }
            other => Err(SdlError::parse(
                self.source,
                start,
                format!("expected a definition, found `{other}`"),
            )),
        }
    }

    fn parse_object_type(&mut self, extend: bool) -> Result<()> {
        let (name, _) = self.expect_name()?;
        if self.check_name("implements") {
            let token = self.advance();
            return Err(SdlError::unsupported(
                self.source,
                token.start,
                format!("type {name} implements"),
            ));
        }

        let mut def = if extend {
            ObjectTypeDef::extension(name.as_str())
        } else {
            ObjectTypeDef::owned(name.as_str())
        };

        for directive in self.parse_directives()? {
            match directive.name.as_str() {
                "extends" => def.is_extension = true,
                "key" => {
                    if def.key.is_some() {
                        return Err(SdlError::parse(
                            self.source,
                            directive.start,
                            format!("type {name} declares more than one @key"),
                        ));
                    }
                    let Some(Some(fields)) = directive.string_argument("fields") else {
                        return Err(SdlError::parse(
                            self.source,
                            directive.start,
                            "@key requires a string `fields` argument",
                        ));
                    };
                    def.key = Some(fields.to_string());
                }
                _ => {}
            }
        }

        if self.eat(&TokenKind::BraceL) {
            while !self.eat(&TokenKind::BraceR) {
                if self.is_at_end() {
                    return Err(self.unexpected("expected `}`"));
                }
                let field = self.parse_field()?;
                def.fields.push(field);
            }
        }

        self.fragment.add_type(def)?;
        Ok(())
    }

    fn parse_field(&mut self) -> Result<FieldDefinition> {
        self.skip_description();
        let (name, _) = self.expect_name()?;

        let mut arguments = Vec::new();
        if self.eat(&TokenKind::ParenL) {
            while !self.eat(&TokenKind::ParenR) {
                self.skip_description();
                let (arg, _) = self.expect_name()?;
                self.expect(&TokenKind::Colon)?;
                let type_ref = self.parse_type_ref()?;
                if self.eat(&TokenKind::Equals) {
                    self.parse_value()?;
                }
                self.parse_directives()?;
                arguments.push((arg, type_ref));
            }
        }

        self.expect(&TokenKind::Colon)?;
        let type_ref = self.parse_type_ref()?;

        let mut field = FieldDefinition::new(name, type_ref);
        for (arg, type_ref) in arguments {
            field = field.with_argument(arg, type_ref);
        }
        if self.parse_directives()?.iter().any(|d| d.name == "external") {
            field = field.external();
        }
        Ok(field)
    }

    /// `Name`, `Name!`, `[Name]`, `[Name!]!`. Nested lists are unsupported.
    fn parse_type_ref(&mut self) -> Result<TypeRef> {
        if self.eat(&TokenKind::BracketL) {
            if self.check(&TokenKind::BracketL) {
                let start = self.current().start;
                return Err(SdlError::unsupported(self.source, start, "nested list type"));
            }
            let (name, _) = self.expect_name()?;
            let mut type_ref = TypeRef::list_of(name);
            if self.eat(&TokenKind::Bang) {
                type_ref = type_ref.items_required();
            }
            self.expect(&TokenKind::BracketR)?;
            if self.eat(&TokenKind::Bang) {
                type_ref = type_ref.required();
            }
            return Ok(type_ref);
        }

        let (name, _) = self.expect_name()?;
        let mut type_ref = TypeRef::named(name);
        if self.eat(&TokenKind::Bang) {
            type_ref = type_ref.required();
        }
        Ok(type_ref)
    }

    fn parse_directives(&mut self) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();
        while self.check(&TokenKind::At) {
            let at = self.advance();
            let (name, _) = self.expect_name()?;
            let mut arguments = Vec::new();
            if self.eat(&TokenKind::ParenL) {
                while !self.eat(&TokenKind::ParenR) {
                    let (arg, _) = self.expect_name()?;
                    self.expect(&TokenKind::Colon)?;
                    arguments.push((arg, self.parse_value()?));
                }
            }
            directives.push(Directive {
                name,
                start: at.start,
                arguments,
            });
        }
        Ok(directives)
    }

    /// Consume one input value; returns it when it is a plain string.
    fn parse_value(&mut self) -> Result<Option<String>> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(value) => Ok(Some(value)),
            TokenKind::Number(_) | TokenKind::Name(_) => Ok(None),
            TokenKind::Dollar => {
                self.expect_name()?;
                Ok(None)
            }
            TokenKind::BracketL => {
                while !self.eat(&TokenKind::BracketR) {
                    if self.is_at_end() {
                        return Err(self.unexpected("expected `]`"));
                    }
                    self.parse_value()?;
                }
                Ok(None)
            }
            TokenKind::BraceL => {
                while !self.eat(&TokenKind::BraceR) {
                    self.expect_name()?;
                    self.expect(&TokenKind::Colon)?;
                    self.parse_value()?;
                }
                Ok(None)
            }
            other => Err(SdlError::parse(
                self.source,
                token.start,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }
}

/// Parse one subgraph's SDL into its fragment.
///
/// Reference resolvers are not part of the document; register them on the
/// returned fragment.
pub fn parse_fragment(subgraph: &str, source: &str) -> Result<SchemaFragment> {
    Parser::new(subgraph, source)?.parse()
}
