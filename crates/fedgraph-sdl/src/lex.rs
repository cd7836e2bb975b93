//! SDL lexer.
//!
//! Produces tokens with byte spans. Commas, whitespace and `#` comments are
//! insignificant and skipped. Fails on the first invalid character.

use crate::error::{Result, SdlError};

/// A token with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Name(String),
    /// String or block string, with escapes resolved.
    Str(String),
    /// Int or float literal, kept as written.
    Number(String),
    BraceL,
    BraceR,
    ParenL,
    ParenR,
    BracketL,
    BracketR,
    Colon,
    Bang,
    At,
    Equals,
    Pipe,
    Amp,
    Dollar,
    Eof,
}

impl TokenKind {
    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self {
            Self::Name(name) => format!("`{name}`"),
            Self::Str(_) => "string".to_string(),
            Self::Number(n) => format!("number `{n}`"),
            Self::BraceL => "`{`".to_string(),
            Self::BraceR => "`}`".to_string(),
            Self::ParenL => "`(`".to_string(),
            Self::ParenR => "`)`".to_string(),
            Self::BracketL => "`[`".to_string(),
            Self::BracketR => "`]`".to_string(),
            Self::Colon => "`:`".to_string(),
            Self::Bang => "`!`".to_string(),
            Self::At => "`@`".to_string(),
            Self::Equals => "`=`".to_string(),
            Self::Pipe => "`|`".to_string(),
            Self::Amp => "`&`".to_string(),
            Self::Dollar => "`$`".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

/// Tokenize a whole document. The last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let b = bytes[pos];
        let punct = match b {
            b'{' => Some(TokenKind::BraceL),
            b'}' => Some(TokenKind::BraceR),
            b'(' => Some(TokenKind::ParenL),
            b')' => Some(TokenKind::ParenR),
            b'[' => Some(TokenKind::BracketL),
            b']' => Some(TokenKind::BracketR),
            b':' => Some(TokenKind::Colon),
            b'!' => Some(TokenKind::Bang),
            b'@' => Some(TokenKind::At),
            b'=' => Some(TokenKind::Equals),
            b'|' => Some(TokenKind::Pipe),
            b'&' => Some(TokenKind::Amp),
            b'$' => Some(TokenKind::Dollar),
            _ => None,
        };
        if let Some(kind) = punct {
            pos += 1;
            tokens.push(Token::new(kind, start, pos));
            continue;
        }

        match b {
            b' ' | b'\t' | b'\r' | b'\n' | b',' => pos += 1,
            // Byte order mark
            0xEF if bytes[pos..].starts_with(&[0xEF, 0xBB, 0xBF]) => pos += 3,
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'"' => {
                let (value, end) = if bytes[pos..].starts_with(b"\"\"\"") {
                    block_string(source, pos)?
                } else {
                    string(source, pos)?
                };
                pos = end;
                tokens.push(Token::new(TokenKind::Str(value), start, end));
            }
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                while pos < bytes.len() && (bytes[pos] == b'_' || bytes[pos].is_ascii_alphanumeric())
                {
                    pos += 1;
                }
                let name = source[start..pos].to_string();
                tokens.push(Token::new(TokenKind::Name(name), start, pos));
            }
            b'-' | b'0'..=b'9' => {
                pos += 1;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_digit() || matches!(bytes[pos], b'.' | b'e' | b'E' | b'+' | b'-'))
                {
                    pos += 1;
                }
                let literal = &source[start..pos];
                if literal == "-" {
                    return Err(SdlError::lex(source, start, "expected digit after `-`"));
                }
                tokens.push(Token::new(TokenKind::Number(literal.to_string()), start, pos));
            }
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('?');
                return Err(SdlError::lex(
                    source,
                    start,
                    format!("unexpected character '{ch}'"),
                ));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, bytes.len(), bytes.len()));
    Ok(tokens)
}

fn string(source: &str, start: usize) -> Result<(String, usize)> {
    let mut value = String::new();
    let mut chars = source[start + 1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, start + 1 + i + 1)),
            '\n' => break,
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 'b')) => value.push('\u{8}'),
                Some((_, 'f')) => value.push('\u{c}'),
                Some((_, '/')) => value.push('/'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((j, 'u')) => {
                    let from = start + 1 + j + 1;
                    let hex = source.get(from..from + 4).unwrap_or("");
                    let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
                    let Some(ch) = decoded else {
                        return Err(SdlError::lex(source, from, "invalid unicode escape"));
                    };
                    value.push(ch);
                    for _ in 0..4 {
                        chars.next();
                    }
                }
                Some((j, other)) => {
                    return Err(SdlError::lex(
                        source,
                        start + 1 + j,
                        format!("invalid escape sequence '\\{other}'"),
                    ));
                }
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(SdlError::lex(source, start, "unterminated string"))
}

fn block_string(source: &str, start: usize) -> Result<(String, usize)> {
    let body_start = start + 3;
    let mut search = body_start;
    loop {
        let Some(found) = source[search..].find("\"\"\"") else {
            return Err(SdlError::lex(source, start, "unterminated block string"));
        };
        let at = search + found;
        // `\"""` is an escaped delimiter inside the block.
        if source[..at].ends_with('\\') {
            search = at + 3;
            continue;
        }
        let raw = source[body_start..at].replace("\\\"\"\"", "\"\"\"");
        return Ok((raw.trim().to_string(), at + 3));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn key_directive() {
        assert_eq!(
            kinds(r#"@key(fields: "link { href }")"#),
            vec![
                TokenKind::At,
                TokenKind::Name("key".into()),
                TokenKind::ParenL,
                TokenKind::Name("fields".into()),
                TokenKind::Colon,
                TokenKind::Str("link { href }".into()),
                TokenKind::ParenR,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_commas_are_skipped() {
        assert_eq!(
            kinds("# heading\nfoo, bar # trailing"),
            vec![
                TokenKind::Name("foo".into()),
                TokenKind::Name("bar".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn block_strings_are_trimmed() {
        assert_eq!(
            kinds("\"\"\"\n  A speaker.\n\"\"\" type"),
            vec![
                TokenKind::Str("A speaker.".into()),
                TokenKind::Name("type".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn escapes_resolve() {
        assert_eq!(
            kinds(r#""a\"b\u0041""#),
            vec![TokenKind::Str("a\"bA".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("type A {\n  x: \"oops\n}").unwrap_err();
        assert_eq!(err.position(), Some((2, 6)));
    }

    #[test]
    fn bad_character_reports_position() {
        let err = tokenize("type A ~").unwrap_err();
        assert!(err.to_string().contains("1:8"), "{err}");
    }
}
