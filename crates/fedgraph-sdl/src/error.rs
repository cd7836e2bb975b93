//! Error types for SDL parsing.

use fedgraph_kernel::FragmentError;

/// Error raised while reading a subgraph schema document.
#[derive(Debug, thiserror::Error)]
pub enum SdlError {
    /// Invalid character or unterminated string.
    #[error("lex error at {line}:{column}: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },

    /// Unexpected token or invalid structure.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A definition kind outside the federation dialect this crate reads.
    #[error("unsupported definition `{definition}` at {line}:{column}")]
    Unsupported {
        line: usize,
        column: usize,
        definition: String,
    },

    /// The parsed declarations do not form a valid fragment.
    #[error(transparent)]
    Fragment(#[from] FragmentError),
}

pub type Result<T> = std::result::Result<T, SdlError>;

/// 1-indexed (line, column) of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

impl SdlError {
    pub(crate) fn lex(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        Self::Lex {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn parse(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(source: &str, offset: usize, definition: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        Self::Unsupported {
            line,
            column,
            definition: definition.into(),
        }
    }

    /// Source position, when the error has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Lex { line, column, .. }
            | Self::Parse { line, column, .. }
            | Self::Unsupported { line, column, .. } => Some((*line, *column)),
            Self::Fragment(_) => None,
        }
    }
}
