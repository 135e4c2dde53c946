use cosmic_core::{Diagnostic, Location};
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = LexicalError> = std::result::Result<T, E>;

/// Scanning stops at the first of these; a lex pass never yields partial tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}")]
pub struct LexicalError {
    pub kind: LexErrorKind,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("integer literal is too large")]
    IntegerOverflow,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

impl LexicalError {
    pub fn new(kind: LexErrorKind, location: impl Into<Location>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.location, self.message()).with_code("lexer")
    }
}
