use std::fmt;

use cosmic_core::Location;
use serde::Serialize;

pub trait IntoToken {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token;
}

#[derive(Debug, Clone, Serialize, Copy, PartialEq, PartialOrd)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    Literal(Literal),
    Operator(Operator),
    Punctuation(Punctuation),
    Eof,
}

impl TokenKind {
    /// Keywords that can only begin a statement. Recovery resynchronizes on these.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Keyword(
                Keyword::Let
                    | Keyword::Fn
                    | Keyword::Struct
                    | Keyword::If
                    | Keyword::While
                    | Keyword::For
                    | Keyword::Return
                    | Keyword::Break
                    | Keyword::Continue
            )
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Keyword(keyword) => write!(f, "'{}'", keyword.as_str()),
            TokenKind::Literal(Literal::Int(_)) => write!(f, "integer literal"),
            TokenKind::Literal(Literal::Float(_)) => write!(f, "float literal"),
            TokenKind::Literal(Literal::String) => write!(f, "string literal"),
            TokenKind::Literal(Literal::Bool(value)) => write!(f, "'{value}'"),
            TokenKind::Literal(Literal::Null) => write!(f, "'null'"),
            TokenKind::Operator(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Punctuation(punct) => write!(f, "'{}'", punct.as_str()),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

impl IntoToken for TokenKind {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token {
        Token(self, (start_byte, end_byte).into())
    }
}

#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    Let,
    Fn,
    Struct,
    If,
    Else,
    While,
    For,
    In,
    Return,
    Break,
    Continue,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::Fn => "fn",
            Keyword::Struct => "struct",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Return => "return",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
        }
    }
}

impl IntoToken for Keyword {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token {
        Token(TokenKind::Keyword(self), (start_byte, end_byte).into())
    }
}

/// String literals keep only their span; the text is read back from the source.
#[derive(Debug, Clone, Serialize, Copy, PartialEq, PartialOrd)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String,
    Bool(bool),
    Null,
}

impl IntoToken for Literal {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token {
        Token(TokenKind::Literal(self), (start_byte, end_byte).into())
    }
}

#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Assign,
    PlusAssign,
    MinusAssign,
    MulAssign,
    DivAssign,
    EqualEqual,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Assign => "=",
            Operator::PlusAssign => "+=",
            Operator::MinusAssign => "-=",
            Operator::MulAssign => "*=",
            Operator::DivAssign => "/=",
            Operator::EqualEqual => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Operator::Assign
                | Operator::PlusAssign
                | Operator::MinusAssign
                | Operator::MulAssign
                | Operator::DivAssign
        )
    }

    /// The arithmetic operator a compound assignment applies, `+=` -> `+`.
    pub fn compound_base(self) -> Option<Operator> {
        match self {
            Operator::PlusAssign => Some(Operator::Plus),
            Operator::MinusAssign => Some(Operator::Minus),
            Operator::MulAssign => Some(Operator::Mul),
            Operator::DivAssign => Some(Operator::Div),
            _ => None,
        }
    }
}

impl IntoToken for Operator {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token {
        Token(TokenKind::Operator(self), (start_byte, end_byte).into())
    }
}

#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Punctuation {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LCurly,
    RCurly,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
}

impl Punctuation {
    pub fn as_str(self) -> &'static str {
        match self {
            Punctuation::LParen => "(",
            Punctuation::RParen => ")",
            Punctuation::LBracket => "[",
            Punctuation::RBracket => "]",
            Punctuation::LCurly => "{",
            Punctuation::RCurly => "}",
            Punctuation::Comma => ",",
            Punctuation::Colon => ":",
            Punctuation::Semicolon => ";",
            Punctuation::Dot => ".",
            Punctuation::Arrow => "->",
        }
    }
}

impl IntoToken for Punctuation {
    fn into_token(self, start_byte: usize, end_byte: usize) -> Token {
        Token(TokenKind::Punctuation(self), (start_byte, end_byte).into())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, PartialOrd)]
pub struct Token(pub TokenKind, pub Location);

impl Token {
    pub fn kind(&self) -> TokenKind {
        self.0
    }

    pub fn location(&self) -> Location {
        self.1
    }

    pub fn lexeme<'src>(&self, content: &'src str) -> &'src str {
        &content[self.1.to_range()]
    }
}

/// The token stream handed to the parser. Reading past the end yields an empty
/// `Eof` token positioned at the end of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokens {
    pub inner: Vec<Token>,
    pub index: usize,
    pub eof: usize,
}

impl Tokens {
    pub fn new(inner: Vec<Token>, eof: usize) -> Self {
        Self {
            inner,
            index: 0,
            eof,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn eof_token(&self) -> Token {
        TokenKind::Eof.into_token(self.eof, self.eof)
    }

    pub fn next_token(&mut self) -> Token {
        match self.inner.get(self.index).copied() {
            Some(token) => {
                self.index += 1;
                token
            }
            None => self.eof_token(),
        }
    }

    pub fn consume(&mut self) {
        if self.index < self.inner.len() {
            self.index += 1;
        }
    }

    pub fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Token {
        self.inner
            .get(self.index + n)
            .copied()
            .unwrap_or_else(|| self.eof_token())
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind() == kind
    }

    pub fn is_eof(&self) -> bool {
        self.index >= self.inner.len()
    }

    /// Consumes the next token when it is `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        match self.at(kind) {
            true => Some(self.next_token()),
            false => None,
        }
    }

    /// The end of the most recently consumed token, or zero at the start.
    pub fn previous_end(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|i| self.inner.get(i))
            .map(|token| token.location().end_byte)
            .unwrap_or(0)
    }
}
