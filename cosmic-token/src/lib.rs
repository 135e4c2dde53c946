pub mod error;
pub mod lexer;
pub mod token;

pub use error::{LexErrorKind, LexicalError, Result};
pub use lexer::{Lexer, tokenize};
pub use token::*;
