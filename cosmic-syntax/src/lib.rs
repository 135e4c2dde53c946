pub mod ast;
pub mod error;
pub mod expressions;
pub mod parser;

pub use ast::*;
pub use error::{ParseError, Result};
pub use parser::{Parse, Parser, parse};
