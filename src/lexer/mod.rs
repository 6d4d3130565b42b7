//! Tokenization of source text

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
