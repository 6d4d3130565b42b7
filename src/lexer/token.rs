use serde::{Deserialize, Serialize};

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where the token appears (1-indexed)
    pub line: usize,
    /// Column number where the token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}

/// Lexical classes of the source language.
///
/// The grammar matches on the class, the literal text, or both; keywords are
/// ordinary identifiers matched by text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Identifier or keyword (`sub`, `main`, `x`, `__ADD__`)
    Ident,
    /// Unsigned integer literal
    Number,
    /// Operator or punctuation (`+`, `<<=`, `(`, `;`)
    Symbol,
    /// End of input
    Eof,
}
