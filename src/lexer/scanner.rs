use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Multi-character symbols, longest first so maximal munch works by scanning
/// the table in order.
const SYMBOLS: &[&str] = &[
    "<<=", ">>=", "==", "!=", "<=", ">=", "<<", ">>", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "->", "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "~", "(", ")", "{",
    "}", "[", "]", ",", ";",
];

/// Hand-written scanner for the source language
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all tokens from source code and returns them, ending with an
    /// `Eof` token.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.scan_token()?;
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.peek();

        match c {
            ' ' | '\t' | '\r' => {
                self.advance();
            }
            '\n' => {
                self.advance();
                self.line += 1;
                self.column = 1;
            }
            // Line comments
            '#' => {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            }
            '0'..='9' => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_ident(),
            _ => self.scan_symbol()?,
        }
        Ok(())
    }

    fn scan_number(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            lexeme.push(self.advance());
        }
        self.tokens
            .push(Token::new(TokenKind::Number, lexeme, line, column));
    }

    fn scan_ident(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            lexeme.push(self.advance());
        }
        self.tokens
            .push(Token::new(TokenKind::Ident, lexeme, line, column));
    }

    fn scan_symbol(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        for sym in SYMBOLS {
            if self.matches(sym) {
                for _ in 0..sym.chars().count() {
                    self.advance();
                }
                self.tokens
                    .push(Token::new(TokenKind::Symbol, *sym, line, column));
                return Ok(());
            }
        }
        Err(Error::UnexpectedCharacter {
            ch: self.peek(),
            line,
            col: column,
        })
    }

    fn matches(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.source.get(self.current + i) == Some(&c))
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexemes(source: &str) -> Vec<String> {
        let mut tokens = Scanner::new(source).scan_tokens().unwrap();
        tokens.pop(); // Eof
        tokens.into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn scans_maximal_symbols() {
        assert_eq!(lexemes("a <<= b << c <= d"), ["a", "<<=", "b", "<<", "c", "<=", "d"]);
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            lexemes("global int a, b;"),
            ["global", "int", "a", ",", "b", ";"]
        );
    }

    #[test]
    fn tracks_positions_across_lines() {
        let tokens = Scanner::new("a\n  b").scan_tokens().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn skips_comments() {
        assert_eq!(lexemes("a # comment\nb"), ["a", "b"]);
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(
            Scanner::new("a $ b").scan_tokens(),
            Err(Error::UnexpectedCharacter { ch: '$', .. })
        ));
    }
}
