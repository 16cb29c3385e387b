//! Lexer for the tape language
//!
//! A single pass over the characters of the source, yielding one token per
//! significant symbol and tracking line/column for diagnostics.

use crate::token::{Token, TokenKind};
use bfc_error::span::{Position, Span};
use std::str::Chars;

/// Streaming lexer; also usable as an [`Iterator`] of tokens
pub struct Lexer<'src> {
    chars: Chars<'src>,
    /// Current line (1-indexed)
    line: u32,
    /// Current column (1-indexed)
    column: u32,
    /// Byte offset
    offset: usize,
    file_id: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u32) -> Self {
        Self {
            chars: source.chars(),
            line: 1,
            column: 1,
            offset: 0,
            file_id,
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.offset += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Returns the next significant token, skipping comment text
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            let start = self.current_position();
            let ch = self.advance()?;

            if let Some(kind) = TokenKind::from_symbol(ch) {
                let span = Span::new(start, self.current_position(), self.file_id);
                return Some(Token::new(kind, span));
            }
        }
    }

    /// Tokenizes the whole source
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Tokenizes source code
pub fn tokenize(source: &str, file_id: u32) -> Vec<Token> {
    Lexer::new(source, file_id).tokenize()
}
