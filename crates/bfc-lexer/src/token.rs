//! Tokens of the tape language

use bfc_error::span::Span;
use std::fmt;

/// The eight significant symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `+` - increment the current cell
    Plus,
    /// `-` - decrement the current cell
    Minus,
    /// `>` - move the pointer right
    Right,
    /// `<` - move the pointer left
    Left,
    /// `[` - loop while the current cell is nonzero
    Open,
    /// `]` - end of loop
    Close,
    /// `.` - write the current cell
    Write,
    /// `,` - read into the current cell
    Read,
}

impl TokenKind {
    pub const ALL: [TokenKind; 8] = [
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Right,
        TokenKind::Left,
        TokenKind::Open,
        TokenKind::Close,
        TokenKind::Write,
        TokenKind::Read,
    ];

    /// Recognizes a significant symbol
    pub fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '>' => Some(TokenKind::Right),
            '<' => Some(TokenKind::Left),
            '[' => Some(TokenKind::Open),
            ']' => Some(TokenKind::Close),
            '.' => Some(TokenKind::Write),
            ',' => Some(TokenKind::Read),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            TokenKind::Plus => '+',
            TokenKind::Minus => '-',
            TokenKind::Right => '>',
            TokenKind::Left => '<',
            TokenKind::Open => '[',
            TokenKind::Close => ']',
            TokenKind::Write => '.',
            TokenKind::Read => ',',
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.symbol())
    }
}

/// A symbol with its location in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
