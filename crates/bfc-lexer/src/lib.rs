//! bfc-lexer - Lexer for the tape language
//!
//! Only eight characters are significant: `+ - > < [ ] . ,`. Every other
//! character is comment text and is skipped, so lexing never fails.
//!
//! # Example
//!
//! ```rust
//! use bfc_lexer::{Lexer, TokenKind};
//!
//! let tokens = Lexer::new("add two: ++", 0).tokenize();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(kinds, vec![TokenKind::Plus, TokenKind::Plus]);
//! ```

pub mod lexer;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use token::{Token, TokenKind};
