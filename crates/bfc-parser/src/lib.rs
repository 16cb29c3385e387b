//! bfc-parser - Parser for the tape language
//!
//! Builds the raw IR tree from tokens: one instruction per symbol, with `[`
//! and `]` turned into nested loops. Unbalanced brackets are the only way a
//! program can be rejected.
//!
//! # Example
//!
//! ```rust
//! use bfc_lexer::Lexer;
//! use bfc_parser::parse;
//!
//! let tokens = Lexer::new("+[-]", 0).tokenize();
//! let (block, diagnostics) = parse(tokens);
//!
//! assert!(diagnostics.is_empty());
//! assert_eq!(block.len(), 2);
//! assert_eq!(block.instruction_count(), 3);
//! ```

pub mod parser;

pub use parser::{parse, parse_source, Parser};
