//! Bracket-matching parser
//!
//! Keeps a stack of open loops. Each frame owns the instructions collected
//! since its `[` so closing a loop is a pop and a push into the parent.

use bfc_error::{Diagnostic, Diagnostics, ErrorCode, Span};
use bfc_ir::{Block, Instruction};
use bfc_lexer::{Token, TokenKind};

/// A loop whose `]` has not been seen yet
struct Frame {
    open: Span,
    instructions: Vec<Instruction>,
}

/// Parser for the tape language
pub struct Parser {
    tokens: Vec<Token>,
    /// Instructions of the top level
    root: Vec<Instruction>,
    /// Open loops, innermost last
    frames: Vec<Frame>,
    /// `[ ... ]` region of the loop closed most recently
    last_closed: Option<Span>,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            root: Vec::new(),
            frames: Vec::new(),
            last_closed: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Returns the diagnostics
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes and returns the diagnostics
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Parses every token into a block.
    ///
    /// On bracket errors every offending bracket gets its own diagnostic and
    /// the returned block should be discarded.
    pub fn parse(&mut self) -> Block {
        let tokens = std::mem::take(&mut self.tokens);

        for token in tokens {
            match token.kind {
                TokenKind::Plus => self.emit(Instruction::add(1)),
                TokenKind::Minus => self.emit(Instruction::add(-1)),
                TokenKind::Right => self.emit(Instruction::shift(1)),
                TokenKind::Left => self.emit(Instruction::shift(-1)),
                TokenKind::Write => self.emit(Instruction::write()),
                TokenKind::Read => self.emit(Instruction::read()),
                TokenKind::Open => self.frames.push(Frame {
                    open: token.span,
                    instructions: Vec::new(),
                }),
                TokenKind::Close => self.close(token.span),
            }
        }

        // Whatever is still open at the end never got its `]`
        for frame in std::mem::take(&mut self.frames) {
            self.diagnostics.push(
                Diagnostic::error("unclosed `[`")
                    .with_code(ErrorCode::UNCLOSED_OPEN)
                    .with_label(frame.open, "this loop is never closed")
                    .with_help("add a matching `]`"),
            );
        }

        let block = Block::from(std::mem::take(&mut self.root));
        tracing::debug!(
            instructions = block.instruction_count(),
            errors = self.diagnostics.error_count(),
            "parsed"
        );
        block
    }

    // =========================================
    // Helpers
    // =========================================

    fn emit(&mut self, instruction: Instruction) {
        match self.frames.last_mut() {
            Some(frame) => frame.instructions.push(instruction),
            None => self.root.push(instruction),
        }
    }

    fn close(&mut self, span: Span) {
        match self.frames.pop() {
            Some(frame) => {
                self.last_closed = Some(frame.open.merge(span));
                let body = Block::from(frame.instructions);
                self.emit(Instruction::looping(body));
            }
            None => {
                let mut diagnostic = Diagnostic::error("unmatched `]`")
                    .with_code(ErrorCode::UNMATCHED_CLOSE)
                    .with_label(span, "no `[` is open here");
                if let Some(closed) = self.last_closed {
                    diagnostic =
                        diagnostic.with_secondary_label(closed, "last loop was closed here");
                }
                self.diagnostics.push(diagnostic);
            }
        }
    }
}

/// Parses a token stream into the raw IR
pub fn parse(tokens: Vec<Token>) -> (Block, Diagnostics) {
    let mut parser = Parser::new(tokens);
    let block = parser.parse();
    (block, parser.take_diagnostics())
}

/// Lexes and parses source text in one step
pub fn parse_source(source: &str, file_id: u32) -> (Block, Diagnostics) {
    parse(bfc_lexer::tokenize(source, file_id))
}
