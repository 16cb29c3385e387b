//! bfc-ir - Intermediate Representation of the tape compiler
//!
//! The IR is a tree: a [`Block`] is an ordered list of [`Instruction`]s and a
//! loop owns its body block. Every pass consumes one tree and builds a fresh
//! one.
//!
//! # Architecture
//!
//! ```text
//! source text
//!         ↓
//!   tokens (bfc-lexer)
//!         ↓
//!   raw IR (bfc-parser)      one instruction per symbol
//!         ↓
//!   peephole (bfc-opt)       merged runs, Set, Copy
//!         ↓
//!   flow analysis (bfc-opt)  pointer offsets materialized
//!         ↓
//!   NASM text (bfc-codegen)
//! ```

pub mod block;
pub mod instruction;
pub mod module;
pub mod options;

pub use block::{Block, MemorySpace};
pub use instruction::{CopyTarget, Instruction, Op, Opcode};
pub use module::Module;
pub use options::{CellSize, MemoryOverflow, Options, OutputKind, DEFAULT_TAPE_CELLS};
