//! bfc-codegen - Code generation for the bfc IR
//!
//! A single backend is provided: NASM assembly for x86-64 Linux, with its
//! runtime support routines embedded in the output.
//!
//! # Example
//!
//! ```rust
//! use bfc_codegen::{CodeGen, X86_64Linux};
//! use bfc_ir::{Block, Instruction, Module, Options};
//!
//! let module = Module::new("demo", Block::from(vec![Instruction::add(65), Instruction::write()]));
//! let backend = X86_64Linux::new(Options::new("demo"));
//! let asm = backend.generate(&module);
//!
//! assert!(asm.contains("_bf_entry:"));
//! assert!(asm.contains("call _bf_write"));
//! ```

pub mod x86_64_linux;

pub use x86_64_linux::X86_64Linux;

use std::path::Path;
use std::process::Command;

/// Trait for code generation backends
pub trait CodeGen {
    /// Backend output type
    type Output;

    /// Generates code from the IR module
    fn generate(&self, module: &bfc_ir::Module) -> Self::Output;
}

/// External tools that turn a backend's output into binaries
pub trait Toolchain {
    /// Assembles `input` into the object file `output`
    fn assembler_command(&self, input: &Path, output: &Path) -> Command;

    /// Links the object `input` into an executable, or `None` when the
    /// object itself is the final product
    fn linker_command(&self, input: &Path, output: &Path) -> Option<Command>;
}
