//! IR Instructions
//!
//! A closed set of tape operations. Arithmetic is kept in `i64` and only
//! truncated to the cell width by the backend.

use crate::block::Block;
use std::fmt;

/// Opcode of an instruction, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    Add,
    Set,
    Shift,
    Write,
    Read,
    Loop,
    Nop,
    Copy,
}

impl Opcode {
    /// Opcodes that must run with the tape pointer materialized at their
    /// own offset (they call into the runtime or use relative addressing
    /// internally).
    pub fn requires_explicit_shift(self) -> bool {
        matches!(
            self,
            Opcode::Loop | Opcode::Copy | Opcode::Read | Opcode::Write | Opcode::Nop
        )
    }
}

/// One destination of a [`Op::Copy`]: `cell[offset] += cell[0] * multiplier`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyTarget {
    pub offset: i64,
    pub multiplier: i64,
}

impl CopyTarget {
    pub fn new(offset: i64, multiplier: i64) -> Self {
        Self { offset, multiplier }
    }
}

/// Operation payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Add a (possibly negative) delta to the cell
    Add(i64),
    /// Overwrite the cell
    Set(i64),
    /// Move the tape pointer
    Shift(i64),
    /// Output the cell
    Write,
    /// Input into the cell
    Read,
    /// Run the body while the cell is nonzero
    Loop(Block),
    /// Marks the net pointer offset at the end of a fold pass
    Nop,
    /// Distribute the cell into the targets and clear it
    Copy(Vec<CopyTarget>),
}

/// An operation stamped with the tape offset it acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    /// Offset relative to the local origin of the enclosing block
    pub pointer: i64,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self { op, pointer: 0 }
    }

    pub fn add(delta: i64) -> Self {
        Self::new(Op::Add(delta))
    }

    pub fn set(value: i64) -> Self {
        Self::new(Op::Set(value))
    }

    pub fn shift(delta: i64) -> Self {
        Self::new(Op::Shift(delta))
    }

    pub fn write() -> Self {
        Self::new(Op::Write)
    }

    pub fn read() -> Self {
        Self::new(Op::Read)
    }

    pub fn looping(body: Block) -> Self {
        Self::new(Op::Loop(body))
    }

    pub fn nop() -> Self {
        Self::new(Op::Nop)
    }

    pub fn copy(targets: Vec<CopyTarget>) -> Self {
        Self::new(Op::Copy(targets))
    }

    pub fn at(mut self, pointer: i64) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn opcode(&self) -> Opcode {
        match self.op {
            Op::Add(_) => Opcode::Add,
            Op::Set(_) => Opcode::Set,
            Op::Shift(_) => Opcode::Shift,
            Op::Write => Opcode::Write,
            Op::Read => Opcode::Read,
            Op::Loop(_) => Opcode::Loop,
            Op::Nop => Opcode::Nop,
            Op::Copy(_) => Opcode::Copy,
        }
    }

    /// The scalar argument of `Add`, `Set` and `Shift`
    pub fn argument(&self) -> Option<i64> {
        match self.op {
            Op::Add(value) | Op::Set(value) | Op::Shift(value) => Some(value),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Block> {
        match &self.op {
            Op::Loop(body) => Some(body),
            _ => None,
        }
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(f, "{}{}", pad, self.opcode())?;

        match &self.op {
            Op::Add(value) | Op::Set(value) | Op::Shift(value) => write!(f, " {}", value)?,
            Op::Copy(targets) => {
                let pairs: Vec<_> = targets
                    .iter()
                    .map(|t| format!("({}, {})", t.offset, t.multiplier))
                    .collect();
                write!(f, " [{}]", pairs.join(", "))?;
            }
            _ => {}
        }

        if self.pointer != 0 {
            write!(f, " @{:+}", self.pointer)?;
        }

        if let Op::Loop(body) = &self.op {
            writeln!(f, " {{")?;
            body.fmt_indented(f, depth + 1)?;
            write!(f, "{}}}", pad)?;
        }

        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
