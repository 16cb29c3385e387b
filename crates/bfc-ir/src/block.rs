//! Blocks and memory-space inference

use crate::instruction::{Instruction, Op};
use std::fmt;

/// Range of tape offsets, relative to the block origin, a block may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySpace {
    pub min: i64,
    pub max: i64,
}

impl MemorySpace {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

/// An owned, ordered sequence of instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions including those nested in loop bodies
    pub fn instruction_count(&self) -> usize {
        self.instructions
            .iter()
            .map(|instr| match &instr.op {
                Op::Loop(body) => 1 + body.instruction_count(),
                _ => 1,
            })
            .sum()
    }

    /// Statically known offsets this block may touch.
    ///
    /// Only `Shift` moves the running offset; a loop folds in its own body's
    /// range shifted by the current offset. The result is `None` when the
    /// block does not return the pointer to where it started, or when any
    /// nested loop is itself unknown.
    pub fn memory_space(&self) -> Option<MemorySpace> {
        let mut offset = 0i64;
        let mut min = 0i64;
        let mut max = 0i64;

        for instr in &self.instructions {
            match &instr.op {
                Op::Shift(delta) => {
                    offset += delta;
                    min = min.min(offset);
                    max = max.max(offset);
                }
                Op::Loop(body) => {
                    let inner = body.memory_space()?;
                    min = min.min(offset + inner.min);
                    max = max.max(offset + inner.max);
                }
                _ => {}
            }
        }

        (offset == 0).then_some(MemorySpace::new(min, max))
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for instr in &self.instructions {
            instr.fmt_indented(f, depth)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl From<Vec<Instruction>> for Block {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for Block {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Block {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
