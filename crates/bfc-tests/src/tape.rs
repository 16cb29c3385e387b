//! Reference evaluator over the IR
//!
//! Runs a block directly on a sparse tape so that passes can be checked for
//! behavior preservation without assembling anything. Cells wrap at the
//! configured width; the pointer is unbounded.

use bfc_ir::{Block, CellSize, Op};
use std::collections::{BTreeMap, VecDeque};

/// Guards against programs that never terminate
pub const STEP_LIMIT: usize = 10_000_000;

/// Observable result of running a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: Vec<u8>,
    /// Nonzero cells only
    pub cells: BTreeMap<i64, u64>,
    pub pointer: i64,
}

impl Outcome {
    pub fn cell(&self, offset: i64) -> u64 {
        self.cells.get(&offset).copied().unwrap_or(0)
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

struct Machine {
    cells: BTreeMap<i64, u64>,
    pointer: i64,
    mask: u64,
    input: VecDeque<u8>,
    output: Vec<u8>,
    steps: usize,
}

impl Machine {
    fn get(&self, at: i64) -> u64 {
        self.cells.get(&at).copied().unwrap_or(0)
    }

    fn put(&mut self, at: i64, value: u64) {
        let value = value & self.mask;
        if value == 0 {
            self.cells.remove(&at);
        } else {
            self.cells.insert(at, value);
        }
    }

    fn tick(&mut self) {
        self.steps += 1;
        assert!(self.steps <= STEP_LIMIT, "step limit exceeded");
    }

    fn block(&mut self, block: &Block) {
        for instr in block {
            self.tick();
            let at = self.pointer + instr.pointer;

            match &instr.op {
                Op::Add(delta) => self.put(at, self.get(at).wrapping_add(*delta as u64)),
                Op::Set(value) => self.put(at, *value as u64),
                Op::Shift(delta) => self.pointer += delta,
                Op::Write => self.output.push(self.get(at) as u8),
                Op::Read => {
                    let byte = self.input.pop_front().unwrap_or(0);
                    self.put(at, u64::from(byte));
                }
                Op::Loop(body) => {
                    while self.get(self.pointer + instr.pointer) != 0 {
                        self.tick();
                        self.block(body);
                    }
                }
                Op::Copy(targets) => {
                    let value = self.get(at);
                    if value != 0 {
                        self.put(at, 0);
                        for target in targets {
                            let dest = at + target.offset;
                            let added = value.wrapping_mul(target.multiplier as u64);
                            self.put(dest, self.get(dest).wrapping_add(added));
                        }
                    }
                }
                Op::Nop => {}
            }
        }
    }
}

/// Runs `block` with the given input; end of input reads as 0
pub fn run(block: &Block, cell_size: CellSize, input: &[u8]) -> Outcome {
    let mask = if cell_size.bits() >= 64 {
        u64::MAX
    } else {
        (1u64 << cell_size.bits()) - 1
    };

    let mut machine = Machine {
        cells: BTreeMap::new(),
        pointer: 0,
        mask,
        input: input.iter().copied().collect(),
        output: Vec::new(),
        steps: 0,
    };
    machine.block(block);

    Outcome {
        output: machine.output,
        cells: machine.cells,
        pointer: machine.pointer,
    }
}
