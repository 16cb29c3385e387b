//! Peephole optimizer
//!
//! One forward scan: every instruction is appended to the output list and the
//! rules are tried against its tail in priority order. When a rule fires the
//! scan over the rules starts again from the top, so a rewrite can enable an
//! earlier rule (`[-][-]` ends as a single `set 0`). The loop fallback, which
//! re-optimizes a loop body, fires at most once per appended instruction.

use crate::matcher::{
    any_of, equals, guarded, instruction, looping, opcode, repeated, sequence, Matcher,
};
use bfc_ir::{Block, CopyTarget, Instruction, Module, Op, Opcode};
use std::collections::BTreeMap;

type Rewrite = fn(&Optimizer, &mut Vec<Instruction>);

/// A named pattern with its rewrite
pub struct Rule {
    pub name: &'static str,
    matcher: Matcher,
    rewrite: Rewrite,
    /// Fires at most once per appended instruction
    once: bool,
}

impl Rule {
    fn new(name: &'static str, matcher: Matcher, rewrite: Rewrite) -> Self {
        Self {
            name,
            matcher,
            rewrite,
            once: false,
        }
    }

    fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// The rule set, built once and reused for every nested block
pub struct Optimizer {
    rules: Vec<Rule>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    pub fn new() -> Self {
        let rules = vec![
            Rule::new("merge-add", pair(Opcode::Add, Opcode::Add), merge_add),
            Rule::new("merge-set-add", pair(Opcode::Set, Opcode::Add), merge_set_add),
            Rule::new("merge-set", pair(Opcode::Set, Opcode::Set), merge_set),
            Rule::new("merge-shift", pair(Opcode::Shift, Opcode::Shift), merge_shift),
            Rule::new(
                "zero-loop",
                looping(
                    Some(sequence(
                        vec![instruction(Opcode::Add, any_of(&[1, -1]))],
                        true,
                    )),
                    false,
                ),
                zero_loop,
            ),
            Rule::new("loop-body", looping(None, false), optimize_loop_body).once(),
            Rule::new("copy-loop", copy_loop(), copy_loop_rewrite),
        ];

        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Optimizes a block, recursing into loop bodies
    pub fn optimize_block(&self, block: Block) -> Block {
        let mut out = Vec::with_capacity(block.len());
        let mut fired: BTreeMap<&'static str, usize> = BTreeMap::new();

        for instr in block {
            out.push(instr);
            self.apply_rules(&mut out, &mut fired);
        }

        if !fired.is_empty() {
            tracing::trace!(?fired, "peephole rewrites");
        }
        Block::from(out)
    }

    pub fn optimize(&self, module: Module) -> Module {
        let before = module.body.instruction_count();
        let name = module.name.clone();
        let body = self.optimize_block(module.body);
        tracing::debug!(
            module = %name,
            before,
            after = body.instruction_count(),
            "peephole optimization"
        );
        Module::new(name, body)
    }

    fn apply_rules(&self, out: &mut Vec<Instruction>, fired: &mut BTreeMap<&'static str, usize>) {
        let mut once_fired = vec![false; self.rules.len()];

        'scan: loop {
            for (index, rule) in self.rules.iter().enumerate() {
                if rule.once && once_fired[index] {
                    continue;
                }
                if (rule.matcher)(out).is_none() {
                    continue;
                }

                (rule.rewrite)(self, out);
                once_fired[index] = true;
                *fired.entry(rule.name).or_default() += 1;
                continue 'scan;
            }
            break;
        }
    }
}

/// Runs the default rule set over a module
pub fn optimize(module: Module) -> Module {
    Optimizer::new().optimize(module)
}

/// Runs the default rule set over a block
pub fn optimize_block(block: Block) -> Block {
    Optimizer::new().optimize_block(block)
}

// =========================================
// Patterns
// =========================================

fn pair(first: Opcode, second: Opcode) -> Matcher {
    sequence(vec![opcode(first), opcode(second)], false)
}

/// `[-` then one or more `>n +m` groups then a shift back, with no
/// destination landing on the source cell
fn copy_loop() -> Matcher {
    let body = sequence(
        vec![
            instruction(Opcode::Add, equals(-1)),
            repeated(pair(Opcode::Shift, Opcode::Add), 1, None),
            opcode(Opcode::Shift),
        ],
        true,
    );

    guarded(looping(Some(body), true), |tail| match &tail[0].op {
        Op::Loop(body) => copy_targets(body).iter().all(|t| t.offset != 0),
        _ => false,
    })
}

/// Reads the `(offset, multiplier)` pairs of a copy loop body
fn copy_targets(body: &Block) -> Vec<CopyTarget> {
    let mut targets = Vec::new();
    let mut offset = 0;
    let mut rest = body.as_slice().get(1..).unwrap_or_default();

    while rest.len() > 2 {
        match (&rest[0].op, &rest[1].op) {
            (Op::Shift(delta), Op::Add(multiplier)) => {
                offset += delta;
                targets.push(CopyTarget::new(offset, *multiplier));
                rest = &rest[2..];
            }
            _ => break,
        }
    }

    targets
}

// =========================================
// Rewrites
// =========================================

fn pop_pair(out: &mut Vec<Instruction>) -> Option<(Instruction, Instruction)> {
    let second = out.pop()?;
    let first = out.pop()?;
    Some((first, second))
}

fn merge_add(_: &Optimizer, out: &mut Vec<Instruction>) {
    if let Some((first, second)) = pop_pair(out) {
        let sum = first.argument().unwrap_or(0) + second.argument().unwrap_or(0);
        out.push(Instruction::add(sum));
    }
}

fn merge_set_add(_: &Optimizer, out: &mut Vec<Instruction>) {
    if let Some((first, second)) = pop_pair(out) {
        let value = first.argument().unwrap_or(0) + second.argument().unwrap_or(0);
        out.push(Instruction::set(value));
    }
}

fn merge_set(_: &Optimizer, out: &mut Vec<Instruction>) {
    let len = out.len();
    if len >= 2 {
        out.remove(len - 2);
    }
}

fn merge_shift(_: &Optimizer, out: &mut Vec<Instruction>) {
    if let Some((first, second)) = pop_pair(out) {
        let sum = first.argument().unwrap_or(0) + second.argument().unwrap_or(0);
        out.push(Instruction::shift(sum));
    }
}

fn zero_loop(_: &Optimizer, out: &mut Vec<Instruction>) {
    out.pop();
    out.push(Instruction::set(0));
}

fn optimize_loop_body(optimizer: &Optimizer, out: &mut Vec<Instruction>) {
    if let Some(Instruction {
        op: Op::Loop(body),
        pointer,
    }) = out.pop()
    {
        let body = optimizer.optimize_block(body);
        out.push(Instruction::looping(body).at(pointer));
    }
}

fn copy_loop_rewrite(_: &Optimizer, out: &mut Vec<Instruction>) {
    if let Some(Instruction {
        op: Op::Loop(body),
        pointer,
    }) = out.pop()
    {
        out.push(Instruction::copy(copy_targets(&body)).at(pointer));
    }
}
