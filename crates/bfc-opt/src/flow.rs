//! Flow analysis
//!
//! Folding walks a block with a virtual pointer and turns it into a sparse
//! graph: every node is stamped with the offset it acts on and depends on
//! the earlier writes it must follow. Pending `add`/`set` nodes stay out of
//! the root list until something forces them out, which lets the unfold pass
//! sink them past unrelated work and drop writes that are overwritten.
//!
//! Unfolding emits the graph back as a flat block, materializing pointer
//! moves as `shift` instructions only where they are needed.

use bfc_ir::{Block, CopyTarget, Instruction, Module, Op, Opcode, Options};
use std::collections::BTreeMap;

/// Index of a node inside its [`FoldedBlock`]
pub type NodeId = usize;

/// Operation of a folded node. Shifts are gone; offsets live on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldedOp {
    Add(i64),
    Set(i64),
    Write,
    Read,
    Loop(FoldedBlock),
    Copy(Vec<CopyTarget>),
    /// Net pointer displacement of the block
    Nop,
}

impl FoldedOp {
    pub fn opcode(&self) -> Opcode {
        match self {
            FoldedOp::Add(_) => Opcode::Add,
            FoldedOp::Set(_) => Opcode::Set,
            FoldedOp::Write => Opcode::Write,
            FoldedOp::Read => Opcode::Read,
            FoldedOp::Loop(_) => Opcode::Loop,
            FoldedOp::Copy(_) => Opcode::Copy,
            FoldedOp::Nop => Opcode::Nop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub op: FoldedOp,
    /// Offset from the block origin, or from the last barrier
    pub pointer: i64,
    /// Nodes that must be emitted before this one
    pub dependencies: Vec<NodeId>,
}

/// Arena of nodes produced by one fold pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldedBlock {
    pub nodes: Vec<Node>,
    /// Nodes in emission order; their dependencies come first
    pub roots: Vec<NodeId>,
}

impl FoldedBlock {
    fn alloc(&mut self, op: FoldedOp, pointer: i64, dependencies: Vec<NodeId>) -> NodeId {
        self.nodes.push(Node {
            op,
            pointer,
            dependencies,
        });
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Root nodes, in order
    pub fn root_nodes(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().map(|id| &self.nodes[*id])
    }
}

// =========================================
// Fold
// =========================================

/// Folds a block into a dependency graph
pub fn fold(block: &Block) -> FoldedBlock {
    let mut folded = FoldedBlock::default();
    let mut pointer = 0i64;
    // latest pending add/set per offset
    let mut pending: BTreeMap<i64, NodeId> = BTreeMap::new();

    for instr in block {
        let at = pointer + instr.pointer;

        match &instr.op {
            Op::Shift(delta) => pointer += delta,
            Op::Add(delta) => {
                let dependencies = pending.get(&at).copied().into_iter().collect();
                let id = folded.alloc(FoldedOp::Add(*delta), at, dependencies);
                pending.insert(at, id);
            }
            Op::Set(value) => {
                let id = folded.alloc(FoldedOp::Set(*value), at, Vec::new());
                pending.insert(at, id);
            }
            Op::Write => {
                let dependencies = pending.remove(&at).into_iter().collect();
                let id = folded.alloc(FoldedOp::Write, at, dependencies);
                folded.roots.push(id);
            }
            Op::Read => {
                // no edge, even with a pending write at this offset
                let id = folded.alloc(FoldedOp::Read, at, Vec::new());
                folded.roots.push(id);
            }
            Op::Loop(body) => {
                let dependencies = std::mem::take(&mut pending).into_values().collect();
                let id = folded.alloc(FoldedOp::Loop(fold(body)), at, dependencies);
                folded.roots.push(id);
                pointer = 0;
            }
            Op::Copy(targets) => {
                let dependencies = std::mem::take(&mut pending).into_values().collect();
                let id = folded.alloc(FoldedOp::Copy(targets.clone()), at, dependencies);
                folded.roots.push(id);
                pointer = 0;
            }
            Op::Nop => {}
        }
    }

    folded.roots.extend(pending.into_values());
    let nop = folded.alloc(FoldedOp::Nop, pointer, Vec::new());
    folded.roots.push(nop);

    folded
}

// =========================================
// Unfold
// =========================================

struct Unfolder<'a> {
    folded: &'a FoldedBlock,
    explicit_offsets: bool,
    emitted: Vec<bool>,
    /// Offset the pointer register currently holds
    cursor: i64,
    out: Vec<Instruction>,
}

impl<'a> Unfolder<'a> {
    fn new(folded: &'a FoldedBlock, explicit_offsets: bool) -> Self {
        Self {
            folded,
            explicit_offsets,
            emitted: vec![false; folded.nodes.len()],
            cursor: 0,
            out: Vec::with_capacity(folded.nodes.len()),
        }
    }

    fn run(mut self) -> Block {
        for &id in &self.folded.roots {
            self.visit(id);
        }
        Block::from(self.out)
    }

    fn visit(&mut self, id: NodeId) {
        if self.emitted[id] {
            return;
        }
        self.emitted[id] = true;

        let folded = self.folded;
        let node = &folded.nodes[id];
        for &dependency in &node.dependencies {
            self.visit(dependency);
        }

        let gap = node.pointer - self.cursor;
        if gap != 0 && (self.explicit_offsets || node.op.opcode().requires_explicit_shift()) {
            self.out.push(Instruction::shift(gap));
            self.cursor = node.pointer;
        }

        let relative = node.pointer - self.cursor;
        match &node.op {
            FoldedOp::Add(delta) => self.out.push(Instruction::add(*delta).at(relative)),
            FoldedOp::Set(value) => self.out.push(Instruction::set(*value).at(relative)),
            FoldedOp::Write => self.out.push(Instruction::write()),
            FoldedOp::Read => self.out.push(Instruction::read()),
            FoldedOp::Loop(body) => {
                let body = unfold(body, self.explicit_offsets);
                self.out.push(Instruction::looping(body));
                self.cursor = 0;
            }
            FoldedOp::Copy(targets) => {
                self.out.push(Instruction::copy(targets.clone()));
                self.cursor = 0;
            }
            FoldedOp::Nop => {}
        }
    }
}

/// Emits a folded block as a flat block.
///
/// With `explicit_offsets` every instruction runs at pointer offset zero
/// after a materialized `shift`. Without it `add`/`set` keep their offset
/// relative to the pointer register and only the opcodes that need the
/// pointer in place get a `shift`.
pub fn unfold(folded: &FoldedBlock, explicit_offsets: bool) -> Block {
    Unfolder::new(folded, explicit_offsets).run()
}

/// Fold then unfold a block under the given options
pub fn analyze_block(block: &Block, options: &Options) -> Block {
    unfold(&fold(block), options.explicit_offsets())
}

/// Fold then unfold a whole module
pub fn analyze_flow(module: Module, options: &Options) -> Module {
    let folded = fold(&module.body);
    let body = unfold(&folded, options.explicit_offsets());

    tracing::debug!(
        module = %module.name,
        nodes = folded.nodes.len(),
        roots = folded.roots.len(),
        explicit_offsets = options.explicit_offsets(),
        instructions = body.instruction_count(),
        "flow analysis"
    );

    module.with_body(body)
}
