//! bfc-opt - Optimization passes over the bfc IR
//!
//! Two passes run in order:
//!
//! 1. [`peephole`] rewrites instruction tails using the combinators in
//!    [`matcher`]: merged runs, zeroing loops, copy loops.
//! 2. [`flow`] folds the block into a write-ordering graph and unfolds it
//!    again with pointer moves placed as the overflow policy requires.
//!
//! # Example
//!
//! ```rust
//! use bfc_ir::{Module, Options};
//! use bfc_opt::{analyze_flow, optimize};
//!
//! let (body, _) = bfc_parser::parse_source("++[>+<-]", 0);
//! let module = optimize(Module::new("demo", body));
//! let module = analyze_flow(module, &Options::new("demo"));
//!
//! println!("{}", module);
//! ```

pub mod flow;
pub mod matcher;
pub mod peephole;

pub use flow::{analyze_block, analyze_flow, fold, unfold, FoldedBlock, FoldedOp, Node, NodeId};
pub use peephole::{optimize, optimize_block, Optimizer, Rule};
