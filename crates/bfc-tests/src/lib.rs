//! Integration tests for the bfc tape compiler
//!
//! This crate provides end-to-end testing of the complete compilation pipeline:
//! Source → Lexer → Parser → Peephole → Flow analysis → Codegen
//!
//! Semantic checks go through [`tape`], a reference evaluator over the IR,
//! so every stage can be compared against the raw parse.

pub mod tape;

use bfc_codegen::{CodeGen, X86_64Linux};
use bfc_error::{Diagnostics, ErrorCode};
use bfc_ir::{CellSize, MemoryOverflow, Module, Options};
use tape::Outcome;

/// Result of compiling a source text
#[derive(Debug)]
pub struct CompileResult {
    /// Whether compilation succeeded without errors
    pub success: bool,
    /// Any diagnostics produced
    pub diagnostics: Diagnostics,
    /// IR straight from the parser
    pub parsed: Option<Module>,
    /// IR after peephole optimization
    pub optimized: Option<Module>,
    /// IR after flow analysis
    pub flow: Option<Module>,
    /// Generated assembly
    pub asm: Option<String>,
}

/// Compiles source text with default options
pub fn compile(source: &str) -> CompileResult {
    compile_with(source, &Options::new("test"))
}

/// Compiles source text through the full pipeline
pub fn compile_with(source: &str, options: &Options) -> CompileResult {
    let (body, diagnostics) = bfc_parser::parse_source(source, 0);
    if diagnostics.has_errors() {
        return CompileResult {
            success: false,
            diagnostics,
            parsed: None,
            optimized: None,
            flow: None,
            asm: None,
        };
    }

    let parsed = Module::new(options.module_name.clone(), body);
    let optimized = bfc_opt::optimize(parsed.clone());
    let flow = bfc_opt::analyze_flow(optimized.clone(), options);
    let asm = X86_64Linux::new(options.clone()).generate(&flow);

    CompileResult {
        success: true,
        diagnostics,
        parsed: Some(parsed),
        optimized: Some(optimized),
        flow: Some(flow),
        asm: Some(asm),
    }
}

fn compiled(source: &str, options: &Options) -> CompileResult {
    let result = compile_with(source, options);
    if !result.success {
        panic!(
            "Expected source to compile, but got errors:\n{:?}",
            result.diagnostics
        );
    }
    result
}

/// Asserts that source code compiles without errors
pub fn assert_compiles(source: &str) {
    compiled(source, &Options::new("test"));
}

/// Asserts that compilation fails with exactly these error codes
pub fn assert_compile_fails(source: &str, expected: &[ErrorCode]) {
    let result = compile(source);
    if result.success {
        panic!("Expected source to fail compilation, but it succeeded");
    }
    let codes: Vec<ErrorCode> = result.diagnostics.iter().filter_map(|d| d.code).collect();
    assert_eq!(codes, expected, "unexpected error codes for {:?}", source);
}

/// Asserts that the generated assembly contains a specific line
pub fn assert_asm_contains(source: &str, options: &Options, expected: &str) {
    let asm = compiled(source, options).asm.unwrap_or_default();
    if !asm.lines().any(|line| line.trim() == expected) {
        panic!(
            "Expected assembly to contain '{}', but it didn't.\n\nGenerated assembly:\n{}",
            expected, asm
        );
    }
}

/// Asserts that the final IR dump contains a specific string
pub fn assert_ir_contains(source: &str, options: &Options, expected: &str) {
    let ir = compiled(source, options)
        .flow
        .map(|module| module.to_string())
        .unwrap_or_default();
    if !ir.contains(expected) {
        panic!(
            "Expected IR to contain '{}', but it didn't.\n\nGenerated IR:\n{}",
            expected, ir
        );
    }
}

/// Runs every stage of the pipeline under every overflow policy on the
/// reference evaluator and checks they all behave like the raw parse.
/// Returns the raw outcome.
pub fn assert_stages_agree(source: &str, cell_size: CellSize, input: &[u8]) -> Outcome {
    let baseline_options = Options::new("test").with_cell_size(cell_size);
    let baseline = compiled(source, &baseline_options);
    let parsed = baseline.parsed.unwrap_or_else(|| Module::new("test", Default::default()));
    let expected = tape::run(&parsed.body, cell_size, input);

    for overflow in [MemoryOverflow::Undefined, MemoryOverflow::Wrap, MemoryOverflow::Abort] {
        let options = baseline_options.clone().with_overflow(overflow);
        let result = compiled(source, &options);

        for (stage, module) in [("optimized", result.optimized), ("flow", result.flow)] {
            let Some(module) = module else {
                panic!("missing {} IR", stage);
            };
            let actual = tape::run(&module.body, cell_size, input);
            assert_eq!(
                actual, expected,
                "{} IR under {} overflow diverges for {:?}:\n{}",
                stage, overflow, source, module
            );
        }
    }

    expected
}

/// Asserts that the program prints `expected` for `input`, at every stage
pub fn assert_output(source: &str, input: &[u8], expected: &str) {
    let outcome = assert_stages_agree(source, CellSize::Byte, input);
    assert_eq!(outcome.output_text(), expected);
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use bfc_ir::{Block, Instruction, OutputKind};
    use pretty_assertions::assert_eq;

    const HELLO_WORLD: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

    // =========================================
    // Front end
    // =========================================

    #[test]
    fn test_empty_program() {
        let result = compile("");
        assert!(result.success);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_comments_only() {
        assert_compiles("this program does nothing at all");
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_compile_fails("[", &[ErrorCode::UNCLOSED_OPEN]);
        assert_compile_fails("]", &[ErrorCode::UNMATCHED_CLOSE]);
        assert_compile_fails(
            "[]][",
            &[ErrorCode::UNMATCHED_CLOSE, ErrorCode::UNCLOSED_OPEN],
        );
    }

    #[test]
    fn test_failed_compile_has_no_output() {
        let result = compile("+[");
        assert!(result.asm.is_none());
        assert!(result.flow.is_none());
    }

    // =========================================
    // Behavior across stages
    // =========================================

    #[test]
    fn test_move_loop() {
        let outcome = assert_stages_agree("++[>+<-]", CellSize::Byte, b"");
        assert_eq!(outcome.cell(0), 0);
        assert_eq!(outcome.cell(1), 2);
    }

    #[test]
    fn test_hello_world() {
        assert_output(HELLO_WORLD, b"", "Hello World!\n");
    }

    #[test]
    fn test_echo_until_eof() {
        assert_output(",[.,]", b"tape", "tape");
    }

    #[test]
    fn test_wide_cells() {
        // 256 does not fit a byte cell
        let source = "++++++++++++++++[>++++++++++++++++<-]>";
        let byte = assert_stages_agree(source, CellSize::Byte, b"");
        let word = assert_stages_agree(source, CellSize::Word, b"");
        let dword = assert_stages_agree(source, CellSize::DWord, b"");

        assert_eq!(byte.cell(1), 0);
        assert_eq!(word.cell(1), 256);
        assert_eq!(dword.cell(1), 256);
    }

    #[test]
    fn test_pointer_drifting_loops() {
        // scan right to the first empty cell, then come back
        assert_stages_agree("+>+>+>+[<]>[.>]", CellSize::Byte, b"");
        assert_stages_agree(">>,[>,]<[<]>[.>]", CellSize::Byte, b"abc");
    }

    #[test]
    fn test_copy_loops_agree() {
        assert_output("+++++[->++>>+++<<<]>.>>.", b"", "\u{a}\u{f}");
        assert_stages_agree("++++[->+>+<<]>[-<+>]", CellSize::Byte, b"");
    }

    #[test]
    fn test_straight_line_fold_unfold_equivalence() {
        // no loops, copies, or reads after pending writes
        let sources = [
            "+++>++<-.>.<<+.",
            ">>+++<<-->+.>>.",
            ",>+<.>.",
            "[-]+++>[-]++<.>.",
            "+>+>+<<<+>.>.>.<<<.",
        ];

        for source in sources {
            let result = compile(source);
            let optimized = result
                .optimized
                .unwrap_or_else(|| Module::new("test", Block::new()));
            let folded = bfc_opt::fold(&optimized.body);

            for explicit in [false, true] {
                let unfolded = bfc_opt::unfold(&folded, explicit);
                assert_eq!(
                    tape::run(&unfolded, CellSize::Byte, b"x"),
                    tape::run(&optimized.body, CellSize::Byte, b"x"),
                    "source {:?}, explicit offsets {}",
                    source,
                    explicit
                );
            }
        }
    }

    // =========================================
    // Optimizer properties
    // =========================================

    #[test]
    fn test_reoptimizing_keeps_size() {
        for source in [HELLO_WORLD, ",[.,]", "[-][-]>+++[-<++>]", "+[->+>+<<]>>[-<<+>>]"] {
            let once = compile(source)
                .optimized
                .unwrap_or_else(|| Module::new("test", Block::new()));
            let twice = bfc_opt::optimize(once.clone());
            assert_eq!(
                twice.body.instruction_count(),
                once.body.instruction_count(),
                "source {:?}",
                source
            );
        }
    }

    #[test]
    fn test_optimizer_rewrites() {
        let optimized = |source: &str| {
            compile(source)
                .optimized
                .map(|module| module.body.instructions)
                .unwrap_or_default()
        };

        assert_eq!(optimized("+++"), vec![Instruction::add(3)]);
        assert_eq!(optimized("[-]+++[-]"), vec![Instruction::set(0)]);
        assert_eq!(optimized("[+]"), vec![Instruction::set(0)]);
        assert_eq!(
            optimized("[->>+++<<]"),
            vec![Instruction::copy(vec![bfc_ir::CopyTarget::new(2, 3)])]
        );
    }

    #[test]
    fn test_memory_space_property() {
        let space = |source: &str| {
            let (block, _) = bfc_parser::parse_source(source, 0);
            block.memory_space().map(|m| (m.min, m.max))
        };

        assert_eq!(space(">><<<>"), Some((-1, 2)));
        assert_eq!(space(">"), None);
        assert_eq!(space("[>]"), None);
        assert_eq!(space(">[<<->>]<"), Some((-1, 1)));
    }

    // =========================================
    // Code generation
    // =========================================

    /// `(mnemonic, source operand)` of every instruction that touches a cell
    fn cell_arithmetic(asm: &str) -> Vec<(String, String)> {
        asm.lines()
            .skip_while(|line| *line != "_bf_entry:")
            .map(str::trim)
            .filter(|line| line.contains("byte ["))
            .filter_map(|line| {
                let (mnemonic, operands) = line.split_once(' ')?;
                if !matches!(mnemonic, "add" | "sub" | "mov" | "cmp") {
                    return None;
                }
                let (_, source) = operands.rsplit_once(", ")?;
                Some((mnemonic.to_string(), source.to_string()))
            })
            .collect()
    }

    #[test]
    fn test_overflow_policy_keeps_arithmetic_order() {
        let sources = [HELLO_WORLD, "+>++>+++<<[->>+<<]>>.", ">+++<[->+<]+++>>--."];

        for source in sources {
            let policies = [MemoryOverflow::Undefined, MemoryOverflow::Wrap, MemoryOverflow::Abort];
            let by_policy: Vec<_> = policies
                .into_iter()
                .map(|overflow| {
                    let options = Options::new("test").with_overflow(overflow);
                    cell_arithmetic(&compile_with(source, &options).asm.unwrap_or_default())
                })
                .collect();

            assert!(!by_policy[0].is_empty());
            assert_eq!(by_policy[0], by_policy[1], "source {:?}", source);
            assert_eq!(by_policy[1], by_policy[2], "source {:?}", source);
        }
    }

    #[test]
    fn test_overflow_policy_pointer_maintenance() {
        let undefined = Options::new("test").with_overflow(MemoryOverflow::Undefined);
        let wrap = Options::new("test").with_overflow(MemoryOverflow::Wrap);
        let abort = Options::new("test").with_overflow(MemoryOverflow::Abort);

        assert_asm_contains(">+.", &undefined, "add byte [rbx + 1], 1");
        assert_asm_contains(">+.", &wrap, "call _bf_normalize_pointer");
        assert_asm_contains(">+.", &abort, "call _bf_check_pointer");
        assert_asm_contains(">+.", &abort, "%define BF_ABORT_ON_OVERFLOW 1");
    }

    #[test]
    fn test_implicit_offsets_in_ir() {
        let undefined = Options::new("test").with_overflow(MemoryOverflow::Undefined);
        assert_ir_contains(">>+<<", &undefined, "add 1 @+2");
    }

    #[test]
    fn test_word_cells() {
        let options = Options::new("test").with_cell_size(CellSize::Word);
        assert_asm_contains("+", &options, "add word [rbx + r12], 1");
        assert_asm_contains("+", &options, "%define BF_CELL_SIZE 2");
    }

    #[test]
    fn test_library_output() {
        let options = Options::new("hello").with_output(OutputKind::Library);
        assert_asm_contains(".", &options, "%define MODULE_ENTRY _bf_hello");
        assert_asm_contains(".", &options, "global MODULE_ENTRY");
    }

    #[test]
    fn test_labels_are_monotonic() {
        let asm = compile("+[>[-]+[->+<]<-]+[>.<-]").asm.unwrap_or_default();
        let ids: Vec<usize> = asm
            .lines()
            .filter_map(|line| line.strip_prefix("_bf_"))
            .filter_map(|rest| rest.strip_suffix("_end:"))
            .filter_map(|rest| {
                rest.trim_start_matches(|c: char| c.is_ascii_alphabetic())
                    .parse()
                    .ok()
            })
            .collect();

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "label ids reused: {:?}", ids);
    }
}
