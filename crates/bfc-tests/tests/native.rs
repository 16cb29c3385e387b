//! Assembles, links and runs generated programs.
//!
//! These need `nasm` and `ld` on PATH: `cargo test -- --ignored`

use bfc_codegen::{Toolchain, X86_64Linux};
use bfc_ir::{CellSize, MemoryOverflow, Options};
use bfc_tests::compile_with;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const HELLO_WORLD: &str = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

fn run_tool(mut cmd: Command) {
    let status = cmd.status().expect("tool should start");
    assert!(status.success(), "{:?} failed", cmd);
}

/// Builds `source` into `dir` and runs it with `input` on stdin
fn build_and_run(dir: &Path, source: &str, options: Options, input: &[u8]) -> Output {
    let result = compile_with(source, &options);
    let asm = result.asm.expect("source should compile");

    let asm_path = dir.join("prog.asm");
    let object = dir.join("prog.o");
    let exe = dir.join("prog");
    std::fs::write(&asm_path, asm).expect("write assembly");

    let backend = X86_64Linux::new(options);
    run_tool(backend.assembler_command(&asm_path, &object));
    run_tool(backend.linker_command(&object, &exe).expect("executable output"));

    let mut child = Command::new(&exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("run program");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input)
        .expect("write stdin");
    child.wait_with_output().expect("program output")
}

#[test]
#[ignore = "requires nasm and ld on PATH"]
fn test_hello_world_every_policy() {
    for overflow in [MemoryOverflow::Undefined, MemoryOverflow::Wrap, MemoryOverflow::Abort] {
        let dir = tempfile::tempdir().expect("temp dir");
        let options = Options::new("prog").with_overflow(overflow);
        let output = build_and_run(dir.path(), HELLO_WORLD, options, b"");

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello World!\n");
    }
}

#[test]
#[ignore = "requires nasm and ld on PATH"]
fn test_move_loop_every_policy() {
    // cell0 then cell1, printed as raw bytes
    for overflow in [MemoryOverflow::Undefined, MemoryOverflow::Wrap, MemoryOverflow::Abort] {
        for cell_size in [CellSize::Byte, CellSize::Word] {
            let dir = tempfile::tempdir().expect("temp dir");
            let options = Options::new("prog")
                .with_overflow(overflow)
                .with_cell_size(cell_size);
            let output = build_and_run(dir.path(), "++[>+<-].>.", options, b"");

            assert!(output.status.success());
            assert_eq!(output.stdout, b"\x00\x02", "{overflow} / {cell_size}");
        }
    }
}

#[test]
#[ignore = "requires nasm and ld on PATH"]
fn test_echo_with_word_cells() {
    let dir = tempfile::tempdir().expect("temp dir");
    let options = Options::new("prog").with_cell_size(CellSize::Word);
    let output = build_and_run(dir.path(), ",[.,]", options, b"bytes in, bytes out");

    assert_eq!(output.stdout, b"bytes in, bytes out");
}

#[test]
#[ignore = "requires nasm and ld on PATH"]
fn test_wrap_moves_around_the_tape() {
    // step left off the start, land on the last cell
    let dir = tempfile::tempdir().expect("temp dir");
    let options = Options::new("prog").with_tape_cells(16);
    let output = build_and_run(dir.path(), "<++++++++[>++++++++<-]>+.", options, b"");

    assert_eq!(output.stdout, b"A");
}

#[test]
#[ignore = "requires nasm and ld on PATH"]
fn test_abort_on_overflow() {
    let dir = tempfile::tempdir().expect("temp dir");
    let options = Options::new("prog").with_overflow(MemoryOverflow::Abort);
    let output = build_and_run(dir.path(), "+.<.", options, b"");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(output.stdout, b"\x01");
    assert!(String::from_utf8_lossy(&output.stderr).contains("tape pointer out of bounds"));
}
