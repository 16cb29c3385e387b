//! x86-64 Linux backend
//!
//! The tape base lives in `rbx`. With an unchecked tape `rbx` itself moves
//! and cells are addressed as `[rbx + offset]`; otherwise `rbx` stays fixed
//! and `r12` holds the byte offset of the current cell, passed through
//! `_bf_normalize_pointer` or `_bf_check_pointer` after every move.

pub mod assembler;

use crate::{CodeGen, Toolchain};
use assembler::{Assembler, Jump, Memory, PointerSize, X86FullRegister};
use bfc_ir::{Block, CopyTarget, Instruction, MemoryOverflow, Module, Op, Options, OutputKind};
use itertools::Itertools;
use std::path::Path;
use std::process::Command;

const RUNTIME_CORE: &str = include_str!("runtime/core.asm");
const RUNTIME_EXEC: &str = include_str!("runtime/exec.asm");
const RUNTIME_LIB: &str = include_str!("runtime/lib.asm");

/// NASM generator for x86-64 Linux
#[derive(Debug, Clone, Default)]
pub struct X86_64Linux {
    options: Options,
}

impl X86_64Linux {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn header(&self) -> String {
        let options = &self.options;
        format!(
            indoc::indoc! {"
                ; module: {0}
                ; cell: {1}, overflow: {2}, output: {3}

                %define BF_CELL_SIZE {4}
                %define BF_TAPE_CELLS {5}
                %define BF_ABORT_ON_OVERFLOW {6}
                %define BF_WRAP_ON_OVERFLOW {7}
            "},
            options.module_name,
            options.cell_size,
            options.overflow,
            options.output,
            options.cell_size.bytes(),
            options.tape_cells,
            u8::from(options.overflow == MemoryOverflow::Abort),
            u8::from(options.overflow == MemoryOverflow::Wrap),
        )
    }
}

impl CodeGen for X86_64Linux {
    type Output = String;

    fn generate(&self, module: &Module) -> String {
        let mut emitter = Emitter::new(&self.options);

        emitter.asm.raw(&self.header());
        if self.options.output == OutputKind::Library {
            let entry = format!("_bf_{}", self.options.module_name);
            emitter.asm.define("MODULE_ENTRY", entry);
        }
        emitter.asm.blank();
        emitter.asm.raw(RUNTIME_CORE);
        emitter.asm.blank();
        emitter.asm.raw(match self.options.output {
            OutputKind::Executable => RUNTIME_EXEC,
            OutputKind::Library => RUNTIME_LIB,
        });
        emitter.asm.blank();

        emitter.asm.label("_bf_entry");
        emitter.asm.emit("xor r12, r12");
        emitter.block(&module.body);
        emitter.asm.emit("mov rax, 0");
        emitter.asm.emit("ret");

        tracing::debug!(
            module = %module.name,
            labels = emitter.next_label,
            "generated x86-64 assembly"
        );

        emitter.asm.into_output()
    }
}

impl Toolchain for X86_64Linux {
    fn assembler_command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new("nasm");
        cmd.args(["-f", "elf64", "-o"]).arg(output).arg(input);
        cmd
    }

    fn linker_command(&self, input: &Path, output: &Path) -> Option<Command> {
        match self.options.output {
            OutputKind::Executable => {
                let mut cmd = Command::new("ld");
                cmd.arg("-o").arg(output).arg(input);
                Some(cmd)
            }
            OutputKind::Library => None,
        }
    }
}

// =========================================
// Instruction lowering
// =========================================

struct Emitter<'a> {
    asm: Assembler,
    options: &'a Options,
    /// Shared by loops and copies, never reset within one compilation
    next_label: usize,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a Options) -> Self {
        Self {
            asm: Assembler::new(),
            options,
            next_label: 0,
        }
    }

    fn fresh_label(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn direct(&self) -> bool {
        self.options.overflow == MemoryOverflow::Undefined
    }

    fn cell_bytes(&self) -> usize {
        self.options.cell_size.bytes()
    }

    fn cell(&self, offset: i64) -> Memory {
        Memory {
            size: PointerSize::from_bytes(self.cell_bytes()),
            base: X86FullRegister::Rbx,
            index: (!self.direct()).then_some(X86FullRegister::R12),
            displacement: offset * self.cell_bytes() as i64,
        }
    }

    /// Reduces a value to the cell width
    fn truncate(&self, value: i64) -> u64 {
        let bits = self.options.cell_size.bits();
        (value as u64) & ((1u64 << bits) - 1)
    }

    fn block(&mut self, block: &Block) {
        for instr in block {
            self.instruction(instr);
        }
    }

    fn instruction(&mut self, instr: &Instruction) {
        let offset = instr.pointer;

        match &instr.op {
            Op::Add(delta) => self.add(offset, *delta),
            Op::Set(value) => {
                let value = self.truncate(*value);
                let cell = self.cell(offset);
                self.asm.emit(format!("mov {cell}, {value}"));
            }
            Op::Shift(delta) => self.shift(*delta),
            Op::Write => self.io(offset, "_bf_write"),
            Op::Read => self.io(offset, "_bf_read"),
            Op::Loop(body) => self.looping(offset, body),
            Op::Copy(targets) => self.copy(offset, targets),
            Op::Nop => {}
        }
    }

    fn add(&mut self, offset: i64, delta: i64) {
        let value = self.truncate(delta);
        if value == 0 {
            return;
        }

        let modulus = 1u64 << self.options.cell_size.bits();
        let cell = self.cell(offset);
        if value <= modulus / 2 {
            self.asm.emit(format!("add {cell}, {value}"));
        } else {
            self.asm.emit(format!("sub {cell}, {}", modulus - value));
        }
    }

    fn shift(&mut self, delta: i64) {
        if delta == 0 {
            return;
        }

        let bytes = delta * self.cell_bytes() as i64;
        let mnemonic = if bytes > 0 { "add" } else { "sub" };
        let register = if self.direct() {
            X86FullRegister::Rbx
        } else {
            X86FullRegister::R12
        };
        self.asm
            .emit(format!("{mnemonic} {register}, {}", bytes.unsigned_abs()));

        match self.options.overflow {
            MemoryOverflow::Undefined => {}
            MemoryOverflow::Wrap => self.asm.call("_bf_normalize_pointer"),
            MemoryOverflow::Abort => self.asm.call("_bf_check_pointer"),
        }
    }

    fn io(&mut self, offset: i64, routine: &str) {
        self.shift(offset);
        self.asm.call(routine);
        self.shift(-offset);
    }

    fn looping(&mut self, offset: i64, body: &Block) {
        let id = self.fresh_label();
        let start = format!("_bf_loop{id}_start");
        let end = format!("_bf_loop{id}_end");
        let cell = self.cell(offset);

        self.asm.emit(format!("cmp {cell}, 0"));
        self.asm.jump(Jump::Jz, &end);
        self.asm.label(&start);
        self.block(body);
        self.asm.emit(format!("cmp {cell}, 0"));
        self.asm.jump(Jump::Jnz, &start);
        self.asm.label(&end);
    }

    fn copy(&mut self, offset: i64, targets: &[CopyTarget]) {
        let id = self.fresh_label();
        let end = format!("_bf_copy{id}_end");
        let bytes = self.cell_bytes();
        let source = self.cell(offset);

        self.asm.comment(format!(
            "copy {}",
            targets
                .iter()
                .map(|t| format!("{:+}*{}", t.offset, t.multiplier))
                .join(" ")
        ));

        let value = X86FullRegister::Rax.as_32_bit();
        if bytes == 4 {
            self.asm.emit(format!("mov {value}, {source}"));
        } else {
            self.asm.emit(format!("movzx {value}, {source}"));
        }
        self.asm.emit(format!("test {value}, {value}"));
        self.asm.jump(Jump::Jz, &end);
        self.asm.emit(format!("mov {source}, 0"));

        // where the pointer register sits, relative to the source cell
        let mut position = 0i64;
        for target in targets {
            let multiplier = self.truncate(target.multiplier);
            if multiplier == 0 {
                continue;
            }

            let register = if multiplier == 1 {
                X86FullRegister::Rax
            } else {
                self.asm.emit(format!("imul ecx, eax, {}", target.multiplier as i32));
                X86FullRegister::Rcx
            };
            let register = register.with_size_bytes(bytes);

            if self.direct() {
                let destination = self.cell(offset + target.offset);
                self.asm.emit(format!("add {destination}, {register}"));
            } else {
                self.shift(target.offset - position);
                position = target.offset;
                let destination = self.cell(offset);
                self.asm.emit(format!("add {destination}, {register}"));
            }
        }
        self.shift(-position);

        self.asm.label(&end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfc_ir::CellSize;
    use pretty_assertions::assert_eq;

    fn lines(asm: &str) -> Vec<&str> {
        asm.lines().map(str::trim).collect()
    }

    /// Lines emitted after the `_bf_entry` label
    fn entry_body(asm: &str) -> Vec<String> {
        asm.lines()
            .skip_while(|line| *line != "_bf_entry:")
            .skip(1)
            .map(|line| line.trim().to_string())
            .collect()
    }

    fn generate(options: Options, instructions: Vec<Instruction>) -> String {
        let module = Module::new(options.module_name.clone(), Block::from(instructions));
        X86_64Linux::new(options).generate(&module)
    }

    fn undefined() -> Options {
        Options::new("prog").with_overflow(MemoryOverflow::Undefined)
    }

    #[test]
    fn test_header_constants() {
        let asm = generate(Options::new("prog").with_cell_size(CellSize::Word), vec![]);
        let lines = lines(&asm);

        assert!(lines.contains(&"%define BF_CELL_SIZE 2"));
        assert!(lines.contains(&"%define BF_TAPE_CELLS 30000"));
        assert!(lines.contains(&"%define BF_ABORT_ON_OVERFLOW 0"));
        assert!(lines.contains(&"%define BF_WRAP_ON_OVERFLOW 1"));
        assert!(lines.contains(&"global _start"));
        assert!(!asm.contains("MODULE_ENTRY"));
    }

    #[test]
    fn test_entry_and_epilogue() {
        let body = entry_body(&generate(undefined(), vec![]));
        assert_eq!(body, vec!["xor r12, r12", "mov rax, 0", "ret"]);
    }

    #[test]
    fn test_library_entry() {
        let options = Options::new("hello").with_output(OutputKind::Library);
        let asm = generate(options, vec![]);

        assert!(asm.contains("%define MODULE_ENTRY _bf_hello\n"));
        assert!(asm.contains("global MODULE_ENTRY"));
        assert!(!asm.contains("global _start"));
    }

    #[test]
    fn test_arithmetic_is_truncated() {
        let body = entry_body(&generate(
            undefined(),
            vec![
                Instruction::add(-1),
                Instruction::add(300).at(2),
                Instruction::add(256),
                Instruction::set(-1).at(-1),
            ],
        ));

        assert_eq!(
            &body[1..4],
            &["sub byte [rbx], 1", "add byte [rbx + 2], 44", "mov byte [rbx - 1], 255"]
        );
    }

    #[test]
    fn test_cell_width_scales_offsets() {
        let options = undefined().with_cell_size(CellSize::DWord);
        let body = entry_body(&generate(
            options,
            vec![Instruction::add(5).at(3), Instruction::shift(-2)],
        ));

        assert_eq!(&body[1..3], &["add dword [rbx + 12], 5", "sub rbx, 8"]);
    }

    #[test]
    fn test_shift_per_policy() {
        let wrap = entry_body(&generate(Options::new("p"), vec![Instruction::shift(3)]));
        assert_eq!(&wrap[1..3], &["add r12, 3", "call _bf_normalize_pointer"]);

        let abort = Options::new("p").with_overflow(MemoryOverflow::Abort);
        let abort = entry_body(&generate(abort, vec![Instruction::shift(-1)]));
        assert_eq!(&abort[1..3], &["sub r12, 1", "call _bf_check_pointer"]);
    }

    #[test]
    fn test_io_shifts_around_call() {
        let body = entry_body(&generate(undefined(), vec![Instruction::write().at(2)]));
        assert_eq!(&body[1..4], &["add rbx, 2", "call _bf_write", "sub rbx, 2"]);
    }

    #[test]
    fn test_loop_labels_are_unique() {
        let inner = Block::from(vec![Instruction::add(-1)]);
        let outer = Block::from(vec![Instruction::looping(inner.clone())]);
        let asm = generate(
            undefined(),
            vec![Instruction::looping(outer), Instruction::looping(inner)],
        );

        for id in 0..3 {
            assert_eq!(asm.matches(&format!("_bf_loop{id}_start:")).count(), 1);
            assert_eq!(asm.matches(&format!("_bf_loop{id}_end:")).count(), 1);
        }
        assert!(!asm.contains("_bf_loop3_"));
    }

    #[test]
    fn test_copy_direct() {
        let body = entry_body(&generate(
            undefined(),
            vec![Instruction::copy(vec![
                CopyTarget::new(1, 1),
                CopyTarget::new(-2, 3),
            ])],
        ));

        assert_eq!(
            &body[1..10],
            &[
                "; copy +1*1 -2*3",
                "movzx eax, byte [rbx]",
                "test eax, eax",
                "jz _bf_copy0_end",
                "mov byte [rbx], 0",
                "add byte [rbx + 1], al",
                "imul ecx, eax, 3",
                "add byte [rbx - 2], cl",
                "_bf_copy0_end:",
            ]
        );
    }

    #[test]
    fn test_copy_with_checked_pointer() {
        let options = Options::new("p").with_overflow(MemoryOverflow::Abort);
        let body = entry_body(&generate(
            options,
            vec![Instruction::copy(vec![
                CopyTarget::new(1, 1),
                CopyTarget::new(3, 2),
            ])],
        ));

        assert_eq!(
            &body[1..],
            &[
                "; copy +1*1 +3*2",
                "movzx eax, byte [rbx + r12]",
                "test eax, eax",
                "jz _bf_copy0_end",
                "mov byte [rbx + r12], 0",
                "add r12, 1",
                "call _bf_check_pointer",
                "add byte [rbx + r12], al",
                "imul ecx, eax, 2",
                "add r12, 2",
                "call _bf_check_pointer",
                "add byte [rbx + r12], cl",
                "sub r12, 3",
                "call _bf_check_pointer",
                "_bf_copy0_end:",
                "mov rax, 0",
                "ret",
            ]
        );
    }

    #[test]
    fn test_toolchain_commands() {
        let exec = X86_64Linux::new(Options::new("p"));
        let nasm = exec.assembler_command(Path::new("p.asm"), Path::new("p.o"));
        assert_eq!(nasm.get_program(), "nasm");
        let args: Vec<_> = nasm.get_args().collect();
        assert_eq!(args, ["-f", "elf64", "-o", "p.o", "p.asm"]);

        assert!(exec.linker_command(Path::new("p.o"), Path::new("p")).is_some());

        let lib = X86_64Linux::new(Options::new("p").with_output(OutputKind::Library));
        assert!(lib.linker_command(Path::new("p.o"), Path::new("p")).is_none());
    }
}
