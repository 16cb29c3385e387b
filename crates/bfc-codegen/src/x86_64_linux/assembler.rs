//! NASM text builder

use std::fmt;

/// Accumulates assembly lines. Instructions are indented, labels are not.
#[derive(Debug, Default)]
pub struct Assembler {
    output: String,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn push_line(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    /// Copies a block of text verbatim, making sure it ends a line
    pub fn raw(&mut self, text: &str) {
        self.output.push_str(text);
        if !text.ends_with('\n') {
            self.output.push('\n');
        }
    }

    pub fn emit(&mut self, string: impl AsRef<str>) {
        self.output.push_str("    ");
        self.push_line(string);
    }

    pub fn label(&mut self, name: impl AsRef<str>) {
        self.push_line(format!("{}:", name.as_ref()));
    }

    pub fn comment(&mut self, comment: impl AsRef<str>) {
        self.emit(format!("; {}", comment.as_ref()));
    }

    pub fn define(&mut self, name: &str, value: impl fmt::Display) {
        self.push_line(format!("%define {name} {value}"));
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn call(&mut self, routine: &str) {
        self.emit(format!("call {routine}"));
    }

    pub fn jump(&mut self, jump: Jump, label: &str) {
        self.emit(format!("{jump} {label}"));
    }
}

/// General purpose register, 64-bit name
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum X86FullRegister {
    Rax,
    Rbx,
    Rcx,
    R12,
}

impl X86FullRegister {
    /// The sub-register holding `size` bytes
    pub fn with_size_bytes(self, size: usize) -> X86Register {
        match size {
            1 => self.as_8_bit(),
            2 => self.as_16_bit(),
            4 => self.as_32_bit(),
            _ => self.as_64_bit(),
        }
    }

    pub fn as_64_bit(self) -> X86Register {
        match self {
            Self::Rax => X86Register::Rax,
            Self::Rbx => X86Register::Rbx,
            Self::Rcx => X86Register::Rcx,
            Self::R12 => X86Register::R12,
        }
    }

    pub fn as_32_bit(self) -> X86Register {
        match self {
            Self::Rax => X86Register::Eax,
            Self::Rbx => X86Register::Ebx,
            Self::Rcx => X86Register::Ecx,
            Self::R12 => X86Register::R12d,
        }
    }

    pub fn as_16_bit(self) -> X86Register {
        match self {
            Self::Rax => X86Register::Ax,
            Self::Rbx => X86Register::Bx,
            Self::Rcx => X86Register::Cx,
            Self::R12 => X86Register::R12w,
        }
    }

    pub fn as_8_bit(self) -> X86Register {
        match self {
            Self::Rax => X86Register::Al,
            Self::Rbx => X86Register::Bl,
            Self::Rcx => X86Register::Cl,
            Self::R12 => X86Register::R12b,
        }
    }
}

/// A register at a specific width
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum X86Register {
    Rax,
    Eax,
    Ax,
    Al,
    Rbx,
    Ebx,
    Bx,
    Bl,
    Rcx,
    Ecx,
    Cx,
    Cl,
    R12,
    R12d,
    R12w,
    R12b,
}

/// Operand size keyword for memory operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PointerSize {
    Byte,
    Word,
    Dword,
}

impl PointerSize {
    pub fn from_bytes(size: usize) -> Self {
        match size {
            1 => Self::Byte,
            2 => Self::Word,
            _ => Self::Dword,
        }
    }
}

/// Conditional jumps used by loops and copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Jump {
    Jz,
    Jnz,
}

/// A sized memory operand: `byte [rbx + r12 + 3]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub size: PointerSize,
    pub base: X86FullRegister,
    pub index: Option<X86FullRegister>,
    pub displacement: i64,
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}", self.size, self.base)?;
        if let Some(index) = self.index {
            write!(f, " + {}", index)?;
        }
        match self.displacement {
            0 => {}
            d if d > 0 => write!(f, " + {}", d)?,
            d => write!(f, " - {}", d.unsigned_abs())?,
        }
        write!(f, "]")
    }
}
