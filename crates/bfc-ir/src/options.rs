//! Compilation options shared by flow analysis and code generation

use bfc_error::{Diagnostic, Diagnostics, ErrorCode};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Tape length used when nothing else is configured
pub const DEFAULT_TAPE_CELLS: usize = 30_000;

/// Width of one tape cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CellSize {
    #[default]
    Byte,
    Word,
    DWord,
}

impl CellSize {
    pub fn bytes(self) -> usize {
        match self {
            CellSize::Byte => 1,
            CellSize::Word => 2,
            CellSize::DWord => 4,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// What happens when the tape pointer leaves the tape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MemoryOverflow {
    /// No checks; the pointer register is moved directly
    Undefined,
    /// The pointer wraps around the tape ends
    #[default]
    Wrap,
    /// Leaving the tape terminates the program
    Abort,
}

impl MemoryOverflow {
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Shape of the generated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputKind {
    /// Standalone program with its own `_start`
    #[default]
    Executable,
    /// Object exporting a callable `_bf_<module>` function
    Library,
}

/// Compilation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub module_name: String,
    pub cell_size: CellSize,
    pub overflow: MemoryOverflow,
    pub output: OutputKind,
    pub tape_cells: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self::new("main")
    }
}

impl Options {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cell_size: CellSize::default(),
            overflow: MemoryOverflow::default(),
            output: OutputKind::default(),
            tape_cells: DEFAULT_TAPE_CELLS,
        }
    }

    pub fn with_cell_size(mut self, cell_size: CellSize) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_overflow(mut self, overflow: MemoryOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    pub fn with_tape_cells(mut self, tape_cells: usize) -> Self {
        self.tape_cells = tape_cells;
        self
    }

    /// Builds options from user-supplied selector names. Unknown names fall
    /// back to the defaults and produce a warning instead of failing.
    pub fn from_selectors(
        module_name: impl Into<String>,
        cell: Option<&str>,
        memory: Option<&str>,
    ) -> (Self, Diagnostics) {
        let mut options = Self::new(module_name);
        let mut diagnostics = Diagnostics::new();

        if let Some(name) = cell {
            match CellSize::from_name(name) {
                Some(cell_size) => options.cell_size = cell_size,
                None => {
                    tracing::warn!(name, fallback = %options.cell_size, "unknown cell size");
                    diagnostics.push(unknown_selector(
                        ErrorCode::UNKNOWN_CELL_SIZE,
                        "cell size",
                        name,
                        options.cell_size,
                        CellSize::iter(),
                    ));
                }
            }
        }

        if let Some(name) = memory {
            match MemoryOverflow::from_name(name) {
                Some(overflow) => options.overflow = overflow,
                None => {
                    tracing::warn!(name, fallback = %options.overflow, "unknown overflow policy");
                    diagnostics.push(unknown_selector(
                        ErrorCode::UNKNOWN_OVERFLOW_POLICY,
                        "overflow policy",
                        name,
                        options.overflow,
                        MemoryOverflow::iter(),
                    ));
                }
            }
        }

        (options, diagnostics)
    }

    /// Whether every instruction must run with the pointer register at its
    /// own offset. Checked and wrapping tapes need this so that each pointer
    /// move passes through the runtime helper.
    pub fn explicit_offsets(&self) -> bool {
        self.overflow != MemoryOverflow::Undefined
    }
}

fn unknown_selector<T: std::fmt::Display>(
    code: ErrorCode,
    what: &str,
    name: &str,
    fallback: T,
    known: impl Iterator<Item = T>,
) -> Diagnostic {
    let known: Vec<String> = known.map(|k| format!("`{}`", k)).collect();
    Diagnostic::warning(format!("unknown {} `{}`, using `{}`", what, name, fallback))
        .with_code(code)
        .with_note(format!("expected one of {}", known.join(", ")))
}
