//! IR Module - one compiled source file

use crate::block::Block;
use std::fmt;
use std::path::Path;

/// A complete program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Identifier-safe name, used for the library entry symbol
    pub name: String,
    pub body: Block,
}

impl Module {
    pub fn new(name: impl Into<String>, body: Block) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Derives a module name from a source path: the file name up to its
    /// first `.`, with anything that is not valid in an assembler symbol
    /// replaced by `_`.
    pub fn name_from_path(path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name.split('.').next().unwrap_or_default();

        let name: String = stem
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
            .collect();

        if name.is_empty() {
            "main".to_string()
        } else {
            name
        }
    }

    /// Replaces the body, keeping the name
    pub fn with_body(self, body: Block) -> Self {
        Self { body, ..self }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module: {}", self.name)?;
        write!(f, "{}", self.body)
    }
}
