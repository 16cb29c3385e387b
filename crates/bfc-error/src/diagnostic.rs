//! Diagnostic - compiler-style error messages
//!
//! A diagnostic renders as:
//!
//! ```text
//! error[EP001]: unmatched `]`
//!  --> hello.b:1:8
//!   |
//! 1 | +[>+<-]]
//!   |        ^ no `[` is open here
//! ```

use crate::span::Span;
use colored::{Color, Colorize};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Stops compilation
    Error,
    /// Reported, compilation continues
    Warning,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
        }
    }

    fn color(&self) -> Color {
        match self {
            Level::Error => Color::Red,
            Level::Warning => Color::Yellow,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A label pointing at a region of the source
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    /// Primary labels are underlined with `^`, secondary ones with `-`
    pub primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: false,
        }
    }
}

/// Structured error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    /// Category (P = Parser, C = Configuration)
    pub category: char,
    pub number: u16,
}

impl ErrorCode {
    pub const fn new(category: char, number: u16) -> Self {
        Self { category, number }
    }

    // Parser errors
    pub const UNMATCHED_CLOSE: Self = Self::new('P', 1);
    pub const UNCLOSED_OPEN: Self = Self::new('P', 2);

    // Configuration warnings
    pub const UNKNOWN_CELL_SIZE: Self = Self::new('C', 1);
    pub const UNKNOWN_OVERFLOW_POLICY: Self = Self::new('C', 2);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}{:03}", self.category, self.number)
    }
}

/// A complete diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Adds a primary label
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.level, code, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

/// Source files known to the renderer
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Returns the text of a 1-indexed line, without its line terminator
    pub fn get_line(&self, line: u32) -> Option<&str> {
        let line_idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(line_idx)?;
        let end = self
            .line_starts
            .get(line_idx + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(self.source.len());

        Some(self.source[start..end].trim_end_matches('\r'))
    }
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file and returns its ID
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> u32 {
        let id = self.files.len() as u32;
        self.files.push(SourceFile::new(name, source));
        id
    }

    pub fn get(&self, id: u32) -> Option<&SourceFile> {
        self.files.get(id as usize)
    }
}

/// Renders diagnostics for the terminal
pub struct DiagnosticRenderer<'a> {
    cache: &'a SourceCache,
    use_colors: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(cache: &'a SourceCache) -> Self {
        Self {
            cache,
            use_colors: true,
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        let colored = text.color(color);
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        let mut heading = diagnostic.level.as_str().to_string();
        if let Some(code) = &diagnostic.code {
            heading.push_str(&format!("[{}]", code));
        }
        output.push_str(&self.paint(&heading, diagnostic.level.color(), true));
        output.push_str(&format!(": {}\n", diagnostic.message));

        for label in &diagnostic.labels {
            let Some(file) = self.cache.get(label.span.file_id) else {
                continue;
            };
            let line_num = label.span.start.line;
            let padding = " ".repeat(line_num.to_string().len());
            let bar = self.paint("|", Color::Blue, true);

            output.push_str(&format!(
                "{}{} {}:{}:{}\n",
                padding,
                self.paint("-->", Color::Blue, true),
                file.name,
                line_num,
                label.span.start.column
            ));

            let Some(line_content) = file.get_line(line_num) else {
                continue;
            };

            let underline_len = if label.span.start.line == label.span.end.line {
                label.span.end.column.saturating_sub(label.span.start.column).max(1) as usize
            } else {
                1
            };
            let spaces = " ".repeat(label.span.start.column.saturating_sub(1) as usize);
            let (marker, color) = if label.primary {
                ('^', diagnostic.level.color())
            } else {
                ('-', Color::Blue)
            };
            let underline = marker.to_string().repeat(underline_len);

            output.push_str(&format!("{} {}\n", padding, bar));
            output.push_str(&format!(
                "{} {} {}\n",
                self.paint(&line_num.to_string(), Color::Blue, true),
                bar,
                line_content
            ));
            output.push_str(&format!(
                "{} {} {}{}\n",
                padding,
                bar,
                spaces,
                self.paint(&format!("{} {}", underline, label.message), color, label.primary)
            ));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  = {}: {}\n", self.paint("note", Color::Cyan, true), note));
        }

        for help in &diagnostic.help {
            output.push_str(&format!("  = {}: {}\n", self.paint("help", Color::Green, true), help));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    #[test]
    fn test_diagnostic_rendering() {
        let mut cache = SourceCache::new();
        let file_id = cache.add("loop.b", "++\n[>+<-\n");

        let span = Span::new(Position::new(2, 1, 3), Position::new(2, 2, 4), file_id);

        let diagnostic = Diagnostic::error("unclosed `[`")
            .with_code(ErrorCode::UNCLOSED_OPEN)
            .with_label(span, "this loop is never closed")
            .with_help("add a matching `]`");

        let renderer = DiagnosticRenderer::new(&cache).without_colors();
        let output = renderer.render(&diagnostic);

        assert!(output.starts_with("error[EP002]: unclosed `[`"));
        assert!(output.contains("--> loop.b:2:1"));
        assert!(output.contains("2 | [>+<-"));
        assert!(output.contains("  | ^ this loop is never closed"));
        assert!(output.contains("= help: add a matching `]`"));
    }

    #[test]
    fn test_secondary_label_rendering() {
        let mut cache = SourceCache::new();
        let file_id = cache.add("extra.b", "+[-]>]");

        let close = Span::new(Position::new(1, 6, 5), Position::new(1, 7, 6), file_id);
        let closed = Span::new(Position::new(1, 2, 1), Position::new(1, 5, 4), file_id);
        let diagnostic = Diagnostic::error("unmatched `]`")
            .with_code(ErrorCode::UNMATCHED_CLOSE)
            .with_label(close, "no `[` is open here")
            .with_secondary_label(closed, "last loop was closed here");

        let output = DiagnosticRenderer::new(&cache).without_colors().render(&diagnostic);

        assert!(output.contains("  |      ^ no `[` is open here"));
        assert!(output.contains("  |  --- last loop was closed here"));
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UNMATCHED_CLOSE.to_string(), "EP001");
        assert_eq!(ErrorCode::UNKNOWN_OVERFLOW_POLICY.to_string(), "EC002");
    }

    #[test]
    fn test_get_line_strips_carriage_return() {
        let file = SourceFile::new("crlf.b", "+\r\n-\r\n");
        assert_eq!(file.get_line(1), Some("+"));
        assert_eq!(file.get_line(2), Some("-"));
        assert_eq!(file.get_line(4), None);
    }
}
