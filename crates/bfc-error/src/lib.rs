//! bfc-error - Diagnostics system for the bfc tape compiler
//!
//! Every stage that can reject input (only the parser, in practice) or that
//! wants to tell the user about a questionable setting reports through a
//! [`Diagnostic`]. Diagnostics carry a source [`Span`] so the renderer can
//! point at the offending bracket.
//!
//! # Example
//!
//! ```rust
//! use bfc_error::{Diagnostic, ErrorCode, SourceCache, DiagnosticRenderer};
//! use bfc_error::span::{Span, Position};
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add("hello.b", "+[>+<-]]");
//!
//! let span = Span::new(
//!     Position::new(1, 8, 7),
//!     Position::new(1, 9, 8),
//!     file_id,
//! );
//!
//! let diagnostic = Diagnostic::error("unmatched `]`")
//!     .with_code(ErrorCode::UNMATCHED_CLOSE)
//!     .with_label(span, "no `[` is open here");
//!
//! let renderer = DiagnosticRenderer::new(&cache).without_colors();
//! assert!(renderer.render(&diagnostic).contains("hello.b:1:8"));
//! ```

pub mod diagnostic;
pub mod span;

pub use diagnostic::{
    Diagnostic, DiagnosticRenderer, ErrorCode, Label, Level, SourceCache, SourceFile,
};
pub use span::{Position, Span};

/// Collection of diagnostics accumulated during compilation
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.level == Level::Error).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Renders all diagnostics
    pub fn render(&self, renderer: &DiagnosticRenderer<'_>) -> String {
        self.items
            .iter()
            .map(|d| renderer.render(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detection() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("unknown cell size `huge`"));
        assert!(!diags.has_errors());

        diags.push(Diagnostic::error("unclosed `[`"));
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_into_iter_keeps_order() {
        let mut diags = Diagnostics::from(Diagnostic::warning("a"));
        diags.push(Diagnostic::error("b"));

        let messages: Vec<_> = diags.into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }
}
