//! Positioned, severity-tagged diagnostics.
//!
//! Parsing, decoding, and evaluation all report problems as [`Diagnostic`]s
//! so that one load produces a maximal report instead of stopping at the
//! first error. [`Diagnostics::render`] formats the collected messages with
//! line/column positions and a source caret.

use std::fmt;

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single positioned message.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            span: Some(span),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Format the diagnostics against the source they were produced from,
    /// with line/column positions and a caret under the offending range.
    pub fn render(&self, file_name: &str, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let mut out = String::new();

        for diag in &self.0 {
            out.push_str(&format!("{}: {}", diag.severity, diag.summary));
            if !diag.detail.is_empty() {
                out.push_str(&format!(": {}", diag.detail));
            }
            out.push('\n');

            if let Some(span) = diag.span {
                let (line, col) = offset_to_line_col(source, span.start);
                out.push_str(&format!("  --> {}:{}:{}\n", file_name, line, col));
                if let Some(line_content) = lines.get(line.saturating_sub(1)) {
                    out.push_str(&format!("{:>4} | {}\n", line, line_content));
                    let width = (span.end.saturating_sub(span.start)).max(1);
                    out.push_str(&format!(
                        "     | {}{}\n",
                        " ".repeat(col.saturating_sub(1)),
                        "^".repeat(width.min(line_content.len().saturating_sub(col - 1).max(1)))
                    ));
                }
            }
        }

        out
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", diag.severity, diag.summary)?;
            if !diag.detail.is_empty() {
                write!(f, ": {}", diag.detail)?;
            }
            if let Some(span) = diag.span {
                write!(f, " (offset {})", span.start)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// Convert a byte offset to 1-indexed line and column numbers.
pub fn offset_to_line_col(content: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
