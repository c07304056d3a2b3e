//! Structured diagnostic information for custom rendering.

use std::fmt;

use super::format::{format_diagnostic, DiagnosticOptions};

/// Lines of context shown before the error line.
const LINES_ABOVE: usize = 2;
/// Lines of context shown after the error line.
const LINES_BELOW: usize = 3;

// ============================================================================
// Location
// ============================================================================

/// A point in source text.
///
/// `line` is 1-indexed, `column` is 0-indexed (counted in chars).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column (0-indexed).
    pub column: usize,
}

impl Location {
    /// Create a new location.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the location of a byte offset inside `source`.
    ///
    /// Offsets past the end clamp to the end of the text.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = floor_char_boundary(source, offset.min(source.len()));
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count();
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ============================================================================
// SourceLine
// ============================================================================

/// A single source line with optional highlight range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Line number (1-indexed).
    pub line_num: usize,
    /// Line content.
    pub text: String,
    /// Highlight range (start_col, end_col), 0-indexed, exclusive end.
    pub highlight: Option<(usize, usize)>,
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A fully resolved error diagnostic.
///
/// Source lines are captured eagerly, so the diagnostic can be rendered after
/// the module that produced it is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Display path of the offending file.
    pub path: String,
    /// Error message.
    pub message: String,
    /// Where the error occurred.
    pub location: Location,
    /// Source lines surrounding the location (code frame).
    pub source_lines: Vec<SourceLine>,
}

impl Diagnostic {
    /// Create a diagnostic without any source context.
    pub fn new(path: impl Into<String>, message: impl Into<String>, location: Location) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            location,
            source_lines: Vec::new(),
        }
    }

    /// Create a diagnostic and capture a code frame from `source`.
    pub fn with_source(
        path: impl Into<String>,
        message: impl Into<String>,
        source: &str,
        location: Location,
    ) -> Self {
        let mut diagnostic = Self::new(path, message, location);
        diagnostic.source_lines = frame_lines(source, location);
        diagnostic
    }

    /// Render with custom options.
    pub fn render(&self, options: &DiagnosticOptions) -> String {
        let mut output = String::new();
        format_diagnostic(&mut output, self, options);
        output
    }

    /// Display wrapper using custom options.
    pub fn with_options<'a>(&'a self, options: &'a DiagnosticOptions) -> DiagnosticDisplay<'a> {
        DiagnosticDisplay {
            diagnostic: self,
            options,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render(&DiagnosticOptions::plain()).trim_end())
    }
}

/// Display wrapper for formatting a diagnostic with custom options.
pub struct DiagnosticDisplay<'a> {
    diagnostic: &'a Diagnostic,
    options: &'a DiagnosticOptions,
}

impl fmt::Display for DiagnosticDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.render(self.options))
    }
}

/// Collect the lines around `location`, highlighting the offending column.
fn frame_lines(source: &str, location: Location) -> Vec<SourceLine> {
    let first = location.line.saturating_sub(LINES_ABOVE).max(1);
    let last = location.line + LINES_BELOW;

    source
        .lines()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .filter(|(line_num, _)| (first..=last).contains(line_num))
        .map(|(line_num, text)| SourceLine {
            line_num,
            text: text.to_owned(),
            highlight: (line_num == location.line)
                .then_some((location.column, location.column + 1)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "let a = 1;\nlet b = ;\n";
        assert_eq!(Location::from_offset(source, 0), Location::new(1, 0));
        assert_eq!(Location::from_offset(source, 11), Location::new(2, 0));
        assert_eq!(Location::from_offset(source, 19), Location::new(2, 8));
    }

    #[test]
    fn test_location_counts_chars_not_bytes() {
        let source = "const s = '世界'; x";
        let offset = source.find('x').unwrap();
        assert_eq!(Location::from_offset(source, offset), Location::new(1, 16));
    }

    #[test]
    fn test_location_clamps_past_end() {
        assert_eq!(Location::from_offset("ab", 99), Location::new(1, 2));
    }

    #[test]
    fn test_frame_lines_window() {
        let source = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let diag = Diagnostic::with_source("a.js", "boom", source, Location::new(5, 0));

        let nums: Vec<_> = diag.source_lines.iter().map(|l| l.line_num).collect();
        assert_eq!(nums, vec![3, 4, 5, 6, 7, 8]);

        let highlighted: Vec<_> = diag
            .source_lines
            .iter()
            .filter(|l| l.highlight.is_some())
            .map(|l| l.line_num)
            .collect();
        assert_eq!(highlighted, vec![5]);
    }

    #[test]
    fn test_frame_lines_at_start() {
        let diag = Diagnostic::with_source("a.js", "boom", "x\ny", Location::new(1, 0));
        assert_eq!(diag.source_lines.len(), 2);
        assert_eq!(diag.source_lines[0].highlight, Some((0, 1)));
    }
}
