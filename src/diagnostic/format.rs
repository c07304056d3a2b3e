//! Diagnostic formatting utilities.

use std::fmt::Write;

use super::info::{Diagnostic, SourceLine};

// ============================================================================
// Options
// ============================================================================

/// Display style for diagnostic output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Rich output with a code frame.
    #[default]
    Rich,
    /// Short output with just file:line:col and message.
    Short,
}

/// Options for controlling diagnostic formatting.
///
/// # Example
///
/// ```
/// use module_transformer::diagnostic::{DiagnosticOptions, DisplayStyle};
///
/// // Plain text (no ANSI colors) for logging
/// let opts = DiagnosticOptions::plain();
///
/// // Short format for CI/IDE integration
/// let opts = DiagnosticOptions::short();
///
/// let opts = DiagnosticOptions::default()
///     .with_colored(false)
///     .with_style(DisplayStyle::Rich)
///     .with_snippets(true);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to use ANSI colors in output.
    pub colored: bool,
    /// Display style (rich with snippets or short).
    pub style: DisplayStyle,
    /// Whether to include source code snippets.
    pub snippets: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            colored: true,
            style: DisplayStyle::Rich,
            snippets: true,
        }
    }
}

impl DiagnosticOptions {
    /// Create options for colored terminal output.
    pub fn colored() -> Self {
        Self::default()
    }

    /// Create options for plain text output (no ANSI colors).
    pub fn plain() -> Self {
        Self {
            colored: false,
            ..Self::default()
        }
    }

    /// Create options for short format (file:line:col: message).
    pub fn short() -> Self {
        Self {
            style: DisplayStyle::Short,
            snippets: false,
            ..Self::default()
        }
    }

    /// Set whether to use colors.
    pub fn with_colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Set display style.
    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }

    /// Set whether to include source snippets.
    pub fn with_snippets(mut self, snippets: bool) -> Self {
        self.snippets = snippets;
        self
    }
}

// ============================================================================
// Gutter Characters
// ============================================================================

/// Box-drawing characters for source code display.
mod gutter {
    pub const HEADER: &str = "┌─";
    pub const BAR: &str = "│";
    pub const MARKER: &str = "^";
    pub const POINTER: &str = ">";
}

// ============================================================================
// Coloring
// ============================================================================

// Diagnostics are written to stderr; colors follow its terminal support and
// the global `owo_colors` override.

#[cfg(feature = "colored-diagnostics")]
fn colorize(text: &str) -> String {
    use owo_colors::{OwoColorize, Stream};
    text.if_supports_color(Stream::Stderr, |t| t.red()).to_string()
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_gutter(text: &str) -> String {
    use owo_colors::{OwoColorize, Stream};
    text.if_supports_color(Stream::Stderr, |t| t.dimmed()).to_string()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize(text: &str) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_gutter(text: &str) -> String {
    text.to_owned()
}

type Paint = Box<dyn Fn(&str) -> String>;

/// Get (error, gutter) paint functions based on options.
fn get_paint_fns(options: &DiagnosticOptions) -> (Paint, Paint) {
    if options.colored {
        (Box::new(colorize), Box::new(colorize_gutter))
    } else {
        (Box::new(|s: &str| s.to_owned()), Box::new(|s: &str| s.to_owned()))
    }
}

// ============================================================================
// Snippet Writer
// ============================================================================

/// Writes a code frame with aligned line numbers and a column marker.
struct SnippetWriter<'a> {
    output: &'a mut String,
    paint: &'a dyn Fn(&str) -> String,
    gutter_paint: &'a dyn Fn(&str) -> String,
    line_num_width: usize,
}

impl<'a> SnippetWriter<'a> {
    /// Write the location header: "  ┌─ path:line:col"
    fn write_header(&mut self, path: &str, line: usize, col: usize) {
        _ = writeln!(
            self.output,
            "{:>width$} {} {}:{}:{}",
            "",
            (self.gutter_paint)(gutter::HEADER),
            path,
            line,
            col,
            width = self.line_num_width + 2
        );
    }

    /// Write an empty gutter line: "  │"
    fn write_empty_gutter(&mut self) {
        _ = writeln!(
            self.output,
            "{:>width$} {}",
            "",
            (self.gutter_paint)(gutter::BAR),
            width = self.line_num_width + 2
        );
    }

    /// Write a source line; the highlighted line gets a `>` pointer.
    fn write_source_line(&mut self, line: &SourceLine) {
        let pointer = if line.highlight.is_some() {
            (self.paint)(gutter::POINTER)
        } else {
            " ".to_owned()
        };
        let line_num = format!("{:>width$}", line.line_num, width = self.line_num_width);
        _ = writeln!(
            self.output,
            "{} {} {} {}",
            pointer,
            (self.gutter_paint)(&line_num),
            (self.gutter_paint)(gutter::BAR),
            line.text
        );
    }

    /// Write marker line under the highlighted column: "  │     ^"
    fn write_marker(&mut self, text: &str, start_col: usize, end_col: usize) {
        // Keep tabs so the marker lines up with the source above it.
        let padding: String = text
            .chars()
            .take(start_col)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        let markers = gutter::MARKER.repeat(end_col.saturating_sub(start_col).max(1));
        _ = writeln!(
            self.output,
            "{:>width$} {} {}{}",
            "",
            (self.gutter_paint)(gutter::BAR),
            padding,
            (self.paint)(&markers),
            width = self.line_num_width + 2
        );
    }
}

// ============================================================================
// Public Formatting API
// ============================================================================

/// Format a single diagnostic into the output string.
pub fn format_diagnostic(output: &mut String, diagnostic: &Diagnostic, options: &DiagnosticOptions) {
    let (paint, gutter_paint) = get_paint_fns(options);
    let Diagnostic {
        path,
        message,
        location,
        source_lines,
    } = diagnostic;

    match options.style {
        DisplayStyle::Short => {
            _ = writeln!(
                output,
                "{}:{}:{}: {}: {}",
                path,
                location.line,
                location.column,
                paint("error"),
                message
            );
        }
        DisplayStyle::Rich => {
            _ = writeln!(output, "{}: {}", paint("error"), message);
            if !options.snippets || source_lines.is_empty() {
                _ = writeln!(output, "  at {}:{}:{}", path, location.line, location.column);
                return;
            }

            let end_line = source_lines.last().map_or(location.line, |l| l.line_num);
            let mut writer = SnippetWriter {
                output,
                paint: &paint,
                gutter_paint: &gutter_paint,
                line_num_width: end_line.to_string().len(),
            };
            writer.write_header(path, location.line, location.column);
            writer.write_empty_gutter();
            for line in source_lines {
                writer.write_source_line(line);
                if let Some((start, end)) = line.highlight {
                    writer.write_marker(&line.text, start, end);
                }
            }
        }
    }
}

/// Disable colored output globally (for tests).
#[cfg(all(test, feature = "colored-diagnostics"))]
pub fn disable_colors() {
    owo_colors::set_override(false);
}
