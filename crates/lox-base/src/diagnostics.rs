use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::Span;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl DiagnosticSeverity {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticLabel {
    pub message: String,
    pub span: Span,
}

/// A user-facing problem report. Every stage collects these instead of stopping at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: Span,
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Error, message.into(), span)
    }

    pub fn warning(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Warning, message.into(), span)
    }

    fn new(code: &str, severity: DiagnosticSeverity, message: String, span: Span) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message,
            span,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, message: impl Into<String>, span: Span) -> Self {
        self.labels.push(DiagnosticLabel {
            message: message.into(),
            span,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDiagnostic {
    pub path: String,
    pub diagnostic: Diagnostic,
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const CYAN: &str = "\x1b[1;36m";
const DARK_GRAY: &str = "\x1b[90m";
const WHITE: &str = "\x1b[97m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn severity(self, severity: DiagnosticSeverity) -> &'static str {
        match severity {
            DiagnosticSeverity::Error => RED,
            DiagnosticSeverity::Warning => YELLOW,
        }
    }
}

/// Renders a batch of diagnostics for one file, separated by blank lines.
pub fn render_diagnostics(
    path: &str,
    source: Option<&str>,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| render_diagnostic(path, source, diagnostic, use_color))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_diagnostic(
    path: &str,
    source: Option<&str>,
    diagnostic: &Diagnostic,
    use_color: bool,
) -> String {
    let palette = Palette { enabled: use_color };
    let color = palette.severity(diagnostic.severity);
    let mut out = String::new();
    let heading = format!("{}[{}]", diagnostic.severity.label(), diagnostic.code);
    let _ = writeln!(
        out,
        "{} {}",
        palette.paint(color, &heading),
        palette.paint(DARK_GRAY, &format!("{path}:{}", diagnostic.span.start)),
    );
    let _ = writeln!(out, "  {}", palette.paint(WHITE, &diagnostic.message));
    if let Some(source) = source {
        write_frame(&mut out, source, diagnostic.span, Some(&diagnostic.message), color, palette);
    }
    for label in &diagnostic.labels {
        let _ = writeln!(
            out,
            "{}: {} at {}",
            palette.paint(CYAN, "note"),
            label.message,
            palette.paint(DARK_GRAY, &format!("{path}:{}", label.span.start)),
        );
        if let Some(source) = source {
            write_frame(&mut out, source, label.span, None, CYAN, palette);
        }
    }
    out.trim_end().to_string()
}

fn write_frame(
    out: &mut String,
    source: &str,
    span: Span,
    message: Option<&str>,
    color: &str,
    palette: Palette,
) {
    let Some(text) = span
        .start
        .line
        .checked_sub(1)
        .and_then(|index| source.lines().nth(index))
    else {
        return;
    };
    let line_no = span.start.line.to_string();
    let width = line_no.len();
    let gutter = palette.paint(DARK_GRAY, &format!("{:>width$} |", ""));

    let columns = text.chars().count();
    let start = span.start.column.clamp(1, columns + 1);
    let end = if span.end.line == span.start.line {
        span.end.column.clamp(start, columns.max(start))
    } else {
        columns.max(start)
    };
    let carets = "^".repeat(end - start + 1);

    let _ = writeln!(out, "{gutter}");
    let _ = writeln!(out, "{} {text}", palette.paint(DARK_GRAY, &format!("{line_no} |")));
    let _ = write!(
        out,
        "{gutter} {}{}",
        " ".repeat(start - 1),
        palette.paint(color, &carets)
    );
    if let Some(message) = message {
        let _ = write!(out, " {}", palette.paint(color, message));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn span(line: usize, start: usize, end: usize) -> Span {
        Span::new(Position::new(line, start), Position::new(line, end))
    }

    #[test]
    fn renders_frame_under_the_offending_columns() {
        let source = "var a = 1;\nvar a = \"x\";\n";
        let diagnostic = Diagnostic::error("E3001", "Number != String", span(2, 5, 5));
        let rendered = render_diagnostic("demo.lox", Some(source), &diagnostic, false);
        insta::assert_snapshot!(rendered, @r#"
        error[E3001] demo.lox:2:5
          Number != String
          |
        2 | var a = "x";
          |     ^ Number != String
        "#);
    }

    #[test]
    fn renders_labels_as_notes() {
        let source = "fun f() {}\nf(1);\n";
        let diagnostic = Diagnostic::error("E3002", "expected 0 arguments, found 1", span(2, 1, 4))
            .with_label("declared here", span(1, 5, 5));
        let rendered = render_diagnostic("demo.lox", Some(source), &diagnostic, false);
        insta::assert_snapshot!(rendered, @r"
        error[E3002] demo.lox:2:1
          expected 0 arguments, found 1
          |
        2 | f(1);
          | ^^^^ expected 0 arguments, found 1
        note: declared here at demo.lox:1:5
          |
        1 | fun f() {}
          |     ^
        ");
    }

    #[test]
    fn missing_source_line_skips_the_frame() {
        let diagnostic = Diagnostic::warning("W3100", "ambiguous", span(9, 1, 1));
        let rendered = render_diagnostic("demo.lox", Some("print 1;"), &diagnostic, false);
        assert_eq!(rendered, "warning[W3100] demo.lox:9:1\n  ambiguous");
    }

    #[test]
    fn colored_output_wraps_heading_in_escape_codes() {
        let diagnostic = Diagnostic::error("E1001", "unexpected character", span(1, 1, 1));
        let rendered = render_diagnostic("demo.lox", None, &diagnostic, true);
        assert!(rendered.starts_with(RED), "{rendered:?}");
        assert!(rendered.contains(RESET));
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let warning = Diagnostic::warning("W3100", "ambiguous", span(1, 1, 1));
        assert!(!has_errors(std::slice::from_ref(&warning)));
        let error = Diagnostic::error("E3001", "Number != String", span(1, 1, 1));
        assert!(has_errors(&[warning, error]));
    }
}
