use lox_base::{Diagnostic, Span, has_errors, render_diagnostics};
use lox_syntax::ast::Program;
use lox_syntax::{lex, parse, print_expr, print_program};
use lox_typing::{AMBIGUITY_CODE, Typing};
use serde::Serialize;
use tracing::debug;

use crate::CliError;
use crate::config::{LoxToml, OutputFormat};

/// What a command wants written. `failed` maps to a non-zero exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub stdout: String,
    pub stderr: String,
    pub failed: bool,
}

impl Report {
    fn diagnostics(&mut self, path: &str, source: &str, diagnostics: &[Diagnostic], color: bool) {
        if diagnostics.is_empty() {
            return;
        }
        self.stderr
            .push_str(&render_diagnostics(path, Some(source), diagnostics, color));
        self.stderr.push('\n');
        self.failed |= has_errors(diagnostics);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub report_ambiguity: bool,
    pub show_types: bool,
    pub format: OutputFormat,
    pub use_color: bool,
}

impl CheckOptions {
    pub fn from_config(config: &LoxToml, is_terminal: bool) -> Self {
        Self {
            report_ambiguity: config.check.report_ambiguity,
            show_types: config.check.show_types,
            format: config.output.format,
            use_color: config.output.color.enabled(is_terminal),
        }
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self::from_config(&LoxToml::default(), false)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    path: &'a str,
    ok: bool,
    types: Vec<TypedExpr>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct TypedExpr {
    span: Span,
    expr: String,
    #[serde(rename = "type")]
    ty: String,
}

/// Lexes, parses and type-checks `source`.
///
/// Type checking is skipped when the program has syntax errors.
pub fn check_source(path: &str, source: &str, options: CheckOptions) -> Result<Report, CliError> {
    let (program, mut diagnostics) = parse(source);
    let typing = if has_errors(&diagnostics) {
        debug!(path, "syntax errors, skipping type check");
        None
    } else {
        let typing = lox_typing::check(&program)?;
        diagnostics.extend(
            typing
                .diagnostics()
                .into_iter()
                .filter(|d| options.report_ambiguity || d.code != AMBIGUITY_CODE),
        );
        Some(typing)
    };
    let types = typing
        .as_ref()
        .map(|typing| typed_expressions(&program, typing))
        .unwrap_or_default();

    let mut report = Report::default();
    match options.format {
        OutputFormat::Json => {
            let failed = has_errors(&diagnostics);
            let json = JsonReport {
                path,
                ok: !failed,
                types,
                diagnostics,
            };
            report.stdout = serde_json::to_string_pretty(&json)?;
            report.stdout.push('\n');
            report.failed = failed;
        }
        OutputFormat::Text => {
            if options.show_types {
                for typed in &types {
                    report.stdout.push_str(&format!(
                        "{}  {}  : {}\n",
                        typed.span.start, typed.expr, typed.ty
                    ));
                }
            }
            report.diagnostics(path, source, &diagnostics, options.use_color);
        }
    }
    Ok(report)
}

fn typed_expressions(program: &Program, typing: &Typing) -> Vec<TypedExpr> {
    program
        .expressions()
        .into_iter()
        .filter_map(|expr| {
            let ty = typing.render(expr.id)?;
            Some(TypedExpr {
                span: expr.span,
                expr: one_line(&print_expr(expr)),
                ty,
            })
        })
        .collect()
}

fn one_line(text: &str) -> String {
    text.lines().map(str::trim).collect::<Vec<_>>().join(" ")
}

/// Prints the syntax tree of `source`.
pub fn parse_source(path: &str, source: &str, use_color: bool) -> Report {
    let (program, diagnostics) = parse(source);
    let mut report = Report {
        stdout: print_program(&program),
        ..Report::default()
    };
    report.diagnostics(path, source, &diagnostics, use_color);
    report
}

/// Prints one token per line.
pub fn tokens_source(path: &str, source: &str, use_color: bool) -> Report {
    let (tokens, diagnostics) = lex(source);
    let mut report = Report::default();
    for token in &tokens {
        report.stdout.push_str(&token.to_string());
        report.stdout.push('\n');
    }
    report.diagnostics(path, source, &diagnostics, use_color);
    report
}
