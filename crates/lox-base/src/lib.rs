//! Source positions and diagnostics shared by every stage of the toolchain.

mod diagnostics;
mod span;

pub use diagnostics::{
    Diagnostic, DiagnosticLabel, DiagnosticSeverity, FileDiagnostic, has_errors, render_diagnostic,
    render_diagnostics,
};
pub use span::{Position, Span};
