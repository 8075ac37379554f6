use std::fmt;

use lox_base::Span;
use serde::Serialize;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchKind {
    /// Two incompatible shapes met.
    Mismatch,
    /// Two function types with different parameter counts.
    Arity,
    /// A ref would have to contain itself.
    Infinite,
}

impl MismatchKind {
    pub fn code(self) -> &'static str {
        match self {
            MismatchKind::Mismatch => "E3001",
            MismatchKind::Arity => "E3002",
            MismatchKind::Infinite => "E3003",
        }
    }
}

/// The conflicting pair of a failed unification, rendered when the failure happened.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub left: Type,
    pub right: Type,
    pub left_text: String,
    pub right_text: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} != {}", self.left_text, self.right_text)?;
        match self.kind {
            MismatchKind::Mismatch => Ok(()),
            MismatchKind::Arity => f.write_str(" (parameter counts differ)"),
            MismatchKind::Infinite => f.write_str(" (infinite type)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{mismatch}")]
pub struct TypeError {
    pub span: Span,
    pub mismatch: Mismatch,
}

/// A unification that several binding sets satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ambiguity {
    pub span: Span,
    /// Each solution as `_id = type` bindings.
    pub solutions: Vec<String>,
}

/// Checker failures that indicate broken input rather than ill-typed code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("no binding for `{name}` at {span}")]
    UnboundVariable { name: String, span: Span },
}
