//! Static type inference for Lox.
//!
//! [`check`] walks a parsed program and assigns every expression a [`Type`]. Operators are
//! overloaded through union types, and the [`unify`](unify::unify) solver backtracks through
//! the alternatives, so `a + b` works on numbers and strings alike. Failures are collected as
//! [`TypeError`]s instead of stopping the walk.

mod arena;
mod builtins;
mod checker;
mod error;
mod generalize;
mod types;
pub mod unify;

use lox_base::{Diagnostic, Span};
use lox_syntax::ast::{ExprId, Program};
use rustc_hash::FxHashMap;

pub use arena::{TypeArena, TypeDisplay};
pub use error::{Ambiguity, CheckError, Mismatch, MismatchKind, TypeError};
pub use generalize::Scheme;
pub use types::{Constraint, FunctionType, RefId, Type};
pub use unify::{Unification, unify};

pub const AMBIGUITY_CODE: &str = "W3100";

/// Type-checks a whole program.
///
/// Ill-typed code is reported through [`Typing::errors`]. `Err` means the program references a
/// name that is not declared before its use, which the checker cannot type at all.
pub fn check(program: &Program) -> Result<Typing, CheckError> {
    checker::TypeChecker::new().check_program(program)
}

/// Everything one checker run learned about a program.
#[derive(Debug)]
pub struct Typing {
    pub arena: TypeArena,
    pub types: FxHashMap<ExprId, Type>,
    pub errors: Vec<TypeError>,
    pub ambiguities: Vec<Ambiguity>,
}

impl Typing {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn type_of(&self, id: ExprId) -> Option<&Type> {
        self.types.get(&id)
    }

    /// The type of `id` with every solved ref replaced by its value.
    pub fn resolved(&self, id: ExprId) -> Option<Type> {
        self.type_of(id).map(|ty| self.arena.resolve(ty))
    }

    pub fn render(&self, id: ExprId) -> Option<String> {
        self.resolved(id).map(|ty| self.arena.render(&ty))
    }

    /// All type errors, one per line.
    pub fn error_report(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let errors = self.errors.iter().map(|error| {
            Diagnostic::error(error.mismatch.kind.code(), error.to_string(), error.span)
        });
        let ambiguities = self.ambiguities.iter().map(|ambiguity| {
            let mut diagnostic = Diagnostic::warning(
                AMBIGUITY_CODE,
                format!(
                    "ambiguous types: {} solutions fit",
                    ambiguity.solutions.len()
                ),
                ambiguity.span,
            );
            for solution in &ambiguity.solutions {
                diagnostic = diagnostic.with_label(format!("possible: {solution}"), ambiguity.span);
            }
            diagnostic
        });
        let mut diagnostics: Vec<Diagnostic> = errors.chain(ambiguities).collect();
        diagnostics.sort_by_key(|diagnostic| span_key(diagnostic.span));
        diagnostics
    }
}

fn span_key(span: Span) -> (usize, usize) {
    (span.start.line, span.start.column)
}
