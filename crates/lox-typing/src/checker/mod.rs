use lox_base::Span;
use lox_syntax::ast::{ExprId, Program};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::arena::TypeArena;
use crate::builtins;
use crate::error::{Ambiguity, CheckError, TypeError};
use crate::generalize::Scheme;
use crate::types::Type;
use crate::unify::{Unification, unify};
use crate::Typing;

mod check_stmt;
mod infer_expr;

#[derive(Debug, Clone)]
enum Binding {
    /// Shared by every use: variables, parameters, and a function's own name inside its body.
    Mono(Type),
    /// Copied on every use.
    Poly(Scheme),
}

impl Binding {
    fn ty(&self) -> &Type {
        match self {
            Binding::Mono(ty) => ty,
            Binding::Poly(scheme) => &scheme.ty,
        }
    }
}

type Scope = FxHashMap<String, Binding>;

/// Walks a program, assigning a type to every expression and collecting unification failures.
pub(crate) struct TypeChecker {
    arena: TypeArena,
    /// Innermost last. The first two are the builtins and the top level.
    scopes: Vec<Scope>,
    types: FxHashMap<ExprId, Type>,
    errors: Vec<TypeError>,
    ambiguities: Vec<Ambiguity>,
    /// Return ref of the function whose body is being checked.
    return_type: Option<Type>,
}

impl TypeChecker {
    pub(crate) fn new() -> Self {
        let mut arena = TypeArena::new();
        let builtins = builtins::signatures(&mut arena)
            .into_iter()
            .map(|(name, ty)| (name.to_string(), Binding::Poly(Scheme::closed(ty))))
            .collect();
        Self {
            arena,
            scopes: vec![builtins, Scope::default()],
            types: FxHashMap::default(),
            errors: Vec::new(),
            ambiguities: Vec::new(),
            return_type: None,
        }
    }

    pub(crate) fn check_program(mut self, program: &Program) -> Result<Typing, CheckError> {
        for stmt in &program.statements {
            trace!(errors = self.errors.len(), "checking top-level statement");
            self.check_stmt(stmt)?;
        }
        debug!(
            expressions = self.types.len(),
            errors = self.errors.len(),
            ambiguities = self.ambiguities.len(),
            refs = self.arena.ref_count(),
            "type check finished"
        );
        Ok(Typing {
            arena: self.arena,
            types: self.types,
            errors: self.errors,
            ambiguities: self.ambiguities,
        })
    }

    /// Unifies `expected` with `actual`, recording a failure or an ambiguity against `span`.
    fn unify(&mut self, expected: &Type, actual: &Type, span: Span) {
        match unify(&mut self.arena, expected, actual) {
            Ok(Unification::Solved(_)) => {}
            Ok(Unification::Ambiguous(solutions)) => {
                let solutions = solutions
                    .iter()
                    .map(|constraint| {
                        constraint
                            .bindings
                            .iter()
                            .map(|(id, ty)| {
                                format!("{id} = {}", self.arena.render(&self.arena.resolve(ty)))
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect();
                self.ambiguities.push(Ambiguity { span, solutions });
            }
            Err(mismatch) => {
                debug!(%mismatch, %span, "type error");
                self.errors.push(TypeError { span, mismatch });
            }
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn current_scope(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Declares `name` in the innermost scope. A previous declaration in the same scope must
    /// agree with the new type.
    fn bind(&mut self, name: &str, ty: Type, span: Span) {
        if let Some(prior) = self.current_scope().get(name).map(|binding| binding.ty().clone()) {
            self.unify(&prior, &ty, span);
        }
        self.current_scope().insert(name.to_string(), Binding::Mono(ty));
    }

    /// Turns the innermost binding of `name` into a scheme over refs created after `floor`.
    fn generalize(&mut self, name: &str, floor: u32) {
        let scope = self.current_scope();
        if let Some(Binding::Mono(ty)) = scope.get(name) {
            let scheme = Scheme {
                ty: ty.clone(),
                floor,
            };
            scope.insert(name.to_string(), Binding::Poly(scheme));
        }
    }

    fn lookup(&mut self, name: &str, span: Span) -> Result<Type, CheckError> {
        let binding = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| CheckError::UnboundVariable {
                name: name.to_string(),
                span,
            })?;
        Ok(match binding {
            Binding::Mono(ty) => ty,
            Binding::Poly(scheme) => self.arena.instantiate(&scheme),
        })
    }

    /// Unifies the innermost declaration of `name` with an assigned value.
    fn assign(&mut self, name: &str, value: &Type, span: Span) -> Result<(), CheckError> {
        let prior = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|binding| binding.ty().clone())
            .ok_or_else(|| CheckError::UnboundVariable {
                name: name.to_string(),
                span,
            })?;
        self.unify(&prior, value, span);
        Ok(())
    }
}
