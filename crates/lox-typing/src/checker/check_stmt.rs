use lox_syntax::ast::{ExprKind, FunctionDecl, Stmt};

use super::TypeChecker;
use crate::error::CheckError;
use crate::types::Type;

impl TypeChecker {
    pub(super) fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CheckError> {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.infer_expr(expr)?;
            }
            Stmt::Var { name, init } => {
                let floor = self.arena.ref_count();
                let ty = match init {
                    Some(init) => self.infer_expr(init)?,
                    None => self.arena.fresh_type(),
                };
                self.bind(&name.name, ty, name.span);
                if init
                    .as_ref()
                    .is_some_and(|init| matches!(init.kind, ExprKind::Function(_)))
                {
                    self.generalize(&name.name, floor);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.infer_expr(condition)?;
                self.check_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch)?;
                }
            }
            Stmt::Block(statements) => {
                self.push_scope();
                let result = self.check_block(statements);
                self.pop_scope();
                result?;
            }
            Stmt::Loop {
                condition,
                body,
                on_loop,
            } => {
                self.infer_expr(condition)?;
                self.check_stmt(body)?;
                if let Some(on_loop) = on_loop {
                    self.infer_expr(on_loop)?;
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::Function(function) => {
                self.check_function(function)?;
            }
            Stmt::Return { value, span } => {
                let ty = match value {
                    Some(value) => self.infer_expr(value)?,
                    None => Type::Nil,
                };
                if let Some(expected) = self.return_type.clone() {
                    self.unify(&expected, &ty, *span);
                }
            }
        }
        Ok(())
    }

    fn check_block(&mut self, statements: &[Stmt]) -> Result<(), CheckError> {
        for stmt in statements {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    /// Checks a declaration or function expression and returns its `Function` type.
    ///
    /// The return ref and the parameter refs are allocated first, and a named function is bound
    /// before its body so it can call itself. Once the body is checked, the name becomes a scheme
    /// over every ref created since the declaration started.
    pub(super) fn check_function(&mut self, function: &FunctionDecl) -> Result<Type, CheckError> {
        let floor = self.arena.ref_count();
        let ret = self.arena.fresh_type();
        let params: Vec<Type> = function
            .params
            .iter()
            .map(|_| self.arena.fresh_type())
            .collect();
        let ty = Type::function(params.clone(), ret.clone());
        if let Some(name) = &function.name {
            self.bind(&name.name, ty.clone(), name.span);
        }

        self.push_scope();
        for (param, param_ty) in function.params.iter().zip(params) {
            self.bind(&param.name, param_ty, param.span);
        }
        let enclosing = self.return_type.replace(ret.clone());
        let result = self.check_block(&function.body);
        self.return_type = enclosing;
        self.pop_scope();
        result?;

        if !always_returns(&function.body) {
            self.unify(&ret, &Type::Nil, function.span);
        }
        if let Some(name) = &function.name {
            self.generalize(&name.name, floor);
        }
        Ok(ty)
    }
}

fn always_returns(statements: &[Stmt]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Stmt::Return { .. } => true,
        Stmt::Block(inner) => always_returns(inner),
        Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => {
            always_returns(std::slice::from_ref(then_branch.as_ref()))
                && always_returns(std::slice::from_ref(else_branch.as_ref()))
        }
        _ => false,
    })
}
