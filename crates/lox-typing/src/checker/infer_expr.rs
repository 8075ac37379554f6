use lox_base::Span;
use lox_syntax::ast::{Expr, ExprKind, Literal};

use super::TypeChecker;
use crate::error::CheckError;
use crate::types::Type;

impl TypeChecker {
    /// Infers the type of `expr` and records it under the expression's id.
    pub(super) fn infer_expr(&mut self, expr: &Expr) -> Result<Type, CheckError> {
        let ty = match &expr.kind {
            ExprKind::Literal(literal) => literal_type(literal),
            ExprKind::Grouping(inner) => self.infer_expr(inner)?,
            ExprKind::Unary { op, operand } => {
                let operand = self.infer_expr(operand)?;
                self.apply_operator(op.symbol(), vec![operand], expr.span)?
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.infer_expr(left)?;
                let right = self.infer_expr(right)?;
                self.apply_operator(op.symbol(), vec![left, right], expr.span)?
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.infer_expr(left)?;
                let right = self.infer_expr(right)?;
                self.apply_operator(op.symbol(), vec![left, right], expr.span)?
            }
            ExprKind::Variable(name) => self.lookup(&name.name, name.span)?,
            ExprKind::Assign { name, value } => {
                let value = self.infer_expr(value)?;
                self.assign(&name.name, &value, expr.span)?;
                value
            }
            ExprKind::Call { callee, args } => {
                let callee = self.infer_expr(callee)?;
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.infer_expr(arg)?);
                }
                self.apply(&callee, arg_types, expr.span)
            }
            ExprKind::Function(function) => self.check_function(function)?,
        };
        self.types.insert(expr.id, ty.clone());
        Ok(ty)
    }

    fn apply_operator(
        &mut self,
        symbol: &str,
        operands: Vec<Type>,
        span: Span,
    ) -> Result<Type, CheckError> {
        let operator = self.lookup(symbol, span)?;
        Ok(self.apply(&operator, operands, span))
    }

    /// Unifies `callee` with `(args) -> result` for a fresh result ref and returns that ref.
    fn apply(&mut self, callee: &Type, args: Vec<Type>, span: Span) -> Type {
        let result = self.arena.fresh_type();
        let call = Type::function(args, result.clone());
        self.unify(callee, &call, span);
        result
    }
}

fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Nil => Type::Nil,
        Literal::Bool(_) => Type::Bool,
        Literal::Number(_) => Type::Number,
        Literal::String(_) => Type::String,
    }
}
