use crate::ast::{Expr, ExprKind, FunctionDecl, Literal, Program, SpannedName, Stmt};

/// Renders the program as parenthesized prefix forms, one top-level statement per line.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::default();
    for stmt in &program.statements {
        printer.stmt(stmt);
        printer.out.push('\n');
    }
    printer.out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layout {
    Inline,
    Nested,
}

enum Part<'a> {
    Text(String),
    Expr(&'a Expr),
    Stmt(&'a Stmt),
    Names(&'a [SpannedName]),
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let text = match literal {
                    Literal::Nil => "nil".to_string(),
                    Literal::Bool(value) => value.to_string(),
                    Literal::Number(value) => value.to_string(),
                    Literal::String(text) => format!("{text:?}"),
                };
                self.out.push_str(&text);
            }
            ExprKind::Grouping(inner) => {
                self.form(Layout::Inline, vec![text("group"), Part::Expr(inner)]);
            }
            ExprKind::Unary { op, operand } => {
                self.form(Layout::Inline, vec![text(op.symbol()), Part::Expr(operand)]);
            }
            ExprKind::Binary { op, left, right } => self.form(
                Layout::Inline,
                vec![text(op.symbol()), Part::Expr(left), Part::Expr(right)],
            ),
            ExprKind::Logical { op, left, right } => self.form(
                Layout::Inline,
                vec![text(op.symbol()), Part::Expr(left), Part::Expr(right)],
            ),
            ExprKind::Variable(name) => self.out.push_str(&name.name),
            ExprKind::Assign { name, value } => self.form(
                Layout::Inline,
                vec![text("set"), text(&name.name), Part::Expr(value)],
            ),
            ExprKind::Call { callee, args } => {
                let mut parts = vec![Part::Expr(callee)];
                parts.extend(args.iter().map(Part::Expr));
                self.form(Layout::Inline, parts);
            }
            ExprKind::Function(function) => self.function("fun", function),
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.form(Layout::Inline, vec![text("expr"), Part::Expr(expr)]),
            Stmt::Print(expr) => self.form(Layout::Inline, vec![text("print"), Part::Expr(expr)]),
            Stmt::Var { name, init } => {
                let mut parts = vec![text("var"), text(&name.name)];
                parts.extend(init.iter().map(Part::Expr));
                self.form(Layout::Inline, parts);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut parts = vec![text("if"), Part::Expr(condition), Part::Stmt(then_branch)];
                parts.extend(else_branch.as_deref().map(Part::Stmt));
                self.form(Layout::Nested, parts);
            }
            Stmt::Block(statements) => {
                let mut parts = vec![text("block")];
                parts.extend(statements.iter().map(Part::Stmt));
                self.form(Layout::Nested, parts);
            }
            Stmt::Loop {
                condition,
                body,
                on_loop,
            } => {
                let mut parts = vec![text("loop"), Part::Expr(condition), Part::Stmt(body)];
                parts.extend(on_loop.iter().map(Part::Expr));
                self.form(Layout::Nested, parts);
            }
            Stmt::Break(_) => self.out.push_str("break"),
            Stmt::Continue(_) => self.out.push_str("continue"),
            Stmt::Function(function) => self.function("defun", function),
            Stmt::Return { value, .. } => {
                let mut parts = vec![text("return")];
                parts.extend(value.iter().map(Part::Expr));
                self.form(Layout::Inline, parts);
            }
        }
    }

    fn function(&mut self, head: &str, function: &FunctionDecl) {
        let mut parts = vec![text(head)];
        parts.extend(function.name.iter().map(|name| text(&name.name)));
        parts.push(Part::Names(&function.params));
        parts.extend(function.body.iter().map(Part::Stmt));
        self.form(Layout::Nested, parts);
    }

    fn form(&mut self, layout: Layout, parts: Vec<Part<'_>>) {
        let layout = if parts.len() <= 2 { Layout::Inline } else { layout };
        self.out.push('(');
        let last = parts.len().saturating_sub(1);
        match layout {
            Layout::Inline => {
                for (index, part) in parts.into_iter().enumerate() {
                    self.part(part);
                    if index < last {
                        self.out.push(' ');
                    }
                }
            }
            Layout::Nested => {
                self.depth += 1;
                for (index, part) in parts.into_iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(&"  ".repeat(self.depth));
                    }
                    self.part(part);
                    if index < last {
                        self.out.push('\n');
                    }
                }
                self.depth -= 1;
            }
        }
        self.out.push(')');
    }

    fn part(&mut self, part: Part<'_>) {
        match part {
            Part::Text(text) => self.out.push_str(&text),
            Part::Expr(expr) => self.expr(expr),
            Part::Stmt(stmt) => self.stmt(stmt),
            Part::Names(names) => {
                let names = names.iter().map(|name| text(&name.name)).collect();
                self.form(Layout::Inline, names);
            }
        }
    }
}

fn text(value: &str) -> Part<'static> {
    Part::Text(value.to_string())
}
