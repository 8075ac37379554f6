use lox_base::Span;
use serde::Serialize;

/// Identity of an expression node within one parsed program.
///
/// Ids are dense and assigned in parse order, so two syntactically equal occurrences are always
/// distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpannedName {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    Grouping(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Variable(SpannedName),
    Assign {
        name: SpannedName,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Function(FunctionDecl),
}

/// A named declaration (`fun f(...) {...}`) or an anonymous function expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Option<SpannedName>,
    pub params: Vec<SpannedName>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var {
        name: SpannedName,
        init: Option<Expr>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    /// `while` and desugared `for` loops. `on_loop` runs after each iteration of the body.
    Loop {
        condition: Expr,
        body: Box<Stmt>,
        on_loop: Option<Expr>,
    },
    Break(Span),
    Continue(Span),
    Function(FunctionDecl),
    Return {
        value: Option<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    /// Number of expression ids handed out; every [`ExprId`] in the tree is below this.
    pub expr_count: u32,
}

impl Program {
    /// Every expression in the tree, parents before children, in source order.
    pub fn expressions(&self) -> Vec<&Expr> {
        let mut out = Vec::with_capacity(self.expr_count as usize);
        for stmt in &self.statements {
            collect_stmt(stmt, &mut out);
        }
        out
    }
}

fn collect_stmt<'a>(stmt: &'a Stmt, out: &mut Vec<&'a Expr>) {
    match stmt {
        Stmt::Expression(expr) | Stmt::Print(expr) => collect_expr(expr, out),
        Stmt::Var { init, .. } => init.iter().for_each(|init| collect_expr(init, out)),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_expr(condition, out);
            collect_stmt(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_stmt(else_branch, out);
            }
        }
        Stmt::Block(statements) => statements.iter().for_each(|stmt| collect_stmt(stmt, out)),
        Stmt::Loop {
            condition,
            body,
            on_loop,
        } => {
            collect_expr(condition, out);
            collect_stmt(body, out);
            if let Some(on_loop) = on_loop {
                collect_expr(on_loop, out);
            }
        }
        Stmt::Function(function) => {
            function.body.iter().for_each(|stmt| collect_stmt(stmt, out));
        }
        Stmt::Return { value, .. } => value.iter().for_each(|value| collect_expr(value, out)),
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn collect_expr<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    out.push(expr);
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Variable(_) => {}
        ExprKind::Grouping(inner) => collect_expr(inner, out),
        ExprKind::Unary { operand, .. } => collect_expr(operand, out),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        ExprKind::Assign { value, .. } => collect_expr(value, out),
        ExprKind::Call { callee, args } => {
            collect_expr(callee, out);
            args.iter().for_each(|arg| collect_expr(arg, out));
        }
        ExprKind::Function(function) => {
            function.body.iter().for_each(|stmt| collect_stmt(stmt, out));
        }
    }
}
