use lox_base::{Diagnostic, Span};

use crate::ast::{
    BinaryOp, Expr, ExprId, ExprKind, FunctionDecl, Literal, LogicalOp, Program, SpannedName,
    Stmt, UnaryOp,
};
use crate::lexer::lex;
use crate::token::{Token, TokenKind};

const MAX_ARITY: usize = 255;

/// Lexes and parses `source`, returning every lexical and syntax diagnostic together.
pub fn parse(source: &str) -> (Program, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = lex(source);
    let (program, parse_diagnostics) = parse_tokens(tokens);
    diagnostics.extend(parse_diagnostics);
    (program, diagnostics)
}

pub fn parse_tokens(tokens: Vec<Token>) -> (Program, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.declarations_until(TokenKind::Eof);
    let program = Program {
        statements,
        expr_count: parser.next_id,
    };
    (program, parser.diagnostics)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|token| token.kind != TokenKind::Eof) {
            let end = tokens.last().map(|token| token.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", Span::new(end.end, end.end)));
        }
        Self {
            tokens,
            pos: 0,
            next_id: 0,
            diagnostics: Vec::new(),
        }
    }

    // Declarations and statements

    fn declarations_until(&mut self, end: TokenKind) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.check(end) && !self.at_end() {
            if self.check(TokenKind::Class) {
                self.skip_class();
                continue;
            }
            match self.declaration() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        match self.peek().kind {
            TokenKind::Var => {
                self.advance();
                self.var_declaration()
            }
            TokenKind::Fun if self.peek_next_kind() == TokenKind::Identifier => {
                self.advance();
                self.function("function").map(Stmt::Function)
            }
            _ => self.statement(),
        }
    }

    fn var_declaration(&mut self) -> Option<Stmt> {
        let name = self.identifier("expected variable name")?;
        let init = if self.matches(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "expected ';' after variable declaration")?;
        Some(Stmt::Var { name, init })
    }

    /// Reports a class declaration and skips over its balanced body.
    fn skip_class(&mut self) {
        let keyword = self.advance().span;
        self.error_at(keyword, "E1104", "classes are not supported by the type checker");
        while !self.at_end() && !self.check(TokenKind::LeftBrace) {
            self.advance();
        }
        let mut depth = 0usize;
        while !self.at_end() {
            match self.advance().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Parses the remainder of a function after `fun`, with or without a name.
    fn function(&mut self, kind: &str) -> Option<FunctionDecl> {
        let start = self.previous().span;
        let name = if self.check(TokenKind::Identifier) {
            Some(self.identifier(&format!("expected {kind} name"))?)
        } else {
            None
        };
        self.consume(TokenKind::LeftParen, &format!("expected '(' after {kind} name"))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let span = self.peek().span;
                    self.error_at(span, "E1103", "can't have more than 255 parameters");
                }
                params.push(self.identifier("expected parameter name")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;
        self.consume(TokenKind::LeftBrace, &format!("expected '{{' before {kind} body"))?;
        let body = self.block()?;
        Some(FunctionDecl {
            name,
            params,
            body,
            span: start.to(self.previous().span),
        })
    }

    fn statement(&mut self) -> Option<Stmt> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Print => {
                self.advance();
                let value = self.expression()?;
                self.consume(TokenKind::Semicolon, "expected ';' after value")?;
                Some(Stmt::Print(value))
            }
            TokenKind::LeftBrace => {
                self.advance();
                Some(Stmt::Block(self.block()?))
            }
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
                let condition = self.expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after condition")?;
                let body = Box::new(self.statement()?);
                Some(Stmt::Loop {
                    condition,
                    body,
                    on_loop: None,
                })
            }
            TokenKind::For => {
                self.advance();
                self.for_statement(token.span)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume(TokenKind::Semicolon, "expected ';' after return value")?;
                Some(Stmt::Return {
                    value,
                    span: token.span.to(self.previous().span),
                })
            }
            TokenKind::Break => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';' after 'break'")?;
                Some(Stmt::Break(token.span))
            }
            TokenKind::Continue => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';' after 'continue'")?;
                Some(Stmt::Continue(token.span))
            }
            _ => {
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
                Some(Stmt::Expression(expr))
            }
        }
    }

    fn if_statement(&mut self) -> Option<Stmt> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Some(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `for (init; cond; step) body` becomes `{ init; loop(cond) body step }`.
    fn for_statement(&mut self, keyword: Span) -> Option<Stmt> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'for'")?;
        let init = if self.matches(TokenKind::Semicolon) {
            None
        } else if self.matches(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            let expr = self.expression()?;
            self.consume(TokenKind::Semicolon, "expected ';' after loop initializer")?;
            Some(Stmt::Expression(expr))
        };
        let condition = if self.check(TokenKind::Semicolon) {
            self.make_expr(ExprKind::Literal(Literal::Bool(true)), keyword)
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "expected ';' after loop condition")?;
        let on_loop = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "expected ')' after for clauses")?;
        let body = Box::new(self.statement()?);
        let looped = Stmt::Loop {
            condition,
            body,
            on_loop,
        };
        Some(Stmt::Block(init.into_iter().chain([looped]).collect()))
    }

    fn block(&mut self) -> Option<Vec<Stmt>> {
        let statements = self.declarations_until(TokenKind::RightBrace);
        self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        Some(statements)
    }

    // Expressions

    fn expression(&mut self) -> Option<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Option<Expr> {
        let target = self.or()?;
        if !self.matches(TokenKind::Equal) {
            return Some(target);
        }
        let equals = self.previous().span;
        let value = self.assignment()?;
        let ExprKind::Variable(name) = &target.kind else {
            self.error_at(equals, "E1102", "invalid assignment target");
            return Some(target);
        };
        let name = name.clone();
        let span = target.span.to(value.span);
        Some(self.make_expr(
            ExprKind::Assign {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn or(&mut self) -> Option<Expr> {
        let mut left = self.and()?;
        while self.matches(TokenKind::Or) {
            let right = self.and()?;
            left = self.logical(LogicalOp::Or, left, right);
        }
        Some(left)
    }

    fn and(&mut self) -> Option<Expr> {
        let mut left = self.equality()?;
        while self.matches(TokenKind::And) {
            let right = self.equality()?;
            left = self.logical(LogicalOp::And, left, right);
        }
        Some(left)
    }

    fn equality(&mut self) -> Option<Expr> {
        self.binary_level(Self::comparison, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOp::Equal),
            TokenKind::BangEqual => Some(BinaryOp::NotEqual),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Option<Expr> {
        self.binary_level(Self::term, |kind| match kind {
            TokenKind::Less => Some(BinaryOp::Less),
            TokenKind::LessEqual => Some(BinaryOp::LessEqual),
            TokenKind::Greater => Some(BinaryOp::Greater),
            TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
            _ => None,
        })
    }

    fn term(&mut self) -> Option<Expr> {
        self.binary_level(Self::factor, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn factor(&mut self) -> Option<Expr> {
        self.binary_level(Self::unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        operator: fn(TokenKind) -> Option<BinaryOp>,
    ) -> Option<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.peek().kind) {
            self.advance();
            let right = operand(self)?;
            let span = left.span.to(right.span);
            left = self.make_expr(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.call(),
        };
        let start = self.advance().span;
        let operand = self.unary()?;
        let span = start.to(operand.span);
        Some(self.make_expr(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn call(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.check(TokenKind::Dot) {
                let span = self.advance().span;
                self.error_at(span, "E1104", "property access is not supported by the type checker");
                return None;
            } else {
                return Some(expr);
            }
        }
    }

    fn finish_call(&mut self, callee: Expr) -> Option<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARITY {
                    let span = self.peek().span;
                    self.error_at(span, "E1103", "can't have more than 255 arguments");
                }
                args.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
        let span = callee.span.to(close);
        Some(self.make_expr(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::Nil => ExprKind::Literal(Literal::Nil),
            TokenKind::Number => match token.lexeme.parse::<f64>() {
                Ok(value) => ExprKind::Literal(Literal::Number(value)),
                Err(_) => {
                    self.error_at(token.span, "E1101", "malformed number literal");
                    return None;
                }
            },
            TokenKind::String => {
                let text = token
                    .lexeme
                    .strip_prefix('"')
                    .and_then(|rest| rest.strip_suffix('"'))
                    .unwrap_or(&token.lexeme);
                ExprKind::Literal(Literal::String(text.to_string()))
            }
            TokenKind::Identifier => ExprKind::Variable(SpannedName {
                name: token.lexeme.clone(),
                span: token.span,
            }),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                let close = self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                return Some(self.make_expr(ExprKind::Grouping(Box::new(inner)), token.span.to(close)));
            }
            TokenKind::Fun => {
                self.advance();
                let function = self.function("function")?;
                let span = function.span;
                return Some(self.make_expr(ExprKind::Function(function), span));
            }
            TokenKind::This | TokenKind::Super => {
                self.error_at(
                    token.span,
                    "E1104",
                    format!("'{}' is not supported by the type checker", token.lexeme),
                );
                return None;
            }
            _ => {
                self.error_at(token.span, "E1101", "expected expression");
                return None;
            }
        };
        self.advance();
        Some(self.make_expr(kind, token.span))
    }

    fn logical(&mut self, op: LogicalOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.to(right.span);
        self.make_expr(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn make_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr { id, kind, span }
    }

    // Token plumbing

    fn identifier(&mut self, message: &str) -> Option<SpannedName> {
        let span = self.consume(TokenKind::Identifier, message)?;
        Some(SpannedName {
            name: self.previous().lexeme.clone(),
            span,
        })
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Option<Span> {
        if self.check(kind) {
            return Some(self.advance().span);
        }
        let found = self.peek();
        let span = found.span;
        let message = if found.kind == TokenKind::Eof {
            format!("{message}, found end of file")
        } else {
            format!("{message}, found `{}`", found.lexeme)
        };
        self.error_at(span, "E1101", message);
        None
    }

    fn error_at(&mut self, span: Span, code: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    /// Skips to the next likely statement boundary after a syntax error.
    fn synchronize(&mut self) {
        if self.at_end() {
            return;
        }
        self.advance();
        while !self.at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_next_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }
}
