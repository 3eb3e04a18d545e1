use std::fmt;

use tracing::trace;

use crate::ast::{
    AssignmentStmt, BinaryExpr, BinaryOp, Block, BoolLiteral, CallExpr, DoStmt, Expr, ForInStmt,
    ForStmt, FunctionExpr, FunctionStmt, GotoStmt, Identifier, IfClause, IfStmt, IndexExpr,
    IndexKind, LabelStmt, LocalStmt, NumberLiteral, RepeatStmt, ReturnStmt, Stmt, StringLiteral,
    TableExpr, TableField, UnaryExpr, UnaryOp, WhileStmt,
};
use crate::lexer::{LexError, LexErrorKind, Lexer};
use crate::line_index::LineIndex;
use crate::token::{Pos, Position, Span, Token, TokenKind};

/// Nesting limit for blocks and expressions.
const MAX_DEPTH: usize = 200;

/// Classifies a syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A specific token was required here.
    Expected { expected: String, found: String },
    /// A closing token for a construct opened on an earlier line is missing.
    Unclosed {
        expected: String,
        opener: String,
        line: usize,
        found: String,
    },
    ExpectedExpression { found: String },
    UnexpectedToken { found: String },
    /// Text the lexer could not classify.
    InvalidToken { text: String },
    /// An expression that is neither a call nor an assignment.
    NotAStatement,
    InvalidAssignmentTarget,
    TooDeep,
    Lex(LexErrorKind),
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::Unclosed {
                expected,
                opener,
                line,
                found,
            } => write!(
                f,
                "expected {expected} (to close {opener} at line {line}), found {found}"
            ),
            Self::ExpectedExpression { found } => write!(f, "expected expression, found {found}"),
            Self::UnexpectedToken { found } => write!(f, "unexpected {found}"),
            Self::InvalidToken { text } => write!(f, "unexpected symbol '{text}'"),
            Self::NotAStatement => write!(f, "expression is not a statement"),
            Self::InvalidAssignmentTarget => write!(f, "cannot assign to this expression"),
            Self::TooDeep => write!(f, "too many nested levels"),
            Self::Lex(kind) => write!(f, "{kind}"),
        }
    }
}

/// Error recorded while parsing. Parsing always continues past it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Span,
    pub position: Position,
}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        Self {
            kind: SyntaxErrorKind::Lex(err.kind),
            span: err.span,
            position: err.position,
        }
    }
}

/// Tree plus every error found, ordered by source position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub block: Block,
    pub errors: Vec<SyntaxError>,
}

impl ParseResult {
    /// Returns true when no syntax error was recorded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a Lua chunk. Never fails: malformed input yields a partial
/// tree and a list of errors.
#[must_use]
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let block = parser.parse_chunk();
    let errors = parser.finish();
    trace!(errors = errors.len(), "parsed chunk");
    ParseResult { block, errors }
}

/// Parse a single expression, reporting any trailing tokens as errors.
#[must_use]
pub fn parse_expression(source: &str) -> (Expr, Vec<SyntaxError>) {
    let mut parser = Parser::new(source);
    let expr = parser.parse_expr();
    if parser.current.kind != TokenKind::Eof {
        parser.unexpected();
    }
    (expr, parser.finish())
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    /// End of the last consumed token.
    prev_end: Pos,
    depth: usize,
    errors: Vec<SyntaxError>,
    lines: LineIndex,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next().unwrap_or_else(|| eof_token(source.len()));
        let peek = lexer.next().unwrap_or_else(|| current.clone());
        Self {
            lexer,
            current,
            peek,
            prev_end: 0,
            depth: 0,
            errors: Vec::new(),
            lines: LineIndex::new(source),
        }
    }

    fn finish(mut self) -> Vec<SyntaxError> {
        let mut errors = self.errors;
        errors.extend(self.lexer.take_errors().into_iter().map(SyntaxError::from));
        errors.sort_by_key(|e| e.span.start);
        errors
    }

    // ----- token handling -----

    fn bump(&mut self) -> Token {
        let next = self.lexer.next().unwrap_or_else(|| self.peek.clone());
        let peek = std::mem::replace(&mut self.peek, next);
        let token = std::mem::replace(&mut self.current, peek);
        if token.kind != TokenKind::Eof {
            self.prev_end = token.span.end;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let found = self.current.describe();
        self.error_here(SyntaxErrorKind::Expected {
            expected: kind.to_string(),
            found,
        });
        false
    }

    /// Expect the token closing a construct opened by `opener` at `line`.
    fn expect_closing(&mut self, kind: &TokenKind, opener: &TokenKind, line: usize) -> bool {
        if line == self.current.range.start.line {
            return self.expect(kind);
        }
        if self.eat(kind) {
            return true;
        }
        let found = self.current.describe();
        self.error_here(SyntaxErrorKind::Unclosed {
            expected: kind.to_string(),
            opener: opener.to_string(),
            line,
            found,
        });
        false
    }

    fn span_from(&self, start: Pos) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    // ----- errors -----

    fn error(&mut self, kind: SyntaxErrorKind, span: Span) {
        if self.errors.last().is_some_and(|e| e.span.start == span.start) {
            return;
        }
        let position = self.lines.position(span.start);
        self.errors.push(SyntaxError {
            kind,
            span,
            position,
        });
    }

    fn error_here(&mut self, kind: SyntaxErrorKind) {
        let span = self.current.span;
        self.error(kind, span);
    }

    /// Report the current token as out of place.
    fn unexpected(&mut self) {
        let kind = if self.current.kind == TokenKind::Invalid {
            SyntaxErrorKind::InvalidToken {
                text: self.current.text.clone(),
            }
        } else {
            SyntaxErrorKind::UnexpectedToken {
                found: self.current.describe(),
            }
        };
        self.error_here(kind);
    }

    /// Skip the offending token, then everything up to the next token
    /// that can begin a statement or close a block.
    fn synchronize(&mut self) {
        let from = self.current.span.start;
        if !self.at(&TokenKind::Eof) {
            self.bump();
        }
        while !self.current.kind.is_block_end() && !self.at_statement_start() {
            self.bump();
        }
        trace!(from, to = self.current.span.start, "resynchronized");
    }

    const fn at_statement_start(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Semicolon
                | TokenKind::DoubleColon
                | TokenKind::Break
                | TokenKind::Goto
                | TokenKind::Do
                | TokenKind::While
                | TokenKind::Repeat
                | TokenKind::If
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::Local
                | TokenKind::Return
                | TokenKind::Ident
        )
    }

    // ----- blocks and statements -----

    fn parse_chunk(&mut self) -> Block {
        let mut stmts = Vec::new();
        loop {
            self.parse_stmts(&mut stmts);
            if self.at(&TokenKind::Eof) {
                break;
            }
            // stray `end`, `else`, `elseif` or `until` at top level
            self.unexpected();
            self.bump();
        }
        block_from(stmts, 0)
    }

    fn parse_block(&mut self) -> Block {
        let mut stmts = Vec::new();
        if self.depth >= MAX_DEPTH {
            self.error_here(SyntaxErrorKind::TooDeep);
        } else {
            self.depth += 1;
            self.parse_stmts(&mut stmts);
            self.depth -= 1;
        }
        block_from(stmts, self.prev_end)
    }

    fn parse_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        while !self.current.kind.is_block_end() {
            if self.at(&TokenKind::Return) {
                stmts.push(self.parse_return());
                if !self.current.kind.is_block_end() {
                    // `return` must be the last statement of a block
                    self.unexpected();
                }
                continue;
            }
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        let stmt = match self.current.kind {
            TokenKind::Semicolon => Stmt::Semicolon(self.bump().span),
            TokenKind::Break => Stmt::Break(self.bump().span),
            TokenKind::DoubleColon => self.parse_label(),
            TokenKind::Goto => self.parse_goto(),
            TokenKind::Do => self.parse_do(),
            TokenKind::While => self.parse_while(),
            TokenKind::Repeat => self.parse_repeat(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function_stmt(),
            TokenKind::Local => self.parse_local(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Ident | TokenKind::LParen => self.parse_expr_stmt(),
            _ => {
                self.unexpected();
                self.synchronize();
                return None;
            }
        };
        Some(stmt)
    }

    fn parse_label(&mut self) -> Stmt {
        let start = self.bump().span.start;
        let name = self.parse_name();
        self.expect(&TokenKind::DoubleColon);
        Stmt::Label(LabelStmt {
            name,
            span: self.span_from(start),
        })
    }

    fn parse_goto(&mut self) -> Stmt {
        let start = self.bump().span.start;
        let label = self.parse_name();
        Stmt::Goto(GotoStmt {
            label,
            span: self.span_from(start),
        })
    }

    fn parse_do(&mut self) -> Stmt {
        let open = self.bump();
        let body = self.parse_block();
        self.expect_closing(&TokenKind::End, &open.kind, open.range.start.line);
        Stmt::Do(DoStmt {
            body,
            span: self.span_from(open.span.start),
        })
    }

    fn parse_while(&mut self) -> Stmt {
        let open = self.bump();
        let condition = self.parse_expr();
        self.expect(&TokenKind::Do);
        let body = self.parse_block();
        self.expect_closing(&TokenKind::End, &open.kind, open.range.start.line);
        Stmt::While(WhileStmt {
            condition,
            body,
            span: self.span_from(open.span.start),
        })
    }

    fn parse_repeat(&mut self) -> Stmt {
        let open = self.bump();
        let body = self.parse_block();
        self.expect_closing(&TokenKind::Until, &open.kind, open.range.start.line);
        let condition = self.parse_expr();
        Stmt::Repeat(RepeatStmt {
            body,
            condition,
            span: self.span_from(open.span.start),
        })
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.current.span.start;
        let line = self.current.range.start.line;
        let mut clauses = Vec::new();

        loop {
            // `if` on the first pass, `elseif` afterwards
            let clause_start = self.bump().span.start;
            let condition = self.parse_expr();
            self.expect(&TokenKind::Then);
            let body = self.parse_block();
            clauses.push(IfClause {
                condition: Some(condition),
                body,
                span: self.span_from(clause_start),
            });
            if !self.at(&TokenKind::ElseIf) {
                break;
            }
        }

        if self.at(&TokenKind::Else) {
            let clause_start = self.bump().span.start;
            let body = self.parse_block();
            clauses.push(IfClause {
                condition: None,
                body,
                span: self.span_from(clause_start),
            });
        }

        self.expect_closing(&TokenKind::End, &TokenKind::If, line);
        Stmt::If(IfStmt {
            clauses,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> Stmt {
        let open = self.bump();
        let start = open.span.start;
        let line = open.range.start.line;
        let first = self.parse_name();

        if self.eat(&TokenKind::Assign) {
            let from = self.parse_expr();
            self.expect(&TokenKind::Comma);
            let limit = self.parse_expr();
            let step = self.eat(&TokenKind::Comma).then(|| self.parse_expr());
            self.expect(&TokenKind::Do);
            let body = self.parse_block();
            self.expect_closing(&TokenKind::End, &open.kind, line);
            return Stmt::For(ForStmt {
                var: first,
                start: from,
                limit,
                step,
                body,
                span: self.span_from(start),
            });
        }

        if !self.at(&TokenKind::Comma) && !self.at(&TokenKind::In) {
            let found = self.current.describe();
            self.error_here(SyntaxErrorKind::Expected {
                expected: "'=' or 'in'".to_string(),
                found,
            });
        }
        let mut names = vec![first];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_name());
        }
        self.expect(&TokenKind::In);
        let exprs = self.parse_expr_list();
        self.expect(&TokenKind::Do);
        let body = self.parse_block();
        self.expect_closing(&TokenKind::End, &open.kind, line);
        Stmt::ForIn(ForInStmt {
            names,
            exprs,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_function_stmt(&mut self) -> Stmt {
        let open = self.bump();
        let name = self.parse_function_name();
        let (params, vararg, body) = self.parse_function_body(open.range.start.line);
        Stmt::Function(FunctionStmt {
            local: false,
            name,
            params,
            vararg,
            body,
            span: self.span_from(open.span.start),
        })
    }

    /// `a.b.c:m` in `function a.b.c:m() end`.
    fn parse_function_name(&mut self) -> Expr {
        let mut name = Expr::Ident(self.parse_name());
        loop {
            let kind = match self.current.kind {
                TokenKind::Dot => IndexKind::Dot,
                TokenKind::Colon => IndexKind::Colon,
                _ => break,
            };
            self.bump();
            let key = self.parse_name();
            let span = self.span_from(name.span().start);
            name = Expr::Index(IndexExpr {
                left: Box::new(name),
                key: Box::new(Expr::Ident(key)),
                kind,
                span,
            });
            if kind == IndexKind::Colon {
                break;
            }
        }
        name
    }

    fn parse_local(&mut self) -> Stmt {
        let open = self.bump();
        let start = open.span.start;

        if self.at(&TokenKind::Function) {
            let line = self.bump().range.start.line;
            let name = Expr::Ident(self.parse_name());
            let (params, vararg, body) = self.parse_function_body(line);
            return Stmt::Function(FunctionStmt {
                local: true,
                name,
                params,
                vararg,
                body,
                span: self.span_from(start),
            });
        }

        let mut names = vec![self.parse_name()];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_name());
        }
        let exprs = if self.eat(&TokenKind::Assign) {
            self.parse_expr_list()
        } else {
            Vec::new()
        };
        Stmt::Local(LocalStmt {
            names,
            exprs,
            span: self.span_from(start),
        })
    }

    fn parse_return(&mut self) -> Stmt {
        let start = self.bump().span.start;
        let exprs = if self.current.kind.is_block_end() || self.at(&TokenKind::Semicolon) {
            Vec::new()
        } else {
            self.parse_expr_list()
        };
        self.eat(&TokenKind::Semicolon);
        Stmt::Return(ReturnStmt {
            exprs,
            span: self.span_from(start),
        })
    }

    /// Call statement or assignment, both starting with a suffixed
    /// expression.
    fn parse_expr_stmt(&mut self) -> Stmt {
        let expr = self.parse_suffixed_expr();
        if self.at(&TokenKind::Assign) || self.at(&TokenKind::Comma) {
            return self.parse_assignment(expr);
        }
        match expr {
            Expr::Call(call) => Stmt::Call(call),
            other => {
                self.error(SyntaxErrorKind::NotAStatement, other.span());
                Stmt::Incomplete(other)
            }
        }
    }

    fn parse_assignment(&mut self, first: Expr) -> Stmt {
        let start = first.span().start;
        let mut vars = vec![first];
        while self.eat(&TokenKind::Comma) {
            vars.push(self.parse_suffixed_expr());
        }
        for var in &vars {
            if !var.is_assignable() && !matches!(var, Expr::Error(_)) {
                self.error(SyntaxErrorKind::InvalidAssignmentTarget, var.span());
            }
        }
        let exprs = if self.expect(&TokenKind::Assign) {
            self.parse_expr_list()
        } else {
            Vec::new()
        };
        Stmt::Assignment(AssignmentStmt {
            vars,
            exprs,
            span: self.span_from(start),
        })
    }

    // ----- functions -----

    /// `(params) block end`, after the name.
    fn parse_function_body(&mut self, line: usize) -> (Vec<Identifier>, bool, Block) {
        let mut params = Vec::new();
        let mut vararg = false;

        if self.expect(&TokenKind::LParen) {
            if !self.at(&TokenKind::RParen) {
                loop {
                    if self.eat(&TokenKind::Ellipsis) {
                        vararg = true;
                        break;
                    }
                    if !self.at(&TokenKind::Ident) {
                        let found = self.current.describe();
                        self.error_here(SyntaxErrorKind::Expected {
                            expected: "parameter name".to_string(),
                            found,
                        });
                        break;
                    }
                    params.push(self.parse_name());
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen);
        }

        let body = self.parse_block();
        self.expect_closing(&TokenKind::End, &TokenKind::Function, line);
        (params, vararg, body)
    }

    fn parse_name(&mut self) -> Identifier {
        if self.at(&TokenKind::Ident) {
            let token = self.bump();
            return Identifier::new(token.text, token.span);
        }
        let found = self.current.describe();
        self.error_here(SyntaxErrorKind::Expected {
            expected: "identifier".to_string(),
            found,
        });
        Identifier::new("", Span::empty(self.prev_end))
    }

    // ----- expressions -----

    fn parse_expr_list(&mut self) -> Vec<Expr> {
        let mut exprs = vec![self.parse_expr()];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_expr());
        }
        exprs
    }

    fn parse_expr(&mut self) -> Expr {
        self.parse_subexpr(0)
    }

    /// Operator-precedence loop: keep folding binary operators whose
    /// left binding power exceeds `limit`.
    fn parse_subexpr(&mut self, limit: u8) -> Expr {
        if self.depth >= MAX_DEPTH {
            self.error_here(SyntaxErrorKind::TooDeep);
            return Expr::Error(Span::empty(self.prev_end));
        }
        self.depth += 1;

        let first = self.current.span.start;
        let mut left = if let Some(op) = unary_op(&self.current.kind) {
            let start = self.bump().span.start;
            let operand = self.parse_subexpr(UnaryOp::BINDING_POWER);
            Expr::Unary(UnaryExpr {
                op,
                operand: Box::new(operand),
                span: self.span_from(start),
            })
        } else {
            self.parse_simple_expr()
        };

        // each fold nests `left` one level deeper
        let mut folds = 0;
        let mut truncated = false;
        while let Some(op) = binary_op(&self.current.kind) {
            let (left_bp, right_bp) = op.binding_power();
            if left_bp <= limit {
                break;
            }
            let operator = self.bump();
            let right = self.parse_subexpr(right_bp);
            if !self.enter_nested(&mut truncated, operator.span) {
                continue;
            }
            folds += 1;
            // a parenthesized left operand starts at its `(`
            let span = self.span_from(first.min(left.span().start));
            left = Expr::Binary(BinaryExpr {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            });
        }

        self.depth -= 1 + folds;
        if truncated {
            widen_to(&mut left, self.prev_end);
        }
        left
    }

    /// Charge one level of nesting for a fold or suffix of a chain.
    /// Past the limit the chain is still consumed but no longer grows;
    /// `TooDeep` is reported once per chain.
    fn enter_nested(&mut self, truncated: &mut bool, at: Span) -> bool {
        if self.depth + 1 < MAX_DEPTH {
            self.depth += 1;
            return true;
        }
        if !*truncated {
            *truncated = true;
            self.error(SyntaxErrorKind::TooDeep, at);
        }
        false
    }

    fn parse_simple_expr(&mut self) -> Expr {
        match self.current.kind {
            TokenKind::Number { .. }
            | TokenKind::String { .. }
            | TokenKind::RawString { .. }
            | TokenKind::Nil
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Ellipsis => {
                let token = self.bump();
                literal(token)
            }
            TokenKind::LBrace => self.parse_table(),
            TokenKind::Function => {
                let open = self.bump();
                let (params, vararg, body) = self.parse_function_body(open.range.start.line);
                Expr::Function(FunctionExpr {
                    params,
                    vararg,
                    body,
                    span: self.span_from(open.span.start),
                })
            }
            _ => self.parse_suffixed_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        match self.current.kind {
            TokenKind::Ident => Expr::Ident(self.parse_name()),
            TokenKind::LParen => {
                let open = self.bump();
                let inner = self.parse_expr();
                self.expect_closing(&TokenKind::RParen, &open.kind, open.range.start.line);
                inner
            }
            TokenKind::Invalid => {
                self.unexpected();
                Expr::Error(Span::empty(self.prev_end))
            }
            _ => {
                let found = self.current.describe();
                self.error_here(SyntaxErrorKind::ExpectedExpression { found });
                Expr::Error(Span::empty(self.prev_end))
            }
        }
    }

    /// Primary expression followed by any chain of `.name`, `[expr]`,
    /// `:name args` and call suffixes.
    fn parse_suffixed_expr(&mut self) -> Expr {
        let first = self.current.span.start;
        let mut expr = self.parse_primary_expr();
        let start = first.min(expr.span().start);
        let mut suffixes = 0;
        let mut truncated = false;
        while matches!(
            self.current.kind,
            TokenKind::Dot
                | TokenKind::LBracket
                | TokenKind::Colon
                | TokenKind::LParen
                | TokenKind::String { .. }
                | TokenKind::RawString { .. }
                | TokenKind::LBrace
        ) {
            let at = self.current.span;
            if self.enter_nested(&mut truncated, at) {
                suffixes += 1;
                expr = self.parse_suffix(expr, start);
            } else {
                self.parse_suffix(Expr::Error(Span::empty(at.start)), at.start);
            }
        }
        self.depth -= suffixes;
        if truncated {
            widen_to(&mut expr, self.prev_end);
        }
        expr
    }

    /// One suffix applied to `expr`, whose chain began at `start`. The
    /// current token starts the suffix.
    fn parse_suffix(&mut self, expr: Expr, start: Pos) -> Expr {
        match self.current.kind {
            TokenKind::Dot => {
                self.bump();
                let key = self.parse_name();
                Expr::Index(IndexExpr {
                    left: Box::new(expr),
                    key: Box::new(Expr::Ident(key)),
                    kind: IndexKind::Dot,
                    span: self.span_from(start),
                })
            }
            TokenKind::LBracket => {
                self.bump();
                let key = self.parse_expr();
                self.expect(&TokenKind::RBracket);
                Expr::Index(IndexExpr {
                    left: Box::new(expr),
                    key: Box::new(key),
                    kind: IndexKind::Bracket,
                    span: self.span_from(start),
                })
            }
            TokenKind::Colon => {
                self.bump();
                let key = self.parse_name();
                let callee = Expr::Index(IndexExpr {
                    left: Box::new(expr),
                    key: Box::new(Expr::Ident(key)),
                    kind: IndexKind::Colon,
                    span: self.span_from(start),
                });
                let args = self.parse_call_args();
                Expr::Call(CallExpr {
                    callee: Box::new(callee),
                    args,
                    span: self.span_from(start),
                })
            }
            _ => {
                let args = self.parse_call_args();
                Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    args,
                    span: self.span_from(start),
                })
            }
        }
    }

    fn parse_call_args(&mut self) -> Vec<Expr> {
        match self.current.kind {
            TokenKind::LParen => {
                let open = self.bump();
                let args = if self.at(&TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()
                };
                self.expect_closing(&TokenKind::RParen, &open.kind, open.range.start.line);
                args
            }
            TokenKind::String { .. } | TokenKind::RawString { .. } => {
                let token = self.bump();
                vec![literal(token)]
            }
            TokenKind::LBrace => vec![self.parse_table()],
            _ => {
                let found = self.current.describe();
                self.error_here(SyntaxErrorKind::Expected {
                    expected: "function arguments".to_string(),
                    found,
                });
                Vec::new()
            }
        }
    }

    fn parse_table(&mut self) -> Expr {
        let open = self.bump();
        let mut fields = Vec::new();

        while !self.at(&TokenKind::RBrace) && !self.at(&TokenKind::Eof) {
            let field = match self.current.kind {
                TokenKind::LBracket => {
                    let start = self.bump().span.start;
                    let key = self.parse_expr();
                    self.expect(&TokenKind::RBracket);
                    self.expect(&TokenKind::Assign);
                    let value = self.parse_expr();
                    TableField::Computed {
                        key,
                        value,
                        span: self.span_from(start),
                    }
                }
                TokenKind::Ident if self.peek.kind == TokenKind::Assign => {
                    let name = self.parse_name();
                    self.bump();
                    let value = self.parse_expr();
                    TableField::Named { name, value }
                }
                _ => TableField::Positional(self.parse_expr()),
            };
            fields.push(field);
            if !self.eat(&TokenKind::Comma) && !self.eat(&TokenKind::Semicolon) {
                break;
            }
        }

        self.expect_closing(&TokenKind::RBrace, &open.kind, open.range.start.line);
        Expr::Table(TableExpr {
            fields,
            span: self.span_from(open.span.start),
        })
    }
}

fn literal(token: Token) -> Expr {
    let span = token.span;
    match token.kind {
        TokenKind::Number { value } => Expr::Number(NumberLiteral {
            raw: token.text,
            value,
            span,
        }),
        TokenKind::String { value } | TokenKind::RawString { value, .. } => {
            Expr::String(StringLiteral {
                raw: token.text,
                value,
                span,
            })
        }
        TokenKind::True => Expr::Bool(BoolLiteral { value: true, span }),
        TokenKind::False => Expr::Bool(BoolLiteral { value: false, span }),
        TokenKind::Nil => Expr::Nil(span),
        TokenKind::Ellipsis => Expr::Vararg(span),
        _ => Expr::Error(Span::empty(span.start)),
    }
}

const fn unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Hash => Some(UnaryOp::Len),
        _ => None,
    }
}

const fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Or => BinaryOp::Or,
        TokenKind::And => BinaryOp::And,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::NotEqual => BinaryOp::NotEqual,
        TokenKind::Equal => BinaryOp::Equal,
        TokenKind::Concat => BinaryOp::Concat,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::Caret => BinaryOp::Pow,
        _ => return None,
    };
    Some(op)
}

/// Block spanning its statements, or an empty span at `fallback`.
/// Stretch the outermost node of a truncated chain over the tail that
/// was consumed but dropped.
fn widen_to(expr: &mut Expr, end: Pos) {
    match expr {
        Expr::Binary(e) => e.span.end = end,
        Expr::Index(e) => e.span.end = end,
        Expr::Call(e) => e.span.end = end,
        _ => {}
    }
}

fn block_from(stmts: Vec<Stmt>, fallback: Pos) -> Block {
    let span = match (stmts.first(), stmts.last()) {
        (Some(first), Some(last)) => first.span().to(last.span()),
        _ => Span::empty(fallback),
    };
    Block { stmts, span }
}

fn eof_token(len: usize) -> Token {
    Token {
        kind: TokenKind::Eof,
        text: String::new(),
        span: Span::empty(len),
        range: crate::token::Range::default(),
    }
}
