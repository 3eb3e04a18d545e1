//! Syntax tree for Lua source.
//!
//! Every node carries the byte [`Span`] of the tokens it was parsed
//! from; a parent's span always encloses the spans of its children.
//! [`NodeRef`] gives the walker and the query layer one uniform,
//! borrowed view over all node families.

use crate::token::Span;

/// Ordered list of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Name occurrence, either a declaration or a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Synthesized in place of a missing name.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `a, b.c = 1, 2`
    Assignment(AssignmentStmt),
    Break(Span),
    /// A function or method call used as a statement.
    Call(CallExpr),
    Do(DoStmt),
    /// Numeric `for i = a, b, c do ... end`.
    For(ForStmt),
    /// Generic `for k, v in explist do ... end`.
    ForIn(ForInStmt),
    Function(FunctionStmt),
    Goto(GotoStmt),
    If(IfStmt),
    /// `::name::`
    Label(LabelStmt),
    Local(LocalStmt),
    Repeat(RepeatStmt),
    Return(ReturnStmt),
    Semicolon(Span),
    While(WhileStmt),
    /// Expression that is not a statement on its own, such as a
    /// half-typed `foo.bar`. Always accompanied by a syntax error.
    Incomplete(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub vars: Vec<Expr>,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoStmt {
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: Identifier,
    pub start: Expr,
    pub limit: Expr,
    pub step: Option<Expr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForInStmt {
    pub names: Vec<Identifier>,
    pub exprs: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// `function a.b:c() end` or `local function f() end`.
///
/// `name` is an [`Expr::Ident`] for plain and local functions and an
/// [`Expr::Index`] chain for `a.b` / `a:b` names.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStmt {
    pub local: bool,
    pub name: Expr,
    pub params: Vec<Identifier>,
    pub vararg: bool,
    pub body: Block,
    pub span: Span,
}

impl FunctionStmt {
    /// The declared name when it is a plain identifier.
    #[must_use]
    pub const fn ident(&self) -> Option<&Identifier> {
        match &self.name {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GotoStmt {
    pub label: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub clauses: Vec<IfClause>,
    pub span: Span,
}

/// One `if`/`elseif`/`else` arm. `else` has no condition.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Option<Expr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStmt {
    pub name: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalStmt {
    pub names: Vec<Identifier>,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStmt {
    pub body: Block,
    pub condition: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
    Function(FunctionExpr),
    Index(IndexExpr),
    Ident(Identifier),
    Nil(Span),
    Bool(BoolLiteral),
    Number(NumberLiteral),
    String(StringLiteral),
    Table(TableExpr),
    /// `...`
    Vararg(Span),
    /// Placeholder for a missing expression; its span is empty.
    Error(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    NotEqual,
    Equal,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::NotEqual => "~=",
            Self::Equal => "==",
            Self::Concat => "..",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
        }
    }

    /// Left and right binding power. Right-associative operators bind
    /// less tightly on their right side.
    #[must_use]
    pub const fn binding_power(self) -> (u8, u8) {
        match self {
            Self::Or => (1, 1),
            Self::And => (2, 2),
            Self::Less
            | Self::Greater
            | Self::LessEqual
            | Self::GreaterEqual
            | Self::NotEqual
            | Self::Equal => (3, 3),
            Self::Concat => (9, 8),
            Self::Add | Self::Sub => (10, 10),
            Self::Mul | Self::Div | Self::Mod => (11, 11),
            Self::Pow => (14, 13),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Len,
}

impl UnaryOp {
    /// Binding power of every prefix operator's operand.
    pub const BINDING_POWER: u8 = 12;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Neg => "-",
            Self::Len => "#",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

/// `f(a, b)`, `f "s"`, `f {}` or, with a colon-indexed callee, `o:m()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl CallExpr {
    /// Returns true for `o:m()` method-call syntax.
    #[must_use]
    pub const fn is_method(&self) -> bool {
        matches!(
            &*self.callee,
            Expr::Index(IndexExpr {
                kind: IndexKind::Colon,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub params: Vec<Identifier>,
    pub vararg: bool,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// `a.b`
    Dot,
    /// `a:b`, only valid as a callee or a function name.
    Colon,
    /// `a[b]`
    Bracket,
}

/// `left.key`, `left:key` or `left[key]`. For the dot and colon
/// forms `key` is always an [`Expr::Ident`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub left: Box<Expr>,
    pub key: Box<Expr>,
    pub kind: IndexKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolLiteral {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    /// Source text of the numeral.
    pub raw: String,
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Source text including delimiters.
    pub raw: String,
    /// Decoded contents.
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableExpr {
    pub fields: Vec<TableField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    /// `expr`
    Positional(Expr),
    /// `name = expr`
    Named { name: Identifier, value: Expr },
    /// `[key] = expr`
    Computed { key: Expr, value: Expr, span: Span },
}

impl Stmt {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Assignment(s) => s.span,
            Self::Break(span) | Self::Semicolon(span) => *span,
            Self::Call(call) => call.span,
            Self::Do(s) => s.span,
            Self::For(s) => s.span,
            Self::ForIn(s) => s.span,
            Self::Function(s) => s.span,
            Self::Goto(s) => s.span,
            Self::If(s) => s.span,
            Self::Label(s) => s.span,
            Self::Local(s) => s.span,
            Self::Repeat(s) => s.span,
            Self::Return(s) => s.span,
            Self::While(s) => s.span,
            Self::Incomplete(expr) => expr.span(),
        }
    }

    /// Short variant name, used in diagnostics and the CLI.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Assignment(_) => "AssignmentStatement",
            Self::Break(_) => "BreakStatement",
            Self::Call(_) => "CallStatement",
            Self::Do(_) => "DoStatement",
            Self::For(_) => "ForStatement",
            Self::ForIn(_) => "ForInStatement",
            Self::Function(_) => "FunctionStatement",
            Self::Goto(_) => "GotoStatement",
            Self::If(_) => "IfStatement",
            Self::Label(_) => "LabelStatement",
            Self::Local(_) => "LocalStatement",
            Self::Repeat(_) => "RepeatStatement",
            Self::Return(_) => "ReturnStatement",
            Self::Semicolon(_) => "SemicolonStatement",
            Self::While(_) => "WhileStatement",
            Self::Incomplete(_) => "IncompleteStatement",
        }
    }
}

impl Expr {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Call(e) => e.span,
            Self::Function(e) => e.span,
            Self::Index(e) => e.span,
            Self::Ident(e) => e.span,
            Self::Bool(e) => e.span,
            Self::Number(e) => e.span,
            Self::String(e) => e.span,
            Self::Table(e) => e.span,
            Self::Nil(span) | Self::Vararg(span) | Self::Error(span) => *span,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Binary(_) => "BinaryExpression",
            Self::Unary(_) => "UnaryExpression",
            Self::Call(_) => "CallExpression",
            Self::Function(_) => "FunctionExpression",
            Self::Index(_) => "IndexExpression",
            Self::Ident(_) => "Identifier",
            Self::Nil(_) => "NilLiteral",
            Self::Bool(_) => "BooleanLiteral",
            Self::Number(_) => "NumberLiteral",
            Self::String(_) => "StringLiteral",
            Self::Table(_) => "TableLiteral",
            Self::Vararg(_) => "Vararg",
            Self::Error(_) => "ErrorExpression",
        }
    }

    /// Returns true if the expression may appear left of `=`.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Ident(_)
                | Self::Index(IndexExpr {
                    kind: IndexKind::Dot | IndexKind::Bracket,
                    ..
                })
        )
    }
}

impl TableField {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Positional(value) => value.span(),
            Self::Named { name, value } => name.span.to(value.span()),
            Self::Computed { span, .. } => *span,
        }
    }
}

/// Borrowed reference to any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Stmt(&'a Stmt),
    IfClause(&'a IfClause),
    Expr(&'a Expr),
    Field(&'a TableField),
    /// A declared name: local, parameter, loop variable, label.
    Ident(&'a Identifier),
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn span(self) -> Span {
        match self {
            Self::Block(b) => b.span,
            Self::Stmt(s) => s.span(),
            Self::IfClause(c) => c.span,
            Self::Expr(e) => e.span(),
            Self::Field(f) => f.span(),
            Self::Ident(i) => i.span,
        }
    }

    #[must_use]
    pub const fn kind_name(self) -> &'static str {
        match self {
            Self::Block(_) => "Block",
            Self::Stmt(s) => s.kind_name(),
            Self::IfClause(_) => "IfClause",
            Self::Expr(e) => e.kind_name(),
            Self::Field(_) => "TableField",
            Self::Ident(_) => "Identifier",
        }
    }

    /// Same node, compared by address.
    #[must_use]
    pub fn ptr_eq(self, other: Self) -> bool {
        use std::ptr;
        match (self, other) {
            (Self::Block(a), Self::Block(b)) => ptr::eq(a, b),
            (Self::Stmt(a), Self::Stmt(b)) => ptr::eq(a, b),
            (Self::IfClause(a), Self::IfClause(b)) => ptr::eq(a, b),
            (Self::Expr(a), Self::Expr(b)) => ptr::eq(a, b),
            (Self::Field(a), Self::Field(b)) => ptr::eq(a, b),
            (Self::Ident(a), Self::Ident(b)) => ptr::eq(a, b),
            _ => false,
        }
    }

    /// Structural children in source order.
    #[must_use]
    pub fn leaves(self) -> Vec<Self> {
        let mut out = Vec::new();
        match self {
            Self::Block(block) => out.extend(block.stmts.iter().map(Self::Stmt)),
            Self::Stmt(stmt) => stmt_leaves(stmt, &mut out),
            Self::IfClause(clause) => {
                out.extend(clause.condition.as_ref().map(Self::Expr));
                out.push(Self::Block(&clause.body));
            }
            Self::Expr(expr) => expr_leaves(expr, &mut out),
            Self::Field(field) => match field {
                TableField::Positional(value) => out.push(Self::Expr(value)),
                TableField::Named { name, value } => {
                    out.push(Self::Ident(name));
                    out.push(Self::Expr(value));
                }
                TableField::Computed { key, value, .. } => {
                    out.push(Self::Expr(key));
                    out.push(Self::Expr(value));
                }
            },
            Self::Ident(_) => {}
        }
        out
    }
}

fn stmt_leaves<'a>(stmt: &'a Stmt, out: &mut Vec<NodeRef<'a>>) {
    match stmt {
        Stmt::Assignment(s) => {
            out.extend(s.vars.iter().map(NodeRef::Expr));
            out.extend(s.exprs.iter().map(NodeRef::Expr));
        }
        Stmt::Break(_) | Stmt::Semicolon(_) => {}
        Stmt::Call(call) => call_leaves(call, out),
        Stmt::Do(s) => out.push(NodeRef::Block(&s.body)),
        Stmt::For(s) => {
            out.push(NodeRef::Ident(&s.var));
            out.push(NodeRef::Expr(&s.start));
            out.push(NodeRef::Expr(&s.limit));
            out.extend(s.step.as_ref().map(NodeRef::Expr));
            out.push(NodeRef::Block(&s.body));
        }
        Stmt::ForIn(s) => {
            out.extend(s.names.iter().map(NodeRef::Ident));
            out.extend(s.exprs.iter().map(NodeRef::Expr));
            out.push(NodeRef::Block(&s.body));
        }
        Stmt::Function(s) => {
            out.push(NodeRef::Expr(&s.name));
            out.extend(s.params.iter().map(NodeRef::Ident));
            out.push(NodeRef::Block(&s.body));
        }
        Stmt::Goto(s) => out.push(NodeRef::Ident(&s.label)),
        Stmt::If(s) => out.extend(s.clauses.iter().map(NodeRef::IfClause)),
        Stmt::Label(s) => out.push(NodeRef::Ident(&s.name)),
        Stmt::Local(s) => {
            out.extend(s.names.iter().map(NodeRef::Ident));
            out.extend(s.exprs.iter().map(NodeRef::Expr));
        }
        Stmt::Repeat(s) => {
            out.push(NodeRef::Block(&s.body));
            out.push(NodeRef::Expr(&s.condition));
        }
        Stmt::Return(s) => out.extend(s.exprs.iter().map(NodeRef::Expr)),
        Stmt::While(s) => {
            out.push(NodeRef::Expr(&s.condition));
            out.push(NodeRef::Block(&s.body));
        }
        Stmt::Incomplete(expr) => out.push(NodeRef::Expr(expr)),
    }
}

fn call_leaves<'a>(call: &'a CallExpr, out: &mut Vec<NodeRef<'a>>) {
    out.push(NodeRef::Expr(&call.callee));
    out.extend(call.args.iter().map(NodeRef::Expr));
}

fn expr_leaves<'a>(expr: &'a Expr, out: &mut Vec<NodeRef<'a>>) {
    match expr {
        Expr::Binary(e) => {
            out.push(NodeRef::Expr(&e.left));
            out.push(NodeRef::Expr(&e.right));
        }
        Expr::Unary(e) => out.push(NodeRef::Expr(&e.operand)),
        Expr::Call(call) => call_leaves(call, out),
        Expr::Function(f) => {
            out.extend(f.params.iter().map(NodeRef::Ident));
            out.push(NodeRef::Block(&f.body));
        }
        Expr::Index(e) => {
            out.push(NodeRef::Expr(&e.left));
            out.push(NodeRef::Expr(&e.key));
        }
        Expr::Table(t) => out.extend(t.fields.iter().map(NodeRef::Field)),
        Expr::Ident(_)
        | Expr::Nil(_)
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Vararg(_)
        | Expr::Error(_) => {}
    }
}
