//! Canonical text form of syntax-tree nodes.
//!
//! Output is tab-indented with one statement per line. Binary and unary
//! operations are fully parenthesized, so the printed text shows how an
//! expression was grouped and parses back to the same tree.

use std::fmt::{self, Write as _};

use crate::ast::{
    Block, CallExpr, Expr, FunctionStmt, Identifier, IfClause, IndexKind, NodeRef, Stmt,
    TableField,
};

/// Render any node to its canonical text.
#[must_use]
pub fn render(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    match node {
        NodeRef::Block(block) => render_stmts(&mut out, block, 0),
        NodeRef::Stmt(stmt) => render_stmt(&mut out, stmt, 0),
        NodeRef::IfClause(clause) => render_clause(&mut out, clause, true, 0),
        NodeRef::Expr(expr) => render_expr(&mut out, expr, 0),
        NodeRef::Field(field) => render_field(&mut out, field, 0),
        NodeRef::Ident(ident) => out.push_str(&ident.name),
    }
    out
}

/// Statements of a top-level block, separated by newlines.
fn render_stmts(out: &mut String, block: &Block, indent: usize) {
    for (i, stmt) in block.stmts.iter().enumerate() {
        if i > 0 {
            out.push('\n');
            push_indent(out, indent);
        }
        render_stmt(out, stmt, indent);
    }
}

/// Nested body: each statement on its own line one level deeper, then
/// a newline at the current level, ready for the closing keyword.
fn render_body(out: &mut String, block: &Block, indent: usize) {
    for stmt in &block.stmts {
        out.push('\n');
        push_indent(out, indent + 1);
        render_stmt(out, stmt, indent + 1);
    }
    out.push('\n');
    push_indent(out, indent);
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push('\t');
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, indent: usize) {
    match stmt {
        Stmt::Assignment(s) => {
            render_list(out, &s.vars, indent);
            out.push_str(" = ");
            render_list(out, &s.exprs, indent);
        }
        Stmt::Break(_) => out.push_str("break"),
        Stmt::Call(call) => render_call(out, call, indent),
        Stmt::Do(s) => {
            out.push_str("do");
            render_body(out, &s.body, indent);
            out.push_str("end");
        }
        Stmt::For(s) => {
            let _ = write!(out, "for {} = ", s.var.name);
            render_expr(out, &s.start, indent);
            out.push_str(", ");
            render_expr(out, &s.limit, indent);
            if let Some(step) = &s.step {
                out.push_str(", ");
                render_expr(out, step, indent);
            }
            out.push_str(" do");
            render_body(out, &s.body, indent);
            out.push_str("end");
        }
        Stmt::ForIn(s) => {
            out.push_str("for ");
            render_names(out, &s.names);
            out.push_str(" in ");
            render_list(out, &s.exprs, indent);
            out.push_str(" do");
            render_body(out, &s.body, indent);
            out.push_str("end");
        }
        Stmt::Function(s) => render_function_stmt(out, s, indent),
        Stmt::Goto(s) => {
            let _ = write!(out, "goto {}", s.label.name);
        }
        Stmt::If(s) => {
            for (i, clause) in s.clauses.iter().enumerate() {
                render_clause(out, clause, i == 0, indent);
            }
            out.push_str("end");
        }
        Stmt::Label(s) => {
            let _ = write!(out, "::{}::", s.name.name);
        }
        Stmt::Local(s) => {
            out.push_str("local ");
            render_names(out, &s.names);
            if !s.exprs.is_empty() {
                out.push_str(" = ");
                render_list(out, &s.exprs, indent);
            }
        }
        Stmt::Repeat(s) => {
            out.push_str("repeat");
            render_body(out, &s.body, indent);
            out.push_str("until ");
            render_expr(out, &s.condition, indent);
        }
        Stmt::Return(s) => {
            out.push_str("return");
            if !s.exprs.is_empty() {
                out.push(' ');
                render_list(out, &s.exprs, indent);
            }
        }
        Stmt::Semicolon(_) => out.push(';'),
        Stmt::While(s) => {
            out.push_str("while ");
            render_expr(out, &s.condition, indent);
            out.push_str(" do");
            render_body(out, &s.body, indent);
            out.push_str("end");
        }
        Stmt::Incomplete(expr) => render_expr(out, expr, indent),
    }
}

/// `if cond then body`, `elseif cond then body` or `else body`. The
/// closing `end` belongs to the statement.
fn render_clause(out: &mut String, clause: &IfClause, first: bool, indent: usize) {
    match &clause.condition {
        Some(condition) => {
            out.push_str(if first { "if " } else { "elseif " });
            render_expr(out, condition, indent);
            out.push_str(" then");
        }
        None => out.push_str("else"),
    }
    render_body(out, &clause.body, indent);
}

fn render_function_stmt(out: &mut String, stmt: &FunctionStmt, indent: usize) {
    if stmt.local {
        out.push_str("local ");
    }
    out.push_str("function ");
    render_expr(out, &stmt.name, indent);
    render_params(out, &stmt.params, stmt.vararg);
    render_body(out, &stmt.body, indent);
    out.push_str("end");
}

fn render_params(out: &mut String, params: &[Identifier], vararg: bool) {
    out.push('(');
    render_names(out, params);
    if vararg {
        if !params.is_empty() {
            out.push_str(", ");
        }
        out.push_str("...");
    }
    out.push(')');
}

fn render_names(out: &mut String, names: &[Identifier]) {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&name.name);
    }
}

fn render_list(out: &mut String, exprs: &[Expr], indent: usize) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_expr(out, expr, indent);
    }
}

fn render_expr(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Binary(e) => {
            out.push('(');
            render_expr(out, &e.left, indent);
            let _ = write!(out, " {} ", e.op.as_str());
            render_expr(out, &e.right, indent);
            out.push(')');
        }
        Expr::Unary(e) => {
            out.push('(');
            out.push_str(e.op.as_str());
            if matches!(e.op, crate::ast::UnaryOp::Not) {
                out.push(' ');
            }
            render_expr(out, &e.operand, indent);
            out.push(')');
        }
        Expr::Call(call) => render_call(out, call, indent),
        Expr::Function(f) => {
            out.push_str("function");
            render_params(out, &f.params, f.vararg);
            render_body(out, &f.body, indent);
            out.push_str("end");
        }
        Expr::Index(e) => {
            render_prefix(out, &e.left, indent);
            match e.kind {
                IndexKind::Dot => {
                    out.push('.');
                    render_expr(out, &e.key, indent);
                }
                IndexKind::Colon => {
                    out.push(':');
                    render_expr(out, &e.key, indent);
                }
                IndexKind::Bracket => render_bracketed(out, &e.key, indent),
            }
        }
        Expr::Ident(ident) => out.push_str(&ident.name),
        Expr::Nil(_) => out.push_str("nil"),
        Expr::Bool(b) => out.push_str(if b.value { "true" } else { "false" }),
        Expr::Number(n) => out.push_str(&n.raw),
        Expr::String(s) => out.push_str(&s.raw),
        Expr::Table(t) => {
            if t.fields.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (i, field) in t.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_field(out, field, indent);
            }
            out.push_str(" }");
        }
        Expr::Vararg(_) => out.push_str("..."),
        // placeholder for a missing expression
        Expr::Error(_) => {}
    }
}

/// Callee or indexed value. Anything other than a name, index, call or
/// self-parenthesizing operation is wrapped so it reparses as a prefix.
fn render_prefix(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Ident(_) | Expr::Index(_) | Expr::Call(_) | Expr::Binary(_) | Expr::Unary(_) => {
            render_expr(out, expr, indent);
        }
        _ => {
            out.push('(');
            render_expr(out, expr, indent);
            out.push(')');
        }
    }
}

/// `[key]`, padded when the key is a long string so `[[` does not open
/// a long bracket.
fn render_bracketed(out: &mut String, key: &Expr, indent: usize) {
    if matches!(key, Expr::String(s) if s.raw.starts_with('[')) {
        out.push_str("[ ");
        render_expr(out, key, indent);
        out.push_str(" ]");
    } else {
        out.push('[');
        render_expr(out, key, indent);
        out.push(']');
    }
}

fn render_call(out: &mut String, call: &CallExpr, indent: usize) {
    render_prefix(out, &call.callee, indent);
    out.push('(');
    render_list(out, &call.args, indent);
    out.push(')');
}

fn render_field(out: &mut String, field: &TableField, indent: usize) {
    match field {
        TableField::Positional(value) => render_expr(out, value, indent),
        TableField::Named { name, value } => {
            let _ = write!(out, "{} = ", name.name);
            render_expr(out, value, indent);
        }
        TableField::Computed { key, value, .. } => {
            render_bracketed(out, key, indent);
            out.push_str(" = ");
            render_expr(out, value, indent);
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(NodeRef::Block(self)))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(NodeRef::Stmt(self)))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(NodeRef::Expr(self)))
    }
}

impl fmt::Display for TableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(NodeRef::Field(self)))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
