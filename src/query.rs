//! Position queries over a parsed tree.
//!
//! Both queries are pure functions of a [`Block`] and a byte offset.
//! Neither stores parent links: ancestor chains are rebuilt during the
//! walk.

use indexmap::IndexMap;

use crate::ast::{Block, Expr, FunctionStmt, Identifier, IfClause, NodeRef, Stmt};
use crate::token::Pos;
use crate::walk::{walk, walk_list};

/// Innermost node at a position, with its ancestors outermost first.
///
/// An empty path (`node` is `None`) means no node covers the position,
/// for example trailing whitespace after the last statement.
#[derive(Debug, Clone, Default)]
pub struct NodePath<'a> {
    pub node: Option<NodeRef<'a>>,
    pub parents: Vec<NodeRef<'a>>,
}

impl<'a> NodePath<'a> {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// Nearest ancestor (or the node itself) matching `pred`.
    #[must_use]
    pub fn find(&self, pred: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        self.node
            .into_iter()
            .chain(self.parents.iter().rev().copied())
            .find(|&node| pred(node))
    }
}

/// Find the innermost node whose span contains `pos`.
///
/// Containment is half-open: a node covers `start <= pos < end`, so
/// zero-width placeholder nodes are never returned.
#[must_use]
pub fn node_at(root: &Block, pos: Pos) -> NodePath<'_> {
    let mut path = NodePath::default();
    walk(NodeRef::Block(root), &mut |node| {
        if !node.span().contains(pos) {
            return false;
        }
        if let Some(previous) = path.node.replace(node) {
            path.parents.push(previous);
        }
        true
    });
    path
}

/// Local names visible at `pos`, mapped to their declaring identifier.
///
/// With `include_self`, a name whose declaration the position touches
/// is included too: resolving the name under the cursor wants it,
/// completing a name being typed does not. On collision the later
/// declaration wins.
#[must_use]
pub fn locals_at(root: &Block, pos: Pos, include_self: bool) -> IndexMap<String, &Identifier> {
    let mut locals = IndexMap::new();
    let mut open_clauses: Vec<&IfClause> = Vec::new();
    walk_list(root.stmts.iter().map(NodeRef::Stmt), &mut |node| {
        let span = node.span();
        if span.start > pos {
            return false;
        }
        let before = span.end < pos;
        match node {
            // a body extends to its closing keyword, past its last statement
            NodeRef::Block(_) => return true,
            NodeRef::IfClause(clause) => {
                return open_clauses.iter().any(|open| std::ptr::eq(*open, clause));
            }
            NodeRef::Stmt(Stmt::If(stmt)) if !before => {
                open_clauses.extend(stmt.clauses.iter().rev().find(|c| c.span.start <= pos));
            }
            NodeRef::Stmt(Stmt::Local(stmt)) => {
                for name in &stmt.names {
                    if before || (include_self && name.span.touches(pos)) {
                        bind(&mut locals, name);
                    }
                }
            }
            NodeRef::Stmt(Stmt::Function(stmt)) => {
                function_stmt_locals(&mut locals, stmt, pos, before, include_self);
            }
            NodeRef::Expr(Expr::Function(func)) if !before => {
                bind_params(&mut locals, &func.params, pos, include_self);
            }
            NodeRef::Stmt(Stmt::For(stmt)) if !before => {
                let header_end = stmt.step.as_ref().unwrap_or(&stmt.limit).span().end;
                if pos > header_end || (include_self && stmt.var.span.touches(pos)) {
                    bind(&mut locals, &stmt.var);
                }
            }
            NodeRef::Stmt(Stmt::ForIn(stmt)) if !before => {
                let header_end = stmt
                    .exprs
                    .last()
                    .map(Expr::span)
                    .or_else(|| stmt.names.last().map(|name| name.span))
                    .map_or(span.start, |header| header.end);
                for name in &stmt.names {
                    if pos > header_end || (include_self && name.span.touches(pos)) {
                        bind(&mut locals, name);
                    }
                }
            }
            _ => {}
        }
        !before
    });
    locals
}

fn function_stmt_locals<'a>(
    locals: &mut IndexMap<String, &'a Identifier>,
    stmt: &'a FunctionStmt,
    pos: Pos,
    before: bool,
    include_self: bool,
) {
    if let Some(name) = stmt.ident() {
        let in_body = !before && pos > name.span.end;
        if before || in_body || (include_self && name.span.touches(pos)) {
            bind(locals, name);
        }
    }
    if !before {
        bind_params(locals, &stmt.params, pos, include_self);
    }
}

fn bind_params<'a>(
    locals: &mut IndexMap<String, &'a Identifier>,
    params: &'a [Identifier],
    pos: Pos,
    include_self: bool,
) {
    for param in params {
        if pos > param.span.end || (include_self && param.span.touches(pos)) {
            bind(locals, param);
        }
    }
}

fn bind<'a>(locals: &mut IndexMap<String, &'a Identifier>, ident: &'a Identifier) {
    if !ident.is_missing() {
        locals.insert(ident.name.clone(), ident);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::token::Span;

    fn names(locals: &IndexMap<String, &Identifier>) -> Vec<String> {
        let mut names: Vec<_> = locals.keys().cloned().collect();
        names.sort();
        names
    }

    #[test]
    fn node_at_returns_innermost_with_parents() {
        let result = parse("x = a + b");
        let path = node_at(&result.block, 8);
        let node = path.node.expect("node");
        assert_eq!(node.kind_name(), "Identifier");
        assert_eq!(node.span(), Span::new(8, 9));
        let parents: Vec<_> = path.parents.iter().map(|n| n.kind_name()).collect();
        assert_eq!(
            parents,
            vec!["Block", "AssignmentStatement", "BinaryExpression"]
        );
    }

    #[test]
    fn node_at_outside_every_node_is_empty() {
        let result = parse("x = 1   ");
        assert!(node_at(&result.block, 6).is_empty());
        assert!(node_at(&Block::default(), 0).is_empty());
    }

    #[test]
    fn later_local_shadows_earlier() {
        let source = "local x = 1\nlocal x = 2\nprint(x)";
        let result = parse(source);
        let pos = source.find("print").expect("print");
        let locals = locals_at(&result.block, pos, false);
        assert_eq!(locals.len(), 1);
        assert_eq!(locals["x"].span, Span::new(18, 19));
    }

    #[test]
    fn nested_scope_does_not_leak() {
        let source = "do local inner = 1 end\nlocal outer = 2\n";
        let result = parse(source);
        let locals = locals_at(&result.block, source.len(), false);
        assert_eq!(names(&locals), vec!["outer"]);
    }

    #[test]
    fn params_and_recursive_local_function() {
        let source = "local function fact(n)\n  return fact(n - 1)\nend";
        let result = parse(source);
        let pos = source.find("return").expect("return");
        let locals = locals_at(&result.block, pos, false);
        assert_eq!(names(&locals), vec!["fact", "n"]);
    }

    #[test]
    fn plain_function_name_visible_in_own_body() {
        let source = "function walk(n)\n  return walk(n - 1)\nend";
        let result = parse(source);
        let pos = source.find("return").expect("return");
        assert_eq!(names(&locals_at(&result.block, pos, false)), vec!["n", "walk"]);
    }

    #[test]
    fn declaration_being_typed_needs_include_self() {
        let source = "local abc";
        let result = parse(source);
        assert!(locals_at(&result.block, 9, false).is_empty());
        let locals = locals_at(&result.block, 9, true);
        assert_eq!(names(&locals), vec!["abc"]);
    }

    #[test]
    fn loop_variables_visible_in_body_only() {
        let source = "for i = 1, 10 do\n  print(i)\nend\nfor k, v in pairs(t) do end";
        let result = parse(source);
        let in_body = source.find("print").expect("print");
        assert_eq!(names(&locals_at(&result.block, in_body, false)), vec!["i"]);
        let in_header = source.find("10").expect("10");
        assert!(locals_at(&result.block, in_header, false).is_empty());
        let in_second = source.rfind("do").expect("do");
        assert_eq!(
            names(&locals_at(&result.block, in_second, false)),
            vec!["k", "v"]
        );
    }

    #[test]
    fn body_scope_reaches_closing_keyword() {
        let source = "while go do\n  local step = 1\n  \nend";
        let result = parse(source);
        let blank = source.find("\n  \n").expect("blank line") + 3;
        assert_eq!(names(&locals_at(&result.block, blank, false)), vec!["step"]);
    }

    #[test]
    fn only_the_clause_at_the_position_is_searched() {
        let source = "if a then local x = 1 elseif b then local y = 2  else  end";
        let result = parse(source);
        let in_else = source.find("else ").expect("else") + 5;
        assert!(locals_at(&result.block, in_else, false).is_empty());
        let in_second = source.find("local y").expect("local y") - 1;
        assert!(locals_at(&result.block, in_second, false).is_empty());
        let after_y = source.find("= 2").expect("= 2") + 3;
        assert_eq!(names(&locals_at(&result.block, after_y + 1, false)), vec!["y"]);
    }

    #[test]
    fn repeat_body_visible_in_condition() {
        let source = "repeat local done = true until done";
        let result = parse(source);
        let pos = source.rfind("done").expect("done");
        assert_eq!(names(&locals_at(&result.block, pos, false)), vec!["done"]);
    }
}
