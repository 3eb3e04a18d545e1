//! Depth-first traversal over [`NodeRef`]s.
//!
//! The visitor is called on a node before its children. Returning
//! `false` from the visitor skips that node's children; traversal then
//! continues with the node's next sibling.

use crate::ast::NodeRef;

/// Walk `node` and everything below it in source order.
pub fn walk<'a, F>(node: NodeRef<'a>, visitor: &mut F)
where
    F: FnMut(NodeRef<'a>) -> bool,
{
    if !visitor(node) {
        return;
    }
    walk_list(node.leaves(), visitor);
}

/// Walk each node of a sibling list in turn.
pub fn walk_list<'a, I, F>(nodes: I, visitor: &mut F)
where
    I: IntoIterator<Item = NodeRef<'a>>,
    F: FnMut(NodeRef<'a>) -> bool,
{
    for node in nodes {
        walk(node, visitor);
    }
}
