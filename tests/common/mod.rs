#![allow(dead_code)]

use luapls::{Block, NodeRef, parse, render};

/// Parse input that must be free of syntax errors.
pub fn parse_ok(input: &str) -> Block {
    let result = parse(input);
    assert!(
        result.errors.is_empty(),
        "unexpected errors: {:?}\n--- input ---\n{input}",
        result.errors
    );
    result.block
}

/// Render, reparse, render again: the two renderings must agree.
pub fn assert_render_stable(input: &str) -> String {
    let first = render(NodeRef::Block(&parse_ok(input)));
    let reparsed = parse(&first);
    assert!(
        reparsed.errors.is_empty(),
        "rendered text does not reparse: {:?}\n--- rendered ---\n{first}",
        reparsed.errors
    );
    let second = render(NodeRef::Block(&reparsed.block));
    assert_eq!(
        first, second,
        "render mismatch:\n--- first ---\n{first}\n--- second ---\n{second}"
    );
    first
}

/// Every child span lies within its parent's span.
pub fn assert_spans_nested(block: &Block) {
    check_children(NodeRef::Block(block));
}

fn check_children(node: NodeRef<'_>) {
    let span = node.span();
    assert!(span.start <= span.end, "inverted span on {node:?}");
    for child in node.leaves() {
        assert!(
            span.encloses(child.span()),
            "{} {} escapes {} {}",
            child.kind_name(),
            child.span(),
            node.kind_name(),
            span
        );
        check_children(child);
    }
}

/// Byte offset of the first occurrence of `needle`.
pub fn offset_of(source: &str, needle: &str) -> usize {
    source
        .find(needle)
        .unwrap_or_else(|| panic!("'{needle}' not found in source"))
}
