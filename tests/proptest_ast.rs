//! Property-based tests with proptest.
//!
//! Generate random Lua programs, render the parsed tree, parse the
//! rendering back, and verify the second rendering matches the first.
//! Arbitrary text is also thrown at the parser to check it never
//! panics and always produces a well-formed tree.
//!
//! We compare renderings rather than trees because spans necessarily
//! differ between the original text and its canonical form.

mod common;

use common::assert_spans_nested;
use luapls::{NodeRef, TokenKind, node_at, parse, render};
use proptest::prelude::*;

// -- Leaf strategies --

/// Identifier that is not a reserved word.
fn name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,5}".prop_filter("reserved word", |s| TokenKind::keyword(s).is_none())
}

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(name(), 1..=3)
}

fn number() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,4}",
        "[0-9]{1,3}\\.[0-9]{1,3}",
        "0x[0-9a-fA-F]{1,4}",
        "[1-9]e[0-9]",
    ]
}

fn string_lit() -> impl Strategy<Value = String> {
    prop_oneof![
        "'[a-z ]{0,8}'",
        "\"[a-z ]{0,8}\"",
        "\\[\\[[a-z ]{0,8}\\]\\]",
    ]
}

fn binary_op() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "or", "and", "<", ">", "<=", ">=", "~=", "==", "..", "+", "-", "*", "/", "%", "^",
    ])
}

fn unary_op() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["not", "-", "#"])
}

// -- Expressions --

fn expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        3 => name(),
        2 => number(),
        1 => string_lit(),
        1 => prop::sample::select(vec!["nil", "true", "false"]).prop_map(String::from),
    ];

    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            3 => (inner.clone(), binary_op(), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            1 => (unary_op(), inner.clone()).prop_map(|(op, e)| format!("{op} {e}")),
            1 => inner.clone().prop_map(|e| format!("({e})")),
            1 => (name(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("{f}({})", args.join(", "))),
            1 => (name(), name(), inner.clone())
                .prop_map(|(obj, method, arg)| format!("{obj}:{method}({arg})")),
            1 => (name(), name()).prop_map(|(t, k)| format!("{t}.{k}")),
            1 => (name(), inner.clone()).prop_map(|(t, k)| format!("{t}[ {k} ]")),
            1 => prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("{{ {} }}", items.join(", "))),
            1 => (name(), inner.clone()).prop_map(|(k, v)| format!("{{ {k} = {v} }}")),
            1 => (names(), inner)
                .prop_map(|(params, body)| format!("function({}) return {body} end", params.join(", "))),
        ]
    })
}

fn exprs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(expr(), 1..=2)
}

// -- Statements --

fn assign_target() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => name(),
        1 => (name(), name()).prop_map(|(t, k)| format!("{t}.{k}")),
        1 => (name(), expr()).prop_map(|(t, k)| format!("{t}[ {k} ]")),
    ]
}

fn stmt() -> impl Strategy<Value = String> {
    let simple = prop_oneof![
        (names(), exprs())
            .prop_map(|(n, e)| format!("local {} = {}", n.join(", "), e.join(", "))),
        (assign_target(), expr()).prop_map(|(t, e)| format!("{t} = {e}")),
        (name(), prop::collection::vec(expr(), 0..3))
            .prop_map(|(f, args)| format!("{f}({})", args.join(", "))),
        (name(), name(), expr()).prop_map(|(obj, method, arg)| format!("{obj}:{method}({arg})")),
        name().prop_map(|label| format!("::{label}::")),
        name().prop_map(|label| format!("goto {label}")),
        Just("break".to_string()),
    ];

    simple.prop_recursive(3, 16, 4, |inner| {
        let body = prop::collection::vec(inner, 0..3).prop_map(|stmts| stmts.join("\n"));
        prop_oneof![
            body.clone().prop_map(|b| format!("do\n{b}\nend")),
            (expr(), body.clone()).prop_map(|(c, b)| format!("while {c} do\n{b}\nend")),
            (expr(), body.clone(), expr(), body.clone(), body.clone()).prop_map(
                |(c1, b1, c2, b2, b3)| format!(
                    "if {c1} then\n{b1}\nelseif {c2} then\n{b2}\nelse\n{b3}\nend"
                )
            ),
            (name(), expr(), expr(), body.clone())
                .prop_map(|(v, a, z, b)| format!("for {v} = {a}, {z} do\n{b}\nend")),
            (names(), exprs(), body.clone()).prop_map(|(n, e, b)| format!(
                "for {} in {} do\n{b}\nend",
                n.join(", "),
                e.join(", ")
            )),
            (name(), prop::collection::vec(name(), 0..3), body.clone()).prop_map(
                |(f, params, b)| format!("local function {f}({})\n{b}\nend", params.join(", "))
            ),
            (name(), name(), body.clone())
                .prop_map(|(t, m, b)| format!("function {t}:{m}(...)\n{b}\nend")),
            (body, expr()).prop_map(|(b, c)| format!("repeat\n{b}\nuntil {c}")),
        ]
    })
}

fn program() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(stmt(), 0..6),
        prop::option::of(exprs()),
    )
        .prop_map(|(stmts, ret)| {
            let mut out = stmts.join("\n");
            if let Some(values) = ret {
                out.push_str("\nreturn ");
                out.push_str(&values.join(", "));
            }
            out
        })
}

// -- Properties --

proptest! {
    /// render(parse(render(parse(x)))) == render(parse(x))
    #[test]
    fn render_is_idempotent(source in program()) {
        let first = parse(&source);
        if !first.errors.is_empty() {
            return Err(TestCaseError::fail(
                format!("generated program has errors: {:?}\n--- source ---\n{source}", first.errors)));
        }
        let r1 = render(NodeRef::Block(&first.block));
        let second = parse(&r1);
        if !second.errors.is_empty() {
            return Err(TestCaseError::fail(
                format!("rendering does not reparse: {:?}\n--- output ---\n{r1}", second.errors)));
        }
        let r2 = render(NodeRef::Block(&second.block));
        prop_assert_eq!(r1, r2);
    }

    /// Statement count survives rendering.
    #[test]
    fn statement_count_preserved(source in program()) {
        let first = parse(&source);
        let rendered = render(NodeRef::Block(&first.block));
        let second = parse(&rendered);
        prop_assert_eq!(first.block.stmts.len(), second.block.stmts.len());
    }

    /// Every child span lies inside its parent, for valid programs.
    #[test]
    fn spans_nest_in_generated_programs(source in program()) {
        assert_spans_nested(&parse(&source).block);
    }

    /// Arbitrary text never panics and still yields a well-formed tree.
    #[test]
    fn arbitrary_input_is_tolerated(source in prop_oneof!["[ -~\n]{0,80}", "\\PC{0,40}"]) {
        let result = parse(&source);
        assert_spans_nested(&result.block);
        let starts: Vec<_> = result.errors.iter().map(|e| e.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        prop_assert_eq!(starts, sorted);
    }

    /// Every offset inside the root span resolves to a chain rooted at
    /// the root block.
    #[test]
    fn node_at_chain_starts_at_root(source in program()) {
        let result = parse(&source);
        let root = NodeRef::Block(&result.block);
        for pos in result.block.span.start..result.block.span.end {
            let path = node_at(&result.block, pos);
            let outermost = path.parents.first().copied().or(path.node);
            prop_assert!(outermost.is_some_and(|n| n.ptr_eq(root)), "no chain at {}", pos);
        }
    }
}
