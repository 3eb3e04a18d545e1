//! Tokenizer behavior on realistic input.

use indoc::indoc;
use luapls::{LexErrorKind, Position, Span, TokenKind, tokenize};

// -----------------------------------------------------------
// Token streams.
// -----------------------------------------------------------

#[test]
fn function_definition_tokens() {
    let (tokens, errors) = tokenize("function M.add(a, b) return a + b end");
    assert!(errors.is_empty());
    let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "function", "M", ".", "add", "(", "a", ",", "b", ")", "return", "a", "+", "b", "end",
            ""
        ]
    );
    assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
}

#[test]
fn comments_and_whitespace_are_skipped() {
    let source = indoc! {"
        -- header comment
        local x = 1 --[[ inline ]] + 2
        --[==[
        block ]] still inside
        ]==]
        return x
    "};
    let (tokens, errors) = tokenize(source);
    assert!(errors.is_empty());
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind.to_string()).collect();
    assert_eq!(
        kinds,
        vec![
            "'local'",
            "identifier",
            "'='",
            "number",
            "'+'",
            "number",
            "'return'",
            "identifier",
            "<eof>"
        ]
    );
}

#[test]
fn token_ranges_are_one_based() {
    let (tokens, _) = tokenize("local\n\tname");
    assert_eq!(tokens[1].span, Span::new(7, 11));
    assert_eq!(tokens[1].range.start, Position::new(2, 2));
    assert_eq!(tokens[1].range.end, Position::new(2, 6));
}

#[test]
fn long_string_levels() {
    let (tokens, errors) = tokenize("[==[a]]b]=]c]==]");
    assert!(errors.is_empty());
    assert_eq!(
        tokens[0].kind,
        TokenKind::RawString {
            value: "a]]b]=]c".into(),
            level: 2
        }
    );
}

#[test]
fn lone_tilde_is_invalid() {
    let (tokens, errors) = tokenize("a ~ b");
    assert!(errors.is_empty());
    assert_eq!(tokens[1].kind, TokenKind::Invalid);
    assert_eq!(tokens[1].text, "~");
}

// -----------------------------------------------------------
// Lexer errors.
// -----------------------------------------------------------

#[test]
fn errors_carry_location() {
    let (_, errors) = tokenize("x = 1\ny = \"open");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    assert_eq!(errors[0].position, Position::new(2, 5));
    assert_eq!(
        errors[0].to_string(),
        "unfinished string at line 2, column 5"
    );
}

#[test]
fn unterminated_long_string() {
    let (tokens, errors) = tokenize("s = [[never closed");
    assert_eq!(errors[0].kind, LexErrorKind::UnterminatedLongString);
    assert_eq!(tokens[2].text, "[[never closed");
    assert_eq!(tokens[3].kind, TokenKind::Eof);
}

#[test]
fn invalid_escape_keeps_the_string() {
    let (tokens, errors) = tokenize(r#""a\qb""#);
    assert_eq!(errors[0].kind, LexErrorKind::InvalidEscape(r"\q".into()));
    assert_eq!(
        tokens[0].kind,
        TokenKind::String {
            value: "aqb".into()
        }
    );
}

#[test]
fn malformed_number_message() {
    let (_, errors) = tokenize("n = 12abc");
    assert_eq!(
        errors[0].to_string(),
        "malformed number near '12abc' at line 1, column 5"
    );
}
