use std::fmt;

use crate::token::{Pos, Position, Range, Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Short string closed by a newline or end of input.
    UnterminatedString,
    /// Long-bracket string whose closing bracket never appears.
    UnterminatedLongString,
    /// Long comment whose closing bracket never appears.
    UnterminatedComment,
    /// Unknown or malformed escape sequence inside a short string.
    InvalidEscape(String),
    /// Numeral that cannot be converted to a number.
    MalformedNumber(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unfinished string"),
            Self::UnterminatedLongString => write!(f, "unfinished long string"),
            Self::UnterminatedComment => write!(f, "unfinished long comment"),
            Self::InvalidEscape(seq) => write!(f, "invalid escape sequence '{seq}'"),
            Self::MalformedNumber(text) => write!(f, "malformed number near '{text}'"),
        }
    }
}

/// Error produced during lexing. The lexer records these and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub position: Position,
}

/// Tokenize a whole source string.
///
/// The returned tokens always end with a single `Eof` token.
#[must_use]
pub fn tokenize(input: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.by_ref().collect();
    (tokens, lexer.take_errors())
}

/// Lazy tokenizer over Lua source text.
///
/// Yields tokens on demand, finishing with exactly one `Eof` token.
/// Restarting means building a new `Lexer` over the same text.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    errors: Vec<LexError>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let bytes = input.as_bytes();
        let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        let mut lexer = Self {
            input: bytes,
            pos: start,
            line: 1,
            col: 1,
            errors: Vec::new(),
            finished: false,
        };
        if lexer.peek() == Some(b'#') && lexer.peek_at(1) == Some(b'!') {
            lexer.skip_line();
        }
        lexer
    }

    /// Errors recorded so far, leaving the lexer's list empty.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.pos;
        let start_position = self.here();
        let Some(ch) = self.peek() else {
            return self.finish(TokenKind::Eof, start, start_position);
        };

        let kind = match ch {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.read_name(start),
            b'0'..=b'9' => self.read_number(start, start_position),
            b'.' => match (self.peek_at(1), self.peek_at(2)) {
                (Some(b'0'..=b'9'), _) => self.read_number(start, start_position),
                (Some(b'.'), Some(b'.')) => self.punct(3, TokenKind::Ellipsis),
                (Some(b'.'), _) => self.punct(2, TokenKind::Concat),
                _ => self.punct(1, TokenKind::Dot),
            },
            b'"' | b'\'' => self.read_string(ch, start, start_position),
            b'[' => match self.long_bracket_level() {
                Some(level) => self.read_long_string(level, start, start_position),
                None if self.peek_at(1) == Some(b'=') => {
                    // `[=` that never reaches a second `[`
                    self.advance();
                    while self.peek() == Some(b'=') {
                        self.advance();
                    }
                    TokenKind::Invalid
                }
                None => self.punct(1, TokenKind::LBracket),
            },
            b'=' => self.one_or_two(b'=', TokenKind::Equal, TokenKind::Assign),
            b'<' => self.one_or_two(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.one_or_two(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'~' => self.one_or_two(b'=', TokenKind::NotEqual, TokenKind::Invalid),
            b':' => self.one_or_two(b':', TokenKind::DoubleColon, TokenKind::Colon),
            b'+' => self.punct(1, TokenKind::Plus),
            b'-' => self.punct(1, TokenKind::Minus),
            b'*' => self.punct(1, TokenKind::Star),
            b'/' => self.punct(1, TokenKind::Slash),
            b'%' => self.punct(1, TokenKind::Percent),
            b'^' => self.punct(1, TokenKind::Caret),
            b'#' => self.punct(1, TokenKind::Hash),
            b'(' => self.punct(1, TokenKind::LParen),
            b')' => self.punct(1, TokenKind::RParen),
            b'{' => self.punct(1, TokenKind::LBrace),
            b'}' => self.punct(1, TokenKind::RBrace),
            b']' => self.punct(1, TokenKind::RBracket),
            b';' => self.punct(1, TokenKind::Semicolon),
            b',' => self.punct(1, TokenKind::Comma),
            _ => {
                self.skip_char();
                TokenKind::Invalid
            }
        };

        self.finish(kind, start, start_position)
    }

    fn finish(&self, kind: TokenKind, start: Pos, start_position: Position) -> Token {
        Token {
            kind,
            text: String::from_utf8_lossy(&self.input[start..self.pos]).into_owned(),
            span: Span::new(start, self.pos),
            range: Range {
                start: start_position,
                end: self.here(),
            },
        }
    }

    const fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.col,
        }
    }

    fn error(&mut self, kind: LexErrorKind, start: Pos, position: Position) {
        self.errors.push(LexError {
            kind,
            span: Span::new(start, self.pos),
            position,
        });
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            // `\r\n` counts once, at its `\n`
            let newline = match self.input[self.pos] {
                b'\n' => true,
                b'\r' => self.peek_at(1) != Some(b'\n'),
                _ => false,
            };
            if newline {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn punct(&mut self, len: usize, kind: TokenKind) -> TokenKind {
        for _ in 0..len {
            self.advance();
        }
        kind
    }

    fn one_or_two(&mut self, second: u8, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek_at(1) == Some(second) {
            self.punct(2, double)
        } else {
            self.punct(1, single)
        }
    }

    /// Skip one whole UTF-8 character.
    fn skip_char(&mut self) {
        let len = match self.peek() {
            Some(b) if b >= 0xF0 => 4,
            Some(b) if b >= 0xE0 => 3,
            Some(b) if b >= 0xC0 => 2,
            _ => 1,
        };
        for _ in 0..len {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            self.advance();
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c) => self.advance(),
                Some(b'-') if self.peek_at(1) == Some(b'-') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        let start = self.pos;
        let start_position = self.here();
        self.advance(); // -
        self.advance(); // -

        if let Some(level) = self.long_bracket_level() {
            let (_, closed) = self.read_long_bracket(level);
            if !closed {
                self.error(LexErrorKind::UnterminatedComment, start, start_position);
            }
        } else {
            self.skip_line();
        }
    }

    /// If the cursor sits on `[`, `[=`*n`[`, return `n`.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    /// Consume a long bracket body starting at the opening `[`.
    /// Returns the contents and whether the closing bracket was found.
    fn read_long_bracket(&mut self, level: usize) -> (String, bool) {
        for _ in 0..level + 2 {
            self.advance();
        }

        // a newline right after the opening bracket is not part of the value
        match (self.peek(), self.peek_at(1)) {
            (Some(b'\r'), Some(b'\n')) | (Some(b'\n'), Some(b'\r')) => {
                self.advance();
                self.advance();
            }
            (Some(b'\n' | b'\r'), _) => self.advance(),
            _ => {}
        }

        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == b']' && self.closes_long_bracket(level) {
                let content =
                    String::from_utf8_lossy(&self.input[content_start..self.pos]).into_owned();
                for _ in 0..level + 2 {
                    self.advance();
                }
                return (content, true);
            }
            self.advance();
        }

        let content = String::from_utf8_lossy(&self.input[content_start..]).into_owned();
        (content, false)
    }

    fn closes_long_bracket(&self, level: usize) -> bool {
        (1..=level).all(|i| self.peek_at(i) == Some(b'=')) && self.peek_at(level + 1) == Some(b']')
    }

    fn read_long_string(&mut self, level: usize, start: Pos, position: Position) -> TokenKind {
        let (value, closed) = self.read_long_bracket(level);
        if !closed {
            self.error(LexErrorKind::UnterminatedLongString, start, position);
        }
        TokenKind::RawString { value, level }
    }

    fn read_name(&mut self, start: Pos) -> TokenKind {
        while let Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') = self.peek() {
            self.advance();
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos]);
        TokenKind::keyword(&word).unwrap_or(TokenKind::Ident)
    }

    fn read_number(&mut self, start: Pos, position: Position) -> TokenKind {
        let mut exponent = [b'e', b'E'];
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.advance();
            self.advance();
            exponent = [b'p', b'P'];
        }

        while let Some(c) = self.peek() {
            if exponent.contains(&c) {
                self.advance();
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.advance();
                }
            } else if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        let value = parse_number(&text).unwrap_or_else(|| {
            self.error(LexErrorKind::MalformedNumber(text.clone()), start, position);
            0.0
        });
        TokenKind::Number { value }
    }

    fn read_string(&mut self, quote: u8, start: Pos, position: Position) -> TokenKind {
        self.advance(); // skip opening quote

        let mut value = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => {
                    self.error(LexErrorKind::UnterminatedString, start, position);
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => self.read_escape(&mut value),
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        TokenKind::String {
            value: String::from_utf8_lossy(&value).into_owned(),
        }
    }

    fn read_escape(&mut self, value: &mut Vec<u8>) {
        let start = self.pos;
        let position = self.here();
        self.advance(); // skip backslash

        let Some(c) = self.peek() else {
            return;
        };
        let simple = match c {
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            b'\\' | b'"' | b'\'' => Some(c),
            _ => None,
        };
        if let Some(byte) = simple {
            value.push(byte);
            self.advance();
            return;
        }

        match c {
            b'\n' | b'\r' => {
                value.push(b'\n');
                self.advance();
                if matches!(self.peek(), Some(b'\n' | b'\r')) && self.peek() != Some(c) {
                    self.advance();
                }
            }
            b'z' => {
                self.advance();
                while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)) {
                    self.advance();
                }
            }
            b'x' => {
                self.advance();
                let digits = self.take_while_max(2, |b| b.is_ascii_hexdigit());
                match u8::from_str_radix(&digits, 16) {
                    Ok(byte) if digits.len() == 2 => value.push(byte),
                    _ => self.invalid_escape(start, position),
                }
            }
            b'u' => {
                self.advance();
                if self.peek() != Some(b'{') {
                    self.invalid_escape(start, position);
                    return;
                }
                self.advance();
                let digits = self.take_while_max(8, |b| b.is_ascii_hexdigit());
                let decoded = u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32);
                if self.peek() == Some(b'}') {
                    self.advance();
                    if let Some(ch) = decoded {
                        let mut buf = [0; 4];
                        value.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        return;
                    }
                }
                self.invalid_escape(start, position);
            }
            b'0'..=b'9' => {
                let digits = self.take_while_max(3, |b| b.is_ascii_digit());
                match digits.parse::<u8>() {
                    Ok(byte) => value.push(byte),
                    Err(_) => self.invalid_escape(start, position),
                }
            }
            _ => {
                value.push(c);
                self.advance();
                self.invalid_escape(start, position);
            }
        }
    }

    fn invalid_escape(&mut self, start: Pos, position: Position) {
        let seq = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        self.error(LexErrorKind::InvalidEscape(seq), start, position);
    }

    fn take_while_max(&mut self, max: usize, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos - start < max && self.peek().is_some_and(&pred) {
            self.advance();
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

/// Convert a Lua numeral to its value. Returns `None` when malformed.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return parse_hex(hex);
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_hex(text: &str) -> Option<f64> {
    let (mantissa, exponent) = match text.find(['p', 'P']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut value = 0.0_f64;
    for c in int_part.chars() {
        value = value.mul_add(16.0, f64::from(c.to_digit(16)?));
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += f64::from(c.to_digit(16)?) * scale;
        scale /= 16.0;
    }

    if let Some(exp) = exponent {
        let exp: i32 = exp.parse().ok()?;
        value *= 2.0_f64.powi(exp);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn names_and_keywords() {
        assert_eq!(
            kinds("local x = nil"),
            vec![
                TokenKind::Local,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Nil,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn greedy_operators() {
        assert_eq!(
            kinds("... .. . == ~= <= >= :: :"),
            vec![
                TokenKind::Ellipsis,
                TokenKind::Concat,
                TokenKind::Dot,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::DoubleColon,
                TokenKind::Colon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn number_values() {
        let (tokens, errors) = tokenize("3 3.5 .5 1e2 0xff 0x1p4 0xA.8");
        assert!(errors.is_empty());
        let values: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Number { value } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![3.0, 3.5, 0.5, 100.0, 255.0, 16.0, 10.5]);
    }

    #[test]
    fn malformed_number() {
        let (tokens, errors) = tokenize("3..2");
        assert_eq!(tokens[0].text, "3..2");
        assert_eq!(errors[0].kind, LexErrorKind::MalformedNumber("3..2".into()));
    }

    #[test]
    fn string_escapes() {
        let (tokens, errors) = tokenize(r#""a\tb\65\x41\u{48}\"""#);
        assert!(errors.is_empty());
        assert_eq!(
            tokens[0].kind,
            TokenKind::String {
                value: "a\tbAAH\"".into()
            }
        );
        assert_eq!(tokens[0].text, r#""a\tb\65\x41\u{48}\"""#);
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let (tokens, errors) = tokenize("'abc\nx");
        assert_eq!(tokens[0].text, "'abc");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn long_string_and_comment() {
        let (tokens, errors) = tokenize("--[==[ skip\n ]==] [[\nraw]] -- trailing");
        assert!(errors.is_empty());
        assert_eq!(
            tokens[0].kind,
            TokenKind::RawString {
                value: "raw".into(),
                level: 0
            }
        );
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn unterminated_comment() {
        let (tokens, errors) = tokenize("x --[[ never closed");
        assert_eq!(tokens.len(), 2);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn invalid_character_does_not_stop_lexing() {
        let (tokens, _) = tokenize("a $ b ~ é");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert_eq!(kinds[1], &TokenKind::Invalid);
        assert_eq!(kinds[2], &TokenKind::Ident);
        assert_eq!(kinds[3], &TokenKind::Invalid);
        assert_eq!(tokens[4].text, "é");
        assert_eq!(kinds[5], &TokenKind::Eof);
    }

    #[test]
    fn span_tracking() {
        let (tokens, _) = tokenize("a\n  bc");
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(4, 6));
        assert_eq!(tokens[1].range.start, Position::new(2, 3));
        assert_eq!(tokens[1].range.end, Position::new(2, 5));
        assert_eq!(tokens[2].span, Span::empty(6));
    }

    #[test]
    fn carriage_returns_end_lines() {
        let (tokens, errors) = tokenize("a\rb\r\nc -- note\rd");
        assert!(errors.is_empty());
        let starts: Vec<_> = tokens.iter().map(|t| t.range.start).collect();
        assert_eq!(
            starts,
            vec![
                Position::new(1, 1),
                Position::new(2, 1),
                Position::new(3, 1),
                Position::new(4, 1),
                Position::new(4, 2),
            ]
        );
    }

    #[test]
    fn shebang_and_bom() {
        let (tokens, _) = tokenize("\u{FEFF}#!/usr/bin/lua\nreturn");
        assert_eq!(tokens[0].kind, TokenKind::Return);
    }

    #[test]
    fn lazy_iteration_ends_after_eof() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Ident));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(lexer.next().is_none());
    }
}
