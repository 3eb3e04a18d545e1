use std::fmt;

/// Byte offset into the source text.
pub type Pos = usize;

/// Half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    #[must_use]
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `pos`.
    #[must_use]
    pub const fn empty(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns true if `pos` lies in `[start, end)`.
    #[must_use]
    pub const fn contains(self, pos: Pos) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Returns true if `pos` lies in `[start, end]`, i.e. a cursor
    /// placed at `pos` touches this span.
    #[must_use]
    pub const fn touches(self, pos: Pos) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Returns true if `other` is fully contained within `self`.
    #[must_use]
    pub const fn encloses(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Span covering both `self` and `other`.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        let end = if other.end > self.end {
            other.end
        } else {
            self.end
        };
        Self {
            start: self.start,
            end,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// 1-based line and column (columns count bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line/column range of a token; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Character that cannot start any token.
    Invalid,
    /// End of input. Always the last token.
    Eof,

    Ident,
    /// Numeric literal with its best-effort value.
    Number { value: f64 },
    /// Single or double quoted string with escapes decoded.
    String { value: String },
    /// Long-bracket string `[==[ ... ]==]`.
    RawString { value: String, level: usize },

    // Keywords
    And,
    Break,
    Do,
    Else,
    ElseIf,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Hash,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Assign,
    Concat,

    // Structure
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Grammar
    Semicolon,
    Colon,
    DoubleColon,
    Comma,
    Dot,
    Ellipsis,
}

impl TokenKind {
    /// Look up a reserved word. Matching is case-sensitive.
    #[must_use]
    pub fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "and" => Self::And,
            "break" => Self::Break,
            "do" => Self::Do,
            "else" => Self::Else,
            "elseif" => Self::ElseIf,
            "end" => Self::End,
            "false" => Self::False,
            "for" => Self::For,
            "function" => Self::Function,
            "goto" => Self::Goto,
            "if" => Self::If,
            "in" => Self::In,
            "local" => Self::Local,
            "nil" => Self::Nil,
            "not" => Self::Not,
            "or" => Self::Or,
            "repeat" => Self::Repeat,
            "return" => Self::Return,
            "then" => Self::Then,
            "true" => Self::True,
            "until" => Self::Until,
            "while" => Self::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Fixed spelling of keywords and punctuation; `None` for tokens
    /// whose text varies.
    #[must_use]
    pub const fn as_str(&self) -> Option<&'static str> {
        let s = match self {
            Self::Invalid
            | Self::Eof
            | Self::Ident
            | Self::Number { .. }
            | Self::String { .. }
            | Self::RawString { .. } => return None,
            Self::And => "and",
            Self::Break => "break",
            Self::Do => "do",
            Self::Else => "else",
            Self::ElseIf => "elseif",
            Self::End => "end",
            Self::False => "false",
            Self::For => "for",
            Self::Function => "function",
            Self::Goto => "goto",
            Self::If => "if",
            Self::In => "in",
            Self::Local => "local",
            Self::Nil => "nil",
            Self::Not => "not",
            Self::Or => "or",
            Self::Repeat => "repeat",
            Self::Return => "return",
            Self::Then => "then",
            Self::True => "true",
            Self::Until => "until",
            Self::While => "while",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::Hash => "#",
            Self::Equal => "==",
            Self::NotEqual => "~=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Assign => "=",
            Self::Concat => "..",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::DoubleColon => "::",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Ellipsis => "...",
        };
        Some(s)
    }

    /// Tokens that close a block: `end`, `else`, `elseif`, `until`, EOF.
    #[must_use]
    pub const fn is_block_end(&self) -> bool {
        matches!(
            self,
            Self::Eof | Self::End | Self::Else | Self::ElseIf | Self::Until
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid character"),
            Self::Eof => f.write_str("<eof>"),
            Self::Ident => f.write_str("identifier"),
            Self::Number { .. } => f.write_str("number"),
            Self::String { .. } | Self::RawString { .. } => f.write_str("string"),
            other => write!(f, "'{}'", other.as_str().unwrap_or_default()),
        }
    }
}

/// A single token with its kind, source text, and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text, delimiters included.
    pub text: String,
    pub span: Span,
    pub range: Range,
}

impl Token {
    /// Human-readable description used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "<eof>".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
