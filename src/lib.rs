//! Error-tolerant Lua 5.2 front end for language tooling.
//!
//! Tokenizes and parses Lua source into a typed syntax tree with exact
//! byte spans, even when the source is incomplete, and answers the
//! position queries an editor needs: which node is under the cursor,
//! and which locals are in scope there.
//!
//! # Quick start
//!
//! ## Parse and render
//!
//! ```
//! use luapls::{parse, render, NodeRef};
//!
//! let result = parse("local x = 1 + 2 * 3");
//! assert!(result.errors.is_empty());
//! assert_eq!(render(NodeRef::Block(&result.block)), "local x = (1 + (2 * 3))");
//! ```
//!
//! ## Partial input still yields a tree
//!
//! ```
//! use luapls::{parse, Stmt};
//!
//! let result = parse("if ready then\n  go()\n");
//! assert!(matches!(result.block.stmts[0], Stmt::If(_)));
//! assert_eq!(result.errors.len(), 1);
//! ```
//!
//! ## Query a position
//!
//! ```
//! use luapls::{locals_at, parse};
//!
//! let source = "local a = 1\nlocal b = a";
//! let result = parse(source);
//! let locals = locals_at(&result.block, source.len(), false);
//! assert!(locals.contains_key("a"));
//! assert!(!locals.contains_key("b"));
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod file_table;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod query;
pub mod render;
pub mod token;
pub mod walk;

use std::path::PathBuf;

pub use ast::{Block, Expr, Identifier, NodeRef, Stmt, TableField};
pub use file_table::{FileTable, ParsedFile};
pub use lexer::{LexError, LexErrorKind, Lexer, tokenize};
pub use line_index::LineIndex;
pub use parser::{ParseResult, SyntaxError, SyntaxErrorKind, parse, parse_expression};
pub use query::{NodePath, locals_at, node_at};
pub use render::render;
pub use token::{Pos, Position, Span, Token, TokenKind};
pub use walk::{walk, walk_list};

/// Error type for callers that treat any syntax error as failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source parsed with errors, in source order.
    #[error("found {} syntax error(s)", .errors.len())]
    Syntax { errors: Vec<SyntaxError> },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse `input`, failing if any syntax error was recorded.
pub fn parse_strict(input: &str) -> Result<Block, Error> {
    let ParseResult { block, errors } = parse(input);
    if errors.is_empty() {
        Ok(block)
    } else {
        Err(Error::Syntax { errors })
    }
}

/// Read and parse a file from disk.
pub fn parse_file(path: impl Into<PathBuf>) -> Result<ParseResult, Error> {
    let path = path.into();
    let source = std::fs::read_to_string(&path).map_err(|source| Error::Io { path, source })?;
    Ok(parse(&source))
}
