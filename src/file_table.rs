//! Store of the most recent parse of each open file.
//!
//! Entries are immutable [`ParsedFile`]s behind an [`Arc`]. Replacing
//! a file parses the new text first and only then swaps the entry, so
//! readers holding the previous `Arc` keep a complete tree.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{Block, Identifier};
use crate::line_index::LineIndex;
use crate::parser::{SyntaxError, parse};
use crate::query::{NodePath, locals_at, node_at};
use crate::token::Position;

/// One parsed file: its text, tree and diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub id: String,
    pub source: String,
    pub block: Block,
    pub errors: Vec<SyntaxError>,
    pub line_index: LineIndex,
}

impl ParsedFile {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let result = parse(&source);
        let line_index = LineIndex::new(&source);
        Self {
            id: id.into(),
            source,
            block: result.block,
            errors: result.errors,
            line_index,
        }
    }

    /// [`node_at`] for a line/column position. Positions outside the
    /// text give an empty path.
    #[must_use]
    pub fn node_at_position(&self, position: Position) -> NodePath<'_> {
        self.line_index
            .offset(position)
            .map(|offset| node_at(&self.block, offset))
            .unwrap_or_default()
    }

    /// [`locals_at`] for a line/column position.
    #[must_use]
    pub fn locals_at_position(
        &self,
        position: Position,
        include_self: bool,
    ) -> IndexMap<String, &Identifier> {
        self.line_index
            .offset(position)
            .map(|offset| locals_at(&self.block, offset, include_self))
            .unwrap_or_default()
    }
}

/// File id to latest parse.
#[derive(Debug, Default)]
pub struct FileTable {
    files: RwLock<HashMap<String, Arc<ParsedFile>>>,
}

impl FileTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and make it the current version of `id`.
    pub fn put(&self, id: impl Into<String>, source: impl Into<String>) -> Arc<ParsedFile> {
        let file = Arc::new(ParsedFile::new(id, source));
        let previous = self.write().insert(file.id.clone(), Arc::clone(&file));
        debug!(
            id = %file.id,
            errors = file.errors.len(),
            replaced = previous.is_some(),
            "stored parsed file"
        );
        file
    }

    /// Latest parse of `id`, or `None` if the file is unknown.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ParsedFile>> {
        self.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ParsedFile>> {
        let removed = self.write().remove(id);
        debug!(id, found = removed.is_some(), "removed file");
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Ids of all stored files, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // A writer can only panic between whole-entry swaps, so the map
    // behind a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ParsedFile>>> {
        self.files.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ParsedFile>>> {
        self.files.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_replaces_and_old_tree_stays_valid() {
        let table = FileTable::new();
        let first = table.put("a.lua", "local x = 1");
        let second = table.put("a.lua", "local y = 2\nlocal z = 3");

        assert_eq!(table.len(), 1);
        assert_eq!(first.block.stmts.len(), 1);
        assert_eq!(second.block.stmts.len(), 2);
        let current = table.get("a.lua").expect("stored");
        assert!(Arc::ptr_eq(&current, &second));
    }

    #[test]
    fn unknown_file_is_none() {
        let table = FileTable::new();
        assert!(table.get("missing.lua").is_none());
        assert!(table.remove("missing.lua").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn position_queries_use_line_and_column() {
        let file = ParsedFile::new("b.lua", "local a = 1\nprint(a)");
        let path = file.node_at_position(Position::new(2, 7));
        assert_eq!(path.node.map(|n| n.kind_name()), Some("Identifier"));

        let locals = file.locals_at_position(Position::new(2, 1), false);
        assert!(locals.contains_key("a"));

        assert!(file.node_at_position(Position::new(9, 1)).is_empty());
    }

    #[test]
    fn ids_are_sorted() {
        let table = FileTable::new();
        table.put("b.lua", "");
        table.put("a.lua", "x = 1");
        assert_eq!(table.ids(), vec!["a.lua", "b.lua"]);
    }
}
