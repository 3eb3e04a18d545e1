//! Conversion between byte offsets and 1-based line/column positions.
//!
//! Tree spans are byte offsets; editors and diagnostics speak in lines
//! and columns. Columns count bytes, matching token ranges.

use crate::token::{Pos, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset at which each line starts.
    line_starts: Vec<Pos>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0];
        for (i, &byte) in bytes.iter().enumerate() {
            // `\r\n` ends one line, at its `\n`
            let ends_line = match byte {
                b'\n' => true,
                b'\r' => bytes.get(i + 1) != Some(&b'\n'),
                _ => false,
            };
            if ends_line {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line/column of a byte offset. Offsets past the end clamp to the
    /// end of the text.
    #[must_use]
    pub fn position(&self, offset: Pos) -> Position {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        Position {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }

    /// Byte offset of a line/column position, or `None` when the
    /// position lies outside the text.
    #[must_use]
    pub fn offset(&self, position: Position) -> Option<Pos> {
        let line = position.line.checked_sub(1)?;
        let column = position.column.checked_sub(1)?;
        let start = *self.line_starts.get(line)?;
        let end = self.line_starts.get(line + 1).map_or(self.len, |next| next - 1);
        let offset = start + column;
        (offset <= end).then_some(offset)
    }
}
