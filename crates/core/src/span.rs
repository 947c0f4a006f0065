//! Source positions and spans.
//!
//! Lines and columns are zero-based. Columns count `char`s from the start
//! of the line, so a caret reported by an editor maps directly onto a
//! [`Position`]. Only `\n` terminates a line; a trailing `\r` is ordinary
//! whitespace on the line it ends.

use serde::Serialize;

/// A line/column location in a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open byte range plus the positions of both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl Span {
    pub fn new(start: usize, end: usize, start_pos: Position, end_pos: Position) -> Self {
        Span {
            start,
            end,
            start_pos,
            end_pos,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let (start, start_pos) = if other.start < self.start {
            (other.start, other.start_pos)
        } else {
            (self.start, self.start_pos)
        };
        let (end, end_pos) = if other.end > self.end {
            (other.end, other.end_pos)
        } else {
            (self.end, self.end_pos)
        };
        Span::new(start, end, start_pos, end_pos)
    }

    /// Whether `pos` lies within the span. Both ends are inclusive: a caret
    /// sitting right after the last character still belongs to the span.
    pub fn contains(&self, pos: Position) -> bool {
        self.start_pos <= pos && pos <= self.end_pos
    }
}

/// Line-start table for converting between byte offsets and positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Byte offset just past the last character of `line`, excluding the
    /// terminating `\n`.
    pub fn line_end(&self, line: u32) -> Option<usize> {
        let idx = line as usize;
        if idx >= self.line_starts.len() {
            return None;
        }
        Some(match self.line_starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.len,
        })
    }

    /// Byte offset of `pos` in `text`, or `None` when the line does not
    /// exist or the column runs past the end of the line. A column equal
    /// to the line's length is valid (end of line).
    pub fn offset_of(&self, text: &str, pos: Position) -> Option<usize> {
        let start = self.line_start(pos.line)?;
        let end = self.line_end(pos.line)?;
        let line = text.get(start..end)?;
        let mut remaining = pos.column as usize;
        for (i, _) in line.char_indices() {
            if remaining == 0 {
                return Some(start + i);
            }
            remaining -= 1;
        }
        if remaining == 0 {
            Some(end)
        } else {
            None
        }
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position_of(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        let start = self.line_starts[line];
        let column = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        Position::new(line as u32, column as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_trip_through_positions() {
        let text = "var a;\nfoo.bar\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.offset_of(text, Position::new(1, 4)), Some(11));
        assert_eq!(index.position_of(text, 11), Position::new(1, 4));
    }

    #[test]
    fn end_of_line_is_a_valid_caret() {
        let text = "foo.b";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_of(text, Position::new(0, 5)), Some(5));
        assert_eq!(index.offset_of(text, Position::new(0, 6)), None);
        assert_eq!(index.offset_of(text, Position::new(1, 0)), None);
    }

    #[test]
    fn columns_count_chars_not_bytes() {
        let text = "var é = 1;";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_of(text, Position::new(0, 5)), Some(6));
        assert_eq!(index.position_of(text, 6), Position::new(0, 5));
    }

    #[test]
    fn span_containment_is_inclusive() {
        let span = Span::new(0, 3, Position::new(0, 0), Position::new(0, 3));
        assert!(span.contains(Position::new(0, 3)));
        assert!(span.contains(Position::new(0, 0)));
        assert!(!span.contains(Position::new(0, 4)));
        assert!(!span.contains(Position::new(1, 0)));
    }
}
