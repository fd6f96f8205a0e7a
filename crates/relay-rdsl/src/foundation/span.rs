//! Source location tracking for diagnostics.
//!
//! The front-end core never reads source text (parsing and file I/O live in
//! the parser crate); a [`Span`] is pure data attached to every syntax node
//! so that errors can point back at the offending source range.
//!
//! # Design
//!
//! - `Span` — compact byte range with a cached start line
//! - spans from different files must never be merged; the file id is part
//!   of the span

use serde::{Deserialize, Serialize};

/// Compact source location reference.
///
/// Points to a byte range in a source file with a cached line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the source file within the compilation unit
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Cached line number (1-based) for the start position
    pub start_line: u16,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Get the length of this span in bytes.
    ///
    /// # Panics
    /// Panics if end < start (malformed span).
    pub fn len(&self) -> u32 {
        assert!(
            self.end >= self.start,
            "malformed span: end ({}) < start ({})",
            self.end,
            self.start
        );
        self.end - self.start
    }

    /// Merge two spans (returns span covering both).
    ///
    /// Panics if spans are from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line: self.start_line.min(other.start_line),
        }
    }
}
