//! A single unified-diff hunk, reduced to the line-number spans it claims in
//! base and head and the raw line tokens it carries.

use std::ops::Range;

use crate::diff::{HeaderField, Segment};
use crate::error::HunkFormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffHunk<'a> {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Raw tokens, each prefixed `+`, `-` or unprefixed context.
    pub lines: &'a [String],
}

impl<'a> DiffHunk<'a> {
    pub fn new(header: [u32; 4], lines: &'a [String]) -> Self {
        let [old_start, old_count, new_start, new_count] = header;
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
            lines,
        }
    }

    /// Read `[old_start, old_count, new_start, new_count]`. An empty field
    /// counts as 0.
    pub fn parse(header: &[HeaderField], lines: &'a [String]) -> Result<Self, HunkFormatError> {
        let invalid = |reason: String| HunkFormatError {
            header: header.iter().map(ToString::to_string).collect(),
            reason,
        };

        if header.len() != 4 {
            return Err(invalid(format!("expected 4 fields, found {}", header.len())));
        }

        let mut fields = [0u32; 4];
        for (slot, field) in fields.iter_mut().zip(header) {
            *slot = match field {
                HeaderField::Number(n) => u32::try_from(*n)
                    .map_err(|_| invalid(format!("line number out of range: {n}")))?,
                HeaderField::Text(s) if s.trim().is_empty() => 0,
                HeaderField::Text(s) => s
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("not a line number: '{s}'")))?,
            };
        }

        Ok(Self::new(fields, lines))
    }

    pub fn from_segment(segment: &'a Segment) -> Result<Self, HunkFormatError> {
        Self::parse(&segment.header, &segment.lines)
    }

    /// No base lines are replaced: the hunk only inserts after `old_start`.
    pub fn is_pure_insertion(&self) -> bool {
        self.old_count == 0
    }

    /// Base line numbers claimed by this hunk. When head starts at line 0
    /// (the file was emptied) the span starts no earlier than line 1 and
    /// covers at least one line.
    pub fn old_span(&self) -> Range<u32> {
        if self.new_start == 0 {
            let start = self.old_start.max(1);
            start..start.saturating_add(self.old_count.max(1))
        } else {
            self.old_start..self.old_start.saturating_add(self.old_count)
        }
    }

    /// Head line numbers claimed by this hunk. A pure insertion claims at
    /// least one head line.
    pub fn new_span(&self) -> Range<u32> {
        if self.is_pure_insertion() && self.new_start > 0 {
            self.new_start..self.new_start.saturating_add(self.new_count.max(1))
        } else {
            self.new_start..self.new_start.saturating_add(self.new_count)
        }
    }

    /// Whether the position `(base_ln, head_ln)` falls inside this hunk.
    pub fn contains(&self, base_ln: u32, head_ln: u32) -> bool {
        self.old_span().contains(&base_ln) || self.new_span().contains(&head_ln)
    }

    /// Whether the position has moved past both spans of this hunk.
    pub fn is_behind(&self, base_ln: u32, head_ln: u32) -> bool {
        let old = self.old_span();
        let new = self.new_span();
        (old.is_empty() || base_ln >= old.end) && (new.is_empty() || head_ln >= new.end)
    }
}
