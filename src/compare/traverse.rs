//! Walks base line numbers and head line numbers in lockstep against a list
//! of diff hunks, handing every aligned position to a set of visitors.
//!
//! Outside a hunk both counters advance together. Inside a hunk each raw
//! token decides which counter moves: `+` lines exist only in head, `-`
//! lines only in base, anything else in both.

use super::hunk::DiffHunk;
use super::line::LineKind;

/// One aligned position produced by the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversedLine<'t> {
    /// Base line number, absent for lines added in head.
    pub base_ln: Option<u32>,
    /// Head line number, absent for lines removed from base.
    pub head_ln: Option<u32>,
    /// Raw line text from the hunk or the source file, when known.
    pub value: Option<&'t str>,
    /// Whether the position was claimed by a diff hunk.
    pub is_diff: bool,
}

/// Receives every position of a traversal, in order.
pub trait LineVisitor {
    fn visit(&mut self, line: &TraversedLine<'_>);
}

impl<F> LineVisitor for F
where
    F: FnMut(&TraversedLine<'_>),
{
    fn visit(&mut self, line: &TraversedLine<'_>) {
        self(line)
    }
}

#[derive(Debug, Clone)]
pub struct LineTraverser<'a> {
    base_ln: u32,
    head_ln: u32,
    /// Exclusive bounds: traversal may stop once `base_ln >= base_eof`
    /// and `head_ln >= head_eof`.
    base_eof: u32,
    head_eof: u32,
    hunks: &'a [DiffHunk<'a>],
    /// Tokens across all hunks.
    token_count: u32,
    hunk_idx: usize,
    /// Next unread token in the current hunk.
    line_idx: usize,
    src: Option<&'a [String]>,
}

impl<'a> LineTraverser<'a> {
    pub fn new(base_eof: u32, head_eof: u32) -> Self {
        Self {
            base_ln: 1,
            head_ln: 1,
            base_eof,
            head_eof,
            hunks: &[],
            token_count: 0,
            hunk_idx: 0,
            line_idx: 0,
            src: None,
        }
    }

    pub fn with_hunks(mut self, hunks: &'a [DiffHunk<'a>]) -> Self {
        self.hunks = hunks;
        let tokens: usize = hunks.iter().map(|hunk| hunk.lines.len()).sum();
        self.token_count = u32::try_from(tokens).unwrap_or(u32::MAX);
        self
    }

    /// Head-side source lines, used for positions no hunk claims.
    pub fn with_src(mut self, src: &'a [String]) -> Self {
        self.src = Some(src);
        self
    }

    /// Current `(base_ln, head_ln)`.
    pub fn position(&self) -> (u32, u32) {
        (self.base_ln, self.head_ln)
    }

    /// Move both counters without emitting anything.
    pub fn seek(&mut self, base_ln: u32, head_ln: u32) {
        self.base_ln = base_ln;
        self.head_ln = head_ln;
    }

    fn current_hunk(&self) -> Option<&'a DiffHunk<'a>> {
        let hunks = self.hunks;
        hunks.get(self.hunk_idx)
    }

    fn next_hunk(&mut self) {
        self.hunk_idx += 1;
        self.line_idx = 0;
    }

    /// Whether the current hunk claims the current position.
    pub fn traversing_hunk(&self) -> bool {
        self.current_hunk()
            .is_some_and(|hunk| hunk.contains(self.base_ln, self.head_ln))
    }

    /// First position past what the inputs can account for: the longer of
    /// both reports and the source, plus one step per hunk token.
    fn data_end(&self) -> u32 {
        let src_end = self
            .src
            .map_or(0, |src| u32::try_from(src.len()).unwrap_or(u32::MAX).saturating_add(1));
        self.base_eof
            .max(self.head_eof)
            .max(src_end)
            .saturating_add(self.token_count)
    }

    /// Both counters at EOF and no hunk claiming the position. A hunk span
    /// reaching past the data is cut off at `data_end`.
    pub fn finished(&self) -> bool {
        if self.base_ln < self.base_eof || self.head_ln < self.head_eof {
            return false;
        }
        if !self.traversing_hunk() {
            return true;
        }
        let end = self.data_end();
        self.base_ln >= end && self.head_ln >= end
    }

    /// Drop hunks whose spans lie entirely behind the current position.
    fn skip_passed_hunks(&mut self) {
        while let Some(hunk) = self.current_hunk() {
            if !hunk.is_behind(self.base_ln, self.head_ln) {
                break;
            }
            let unread = hunk.lines.len().saturating_sub(self.line_idx);
            if unread > 0 {
                tracing::debug!(
                    hunk = self.hunk_idx,
                    unread,
                    "skipping hunk behind traversal position"
                );
            }
            self.next_hunk();
        }
    }

    /// Next raw line: a token of the current hunk when one claims the
    /// position, otherwise the source line at `head_ln`.
    pub fn pop_next_line(&mut self) -> Option<&'a str> {
        if self.traversing_hunk() {
            if let Some(hunk) = self.current_hunk() {
                if let Some(token) = hunk.lines.get(self.line_idx) {
                    self.line_idx += 1;
                    if self.line_idx >= hunk.lines.len() {
                        self.next_hunk();
                    }
                    return Some(token.as_str());
                }
            }
        }
        self.src_line()
    }

    fn src_line(&self) -> Option<&'a str> {
        let src = self.src?;
        let idx = usize::try_from(self.head_ln.checked_sub(1)?).ok()?;
        src.get(idx).map(String::as_str)
    }

    /// Run the traversal to the end, calling every visitor once per position.
    pub fn apply(&mut self, visitors: &mut [&mut dyn LineVisitor]) {
        loop {
            self.skip_passed_hunks();
            if self.finished() {
                break;
            }

            let is_diff = self.traversing_hunk();
            let value = self.pop_next_line();
            let kind = LineKind::of(value);

            let line = TraversedLine {
                base_ln: (kind != LineKind::Added).then_some(self.base_ln),
                head_ln: (kind != LineKind::Removed).then_some(self.head_ln),
                value,
                is_diff,
            };
            for visitor in visitors.iter_mut() {
                visitor.visit(&line);
            }

            match kind {
                LineKind::Added => self.head_ln += 1,
                LineKind::Removed => self.base_ln += 1,
                LineKind::Unchanged => {
                    self.base_ln += 1;
                    self.head_ln += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::HeaderField;

    /// Records `(base_ln, head_ln)` pairs.
    #[derive(Default)]
    struct LineNumberCollector {
        line_numbers: Vec<(Option<u32>, Option<u32>)>,
    }

    impl LineVisitor for LineNumberCollector {
        fn visit(&mut self, line: &TraversedLine<'_>) {
            self.line_numbers.push((line.base_ln, line.head_ln));
        }
    }

    fn tokens(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn collect(traverser: &mut LineTraverser<'_>) -> Vec<(Option<u32>, Option<u32>)> {
        let mut collector = LineNumberCollector::default();
        traverser.apply(&mut [&mut collector]);
        collector.line_numbers
    }

    #[test]
    fn test_no_diff_results_in_no_line_number_adjustments() {
        let mut traverser = LineTraverser::new(3, 3);
        assert_eq!(
            collect(&mut traverser),
            vec![(Some(1), Some(1)), (Some(2), Some(2))]
        );
    }

    #[test]
    fn test_no_diff_uneven_eofs_runs_to_longer_side() {
        let mut traverser = LineTraverser::new(2, 4);
        assert_eq!(collect(&mut traverser).len(), 3);
    }

    #[test]
    fn test_diff_with_added_lines_adjusts_lines() {
        let lines = tokens(&["+"]);
        let hunks = [DiffHunk::new([1, 1, 1, 2], &lines)];
        let mut traverser = LineTraverser::new(3, 4).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![(None, Some(1)), (Some(1), Some(2)), (Some(2), Some(3))]
        );
    }

    #[test]
    fn test_diff_with_removed_lines_adjusts_lines() {
        let lines = tokens(&["-"]);
        let hunks = [DiffHunk::new([1, 1, 1, 2], &lines)];
        let mut traverser = LineTraverser::new(4, 3).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![(Some(1), None), (Some(2), Some(1)), (Some(3), Some(2))]
        );
    }

    #[test]
    fn test_diff_with_1_line_added_file_adjusts_lines() {
        let lines = tokens(&["+"]);
        let hunks = [DiffHunk::new([0, 0, 1, 0], &lines)];
        let mut traverser = LineTraverser::new(0, 2).with_hunks(&hunks);
        assert_eq!(collect(&mut traverser), vec![(None, Some(1))]);
    }

    #[test]
    fn test_diff_with_1_line_removed_file_adjusts_lines() {
        let lines = tokens(&["-"]);
        let hunks = [DiffHunk::new([1, 1, 0, 0], &lines)];
        let mut traverser = LineTraverser::new(2, 0).with_hunks(&hunks);
        assert_eq!(collect(&mut traverser), vec![(Some(1), None)]);
    }

    #[test]
    fn test_pop_line_returns_none_if_no_diff_or_src() {
        let mut traverser = LineTraverser::new(0, 0);
        assert_eq!(traverser.pop_next_line(), None);
    }

    #[test]
    fn test_pop_line_pops_first_line_in_hunk_if_traversing_it() {
        let lines = tokens(&["+this is a line!", "this is another line"]);
        let hunks = [DiffHunk::new([1, 2, 1, 3], &lines)];
        let mut traverser = LineTraverser::new(0, 0).with_hunks(&hunks);
        assert_eq!(traverser.pop_next_line(), Some("+this is a line!"));
        assert_eq!(traverser.pop_next_line(), Some("this is another line"));
    }

    #[test]
    fn test_pop_line_returns_src_line_at_head_ln_if_not_in_hunk() {
        let src = tokens(&["a line from src!"]);
        let mut traverser = LineTraverser::new(0, 2).with_src(&src);
        assert_eq!(traverser.pop_next_line(), Some("a line from src!"));
    }

    #[test]
    fn test_pop_line_past_end_of_src_is_none() {
        let src = tokens(&["only line"]);
        let mut traverser = LineTraverser::new(0, 5).with_src(&src);
        traverser.seek(3, 3);
        assert_eq!(traverser.pop_next_line(), None);
    }

    #[test]
    fn test_traversing_hunk_by_head_ln() {
        let hunks = [DiffHunk::new([1, 6, 12, 4], &[])];
        let mut traverser = LineTraverser::new(0, 0).with_hunks(&hunks);
        traverser.seek(1000, 14);
        assert!(traverser.traversing_hunk());

        traverser.seek(1000, 11);
        assert!(!traverser.traversing_hunk());
    }

    #[test]
    fn test_traversing_hunk_by_base_ln() {
        let hunks = [DiffHunk::new([4, 43, 4, 3], &[])];
        let mut traverser = LineTraverser::new(0, 0).with_hunks(&hunks);
        traverser.seek(44, 7);
        assert!(traverser.traversing_hunk());
    }

    #[test]
    fn test_traversing_hunk_handles_one_line_file_headers() {
        let added = [DiffHunk::new([0, 0, 1, 0], &[])];
        assert!(LineTraverser::new(0, 0).with_hunks(&added).traversing_hunk());

        let removed = [DiffHunk::new([1, 1, 0, 0], &[])];
        assert!(LineTraverser::new(0, 0).with_hunks(&removed).traversing_hunk());
    }

    #[test]
    fn test_not_finished_at_eof_while_hunk_claims_position() {
        // Removing a multi-line statement at the end of a file: coverage counts
        // it as one line but the diff has several, so both counters can pass
        // EOF while the hunk still has lines to give.
        let hunks = [DiffHunk::new([4, 43, 4, 3], &[])];
        let mut traverser = LineTraverser::new(43, 7).with_hunks(&hunks);
        traverser.seek(45, 7);
        assert!(!traverser.finished());
    }

    #[test]
    fn test_removed_lines_past_eof_are_still_emitted() {
        let lines = tokens(&["-a", "-b", "-c"]);
        let hunks = [DiffHunk::new([2, 3, 2, 0], &lines)];
        // Base coverage ends at line 2, the diff removes lines 2..=4
        let mut traverser = LineTraverser::new(3, 2).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![
                (Some(1), Some(1)),
                (Some(2), None),
                (Some(3), None),
                (Some(4), None),
            ]
        );
    }

    #[test]
    fn test_hunk_far_past_eof_is_not_reached() {
        let lines = tokens(&["+x"]);
        let hunks = [DiffHunk::new([50_000_000, 1, 50_000_000, 1], &lines)];
        let mut traverser = LineTraverser::new(3, 3).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![(Some(1), Some(1)), (Some(2), Some(2))]
        );
    }

    #[test]
    fn test_oversized_hunk_span_is_clamped_to_data() {
        let hunks = [DiffHunk::new([1, 50_000_000, 1, 50_000_000], &[])];
        let mut traverser = LineTraverser::new(3, 3).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![(Some(1), Some(1)), (Some(2), Some(2))]
        );
    }

    #[test]
    fn test_mid_file_insertion_keeps_alignment() {
        let lines = tokens(&["+x"]);
        let header: Vec<HeaderField> = ["5", "0", "6", ""]
            .iter()
            .map(|s| HeaderField::Text(s.to_string()))
            .collect();
        let hunks = [DiffHunk::parse(&header, &lines).unwrap()];
        let mut traverser = LineTraverser::new(9, 10).with_hunks(&hunks);
        let pairs = collect(&mut traverser);
        assert_eq!(
            pairs[3..8],
            [
                (Some(4), Some(4)),
                (Some(5), Some(5)),
                (None, Some(6)),
                (Some(6), Some(7)),
                (Some(7), Some(8)),
            ]
        );
        assert_eq!(pairs.last(), Some(&(Some(8), Some(9))));
    }

    #[test]
    fn test_hunk_left_when_tokens_exhausted() {
        // Header claims more lines than it carries; once the tokens are used up
        // the remaining positions come from src again.
        let lines = tokens(&["+added", "-removed"]);
        let hunks = [DiffHunk::new([2, 2, 2, 2], &lines)];
        let src = tokens(&["first", "added", "last"]);
        let mut traverser = LineTraverser::new(4, 4).with_hunks(&hunks).with_src(&src);

        let mut seen = Vec::new();
        let mut record = |line: &TraversedLine<'_>| {
            seen.push((line.value.map(str::to_string), line.is_diff));
        };
        traverser.apply(&mut [&mut record]);

        assert_eq!(
            seen,
            vec![
                (Some("first".to_string()), false),
                (Some("+added".to_string()), true),
                (Some("-removed".to_string()), true),
                (Some("last".to_string()), false),
            ]
        );
    }

    #[test]
    fn test_stale_hunk_is_skipped() {
        // Second hunk lies behind the position once the first is consumed
        let first = tokens(&["+a", "+b", "+c", "+d"]);
        let second = tokens(&["+x"]);
        let hunks = [
            DiffHunk::new([1, 0, 1, 4], &first),
            DiffHunk::new([0, 0, 2, 1], &second),
        ];
        let mut traverser = LineTraverser::new(2, 6).with_hunks(&hunks);
        assert_eq!(
            collect(&mut traverser),
            vec![
                (None, Some(1)),
                (None, Some(2)),
                (None, Some(3)),
                (None, Some(4)),
                (Some(1), Some(5)),
            ]
        );
    }

    #[test]
    fn test_all_visitors_see_every_position() {
        let mut first = LineNumberCollector::default();
        let mut second = LineNumberCollector::default();
        LineTraverser::new(4, 4).apply(&mut [&mut first, &mut second]);
        assert_eq!(first.line_numbers.len(), 3);
        assert_eq!(first.line_numbers, second.line_numbers);
    }
}
