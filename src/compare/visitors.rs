//! The two visitors a file comparison runs over a single traversal.

use super::line::{ChangeSummary, LineComparison, LineKind};
use super::traverse::{LineVisitor, TraversedLine};
use crate::model::{ReportFile, ReportLine};

fn lookup<'a>(file: Option<&'a ReportFile>, line_no: Option<u32>) -> Option<&'a ReportLine> {
    file?.get(line_no?)
}

/// Builds a [`LineComparison`] for every position that has line text.
#[derive(Debug, Clone)]
pub struct LineComparisonVisitor<'a> {
    pub base_file: Option<&'a ReportFile>,
    pub head_file: Option<&'a ReportFile>,
    pub lines: Vec<LineComparison<'a>>,
}

impl<'a> LineComparisonVisitor<'a> {
    pub fn new(base_file: Option<&'a ReportFile>, head_file: Option<&'a ReportFile>) -> Self {
        Self {
            base_file,
            head_file,
            lines: Vec::new(),
        }
    }
}

impl LineVisitor for LineComparisonVisitor<'_> {
    fn visit(&mut self, line: &TraversedLine<'_>) {
        let Some(value) = line.value else {
            return;
        };
        self.lines.push(LineComparison::new(
            lookup(self.base_file, line.base_ln),
            lookup(self.head_file, line.head_ln),
            line.base_ln,
            line.head_ln,
            value,
            line.is_diff,
        ));
    }
}

/// Counts coverage-state transitions on lines the diff did not touch.
#[derive(Debug, Clone)]
pub struct ChangeSummaryVisitor<'a> {
    pub base_file: Option<&'a ReportFile>,
    pub head_file: Option<&'a ReportFile>,
    pub summary: ChangeSummary,
}

impl<'a> ChangeSummaryVisitor<'a> {
    pub fn new(base_file: Option<&'a ReportFile>, head_file: Option<&'a ReportFile>) -> Self {
        Self {
            base_file,
            head_file,
            summary: ChangeSummary::new(),
        }
    }
}

impl LineVisitor for ChangeSummaryVisitor<'_> {
    fn visit(&mut self, line: &TraversedLine<'_>) {
        if line.is_diff || LineKind::of(line.value) != LineKind::Unchanged {
            return;
        }
        let base_line = lookup(self.base_file, line.base_ln);
        let head_line = lookup(self.head_file, line.head_ln);
        if let (Some(base), Some(head)) = (base_line, head_line) {
            self.summary.record_transition(base.state(), head.state());
        }
    }
}
