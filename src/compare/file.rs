use std::sync::OnceLock;

use super::hunk::DiffHunk;
use super::line::{ChangeSummary, LineComparison, Sides};
use super::traverse::LineTraverser;
use super::visitors::{ChangeSummaryVisitor, LineComparisonVisitor};
use crate::diff::{DiffFile, DiffStats};
use crate::error::{HunkFormatError, Result};
use crate::model::{FileTotals, ReportFile};

/// Output of the single traversal shared by `lines` and `change_summary`.
#[derive(Debug)]
struct Traversal<'a> {
    lines: Vec<LineComparison<'a>>,
    change_summary: ChangeSummary,
}

/// One file seen from both sides of a comparison, with optional diff
/// metadata and head-side source text.
///
/// The traversal runs at most once per instance, on first access to
/// [`lines`](Self::lines) or [`change_summary`](Self::change_summary).
#[derive(Debug)]
pub struct FileComparison<'a> {
    base_file: Option<&'a ReportFile>,
    head_file: Option<&'a ReportFile>,
    diff_data: Option<&'a DiffFile>,
    src: Option<Vec<String>>,
    traversal: OnceLock<std::result::Result<Traversal<'a>, HunkFormatError>>,
}

impl<'a> FileComparison<'a> {
    pub fn new(base_file: Option<&'a ReportFile>, head_file: Option<&'a ReportFile>) -> Self {
        Self {
            base_file,
            head_file,
            diff_data: None,
            src: None,
            traversal: OnceLock::new(),
        }
    }

    pub fn with_diff(mut self, diff_data: Option<&'a DiffFile>) -> Self {
        self.diff_data = diff_data;
        self
    }

    pub fn with_src(mut self, src: Option<Vec<String>>) -> Self {
        self.src = src;
        self
    }

    pub fn name(&self) -> Sides<&'a str> {
        Sides::new(
            self.base_file.map(ReportFile::name),
            self.head_file.map(ReportFile::name),
        )
    }

    pub fn totals(&self) -> Sides<FileTotals> {
        Sides::new(
            self.base_file.map(ReportFile::totals),
            self.head_file.map(ReportFile::totals),
        )
    }

    pub fn has_diff(&self) -> bool {
        self.diff_data.is_some()
    }

    pub fn diff(&self) -> Option<&'a DiffFile> {
        self.diff_data
    }

    pub fn stats(&self) -> Option<DiffStats> {
        self.diff_data.and_then(|d| d.stats)
    }

    /// Every aligned line that has text, in traversal order. Empty when the
    /// file has neither a diff nor source lines.
    pub fn lines(&self) -> Result<&[LineComparison<'a>]> {
        Ok(&self.traverse()?.lines)
    }

    /// Coverage-state deltas on lines the diff left alone.
    pub fn change_summary(&self) -> Result<&ChangeSummary> {
        Ok(&self.traverse()?.change_summary)
    }

    fn traverse(&self) -> Result<&Traversal<'a>> {
        self.traversal
            .get_or_init(|| self.run())
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    fn run(&self) -> std::result::Result<Traversal<'a>, HunkFormatError> {
        let hunks = match self.diff_data {
            Some(diff) => diff
                .segments
                .iter()
                .map(DiffHunk::from_segment)
                .collect::<std::result::Result<Vec<_>, _>>()
                .inspect_err(|e| {
                    let name = self.name();
                    let path = name.head.or(name.base).unwrap_or_default();
                    tracing::warn!(path, error = %e, "skipping file with malformed diff");
                })?,
            None => Vec::new(),
        };

        let base_eof = self.base_file.map_or(0, ReportFile::eof);
        let head_eof = self.head_file.map_or(0, ReportFile::eof);

        let mut traverser = LineTraverser::new(base_eof, head_eof).with_hunks(&hunks);
        if let Some(src) = &self.src {
            traverser = traverser.with_src(src);
        }

        let mut lines = LineComparisonVisitor::new(self.base_file, self.head_file);
        let mut summary = ChangeSummaryVisitor::new(self.base_file, self.head_file);
        traverser.apply(&mut [&mut lines, &mut summary]);

        Ok(Traversal {
            lines: lines.lines,
            change_summary: summary.summary,
        })
    }
}
