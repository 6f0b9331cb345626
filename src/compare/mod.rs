//! Line-level reconciliation of a base and a head coverage report against
//! the diff between them.
//!
//! [`Comparison`] pairs files across the two reports, [`FileComparison`]
//! aligns one pair line by line, and the traversal in [`traverse`] does the
//! actual walking.

pub mod file;
pub mod hunk;
pub mod line;
pub mod traverse;
pub mod visitors;

pub use file::FileComparison;
pub use hunk::DiffHunk;
pub use line::{ChangeSummary, LineComparison, LineKind, Sides};
pub use traverse::{LineTraverser, LineVisitor, TraversedLine};
pub use visitors::{ChangeSummaryVisitor, LineComparisonVisitor};

use crate::diff::ComparisonDiff;
use crate::model::CoverageReport;
use crate::source::SourceFetcher;

/// A base report, a head report and (optionally) the diff between their
/// commits.
pub struct Comparison<'a> {
    base: &'a CoverageReport,
    head: &'a CoverageReport,
    diff: Option<&'a ComparisonDiff>,
    sources: Option<&'a dyn SourceFetcher>,
}

impl<'a> Comparison<'a> {
    pub fn new(base: &'a CoverageReport, head: &'a CoverageReport) -> Self {
        Self {
            base,
            head,
            diff: None,
            sources: None,
        }
    }

    pub fn with_diff(mut self, diff: Option<&'a ComparisonDiff>) -> Self {
        self.diff = diff;
        self
    }

    /// Where [`file`](Self::file) gets head source lines from.
    pub fn with_sources(mut self, sources: &'a dyn SourceFetcher) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn base(&self) -> &'a CoverageReport {
        self.base
    }

    pub fn head(&self) -> &'a CoverageReport {
        self.head
    }

    pub fn diff(&self) -> Option<&'a ComparisonDiff> {
        self.diff
    }

    /// One comparison per file in the head report, in path order. Files only
    /// present in base are not included. Source lines are not fetched.
    pub fn files(&self) -> Vec<FileComparison<'a>> {
        self.head
            .iter()
            .map(|file| self.build(file.name(), false))
            .collect()
    }

    /// Comparison for a single head path, with source lines when a fetcher
    /// is configured.
    pub fn file(&self, path: &str) -> FileComparison<'a> {
        self.build(path, true)
    }

    /// Sum of every file's change summary. Files whose diff cannot be read
    /// are left out.
    pub fn total_change_summary(&self) -> ChangeSummary {
        let mut total = ChangeSummary::new();
        for file in self.files() {
            if let Ok(summary) = file.change_summary() {
                total.merge(summary);
            }
        }
        total
    }

    fn build(&self, path: &str, with_src: bool) -> FileComparison<'a> {
        let diff_data = self.diff.and_then(|d| d.file(path));
        let base_path = diff_data
            .and_then(|d| d.before.as_deref())
            .unwrap_or(path);

        let base_file = self.base.get_file(base_path);
        let head_file = self.head.get_file(path);
        tracing::debug!(
            path,
            base_path,
            base = base_file.is_some(),
            head = head_file.is_some(),
            diff = diff_data.is_some(),
            "paired file"
        );

        let src = if with_src { self.fetch_source(path) } else { None };

        FileComparison::new(base_file, head_file)
            .with_diff(diff_data)
            .with_src(src)
    }

    fn fetch_source(&self, path: &str) -> Option<Vec<String>> {
        let sources = self.sources?;
        match sources.fetch_source(path) {
            Ok(src) => src,
            Err(e) => {
                tracing::warn!(path, error = %e, "could not fetch source");
                None
            }
        }
    }
}
