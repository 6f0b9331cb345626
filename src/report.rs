//! Output formatting for comparison results.

use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use crate::compare::{ChangeSummary, Comparison, FileComparison, LineComparison, LineKind, Sides};
use crate::diff::DiffStats;
use crate::model::FileTotals;

/// Owned, serializable view of a [`Comparison`], ready to be formatted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonReport {
    /// Files with a diff, a coverage change, or an error.
    pub files: Vec<FileReport>,
    /// Sum of the per-file change summaries.
    pub total: ChangeSummary,
}

impl ComparisonReport {
    /// Format using a specific formatter.
    pub fn format(&self, formatter: &dyn ReportFormatter) -> Result<String> {
        formatter.format(self)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    pub name: Sides<String>,
    pub totals: Sides<FileTotals>,
    pub has_diff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DiffStats>,
    pub change_summary: ChangeSummary,
    /// Added lines that head does not cover, as inclusive ranges.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missed: Vec<(u32, u32)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineRow>,
    /// Set when the file's diff could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    /// Head path, or base path for a file without head coverage.
    pub fn path(&self) -> &str {
        self.name
            .head
            .as_deref()
            .or(self.name.base.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRow {
    pub number: Sides<u32>,
    pub coverage: Sides<u32>,
    pub value: String,
    pub is_diff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<usize>,
}

impl From<&LineComparison<'_>> for LineRow {
    fn from(line: &LineComparison<'_>) -> Self {
        Self {
            number: line.number(),
            coverage: line.coverage(),
            value: line.value.clone(),
            is_diff: line.is_diff,
            sessions: line.sessions(),
        }
    }
}

/// Build a [`ComparisonReport`] listing every file that has a diff or a
/// coverage change.
pub fn build_report(comparison: &Comparison<'_>, include_lines: bool) -> ComparisonReport {
    let mut report = ComparisonReport::default();

    for file in comparison.files() {
        let file_report = file_report(&file, include_lines);
        if !file_report.has_diff
            && file_report.change_summary.is_empty()
            && file_report.error.is_none()
        {
            continue;
        }
        report.total.merge(&file_report.change_summary);
        report.files.push(file_report);
    }

    report
}

/// Build the report entry for a single file.
pub fn file_report(file: &FileComparison<'_>, include_lines: bool) -> FileReport {
    let name = file.name();
    let mut report = FileReport {
        name: Sides::new(name.base.map(str::to_string), name.head.map(str::to_string)),
        totals: file.totals(),
        has_diff: file.has_diff(),
        stats: file.stats(),
        ..Default::default()
    };

    let (lines, summary) = match (file.lines(), file.change_summary()) {
        (Ok(lines), Ok(summary)) => (lines, summary),
        (Err(e), _) | (_, Err(e)) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    report.change_summary = summary.clone();

    let missed: Vec<u32> = lines
        .iter()
        .filter(|l| l.is_diff && l.kind() == LineKind::Added)
        .filter(|l| l.coverage().head == Some(0))
        .filter_map(|l| l.head_ln)
        .collect();
    let instrumented: Vec<u32> = lines
        .iter()
        .filter(|l| l.coverage().head.is_some())
        .filter_map(|l| l.head_ln)
        .collect();
    report.missed = coalesce_ranges(&missed, &instrumented);

    if include_lines {
        report.lines = lines.iter().map(LineRow::from).collect();
    }

    report
}

/// Trait for formatting comparison reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &ComparisonReport) -> Result<String>;
}

fn format_summary(summary: &ChangeSummary) -> String {
    if summary.is_empty() {
        return "no change".to_string();
    }
    summary
        .iter()
        .map(|(state, delta)| format!("{state} {delta:+}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_stats(stats: Option<DiffStats>) -> String {
    match stats {
        Some(DiffStats { added, removed }) => format!("+{added} -{removed}"),
        None => String::new(),
    }
}

fn cell(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn marker(row: &LineRow) -> char {
    match LineKind::of(Some(row.value.as_str())) {
        LineKind::Added => '+',
        LineKind::Removed => '-',
        LineKind::Unchanged => ' ',
    }
}

/// Plain text formatter.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &ComparisonReport) -> Result<String> {
        let mut out = String::new();

        if report.files.is_empty() {
            out.push_str("No coverage changes.\n");
            return Ok(out);
        }

        let total = format_summary(&report.total);
        writeln!(out, "Coverage change outside the diff: {total}").unwrap();
        out.push('\n');

        for f in &report.files {
            let path = f.path();
            if let Some(ref err) = f.error {
                writeln!(out, "  {path}  error: {err}").unwrap();
                continue;
            }

            let summary = format_summary(&f.change_summary);
            write!(out, "  {path}  {summary}").unwrap();
            if f.has_diff {
                let stats = format_stats(f.stats);
                if !stats.is_empty() {
                    write!(out, "  diff {stats}").unwrap();
                }
            }
            if !f.missed.is_empty() {
                write!(out, "  missed: {}", format_ranges(&f.missed)).unwrap();
            }
            out.push('\n');

            for row in &f.lines {
                writeln!(
                    out,
                    "    {:>5} {:>5}  {:>2} {:>2}  {}{}",
                    cell(row.number.base),
                    cell(row.number.head),
                    cell(row.coverage.base),
                    cell(row.coverage.head),
                    if row.is_diff { '*' } else { ' ' },
                    row.value,
                )
                .unwrap();
            }
        }

        Ok(out)
    }
}

/// Markdown formatter.
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &ComparisonReport) -> Result<String> {
        let mut md = String::new();

        md.push_str("### Coverage Changes\n\n");

        if report.files.is_empty() {
            md.push_str("No coverage changes.\n");
            return Ok(md);
        }

        let total = format_summary(&report.total);
        writeln!(md, "**Outside the diff:** {total}\n").unwrap();

        md.push_str("| File | Hits | Misses | Partials | Diff | Missed |\n");
        md.push_str("|:-----|-----:|-------:|---------:|-----:|:-------|\n");
        for f in &report.files {
            let path = f.path();
            if let Some(ref err) = f.error {
                writeln!(md, "| `{path}` | | | | | ⚠️ {err} |").unwrap();
                continue;
            }
            let delta = |state| match f.change_summary.get(state) {
                0 => String::new(),
                d => format!("{d:+}"),
            };
            writeln!(
                md,
                "| `{path}` | {} | {} | {} | {} | {} |",
                delta(crate::model::CoverageState::Hit),
                delta(crate::model::CoverageState::Miss),
                delta(crate::model::CoverageState::Partial),
                format_stats(f.stats),
                format_ranges(&f.missed),
            )
            .unwrap();
        }

        for f in report.files.iter().filter(|f| !f.lines.is_empty()) {
            let path = f.path();
            writeln!(md, "\n<details>\n<summary><code>{path}</code></summary>\n").unwrap();
            md.push_str("```diff\n");
            for row in &f.lines {
                let value = row.value.get(1..).filter(|_| marker(row) != ' ');
                writeln!(
                    md,
                    "{}{:>5} {:>5} {:>2}| {}",
                    marker(row),
                    cell(row.number.base),
                    cell(row.number.head),
                    cell(row.coverage.head),
                    value.unwrap_or(&row.value),
                )
                .unwrap();
            }
            md.push_str("```\n\n</details>\n");
        }

        Ok(md)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ComparisonReport) -> Result<String> {
        let mut json = serde_json::to_string_pretty(report)?;
        json.push('\n');
        Ok(json)
    }
}

/// Maximum number of consecutive non-instrumented lines that can be bridged
/// when coalescing missed ranges.
const MAX_BRIDGE_GAP: u32 = 2;

/// Coalesce sorted line numbers into `(start, end)` ranges, bridging small
/// gaps where every line in the gap is non-instrumented.
///
/// A gap between two missed lines is bridged only when:
/// 1. Every line in the gap is absent from `instrumented`, AND
/// 2. The gap is at most [`MAX_BRIDGE_GAP`] lines wide.
///
/// `lines` must be sorted and deduplicated; `instrumented` must be sorted.
#[must_use]
pub fn coalesce_ranges(lines: &[u32], instrumented: &[u32]) -> Vec<(u32, u32)> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = first;
    let mut end = first;

    for &line in rest {
        let gap = line - end - 1;
        if gap <= MAX_BRIDGE_GAP && (end + 1..line).all(|l| instrumented.binary_search(&l).is_err())
        {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Format ranges in compact notation, e.g. "1, 3-5, 8".
#[must_use]
pub fn format_ranges(ranges: &[(u32, u32)]) -> String {
    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
