//! Command handler functions for the covdiff CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use anyhow::{bail, Result};
use clap::ValueEnum;

use crate::compare::Comparison;
use crate::diff::ComparisonDiff;
use crate::model::CoverageReport;
use crate::report::{
    self, ComparisonReport, JsonFormatter, MarkdownFormatter, ReportFormatter, TextFormatter,
};
use crate::source::SourceFetcher;

/// Output style for comparison commands.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Style {
    #[default]
    Text,
    Markdown,
    Json,
}

impl Style {
    fn formatter(self) -> &'static dyn ReportFormatter {
        match self {
            Style::Text => &TextFormatter,
            Style::Markdown => &MarkdownFormatter,
            Style::Json => &JsonFormatter,
        }
    }
}

/// Everything a comparison command reads, loaded up front.
pub struct Inputs<'a> {
    pub base: &'a CoverageReport,
    pub head: &'a CoverageReport,
    pub diff: Option<&'a ComparisonDiff>,
    pub sources: Option<&'a dyn SourceFetcher>,
}

impl<'a> Inputs<'a> {
    fn comparison(&self) -> Comparison<'a> {
        let comparison = Comparison::new(self.base, self.head).with_diff(self.diff);
        match self.sources {
            Some(sources) => comparison.with_sources(sources),
            None => comparison,
        }
    }
}

/// Compare every file in the head report.
pub fn cmd_compare(inputs: &Inputs<'_>, style: Style, include_lines: bool) -> Result<String> {
    let report = report::build_report(&inputs.comparison(), include_lines);
    tracing::info!(
        files = report.files.len(),
        errors = report.files.iter().filter(|f| f.error.is_some()).count(),
        "built comparison report"
    );
    report.format(style.formatter())
}

/// Line-by-line comparison of a single file.
pub fn cmd_file(inputs: &Inputs<'_>, path: &str, style: Style) -> Result<String> {
    let file = inputs.comparison().file(path);

    let name = file.name();
    if name.base.is_none() && name.head.is_none() && !file.has_diff() {
        bail!("No coverage data or diff for '{path}'");
    }

    let file_report = report::file_report(&file, true);
    let report = ComparisonReport {
        total: file_report.change_summary.clone(),
        files: vec![file_report],
    };
    report.format(style.formatter())
}
