use std::path::Path;

use crate::detect::{detect_format, Format};
use crate::error::{CovdiffError, Result};
use crate::model::CoverageReport;
use crate::parsers::parser_for;

/// Read a coverage file, auto-detect its format (or use the override) and
/// parse it. Returns the report and the format it was read as.
pub fn load_report(
    file_path: &Path,
    format_override: Option<&str>,
) -> Result<(CoverageReport, Format)> {
    let content = std::fs::read(file_path)?;

    let format = match format_override {
        Some(fmt_str) => fmt_str.parse::<Format>()?,
        None => detect_format(file_path, &content).ok_or(CovdiffError::UnknownFormat)?,
    };

    let report = parser_for(format).parse(&content)?;
    tracing::debug!(
        path = %file_path.display(),
        %format,
        files = report.len(),
        "loaded coverage report"
    );

    Ok((report, format))
}
