//! Parser for reports already in the comparison's own line model:
//!
//! ```json
//! {"files": {"src/app.py": {"lines": {"1": {"coverage": 1, "sessions": [{"id": 0, "coverage": 1}]},
//!                                     "3": {"coverage": 0}}}}}
//! ```
//!
//! `coverage` is 0 for a miss, 1 for a hit and 2 or more for a partial.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{CovdiffError, Result};
use crate::model::{CoverageReport, ReportFile, ReportLine};
use crate::parsers::Parser;

pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageReport> {
        let raw: RawReport = serde_json::from_slice(input)?;

        let mut report = CoverageReport::new();
        for (name, file) in raw.files {
            if file.lines.contains_key(&0) {
                return Err(CovdiffError::Parse(format!(
                    "{name}: line numbers start at 1"
                )));
            }
            report.insert_file(ReportFile {
                name,
                lines: file.lines,
            });
        }
        Ok(report)
    }
}

#[derive(Deserialize)]
struct RawReport {
    files: BTreeMap<String, RawFile>,
}

#[derive(Deserialize)]
struct RawFile {
    #[serde(default)]
    lines: BTreeMap<u32, ReportLine>,
}
