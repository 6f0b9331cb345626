/// Parser for the LCOV `.info` format.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Records used:
///   SF:<path to source file>
///   DA:<line number>,<execution count>[,<checksum>]
///   BRDA:<line>,<block>,<branch>,<taken>   ("-" means 0)
///   end_of_record
///
/// Everything else (TN, FN, FNDA, summary counters) is ignored. A file that
/// appears in several records has its counts summed.
use std::collections::BTreeMap;

use crate::error::{CovdiffError, Result};
use crate::model::{CoverageReport, ReportFile, ReportLine};
use crate::parsers::Parser;

pub struct LcovParser;

impl Parser for LcovParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageReport> {
        parse(input)
    }
}

/// Counts collected for one source file across all of its records.
#[derive(Default)]
struct FileCounts {
    hits: BTreeMap<u32, u64>,
    /// Times taken, per (line, block, branch).
    branches: BTreeMap<(u32, String, String), u64>,
}

impl FileCounts {
    fn into_report_file(self, name: String) -> ReportFile {
        let mut arms: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
        for ((line, _, _), taken) in self.branches {
            let (covered, total) = arms.entry(line).or_default();
            *total += 1;
            if taken > 0 {
                *covered += 1;
            }
        }

        let mut file = ReportFile::new(name);
        for (line_number, hits) in self.hits {
            let line = ReportLine::from_counts(hits, arms.get(&line_number).copied());
            file.insert(line_number, line);
        }
        file
    }
}

/// Parse LCOV coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageReport> {
    let text = std::str::from_utf8(input)
        .map_err(|e| CovdiffError::Parse(format!("Invalid UTF-8 in LCOV data: {e}")))?;

    let mut files: BTreeMap<String, FileCounts> = BTreeMap::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "end_of_record" {
            current = None;
            continue;
        }

        let Some((tag, value)) = line.split_once(':') else {
            continue;
        };

        match tag {
            "SF" => {
                files.entry(value.to_string()).or_default();
                current = Some(value.to_string());
            }
            "DA" => {
                // Negative counts mark non-instrumentable lines.
                let Some(counts) = current.as_ref().and_then(|p| files.get_mut(p)) else {
                    continue;
                };
                let mut parts = value.splitn(3, ',');
                let (Some(line_str), Some(count_str)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let Ok(line_number) = line_str.parse::<u32>() else {
                    continue;
                };
                match count_str.parse::<i64>() {
                    Ok(count) if count >= 0 => {
                        *counts.hits.entry(line_number).or_insert(0) += count as u64;
                    }
                    _ => {}
                }
            }
            "BRDA" => {
                let Some(counts) = current.as_ref().and_then(|p| files.get_mut(p)) else {
                    continue;
                };
                let parts: Vec<&str> = value.splitn(4, ',').collect();
                if parts.len() != 4 {
                    continue;
                }
                let Ok(line_number) = parts[0].parse::<u32>() else {
                    continue;
                };
                let taken = if parts[3] == "-" {
                    0
                } else {
                    parts[3].parse::<u64>().unwrap_or(0)
                };
                *counts
                    .branches
                    .entry((line_number, parts[1].to_string(), parts[2].to_string()))
                    .or_insert(0) += taken;
            }
            // TN, FN, FNDA and the LF/LH/BRF/BRH summaries
            _ => {}
        }
    }

    let mut report = CoverageReport::new();
    for (name, counts) in files {
        report.insert_file(counts.into_report_file(name));
    }
    Ok(report)
}
