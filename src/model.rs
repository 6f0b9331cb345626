//! In-memory representation of a coverage report, independent of the format
//! it was read from. Parsers produce a `CoverageReport`; the comparison engine
//! only ever reads from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coverage classification of a single line.
///
/// Serialized with the plural key names used in change summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoverageState {
    #[serde(rename = "hits")]
    Hit,
    #[serde(rename = "misses")]
    Miss,
    #[serde(rename = "partials")]
    Partial,
}

impl CoverageState {
    /// Classify a raw coverage value: 0 is a miss, 1 a hit, anything higher a partial.
    #[must_use]
    pub fn classify(coverage: u32) -> Self {
        match coverage {
            0 => CoverageState::Miss,
            1 => CoverageState::Hit,
            _ => CoverageState::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageState::Hit => "hits",
            CoverageState::Miss => "misses",
            CoverageState::Partial => "partials",
        }
    }
}

impl std::fmt::Display for CoverageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hit record for one line from a single upload/test session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSession {
    pub id: u32,
    pub coverage: u32,
}

/// Coverage of one instrumented source line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// 0 = miss, 1 = hit, 2 and above = partial.
    pub coverage: u32,
    #[serde(default)]
    pub sessions: Vec<LineSession>,
}

impl ReportLine {
    pub fn new(coverage: u32) -> Self {
        Self {
            coverage,
            sessions: Vec::new(),
        }
    }

    /// Build a line from raw execution data: a hit count plus, for branch
    /// lines, `(covered_arms, total_arms)`.
    pub fn from_counts(hits: u64, branches: Option<(u32, u32)>) -> Self {
        let coverage = match branches {
            _ if hits == 0 => 0,
            Some((covered, total)) if covered < total => 2,
            _ => 1,
        };
        Self {
            coverage,
            sessions: vec![LineSession { id: 0, coverage }],
        }
    }

    #[must_use]
    pub fn state(&self) -> CoverageState {
        CoverageState::classify(self.coverage)
    }
}

/// Line counts for a single file, by coverage state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTotals {
    pub lines: u32,
    pub hits: u32,
    pub misses: u32,
    pub partials: u32,
}

/// Coverage for a single source file. Non-instrumented lines are simply
/// absent from `lines`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFile {
    pub name: String,
    pub lines: BTreeMap<u32, ReportLine>,
}

impl ReportFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: BTreeMap::new(),
        }
    }

    /// Build a file from a dense list where index 0 is line 1 and `None`
    /// marks a non-instrumented line.
    pub fn from_dense(name: impl Into<String>, lines: Vec<Option<ReportLine>>) -> Self {
        let lines = lines
            .into_iter()
            .zip(1u32..)
            .filter_map(|(line, n)| line.map(|l| (n, l)))
            .collect();
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line `line_no` (1-based), or `None` for gaps and out-of-range numbers.
    pub fn get(&self, line_no: u32) -> Option<&ReportLine> {
        self.lines.get(&line_no)
    }

    pub fn insert(&mut self, line_no: u32, line: ReportLine) {
        self.lines.insert(line_no, line);
    }

    /// Exclusive end-of-file bound: one past the last instrumented line,
    /// or 0 for a file with no lines.
    pub fn eof(&self) -> u32 {
        self.lines
            .last_key_value()
            .map_or(0, |(&n, _)| n.saturating_add(1))
    }

    pub fn totals(&self) -> FileTotals {
        let mut totals = FileTotals::default();
        for line in self.lines.values() {
            totals.lines += 1;
            match line.state() {
                CoverageState::Hit => totals.hits += 1,
                CoverageState::Miss => totals.misses += 1,
                CoverageState::Partial => totals.partials += 1,
            }
        }
        totals
    }
}

/// All files of one coverage report, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    pub files: BTreeMap<String, ReportFile>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_file(&self, path: &str) -> Option<&ReportFile> {
        self.files.get(path)
    }

    /// Add a file, replacing any previous file with the same name.
    pub fn insert_file(&mut self, file: ReportFile) {
        self.files.insert(file.name.clone(), file);
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> impl Iterator<Item = &ReportFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
