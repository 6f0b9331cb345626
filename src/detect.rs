/// Auto-detection of coverage file formats.
///
/// Strategy:
///   1. Check file extension for strong hints
///   2. Peek at the first bytes of the file content
///   3. Fall back to CLI --format override (handled by caller)
use std::path::Path;

use crate::error::CovdiffError;

/// Supported coverage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Cobertura,
    Json,
    Lcov,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cobertura => "cobertura",
            Format::Json => "json",
            Format::Lcov => "lcov",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = CovdiffError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cobertura" => Ok(Format::Cobertura),
            "json" => Ok(Format::Json),
            "lcov" => Ok(Format::Lcov),
            _ => Err(CovdiffError::Parse(format!(
                "Unknown format: '{s}'. Supported: cobertura, json, lcov"
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the coverage format from filename and file content.
pub fn detect_format(path: &Path, content: &[u8]) -> Option<Format> {
    detect_by_extension(path).or_else(|| detect_by_content(content))
}

fn detect_by_extension(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "info" | "lcov" => Some(Format::Lcov),
        // .xml and .json need content inspection
        _ => None,
    }
}

fn detect_by_content(content: &[u8]) -> Option<Format> {
    // We only need to look at the first few KB
    let head_len = content.len().min(4096);
    let head = String::from_utf8_lossy(&content[..head_len]);

    // Require the tags at line starts to avoid false positives on files that
    // merely contain these strings.
    let has_sf = head.lines().any(|l| l.starts_with("SF:"));
    let has_da = head.lines().any(|l| l.starts_with("DA:"));
    if has_sf && has_da {
        return Some(Format::Lcov);
    }

    let trimmed = head.trim_start();
    if trimmed.starts_with('<') && head.contains("<coverage") {
        return Some(Format::Cobertura);
    }

    if trimmed.starts_with('{') && head.contains("\"files\"") {
        return Some(Format::Json);
    }

    None
}
