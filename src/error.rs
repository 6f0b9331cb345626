use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovdiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown coverage format")]
    UnknownFormat,

    #[error(transparent)]
    InvalidHunkFormat(#[from] HunkFormatError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CovdiffError>;

/// A diff hunk header that could not be read as four line-number fields.
///
/// Kept separate from [`CovdiffError`] because it is memoized per file and
/// handed out on every access, so it has to be `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid hunk header {header:?}: {reason}")]
pub struct HunkFormatError {
    pub header: Vec<String>,
    pub reason: String,
}
