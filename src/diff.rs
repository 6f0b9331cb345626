//! Diff data as handed over by a version-control provider: per-file hunk
//! lists plus rename and line-count metadata.
//!
//! Also provides a [`DiffSource`] trait that abstracts over different ways to
//! obtain a diff (stdin, git, a file on disk, provider JSON), and a parser
//! that turns unified diff text into the provider shape.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The whole diff between base and head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDiff {
    #[serde(default)]
    pub files: BTreeMap<String, DiffFile>,
    /// Commit metadata passed through untouched.
    #[serde(default)]
    pub commits: Vec<serde_json::Value>,
}

impl ComparisonDiff {
    /// Diff entry for a head path, falling back to an entry that declares
    /// `path` as its pre-rename name.
    pub fn file(&self, path: &str) -> Option<&DiffFile> {
        self.files.get(path).or_else(|| {
            self.files
                .values()
                .find(|f| f.before.as_deref() == Some(path))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffFileKind {
    New,
    Deleted,
    Modified,
    Binary,
}

/// Diff for a single file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffFile {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DiffFileKind>,
    /// Path in base, when the file was renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DiffStats>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    #[serde(default)]
    pub added: u32,
    #[serde(default)]
    pub removed: u32,
}

/// One hunk as the provider delivers it: an unvalidated
/// `[old_start, old_count, new_start, new_count]` header and raw lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub header: Vec<HeaderField>,
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Segment {
    pub fn new(header: [&str; 4], lines: Vec<String>) -> Self {
        Self {
            header: header
                .iter()
                .map(|s| HeaderField::Text(s.to_string()))
                .collect(),
            lines,
        }
    }
}

/// Providers send header fields as strings, occasionally as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for HeaderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderField::Number(n) => write!(f, "{n}"),
            HeaderField::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff sources
// ---------------------------------------------------------------------------

/// A source for obtaining a diff.
pub trait DiffSource {
    /// Fetch the raw diff text.
    fn fetch_diff(&self) -> Result<String>;

    /// Fetch and parse the diff. Unified diff text unless overridden.
    fn load(&self) -> Result<ComparisonDiff> {
        Ok(parse_unified_diff(&self.fetch_diff()?))
    }
}

/// Unified diff from stdin.
pub struct StdinDiff;

impl DiffSource for StdinDiff {
    fn fetch_diff(&self) -> Result<String> {
        std::io::read_to_string(std::io::stdin()).context("Failed to read diff from stdin")
    }
}

/// Unified diff from a git command (e.g., `git diff main..HEAD`).
pub struct GitDiff {
    /// Arguments to pass to `git diff`.
    pub args: String,
}

impl DiffSource for GitDiff {
    fn fetch_diff(&self) -> Result<String> {
        let diff_args: Vec<&str> = self.args.split_whitespace().collect();
        let output = Command::new("git")
            .arg("diff")
            .args(&diff_args)
            .output()
            .context("Failed to run git diff")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git diff failed: {stderr}");
        }

        String::from_utf8(output.stdout).context("git diff output not valid UTF-8")
    }
}

/// Unified diff stored in a file.
pub struct DiffFileSource {
    pub path: PathBuf,
}

impl DiffSource for DiffFileSource {
    fn fetch_diff(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read diff {}", self.path.display()))
    }
}

/// Provider-shaped JSON (`{"files": {...}, "commits": [...]}`) stored in a file.
pub struct JsonDiffSource {
    pub path: PathBuf,
}

impl DiffSource for JsonDiffSource {
    fn fetch_diff(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read diff {}", self.path.display()))
    }

    fn load(&self) -> Result<ComparisonDiff> {
        let text = self.fetch_diff()?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid diff JSON in {}", self.path.display()))
    }
}

// ---------------------------------------------------------------------------
// Diff parsing
// ---------------------------------------------------------------------------

/// Hunk header: @@ -old_start[,old_count] +new_start[,new_count] @@
static HUNK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Prepend a path prefix to all file paths (and rename sources) in a diff.
pub fn apply_path_prefix(diff: ComparisonDiff, prefix: &str) -> ComparisonDiff {
    let prefix = prefix.trim_end_matches('/');
    let files = diff
        .files
        .into_iter()
        .map(|(path, mut file)| {
            file.before = file.before.map(|before| format!("{prefix}/{before}"));
            (format!("{prefix}/{path}"), file)
        })
        .collect();
    ComparisonDiff {
        files,
        commits: diff.commits,
    }
}

/// Strip common VCS prefixes ("b/" from default git, "a/" from some tools)
/// and trailing timestamps from a `---`/`+++` path.
fn clean_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    let path = raw
        .strip_prefix("b/")
        .or_else(|| raw.strip_prefix("a/"))
        .unwrap_or(raw);
    Some(path.to_string())
}

/// A file whose header has been seen but whose hunks are still being read.
#[derive(Default)]
struct PendingFile {
    old_path: Option<String>,
    new_path: Option<String>,
    kind: Option<DiffFileKind>,
    segments: Vec<Segment>,
    stats: DiffStats,
    /// Lines still expected in the current hunk, per side.
    old_remaining: u32,
    new_remaining: u32,
}

impl PendingFile {
    fn in_hunk(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn push_line(&mut self, line: &str) {
        if let Some(segment) = self.segments.last_mut() {
            segment.lines.push(line.to_string());
        }
    }

    fn finish(self, files: &mut BTreeMap<String, DiffFile>) {
        let Some(path) = self.new_path.clone().or_else(|| self.old_path.clone()) else {
            return;
        };
        let before = match (&self.old_path, &self.new_path) {
            (Some(old), Some(new)) if old != new => Some(old.clone()),
            _ => None,
        };
        files.insert(
            path,
            DiffFile {
                kind: Some(self.kind.unwrap_or(DiffFileKind::Modified)),
                before,
                stats: Some(self.stats),
                segments: self.segments,
            },
        );
    }
}

/// Parse a unified diff (e.g., `git diff`) into per-file hunk lists.
///
/// Omitted hunk counts are written out as `"1"`, so every header carries
/// explicit numbers.
pub fn parse_unified_diff(diff_text: &str) -> ComparisonDiff {
    let mut files = BTreeMap::new();
    let mut current: Option<PendingFile> = None;

    for line in diff_text.lines() {
        if let Some(file) = current.as_mut().filter(|f| f.in_hunk()) {
            match line.chars().next() {
                Some('+') => {
                    file.new_remaining = file.new_remaining.saturating_sub(1);
                    file.stats.added += 1;
                    file.push_line(line);
                }
                Some('-') => {
                    file.old_remaining = file.old_remaining.saturating_sub(1);
                    file.stats.removed += 1;
                    file.push_line(line);
                }
                Some('\\') => {
                    // "\ No newline at end of file" is metadata, not a line
                }
                _ => {
                    // Context line; some tools strip the leading space of blank lines
                    file.old_remaining = file.old_remaining.saturating_sub(1);
                    file.new_remaining = file.new_remaining.saturating_sub(1);
                    file.push_line(line);
                }
            }
            continue;
        }

        if line.starts_with("diff --git ") {
            if let Some(file) = current.take() {
                file.finish(&mut files);
            }
            let mut file = PendingFile::default();
            // Fallback paths for diffs without ---/+++ lines (binary, mode-only)
            if let Some((old, new)) = line["diff --git ".len()..].split_once(" b/") {
                file.old_path = clean_path(old);
                file.new_path = Some(new.to_string());
            }
            current = Some(file);
        } else if let Some(rest) = line.strip_prefix("--- ") {
            // Plain unified diffs have no "diff --git" line: a new "---"
            // after hunks starts the next file.
            if current.as_ref().map_or(true, |f| !f.segments.is_empty()) {
                if let Some(file) = current.take() {
                    file.finish(&mut files);
                }
                current = Some(PendingFile::default());
            }
            if let Some(file) = current.as_mut() {
                file.old_path = clean_path(rest);
                if file.old_path.is_none() {
                    file.kind = Some(DiffFileKind::New);
                }
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(file) = current.as_mut() {
                file.new_path = clean_path(rest);
                if file.new_path.is_none() {
                    file.kind = Some(DiffFileKind::Deleted);
                }
            }
        } else if let Some(file) = current.as_mut() {
            if let Some(old) = line.strip_prefix("rename from ") {
                file.old_path = Some(old.to_string());
            } else if let Some(new) = line.strip_prefix("rename to ") {
                file.new_path = Some(new.to_string());
            } else if line.starts_with("new file mode") {
                file.kind = Some(DiffFileKind::New);
            } else if line.starts_with("deleted file mode") {
                file.kind = Some(DiffFileKind::Deleted);
            } else if line.starts_with("Binary files ") {
                file.kind = Some(DiffFileKind::Binary);
            } else if let Some(caps) = HUNK_RE.captures(line) {
                let field = |i: usize| caps.get(i).map_or("1", |m| m.as_str());
                let header = [field(1), field(2), field(3), field(4)];
                file.old_remaining = header[1].parse().unwrap_or(0);
                file.new_remaining = header[3].parse().unwrap_or(0);
                file.segments.push(Segment::new(header, Vec::new()));
            }
        }
    }

    if let Some(file) = current.take() {
        file.finish(&mut files);
    }

    ComparisonDiff {
        files,
        commits: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(segment: &Segment) -> Vec<String> {
        segment.header.iter().map(ToString::to_string).collect()
    }

    const MODIFIED: &str = "\
diff --git a/src/main.rs b/src/main.rs
index 1111111..2222222 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -9,4 +9,6 @@ fn main() {
     let x = 1;
+    let y = 2;
+    let z = x + y;
     println!(\"{x}\");
-    println!(\"done\");
+    println!(\"{z}\");
 }
";

    #[test]
    fn test_parse_modified_file() {
        let diff = parse_unified_diff(MODIFIED);
        assert_eq!(diff.files.len(), 1);
        let file = &diff.files["src/main.rs"];
        assert_eq!(file.kind, Some(DiffFileKind::Modified));
        assert_eq!(file.before, None);
        assert_eq!(file.stats, Some(DiffStats { added: 3, removed: 1 }));
        assert_eq!(file.segments.len(), 1);
        assert_eq!(header(&file.segments[0]), vec!["9", "4", "9", "6"]);
        assert_eq!(file.segments[0].lines.len(), 7);
        assert_eq!(file.segments[0].lines[1], "+    let y = 2;");
    }

    #[test]
    fn test_parse_new_file() {
        let text = "\
diff --git a/src/new.rs b/src/new.rs
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/src/new.rs
@@ -0,0 +1,3 @@
+fn a() {}
+fn b() {}
+fn c() {}
";
        let diff = parse_unified_diff(text);
        let file = &diff.files["src/new.rs"];
        assert_eq!(file.kind, Some(DiffFileKind::New));
        assert_eq!(header(&file.segments[0]), vec!["0", "0", "1", "3"]);
        assert_eq!(file.segments[0].lines.len(), 3);
    }

    #[test]
    fn test_parse_deleted_file_keyed_by_old_path() {
        let text = "\
diff --git a/src/gone.rs b/src/gone.rs
deleted file mode 100644
--- a/src/gone.rs
+++ /dev/null
@@ -1,2 +0,0 @@
-fn a() {}
-fn b() {}
";
        let diff = parse_unified_diff(text);
        let file = &diff.files["src/gone.rs"];
        assert_eq!(file.kind, Some(DiffFileKind::Deleted));
        assert_eq!(file.stats, Some(DiffStats { added: 0, removed: 2 }));
    }

    #[test]
    fn test_parse_omitted_counts_are_one() {
        let text = "\
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1 @@
-hello
+world
";
        let diff = parse_unified_diff(text);
        assert_eq!(
            header(&diff.files["src/lib.rs"].segments[0]),
            vec!["1", "1", "1", "1"]
        );
    }

    #[test]
    fn test_parse_no_newline_at_eof() {
        let text = "\
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,2 +1,3 @@
 fn main() {
-}
\\ No newline at end of file
+    println!(\"world\");
+}
";
        let diff = parse_unified_diff(text);
        let lines = &diff.files["src/lib.rs"].segments[0].lines;
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| !l.starts_with('\\')));
    }

    #[test]
    fn test_parse_rename_sets_before() {
        let text = "\
diff --git a/old/name.py b/new/name.py
similarity index 90%
rename from old/name.py
rename to new/name.py
--- a/old/name.py
+++ b/new/name.py
@@ -1,1 +1,1 @@
-x = 1
+x = 2
";
        let diff = parse_unified_diff(text);
        let file = &diff.files["new/name.py"];
        assert_eq!(file.before.as_deref(), Some("old/name.py"));
        assert!(diff.file("old/name.py").is_some());
    }

    #[test]
    fn test_parse_pure_rename_without_hunks() {
        let text = "\
diff --git a/a.py b/b.py
similarity index 100%
rename from a.py
rename to b.py
";
        let diff = parse_unified_diff(text);
        let file = &diff.files["b.py"];
        assert_eq!(file.before.as_deref(), Some("a.py"));
        assert!(file.segments.is_empty());
    }

    #[test]
    fn test_parse_removed_line_that_looks_like_header() {
        // A removed SQL comment "-- x" shows up as "--- x" in the diff body
        let text = "\
--- a/q.sql
+++ b/q.sql
@@ -1,2 +1,1 @@
--- x
 select 1;
";
        let diff = parse_unified_diff(text);
        assert_eq!(diff.files.len(), 1);
        let file = &diff.files["q.sql"];
        assert_eq!(file.segments[0].lines, vec!["--- x", " select 1;"]);
        assert_eq!(file.stats, Some(DiffStats { added: 0, removed: 1 }));
    }

    #[test]
    fn test_parse_multiple_files() {
        let text = "\
--- a/a.rs
+++ b/a.rs
@@ -1,1 +1,2 @@
 a
+b
--- a/b.rs
+++ b/b.rs
@@ -1,1 +1,2 @@
 a
+b
";
        let diff = parse_unified_diff(text);
        assert_eq!(diff.files.len(), 2);
        assert!(diff.files.contains_key("a.rs"));
        assert!(diff.files.contains_key("b.rs"));
    }

    #[test]
    fn test_parse_binary_file() {
        let text = "\
diff --git a/img.png b/img.png
index 1111111..2222222 100644
Binary files a/img.png and b/img.png differ
";
        let diff = parse_unified_diff(text);
        assert_eq!(diff.files["img.png"].kind, Some(DiffFileKind::Binary));
    }

    #[test]
    fn test_apply_path_prefix() {
        let diff = parse_unified_diff(
            "\
diff --git a/old.py b/new.py
rename from old.py
rename to new.py
",
        );
        let prefixed = apply_path_prefix(diff, "project/");
        let file = &prefixed.files["project/new.py"];
        assert_eq!(file.before.as_deref(), Some("project/old.py"));
    }

    #[test]
    fn test_provider_json_round_trips_header_kinds() {
        let json = r#"{
            "files": {
                "myfile.py": {
                    "before": "previous.py",
                    "stats": {"added": 1, "removed": 0},
                    "segments": [{"header": ["1", "1", "1", "2"], "lines": ["+"]},
                                 {"header": [5, 0, 6, 1], "lines": ["+x"]}]
                }
            },
            "commits": [{"commitid": "abc"}]
        }"#;
        let diff: ComparisonDiff = serde_json::from_str(json).unwrap();
        let file = &diff.files["myfile.py"];
        assert_eq!(file.before.as_deref(), Some("previous.py"));
        assert_eq!(file.segments[0].header[0], HeaderField::Text("1".into()));
        assert_eq!(file.segments[1].header[0], HeaderField::Number(5));
        assert_eq!(diff.commits.len(), 1);
    }
}
