//! Head-side source text for files being compared.
//!
//! Implements [`SourceFetcher`] for a checkout on disk, for `git show` at a
//! revision, and for an in-memory map.
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};

/// A source for obtaining raw file lines by path.
pub trait SourceFetcher {
    /// Lines of the file at `path`, or `None` if the file does not exist.
    fn fetch_source(&self, path: &str) -> Result<Option<Vec<String>>>;
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Files under a directory (usually a checkout of the head commit).
pub struct FsSource {
    pub root: PathBuf,
}

impl SourceFetcher for FsSource {
    fn fetch_source(&self, path: &str) -> Result<Option<Vec<String>>> {
        let full = self.root.join(path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(split_lines(&String::from_utf8_lossy(&bytes)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", full.display())),
        }
    }
}

/// Files at a git revision, read with `git show REV:PATH`.
pub struct GitSource {
    pub rev: String,
}

impl SourceFetcher for GitSource {
    fn fetch_source(&self, path: &str) -> Result<Option<Vec<String>>> {
        let output = Command::new("git")
            .arg("show")
            .arg(format!("{}:{}", self.rev, path))
            .output()
            .context("Failed to run git show")?;

        if !output.status.success() {
            tracing::debug!(
                rev = %self.rev,
                path,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git show found no source"
            );
            return Ok(None);
        }

        Ok(Some(split_lines(&String::from_utf8_lossy(&output.stdout))))
    }
}

impl SourceFetcher for HashMap<String, Vec<String>> {
    fn fetch_source(&self, path: &str) -> Result<Option<Vec<String>>> {
        Ok(self.get(path).cloned())
    }
}
