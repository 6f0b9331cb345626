use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{CoverageState, ReportLine};

/// What a raw line token says about which side it exists on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `+` prefix: head only.
    Added,
    /// `-` prefix: base only.
    Removed,
    /// Context, source text, or no text at all: both sides.
    Unchanged,
}

impl LineKind {
    pub fn of(value: Option<&str>) -> Self {
        match value.and_then(|v| v.chars().next()) {
            Some('+') => LineKind::Added,
            Some('-') => LineKind::Removed,
            _ => LineKind::Unchanged,
        }
    }
}

/// A value seen from the base side and the head side of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sides<T> {
    pub base: Option<T>,
    pub head: Option<T>,
}

impl<T> Sides<T> {
    pub fn new(base: Option<T>, head: Option<T>) -> Self {
        Self { base, head }
    }
}

/// One row of a file comparison: the same source line in base and head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineComparison<'a> {
    pub base_line: Option<&'a ReportLine>,
    pub head_line: Option<&'a ReportLine>,
    pub base_ln: Option<u32>,
    pub head_ln: Option<u32>,
    pub value: String,
    pub is_diff: bool,
}

impl<'a> LineComparison<'a> {
    pub fn new(
        base_line: Option<&'a ReportLine>,
        head_line: Option<&'a ReportLine>,
        base_ln: Option<u32>,
        head_ln: Option<u32>,
        value: impl Into<String>,
        is_diff: bool,
    ) -> Self {
        Self {
            base_line,
            head_line,
            base_ln,
            head_ln,
            value: value.into(),
            is_diff,
        }
    }

    pub fn kind(&self) -> LineKind {
        LineKind::of(Some(self.value.as_str()))
    }

    /// Line numbers, with the side a `+`/`-` line does not exist on blanked out.
    pub fn number(&self) -> Sides<u32> {
        let kind = self.kind();
        Sides {
            base: if kind == LineKind::Added {
                None
            } else {
                self.base_ln
            },
            head: if kind == LineKind::Removed {
                None
            } else {
                self.head_ln
            },
        }
    }

    pub fn coverage(&self) -> Sides<u32> {
        let kind = self.kind();
        Sides {
            base: self
                .base_line
                .filter(|_| kind != LineKind::Added)
                .map(|l| l.coverage),
            head: self
                .head_line
                .filter(|_| kind != LineKind::Removed)
                .map(|l| l.coverage),
        }
    }

    /// Number of head sessions that hit this line.
    pub fn sessions(&self) -> Option<usize> {
        self.head_line
            .map(|l| l.sessions.iter().filter(|s| s.coverage > 0).count())
    }
}

/// Signed per-state line deltas between base and head. Zero entries are
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSummary(BTreeMap<CoverageState, i64>);

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: CoverageState) -> i64 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    pub fn add(&mut self, state: CoverageState, delta: i64) {
        let value = self.0.entry(state).or_insert(0);
        *value += delta;
        if *value == 0 {
            self.0.remove(&state);
        }
    }

    /// Record a line moving from `base` to `head`. No-op when the state is unchanged.
    pub fn record_transition(&mut self, base: CoverageState, head: CoverageState) {
        if base != head {
            self.add(base, -1);
            self.add(head, 1);
        }
    }

    pub fn merge(&mut self, other: &ChangeSummary) {
        for (&state, &delta) in &other.0 {
            self.add(state, delta);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoverageState, i64)> + '_ {
        self.0.iter().map(|(&state, &delta)| (state, delta))
    }
}

impl<const N: usize> From<[(CoverageState, i64); N]> for ChangeSummary {
    fn from(entries: [(CoverageState, i64); N]) -> Self {
        let mut summary = Self::new();
        for (state, delta) in entries {
            summary.add(state, delta);
        }
        summary
    }
}
