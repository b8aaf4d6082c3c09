//! Core types for the merge engine.
//!
//! A comparison is modelled as an ordered list of **segments**, each tagged
//! with one of three kinds:
//! - **Unchanged**: present verbatim on both sides
//! - **Added**: present only on the modified side
//! - **Removed**: present only on the original side
//!
//! Segments are immutable once materialized; acceptance lives beside them in
//! the [`SelectionStore`](crate::selection::SelectionStore).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dense identifier of a segment within one comparison run.
pub type SegmentId = usize;

/// Granularity of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Line granularity, whitespace inside lines preserved.
    #[default]
    Code,
    /// Word granularity over whitespace-collapsed prose.
    Text,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Code => "code",
            Mode::Text => "text",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode `{0}` (expected `code` or `text`)")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Mode::Code),
            "text" => Ok(Mode::Text),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Which side of the comparison a diff span belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

impl SegmentKind {
    /// Present in the original input.
    pub fn on_original_side(&self) -> bool {
        matches!(self, SegmentKind::Unchanged | SegmentKind::Removed)
    }

    /// Present in the modified input.
    pub fn on_modified_side(&self) -> bool {
        matches!(self, SegmentKind::Unchanged | SegmentKind::Added)
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, SegmentKind::Unchanged)
    }

    /// Single-character marker used by plain-text renderers.
    pub fn marker(&self) -> char {
        match self {
            SegmentKind::Unchanged => ' ',
            SegmentKind::Added => '+',
            SegmentKind::Removed => '-',
        }
    }
}

impl From<similar::ChangeTag> for SegmentKind {
    fn from(tag: similar::ChangeTag) -> Self {
        match tag {
            similar::ChangeTag::Equal => SegmentKind::Unchanged,
            similar::ChangeTag::Insert => SegmentKind::Added,
            similar::ChangeTag::Delete => SegmentKind::Removed,
        }
    }
}

/// A contiguous run of tagged content as produced by a [`Differ`](crate::adapter::Differ).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SegmentKind,
    pub content: String,
}

impl Span {
    pub fn new(kind: SegmentKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// The atomic addressable unit of a comparison.
///
/// Fields are private so that neither `id` nor `kind` can change after
/// materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    id: SegmentId,
    kind: SegmentKind,
    content: String,
}

impl Segment {
    pub(crate) fn new(id: SegmentId, kind: SegmentKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A segment together with its current acceptance, as returned by
/// [`SelectionStore::snapshot`](crate::selection::SelectionStore::snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentState {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub content: String,
    pub accepted: bool,
}

/// Policy used to seed acceptance of changed segments.
///
/// Unchanged segments are accepted under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialSelection {
    /// Keep what the modified side has: additions in, removals out.
    #[default]
    Modified,
    /// Keep what the original side has: removals in, additions out.
    Original,
    /// Keep every segment from both sides.
    Everything,
    /// Reject every change; only common content survives.
    Unchanged,
}

impl InitialSelection {
    /// Acceptance a segment of `kind` starts with under this policy.
    pub fn accepts(&self, kind: SegmentKind) -> bool {
        match (self, kind) {
            (_, SegmentKind::Unchanged) => true,
            (InitialSelection::Modified, k) => k.on_modified_side(),
            (InitialSelection::Original, k) => k.on_original_side(),
            (InitialSelection::Everything, _) => true,
            (InitialSelection::Unchanged, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InitialSelection::Modified => "modified",
            InitialSelection::Original => "original",
            InitialSelection::Everything => "everything",
            InitialSelection::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for InitialSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown selection policy `{0}` (expected modified, original, everything or unchanged)")]
pub struct ParseSelectionError(String);

impl FromStr for InitialSelection {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modified" => Ok(InitialSelection::Modified),
            "original" => Ok(InitialSelection::Original),
            "everything" | "all" => Ok(InitialSelection::Everything),
            "unchanged" | "none" => Ok(InitialSelection::Unchanged),
            other => Err(ParseSelectionError(other.to_string())),
        }
    }
}

/// Diff algorithm handed to `similar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl From<DiffAlgorithm> for similar::Algorithm {
    fn from(algorithm: DiffAlgorithm) -> Self {
        match algorithm {
            DiffAlgorithm::Myers => similar::Algorithm::Myers,
            DiffAlgorithm::Patience => similar::Algorithm::Patience,
            DiffAlgorithm::Lcs => similar::Algorithm::Lcs,
        }
    }
}

/// Per-kind counts over a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub unchanged: usize,
    pub added: usize,
    pub removed: usize,
    /// Changed segments (added or removed) currently accepted.
    pub accepted_changes: usize,
}

impl DiffStats {
    pub fn from_states(states: &[SegmentState]) -> Self {
        let mut stats = DiffStats::default();
        for state in states {
            match state.kind {
                SegmentKind::Unchanged => stats.unchanged += 1,
                SegmentKind::Added => stats.added += 1,
                SegmentKind::Removed => stats.removed += 1,
            }
            if state.kind.is_change() && state.accepted {
                stats.accepted_changes += 1;
            }
        }
        stats
    }

    pub fn has_changes(&self) -> bool {
        self.added + self.removed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("code".parse::<Mode>().unwrap(), Mode::Code);
        assert_eq!(" TEXT ".parse::<Mode>().unwrap(), Mode::Text);
        assert!("prose".parse::<Mode>().is_err());
    }

    #[test]
    fn test_sides() {
        assert!(SegmentKind::Unchanged.on_original_side());
        assert!(SegmentKind::Unchanged.on_modified_side());
        assert!(!SegmentKind::Added.on_original_side());
        assert!(!SegmentKind::Removed.on_modified_side());
    }

    #[test]
    fn test_initial_selection_policies() {
        use crate::types::SegmentKind::*;
        let modified = InitialSelection::Modified;
        assert!(modified.accepts(Unchanged) && modified.accepts(Added) && !modified.accepts(Removed));
        let original = InitialSelection::Original;
        assert!(original.accepts(Removed) && !original.accepts(Added));
        assert!(InitialSelection::Everything.accepts(Removed));
        assert!(!InitialSelection::Unchanged.accepts(Added));
        assert!(InitialSelection::Unchanged.accepts(Unchanged));
    }

    #[test]
    fn test_selection_parse_aliases() {
        assert_eq!("all".parse::<InitialSelection>().unwrap(), InitialSelection::Everything);
        assert_eq!("none".parse::<InitialSelection>().unwrap(), InitialSelection::Unchanged);
        assert!("both".parse::<InitialSelection>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&SegmentKind::Removed).unwrap();
        assert_eq!(json, "\"removed\"");
        let mode: Mode = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(mode, Mode::Text);
    }

    #[test]
    fn test_stats() {
        let states = vec![
            SegmentState { id: 0, kind: SegmentKind::Unchanged, content: "a".into(), accepted: true },
            SegmentState { id: 1, kind: SegmentKind::Removed, content: "b".into(), accepted: false },
            SegmentState { id: 2, kind: SegmentKind::Added, content: "x".into(), accepted: true },
        ];
        let stats = DiffStats::from_states(&states);
        assert_eq!(stats, DiffStats { unchanged: 1, added: 1, removed: 1, accepted_changes: 1 });
        assert!(stats.has_changes());
    }
}
