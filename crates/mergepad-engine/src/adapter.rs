//! Boundary to the external diff primitive.
//!
//! The engine never computes an LCS itself. A [`Differ`] returns an ordered
//! list of [`Span`]s whose kind is already the three-way [`SegmentKind`], so
//! nothing downstream ever sees an "added and removed" combination.

use similar::TextDiff;

use crate::types::{DiffAlgorithm, Mode, SegmentKind, Span};

/// A two-way differ producing tagged spans in diff order.
pub trait Differ: Send + Sync {
    fn diff(&self, original: &str, modified: &str) -> Vec<Span>;
}

/// [`Differ`] backed by the `similar` crate.
///
/// Code mode diffs whole lines; text mode diffs words and the whitespace runs
/// between them. Consecutive changes with the same tag are coalesced into one
/// span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarDiffer {
    mode: Mode,
    algorithm: DiffAlgorithm,
}

impl SimilarDiffer {
    pub fn new(mode: Mode, algorithm: DiffAlgorithm) -> Self {
        Self { mode, algorithm }
    }

    fn diff_lines(&self, original: &str, modified: &str) -> Vec<Span> {
        // Lines are compared without terminators so that a final line with no
        // trailing newline still matches its counterpart.
        let old_lines: Vec<&str> = original.split_terminator('\n').collect();
        let new_lines: Vec<&str> = modified.split_terminator('\n').collect();

        let diff = TextDiff::configure()
            .algorithm(self.algorithm.into())
            .diff_slices(&old_lines, &new_lines);

        let mut spans = Vec::new();
        for change in diff.iter_all_changes() {
            let mut line = change.value().to_string();
            line.push('\n');
            push_coalesced(&mut spans, change.tag().into(), &line);
        }
        spans
    }

    fn diff_words(&self, original: &str, modified: &str) -> Vec<Span> {
        let diff = TextDiff::configure()
            .algorithm(self.algorithm.into())
            .diff_words(original, modified);

        let mut spans = Vec::new();
        for change in diff.iter_all_changes() {
            push_coalesced(&mut spans, change.tag().into(), change.value());
        }
        spans
    }
}

impl Differ for SimilarDiffer {
    fn diff(&self, original: &str, modified: &str) -> Vec<Span> {
        if original.is_empty() && modified.is_empty() {
            return Vec::new();
        }
        match self.mode {
            Mode::Code => self.diff_lines(original, modified),
            Mode::Text => self.diff_words(original, modified),
        }
    }
}

fn push_coalesced(spans: &mut Vec<Span>, kind: SegmentKind, value: &str) {
    match spans.last_mut() {
        Some(last) if last.kind == kind => last.content.push_str(value),
        _ => spans.push(Span::new(kind, value)),
    }
}
