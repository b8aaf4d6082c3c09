//! Reconstruction of merged output from accepted segments.

use crate::types::{Mode, Segment};

/// Fold accepted segments into the merged output, preserving diff order.
///
/// `accepted` is indexed by segment id; segments without a flag count as
/// rejected. Code joins lines with `\n`; text concatenates spans as-is since
/// they already carry their own whitespace.
pub fn merge(segments: &[Segment], accepted: &[bool], mode: Mode) -> String {
    let kept = segments
        .iter()
        .filter(|s| accepted.get(s.id()).copied().unwrap_or(false))
        .map(Segment::content);

    match mode {
        Mode::Code => kept.collect::<Vec<_>>().join("\n"),
        Mode::Text => kept.collect(),
    }
}

/// Lines of merged text as shown to a reader.
///
/// A final line that is blank after splitting is suppressed. The merged string
/// itself is left alone.
pub fn display_lines(merged: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = merged.split('\n').collect();
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}
