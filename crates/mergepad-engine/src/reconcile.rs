//! Line numbering for the dual-pane code view.

use serde::{Deserialize, Serialize};

use crate::types::{Segment, SegmentId, SegmentKind};

/// One rendered row of the dual-pane view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: SegmentId,
    pub kind: SegmentKind,
    /// 1-based line number on the original side, absent for added lines.
    pub original_line: Option<usize>,
    /// 1-based line number on the modified side, absent for removed lines.
    pub modified_line: Option<usize>,
}

/// Assign per-side line numbers with two independent running counters.
pub fn number_lines<I>(kinds: I) -> Vec<Row>
where
    I: IntoIterator<Item = (SegmentId, SegmentKind)>,
{
    let mut original = 0;
    let mut modified = 0;
    kinds
        .into_iter()
        .map(|(id, kind)| {
            let original_line = kind.on_original_side().then(|| {
                original += 1;
                original
            });
            let modified_line = kind.on_modified_side().then(|| {
                modified += 1;
                modified
            });
            Row {
                id,
                kind,
                original_line,
                modified_line,
            }
        })
        .collect()
}

pub fn rows_for_segments(segments: &[Segment]) -> Vec<Row> {
    number_lines(segments.iter().map(|s| (s.id(), s.kind())))
}
