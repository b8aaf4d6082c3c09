//! Expansion of coarse diff spans into addressable segments.

use crate::types::{Mode, Segment, Span};

/// Turn spans into segments with dense ids in diff order.
///
/// Code mode emits one segment per line of each span. Splitting drops only the
/// empty piece left behind by a terminal newline; blank lines inside a span
/// survive as empty-content segments. Text mode emits one segment per span,
/// whitespace-only spans included.
pub fn materialize(spans: &[Span], mode: Mode) -> Vec<Segment> {
    let mut segments = Vec::new();
    for span in spans {
        match mode {
            Mode::Code => {
                for line in span.content.split_terminator('\n') {
                    segments.push(Segment::new(segments.len(), span.kind, line));
                }
            }
            Mode::Text => {
                segments.push(Segment::new(segments.len(), span.kind, span.content.as_str()));
            }
        }
    }
    segments
}
