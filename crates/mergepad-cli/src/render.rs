//! Plain-text rendering of a comparison for the terminal.

use mergepad_engine::reconcile::Row;
use mergepad_engine::{DiffStats, SegmentKind, SegmentState};

/// Dual-pane view of a code comparison: one row per segment, original on the
/// left, modified on the right, each side with its own line numbers.
pub fn code_view(states: &[SegmentState], rows: &[Row], width: usize) -> String {
    let mut out = String::new();
    for (state, row) in states.iter().zip(rows) {
        let left = if state.kind.on_original_side() {
            clip(&state.content, width)
        } else {
            String::new()
        };
        let right = if state.kind.on_modified_side() {
            state.content.as_str()
        } else {
            ""
        };
        out.push_str(&format!(
            "{:>4} {} {:>4} {} {:<width$} | {:>4} {} {}\n",
            state.id,
            acceptance_box(state),
            number(row.original_line),
            side_marker(state.kind, SegmentKind::Removed),
            left,
            number(row.modified_line),
            side_marker(state.kind, SegmentKind::Added),
            right,
            width = width,
        ));
    }
    out
}

/// The two annotated panes of a text comparison: the original with removed
/// spans marked, then the modified text with added spans marked.
pub fn text_panes(states: &[SegmentState]) -> (String, String) {
    let mut original = String::new();
    let mut modified = String::new();
    for state in states {
        match state.kind {
            SegmentKind::Unchanged => {
                original.push_str(&state.content);
                modified.push_str(&state.content);
            }
            SegmentKind::Removed => original.push_str(&annotate(state, '-')),
            SegmentKind::Added => modified.push_str(&annotate(state, '+')),
        }
    }
    (original, modified)
}

/// Merged lines with 1-based line numbers.
pub fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4}  {}\n", i + 1, line))
        .collect()
}

pub fn stats_line(stats: &DiffStats) -> String {
    format!(
        "{} unchanged, {} added, {} removed, {} of {} changes accepted",
        stats.unchanged,
        stats.added,
        stats.removed,
        stats.accepted_changes,
        stats.added + stats.removed
    )
}

/// Label for a changed segment in the interactive picker.
pub fn picker_label(state: &SegmentState) -> String {
    let content = if state.content.trim().is_empty() {
        format!("{:?}", state.content)
    } else {
        state.content.replace('\n', "\u{21b5}")
    };
    format!("#{:<4} {} {}", state.id, state.kind.marker(), content)
}

fn annotate(state: &SegmentState, sign: char) -> String {
    let verdict = if state.accepted { "keep" } else { "drop" };
    format!("[{sign}{}{sign}]({} {})", state.content, state.id, verdict)
}

fn acceptance_box(state: &SegmentState) -> &'static str {
    match (state.kind.is_change(), state.accepted) {
        (false, _) => "   ",
        (true, true) => "[x]",
        (true, false) => "[ ]",
    }
}

fn side_marker(kind: SegmentKind, wanted: SegmentKind) -> char {
    if kind == wanted {
        kind.marker()
    } else {
        ' '
    }
}

fn number(line: Option<usize>) -> String {
    line.map(|n| n.to_string()).unwrap_or_default()
}

fn clip(content: &str, width: usize) -> String {
    if content.chars().count() <= width {
        return content.to_string();
    }
    let mut clipped: String = content.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}
