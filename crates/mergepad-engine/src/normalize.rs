//! Input canonicalization applied before diffing.
//!
//! Code keeps its internal formatting so the diff stays honest; only the
//! surrounding whitespace of the whole document goes. Text collapses every
//! whitespace run inside a line, so reflowed prose does not show up as a
//! change.

use crate::types::Mode;

/// Canonicalize `input` for the given mode. Idempotent.
pub fn normalize(input: &str, mode: Mode) -> String {
    match mode {
        Mode::Code => normalize_code(input),
        Mode::Text => normalize_text(input),
    }
}

pub fn normalize_code(input: &str) -> String {
    input.trim().to_string()
}

pub fn normalize_text(input: &str) -> String {
    input
        .split('\n')
        .map(collapse_whitespace)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_trims_document_only() {
        let input = "\n\n  fn main() {\n      let  x = 1;\n  }\n\n";
        assert_eq!(normalize_code(input), "fn main() {\n      let  x = 1;\n  }");
    }

    #[test]
    fn test_text_collapses_lines() {
        let input = "  The   cat\t sat  \n\n   on the   mat \n";
        assert_eq!(normalize_text(input), "The cat sat\n\non the mat");
    }

    #[test]
    fn test_text_strips_carriage_returns() {
        assert_eq!(normalize_text("one\r\ntwo\r\n"), "one\ntwo");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("", Mode::Code), "");
        assert_eq!(normalize("", Mode::Text), "");
        assert_eq!(normalize(" \n\t\n ", Mode::Text), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "  a  b\n\n c \n",
            "\n\nfoo(bar)\n    baz\n",
            "x",
            "\t\r\n  \n y\tz  ",
        ];
        for mode in [Mode::Code, Mode::Text] {
            for sample in samples {
                let once = normalize(sample, mode);
                assert_eq!(normalize(&once, mode), once, "{mode} {sample:?}");
            }
        }
    }
}
