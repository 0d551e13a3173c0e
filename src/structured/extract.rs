//! Locate the first JSON array embedded in free-form model output.
//!
//! The scanner walks bytes from each `[` keeping a stack of expected closers plus string and
//! escape state, so brackets inside string literals and nested containers never end the
//! block early. Only ASCII delimiters are inspected, which keeps every slice boundary on a
//! UTF-8 character boundary.

use std::ops::Range;

/// Borrowed view of the array block found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArray<'a> {
    text: &'a str,
    span: Range<usize>,
    trailing_array: bool,
}

impl<'a> ExtractedArray<'a> {
    /// The array text, delimiters included, exactly as the model wrote it.
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Byte range of the block within the original response.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Whether another balanced array follows the extracted one. Only the first is used.
    pub fn has_trailing_array(&self) -> bool {
        self.trailing_array
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Scan {
    /// Block closed; exclusive end offset.
    Closed(usize),
    /// A closer that does not match the open container.
    Mismatch,
    /// Input ended inside the block.
    Unterminated,
}

fn scan_block(bytes: &[u8], start: usize) -> Scan {
    let mut closers: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => closers.push(b']'),
            b'{' => closers.push(b'}'),
            b']' | b'}' => {
                if closers.pop() != Some(b) {
                    return Scan::Mismatch;
                }
                if closers.is_empty() {
                    return Scan::Closed(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    Scan::Unterminated
}

fn find_block(input: &str, from: usize) -> Option<Range<usize>> {
    let bytes = input.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        let start = pos + bytes[pos..].iter().position(|&b| b == b'[')?;
        match scan_block(bytes, start) {
            Scan::Closed(end) => return Some(start..end),
            // Arrays nested inside the abandoned block are still candidates.
            Scan::Mismatch => pos = start + 1,
            // Every later `[` sits inside the unfinished block, so nothing trustworthy remains.
            Scan::Unterminated => return None,
        }
    }
    None
}

/// Find the first balanced `[...]` block in `input`.
///
/// Prose before and after the block is discarded; the block itself is returned untouched.
/// Returns `None` when no block closes cleanly.
pub fn extract_array(input: &str) -> Option<ExtractedArray<'_>> {
    let span = find_block(input, 0)?;
    let trailing_array = find_block(input, span.end).is_some();
    Some(ExtractedArray {
        text: &input[span.clone()],
        span,
        trailing_array,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(input: &str) -> Option<&str> {
        extract_array(input).map(|e| e.as_str())
    }

    #[test]
    fn test_clean_input_extracts_to_itself() {
        let input = r#"[{"question":"Q","answer":"A"}]"#;
        let e = extract_array(input).unwrap();
        assert_eq!(e.as_str(), input);
        assert_eq!(e.span(), 0..input.len());
        assert!(!e.has_trailing_array());
    }

    #[test]
    fn test_surrounding_prose_is_dropped() {
        let input = r#"Sure, here you go: [ {"question":"Q","answer":"A"} ] Hope that helps!"#;
        assert_eq!(extracted(input), Some(r#"[ {"question":"Q","answer":"A"} ]"#));
    }

    #[test]
    fn test_markdown_fence() {
        let input = "```json\n[{\"a\":\"b\"}]\n```";
        assert_eq!(extracted(input), Some("[{\"a\":\"b\"}]"));
    }

    #[test]
    fn test_nested_arrays_are_kept_whole() {
        let input = r#"out: [{"tags":["x","y"],"m":{"k":[1,[2]]}}] end"#;
        assert_eq!(
            extracted(input),
            Some(r#"[{"tags":["x","y"],"m":{"k":[1,[2]]}}]"#)
        );
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let input = r#"[{"q":"what is ] or [ ?","a":"a \"quoted]\" word"}] tail ]"#;
        assert_eq!(
            extracted(input),
            Some(r#"[{"q":"what is ] or [ ?","a":"a \"quoted]\" word"}]"#)
        );
    }

    #[test]
    fn test_escaped_backslash_before_quote() {
        let input = r#"[{"path":"C:\\"}, {"x":"]"}]"#;
        assert_eq!(extracted(input), Some(input));
    }

    #[test]
    fn test_mismatched_block_is_skipped() {
        let input = r#"note [a} then [{"q":"Q"}]"#;
        assert_eq!(extracted(input), Some(r#"[{"q":"Q"}]"#));
    }

    #[test]
    fn test_array_nested_in_mismatched_block_is_found() {
        let input = r#"[see: [{"question":"Q","answer":"A"}] }"#;
        let e = extract_array(input).unwrap();
        assert_eq!(e.as_str(), r#"[{"question":"Q","answer":"A"}]"#);
        assert_eq!(e.span().start, 6);
    }

    #[test]
    fn test_truncated_output_yields_nothing() {
        assert_eq!(extracted(r#"[{"items":[{"a":"b"}]"#), None);
        assert_eq!(extracted(r#"[{"q":"unterminated]"#), None);
    }

    #[test]
    fn test_no_brackets() {
        assert_eq!(extracted("I cannot help with that."), None);
        assert_eq!(extracted(""), None);
        assert_eq!(extracted(r#"{"question":"Q"}"#), None);
    }

    #[test]
    fn test_first_of_many_with_trailing_flag() {
        let input = r#"schema: [{"question":""}] result: [{"question":"Real"}]"#;
        let e = extract_array(input).unwrap();
        assert_eq!(e.as_str(), r#"[{"question":""}]"#);
        assert!(e.has_trailing_array());
    }

    #[test]
    fn test_prose_bracket_before_payload_wins() {
        // Heuristic: a balanced prose bracket is still "the first array".
        let input = r#"[1] items: [{"q":"Q"}]"#;
        let e = extract_array(input).unwrap();
        assert_eq!(e.as_str(), "[1]");
        assert!(e.has_trailing_array());
    }

    #[test]
    fn test_multibyte_text_around_and_inside() {
        let input = "Voilà → [{\"q\":\"¿Qué es el magma? 🌋\"}] ✓";
        assert_eq!(extracted(input), Some("[{\"q\":\"¿Qué es el magma? 🌋\"}]"));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(extracted("nothing: [] done"), Some("[]"));
    }
}
