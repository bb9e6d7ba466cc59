//! Balanced sub-block reading and declaration header recognition.
//!
//! Nothing here understands C. A block is whatever sits between an opening line and
//! the first line that looks like one of the expected terminators.

use crate::error::{MigrateError, Result};
use regex::Regex;
use std::ops::Range;

/// Lines strictly between an opening line and its terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBlock {
    pub body: Range<usize>,
    /// Index just past the terminator.
    pub next: usize,
}

/// Read lines after `start` until one whose trimmed text equals a terminator.
///
/// Only `lines` is searched, so callers bound nested reads by passing a prefix slice.
pub fn read_block(lines: &[String], start: usize, terminators: &[&str]) -> Result<SubBlock> {
    read_until(lines, start, terminators, |line| terminators.contains(&line.trim()))
}

/// Read a function body: the terminator is a `}` in column 0, so nested scopes
/// closing at deeper indentation do not end it.
pub fn read_function_body(lines: &[String], open: usize) -> Result<SubBlock> {
    read_until(lines, open, &["}"], |line| line.trim_end() == "}")
}

fn read_until(
    lines: &[String],
    start: usize,
    expected: &[&str],
    is_terminator: impl Fn(&str) -> bool,
) -> Result<SubBlock> {
    let from = start + 1;
    match lines.iter().skip(from).position(|l| is_terminator(l.as_str())) {
        Some(offset) => {
            let end = from + offset;
            Ok(SubBlock { body: from..end, next: end + 1 })
        }
        None => Err(MigrateError::UnterminatedBlock {
            start: start + 1,
            end: lines.len().max(start + 1),
            expected: expected.iter().map(|t| format!("`{t}`")).collect::<Vec<_>>().join(" or "),
        }),
    }
}

// ---------------------------------------------------------------------------
// Declaration headers
// ---------------------------------------------------------------------------

/// Recognizes `static <legacy_type> <name> = {` lines.
pub struct HeaderMatcher {
    prefix: String,
    header_re: Regex,
}

impl HeaderMatcher {
    pub fn new(legacy_type: &str) -> Result<Self> {
        let header_re = Regex::new(&format!(
            r"^static\s+{}\s+([A-Za-z_]\w*)\s*=\s*\{{\s*$",
            regex::escape(legacy_type)
        ))?;
        Ok(Self { prefix: format!("static {legacy_type} "), header_re })
    }

    /// First line at or after `from` that opens a legacy declaration.
    pub fn find(&self, lines: &[String], from: usize) -> Option<usize> {
        lines.iter().skip(from).position(|l| l.starts_with(&self.prefix)).map(|i| from + i)
    }

    /// Variable name declared by the header at `index`.
    pub fn name(&self, lines: &[String], index: usize) -> Result<String> {
        let line = &lines[index];
        self.header_re
            .captures(line)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| MigrateError::syntax(index, "cannot process this declaration form", line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_read_block_stops_at_trimmed_terminator() {
        let src = lines("static DeviceInfo a_info = {\n    .name = \"a\",\n    .size = 4,\n};\nrest");
        let block = read_block(&src, 0, &["};"]).unwrap();
        assert_eq!(block.body, 1..3);
        assert_eq!(block.next, 4);
        assert_eq!(src[block.next], "rest");
    }

    #[test]
    fn test_read_block_accepts_any_terminator() {
        let src = lines("    .props = (Property[]) {\n        A(),\n        B(),\n    },\n");
        let block = read_block(&src, 0, &["}", "},"]).unwrap();
        assert_eq!(block.body, 1..3);
        assert_eq!(block.next, 4);
    }

    #[test]
    fn test_read_block_unterminated() {
        let src = lines("static DeviceInfo a_info = {\n    .name = \"a\",");
        let err = read_block(&src, 0, &["};"]).unwrap_err();
        match err {
            MigrateError::UnterminatedBlock { start, end, expected } => {
                assert_eq!(start, 1);
                assert_eq!(end, 2);
                assert_eq!(expected, "`};`");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_block_respects_prefix_bound() {
        // The terminator exists but lies outside the slice handed in.
        let src = lines("x = (T[]) {\n    A(),\n};\n}");
        assert!(read_block(&src[..3], 0, &["}", "},"]).is_err());
    }

    #[test]
    fn test_function_body_skips_nested_scopes() {
        let src = lines("{\n    if (x) {\n        y();\n    }\n}\nafter");
        let body = read_function_body(&src, 0).unwrap();
        assert_eq!(body.body, 1..4);
        assert_eq!(body.next, 5);
    }

    #[test]
    fn test_header_name_and_find() {
        let m = HeaderMatcher::new("DeviceInfo").unwrap();
        let src = lines("int x;\nstatic DeviceInfo serial_isa_info = {\n};");
        assert_eq!(m.find(&src, 0), Some(1));
        assert_eq!(m.find(&src, 2), None);
        assert_eq!(m.name(&src, 1).unwrap(), "serial_isa_info");
    }

    #[test]
    fn test_header_rejects_other_forms() {
        let m = HeaderMatcher::new("DeviceInfo").unwrap();
        let src = lines("static DeviceInfo infos[] = {");
        assert!(matches!(m.name(&src, 0), Err(MigrateError::UnsupportedSyntax { line: 1, .. })));
    }
}
