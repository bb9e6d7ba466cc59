//! Field extraction: turn the body of a declaration block into [`Fields`].
//!
//! Every non-blank, non-comment line must be a single `.key = value,` assignment.
//! The `props` key may instead open an inline property list, which is collected
//! entry by entry until its closing brace.

use crate::block::read_block;
use crate::error::{MigrateError, Result};
use crate::types::{Field, FieldValue, Fields, LegacyField, PropertyEntry};
use std::ops::Range;
use tracing::warn;

// ---------------------------------------------------------------------------
// Character-level helpers
// ---------------------------------------------------------------------------

/// Characters of `line` (with byte offsets) that are outside string and char literals.
fn code_chars(line: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    line.char_indices().filter(move |&(_, c)| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            return false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            return false;
        }
        true
    })
}

/// Split `key = value` on its only unquoted `=`. Lines with zero or several are rejected.
pub fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let mut eqs = code_chars(line).filter(|&(_, c)| c == '=').map(|(i, _)| i);
    let at = eqs.next()?;
    if eqs.next().is_some() {
        return None;
    }
    Some((&line[..at], &line[at + 1..]))
}

/// True if `text` has a `/*` or `//` outside literals.
pub fn has_comment(text: &str) -> bool {
    code_chars(text).any(|(i, c)| c == '/' && matches!(text[i + 1..].chars().next(), Some('*' | '/')))
}

fn paren_delta(line: &str) -> i32 {
    code_chars(line).fold(0, |depth, (_, c)| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Drop up to `width` leading blanks.
fn strip_indent(line: &str, width: usize) -> &str {
    let cut = line.bytes().take(width).take_while(|b| *b == b' ' || *b == b'\t').count();
    &line[cut..]
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*")
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the fields from the block body `body` (indices into `lines`).
pub fn extract_fields(lines: &[String], body: Range<usize>, entry_indent: usize) -> Result<Fields> {
    let mut fields = Fields::default();
    let mut in_comment = false;
    let mut i = body.start;

    while i < body.end {
        let line = &lines[i];
        let trimmed = line.trim();

        if in_comment {
            warn!(line = i + 1, text = trimmed, "Dropping comment inside declaration block");
            if trimmed.contains("*/") {
                in_comment = false;
            }
            i += 1;
            continue;
        }
        if trimmed.is_empty() {
            i += 1;
            continue;
        }
        if is_comment_line(trimmed) {
            warn!(line = i + 1, text = trimmed, "Dropping comment inside declaration block");
            in_comment = trimmed.starts_with("/*") && !trimmed.contains("*/");
            i += 1;
            continue;
        }

        let Some((key_text, value)) = split_assignment(trimmed) else {
            warn!(
                body = %lines[body.start..=i].join("\n"),
                "Partially collected declaration body"
            );
            return Err(MigrateError::syntax(i, "expected exactly one '=' per field", line));
        };
        let key_text = key_text.trim();
        let key = LegacyField::from_key(key_text.strip_prefix('.').unwrap_or(key_text))
            .ok_or_else(|| MigrateError::syntax(i, format!("unrecognized field '{key_text}'"), line))?;
        let value = value.trim();
        let decl = i;

        let value = if key == LegacyField::Props && value.starts_with('(') {
            if !value.ends_with('{') {
                return Err(MigrateError::syntax(i, "property list must open with '{'", line));
            }
            let list = read_block(&lines[..body.end], i, &["}", "},"])?;
            i = list.next;
            FieldValue::List(collect_entries(lines, list.body, entry_indent)?)
        } else {
            if has_comment(value) {
                return Err(MigrateError::syntax(i, "inline comment in field value", line));
            }
            let value = value.strip_suffix(',').unwrap_or(value).trim_end();
            if value.is_empty() {
                return Err(MigrateError::syntax(i, "empty field value", line));
            }
            i += 1;
            FieldValue::Scalar(value.to_string())
        };

        fields.insert(Field { key, value, line: decl }).map_err(|prev| {
            MigrateError::syntax(
                decl,
                format!("duplicate field '.{}' (first set on line {})", key.key(), prev + 1),
                &lines[decl],
            )
        })?;
    }

    Ok(fields)
}

/// Group the lines of a property list into entries. An entry ends on the first
/// line that balances its parentheses; its trailing comma is dropped.
fn collect_entries(lines: &[String], body: Range<usize>, entry_indent: usize) -> Result<Vec<PropertyEntry>> {
    let mut entries = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut depth = 0;

    for i in body.clone() {
        let line = &lines[i];
        let trimmed = line.trim();
        if current.is_empty() && trimmed.is_empty() {
            continue;
        }
        if is_comment_line(trimmed) || has_comment(line) {
            return Err(MigrateError::syntax(i, "comment inside property list", line));
        }

        current.push(strip_indent(line.trim_end_matches('\r'), entry_indent).to_string());
        depth += paren_delta(line);
        if depth <= 0 {
            if let Some(last) = current.last_mut() {
                let t = last.trim_end();
                *last = t.strip_suffix(',').unwrap_or(t).to_string();
            }
            entries.push(PropertyEntry { lines: std::mem::take(&mut current) });
            depth = 0;
        }
    }

    if !current.is_empty() {
        let last = body.end - 1;
        return Err(MigrateError::syntax(last, "unbalanced parentheses in property entry", &lines[last]));
    }
    Ok(entries)
}
