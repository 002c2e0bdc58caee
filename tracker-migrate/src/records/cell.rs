//! Multi-value cell parsing.
//!
//! Jira packs comments and attachments into `;`-separated sub-fields:
//! `date;author;body` for comments and `date;author;filename;url` for
//! attachments. One cell may hold several entries, one per line. Sub-fields
//! follow CSV quoting rules, so a `"`-quoted sub-field may contain `;` and
//! line breaks. Unquoted comment bodies may also span lines: a line that does
//! not start with a `date;author;` header continues the previous body.

use super::record::{AttachmentRef, SourceComment};
use chrono::NaiveDateTime;
use tracing::warn;

const DELIMITER: char = ';';
const QUOTE: char = '"';

/// Timestamp layouts seen in Jira exports, most common first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%d/%b/%y %I:%M %p",
    "%d/%b/%Y %I:%M %p",
    "%d/%b/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parses a timestamp sub-field.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Parses every comment packed into one cell, in order.
pub(crate) fn parse_comment_cell(cell: &str) -> Vec<SourceComment> {
    split_entries(cell, 3, true)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Entry(fields) => Some(SourceComment {
                timestamp: parse_timestamp(&fields[0]),
                author: non_empty(&fields[1]),
                body: fields[2].trim().to_string(),
            }),
            Segment::Text(text) => non_empty(&text).map(|body| SourceComment {
                author: None,
                body,
                timestamp: None,
            }),
        })
        .collect()
}

/// Parses every attachment packed into one cell, in order.
pub(crate) fn parse_attachment_cell(cell: &str) -> Vec<AttachmentRef> {
    split_entries(cell, 4, false)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Entry(fields) => {
                let url = fields[3].trim().to_string();
                if url.is_empty() {
                    warn!(entry = %fields.join(";"), "Attachment entry has no URL, skipping");
                    return None;
                }
                let filename = match sanitize_filename(&fields[2]) {
                    name if name.is_empty() => filename_from_url(&url),
                    name => name,
                };
                Some(AttachmentRef {
                    filename,
                    url,
                    author: non_empty(&fields[1]),
                    timestamp: parse_timestamp(&fields[0]),
                })
            }
            Segment::Text(text) => {
                let url = text.trim();
                if url.is_empty() {
                    return None;
                }
                if !url.contains("://") {
                    warn!(value = %url, "Unrecognised attachment entry, skipping");
                    return None;
                }
                Some(AttachmentRef {
                    filename: filename_from_url(url),
                    url: url.to_string(),
                    author: None,
                    timestamp: None,
                })
            }
        })
        .collect()
}

/// Normalizes odd whitespace Jira leaves in file names.
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.replace('\u{202f}', " ").trim().to_string()
}

fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    sanitize_filename(name)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A piece of a multi-value cell.
#[derive(Debug, PartialEq, Eq)]
enum Segment {
    /// A `date;author;...` entry with exactly the requested number of fields.
    Entry(Vec<String>),
    /// Text that did not start with an entry header.
    Text(String),
}

/// Splits a cell into entries of `arity` sub-fields.
///
/// With `continue_last`, lines that are not entry headers are appended to the
/// last field of the preceding entry.
fn split_entries(cell: &str, arity: usize, continue_last: bool) -> Vec<Segment> {
    let normalized = cell.replace("\r\n", "\n");
    let mut segments: Vec<Segment> = Vec::new();
    let mut rest = normalized.as_str();

    while !rest.is_empty() {
        if let Some((fields, consumed)) = parse_entry(rest, arity) {
            segments.push(Segment::Entry(fields));
            rest = &rest[consumed..];
            continue;
        }

        let (line, consumed) = take_line(rest);
        rest = &rest[consumed..];

        match segments.last_mut() {
            Some(Segment::Entry(fields)) if continue_last => {
                if let Some(last) = fields.last_mut() {
                    last.push('\n');
                    last.push_str(line);
                }
            }
            Some(Segment::Text(text)) if continue_last => {
                text.push('\n');
                text.push_str(line);
            }
            _ => segments.push(Segment::Text(line.to_string())),
        }
    }

    segments
}

/// Returns the text up to the next line break and the bytes consumed.
fn take_line(text: &str) -> (&str, usize) {
    match text.find('\n') {
        Some(end) => (&text[..end], end + 1),
        None => (text, text.len()),
    }
}

/// Parses one entry at the start of `text`. The first field must be a
/// timestamp for the line to count as an entry header.
fn parse_entry(text: &str, arity: usize) -> Option<(Vec<String>, usize)> {
    let mut fields = Vec::with_capacity(arity);
    let mut pos = 0;

    for index in 0..arity {
        let (field, next) = read_field(text, pos, index + 1 == arity)?;
        if index == 0 {
            parse_timestamp(&field)?;
        }
        fields.push(field);
        pos = next;
    }

    Some((fields, pos))
}

/// Reads one sub-field starting at byte `pos`.
///
/// Non-final fields must end at a delimiter on the same logical line. The
/// final field runs to the end of the line. Returns the field and the byte
/// offset just past it (and past its terminator).
fn read_field(text: &str, pos: usize, last: bool) -> Option<(String, usize)> {
    let rest = &text[pos..];

    if rest.starts_with(QUOTE) {
        let (value, close) = read_quoted(rest)?;
        let after = pos + close;
        let tail = &text[after..];
        return if last {
            match tail.chars().next() {
                None => Some((value, after)),
                Some('\n') => Some((value, after + 1)),
                Some(_) => None,
            }
        } else if tail.starts_with(DELIMITER) {
            Some((value, after + 1))
        } else {
            None
        };
    }

    if last {
        let (line, consumed) = take_line(rest);
        return Some((line.to_string(), pos + consumed));
    }

    let end = rest.find([DELIMITER, '\n'])?;
    if !rest[end..].starts_with(DELIMITER) {
        return None;
    }
    Some((rest[..end].to_string(), pos + end + 1))
}

/// Reads a quoted sub-field. `text` starts at the opening quote. Returns the
/// unescaped value and the byte offset just past the closing quote.
fn read_quoted(text: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = text.char_indices().skip(1).peekable();

    while let Some((index, c)) = chars.next() {
        if c != QUOTE {
            value.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, QUOTE))) {
            value.push(QUOTE);
            chars.next();
            continue;
        }
        return Some((value, index + 1));
    }

    None
}
