//! Line-level structure: headings, lists, code and quote blocks, tables.

use super::inline::convert_inline;

/// What the previous lines left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Text,
    /// The previous line was a `*`/`#` list item.
    List,
    /// A quote just ended; a following paragraph needs a blank line first.
    AfterQuote,
    /// Inside a code block; the closing marker decides how it ends.
    Code(CodeClose),
    Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeClose {
    Fence,
    Tag(&'static str),
}

const CODE_TAGS: &[(&str, &str)] = &[("{code", "{code}"), ("{noformat", "{noformat}")];
const QUOTE_TAG: &str = "{quote}";
const FENCE: &str = "```";
/// Never read as a setext underline, unlike `---`.
const RULE: &str = "***";

/// Converts a whole (LF-normalised) document line by line.
pub(crate) fn convert_blocks(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut state = BlockState::Text;

    for line in text.split('\n') {
        if matches!(state, BlockState::Code(_)) || opens_code(line) {
            convert_line(line, &mut state, &mut out);
            continue;
        }

        // `\\` forces a line break: each piece becomes its own line and every
        // piece but the last ends in a Markdown hard-break backslash.
        let mut pieces = split_breaks(line).into_iter().peekable();
        while let Some(piece) = pieces.next() {
            convert_line(piece, &mut state, &mut out);
            if pieces.peek().is_some() {
                if let Some(last) = out.last_mut() {
                    last.push('\\');
                }
            }
        }
    }

    if let BlockState::Code(CodeClose::Tag(_)) = state {
        out.push(FENCE.to_string());
    }

    out.join("\n")
}

fn convert_line(line: &str, state: &mut BlockState, out: &mut Vec<String>) {
    match *state {
        BlockState::Code(close) => code_line(line, close, state, out),
        BlockState::Quote => quote_line(line, state, out),
        BlockState::AfterQuote => {
            if !line.trim().is_empty() && !line.starts_with("bq. ") {
                out.push(String::new());
            }
            *state = BlockState::Text;
            text_line(line, state, out);
        }
        BlockState::Text | BlockState::List => text_line(line, state, out),
    }
}

fn opens_code(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(FENCE) || open_code_tag(trimmed).is_some()
}

/// Splits a line on `\\`, leaving `{{...}}` and backtick spans whole.
fn split_breaks(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];
        if let Some(inner) = rest.strip_prefix("{{") {
            if let Some(end) = inner.find("}}") {
                i += end + 4;
                continue;
            }
        } else if rest.starts_with('`') {
            let run = rest.bytes().take_while(|&b| b == b'`').count();
            i += run + closing_backticks(&rest[run..], run).unwrap_or(0);
            continue;
        } else if rest.starts_with(r"\\") {
            pieces.push(&line[start..i]);
            i += 2;
            start = i;
            continue;
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }

    pieces.push(&line[start..]);
    pieces
}

/// Byte length up to and including a backtick run of exactly `run`.
fn closing_backticks(text: &str, run: usize) -> Option<usize> {
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with('`') {
            let len = rest.bytes().take_while(|&b| b == b'`').count();
            if len == run {
                return Some(i + len);
            }
            i += len;
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

fn code_line(line: &str, close: CodeClose, state: &mut BlockState, out: &mut Vec<String>) {
    match close {
        CodeClose::Fence => {
            out.push(line.to_string());
            if line.trim_start().starts_with(FENCE) {
                *state = BlockState::Text;
            }
        }
        CodeClose::Tag(tag) => match line.find(tag) {
            Some(pos) => {
                let (content, rest) = (&line[..pos], &line[pos + tag.len()..]);
                if !content.trim().is_empty() {
                    out.push(content.to_string());
                }
                out.push(FENCE.to_string());
                *state = BlockState::Text;
                if !rest.trim().is_empty() {
                    convert_line(rest, state, out);
                }
            }
            None => out.push(line.to_string()),
        },
    }
}

fn quote_line(line: &str, state: &mut BlockState, out: &mut Vec<String>) {
    let (content, closes) = match line.trim_end().strip_suffix(QUOTE_TAG) {
        Some(content) => (content, true),
        None => (line, false),
    };

    if !content.trim().is_empty() {
        out.push(format!("> {}", convert_inline(content)));
    } else if !closes {
        out.push(">".to_string());
    }

    if closes {
        *state = BlockState::AfterQuote;
    }
}

fn text_line(line: &str, state: &mut BlockState, out: &mut Vec<String>) {
    let in_list = *state == BlockState::List;
    *state = BlockState::Text;
    let trimmed = line.trim_start();

    if trimmed.starts_with(FENCE) {
        out.push(line.to_string());
        *state = BlockState::Code(CodeClose::Fence);
        return;
    }

    if let Some((fence, close, rest)) = open_code_tag(trimmed) {
        out.push(fence);
        *state = BlockState::Code(close);
        if !rest.is_empty() {
            convert_line(rest, state, out);
        }
        return;
    }

    if let Some(rest) = trimmed.strip_prefix(QUOTE_TAG) {
        *state = BlockState::Quote;
        if !rest.trim().is_empty() {
            quote_line(rest, state, out);
        }
        return;
    }

    if trimmed.trim_end() == "----" {
        out.push(RULE.to_string());
        return;
    }

    if let Some(heading) = heading(line) {
        out.push(heading);
        return;
    }

    // `# a #` is both a closed heading and a Jira item; inside a list it is an item.
    if !in_list {
        if let Some(heading) = markdown_heading(line) {
            out.push(heading);
            return;
        }
    }

    if let Some(item) = list_item(line) {
        if line.starts_with(['*', '#']) {
            *state = BlockState::List;
        }
        out.push(item);
        return;
    }

    if let Some(quote) = line.strip_prefix("bq. ") {
        out.push(format!("> {}", convert_inline(quote)));
        *state = BlockState::AfterQuote;
        return;
    }

    if let Some(rows) = table_row(line) {
        out.extend(rows);
        return;
    }

    out.push(convert_inline(line));
}

/// `{code:java}` -> (```` ```java ````, closing tag, text after the tag)
fn open_code_tag(trimmed: &str) -> Option<(String, CodeClose, &str)> {
    let &(open, close) = CODE_TAGS
        .iter()
        .find(|(open, _)| trimmed.starts_with(open))?;
    let after = &trimmed[open.len()..];
    let end = after.find('}')?;
    let params = &after[..end];
    if !(params.is_empty() || params.starts_with(':')) {
        return None;
    }

    let language = code_language(params.trim_start_matches(':'));
    Some((
        format!("{FENCE}{language}"),
        CodeClose::Tag(close),
        &after[end + 1..],
    ))
}

/// Picks the language out of `java`, `language=java|title=Foo` or `title=Foo`.
fn code_language(params: &str) -> &str {
    params
        .split('|')
        .find_map(|param| match param.split_once('=') {
            Some(("language", value)) => Some(value.trim()),
            Some(_) => None,
            None => Some(param.trim()),
        })
        .unwrap_or("")
}

/// `h2. Title` -> `## Title ##`
fn heading(line: &str) -> Option<String> {
    let mut chars = line.chars();
    if chars.next() != Some('h') {
        return None;
    }
    let level = chars.next()?.to_digit(10)?;
    if !(1..=6).contains(&level) || chars.next() != Some('.') {
        return None;
    }

    let rest = chars.as_str();
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    Some(closed_heading(level as usize, rest.trim()))
}

/// Recognises a heading in the form this module emits and re-renders it, so
/// converted text passes through unchanged.
fn markdown_heading(line: &str) -> Option<String> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let marks = "#".repeat(level);
    let content = line
        .strip_prefix(&marks)?
        .strip_prefix(' ')?
        .strip_suffix(&marks)?
        .strip_suffix(' ')?;

    Some(closed_heading(level, content.trim()))
}

fn closed_heading(level: usize, content: &str) -> String {
    let marks = "#".repeat(level);
    if content.is_empty() {
        marks
    } else {
        format!("{marks} {} {marks}", convert_inline(content))
    }
}

/// `** item` -> `  - item`, `*# item` -> `  1. item`
fn list_item(line: &str) -> Option<String> {
    let (markers, text) = if let Some(text) = line.strip_prefix("- ") {
        ("-", text)
    } else {
        let depth = line.chars().take_while(|&c| c == '*' || c == '#').count();
        if depth == 0 {
            return None;
        }
        let text = line[depth..].strip_prefix(' ')?;
        (&line[..depth], text)
    };

    let mut item = String::new();
    let mut parents = markers.chars();
    let own = parents.next_back()?;
    for parent in parents {
        item.push_str(if parent == '#' { "   " } else { "  " });
    }
    item.push_str(if own == '#' { "1. " } else { "- " });
    item.push_str(&convert_inline(text.trim_start()));
    Some(item)
}

/// `||a||b||` -> `| a | b |` plus a separator, `|a|b|` -> `| a | b |`
fn table_row(line: &str) -> Option<Vec<String>> {
    let line = line.trim_end();
    if line.len() < 2 || !line.starts_with('|') || !line.ends_with('|') {
        return None;
    }

    let header = line.len() > 4 && line.starts_with("||") && line.ends_with("||");
    let cells = if header {
        split_cells(&line[2..line.len() - 2], "||")
    } else {
        split_cells(&line[1..line.len() - 1], "|")
    };

    let converted: Vec<String> = cells
        .iter()
        .map(|cell| convert_inline(cell.trim()))
        .collect();
    let mut rows = vec![format!("| {} |", converted.join(" | "))];
    if header {
        let separators = vec!["---"; converted.len()];
        rows.push(format!("| {} |", separators.join(" | ")));
    }
    Some(rows)
}

/// Splits on `separator` outside `[...]` so link targets keep their pipes.
fn split_cells<'a>(inner: &'a str, separator: &str) -> Vec<&'a str> {
    let mut cells = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < inner.len() {
        let rest = &inner[i..];
        if rest.starts_with('[') {
            depth += 1;
        } else if rest.starts_with(']') {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && rest.starts_with(separator) {
            cells.push(&inner[start..i]);
            i += separator.len();
            start = i;
            continue;
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }

    cells.push(&inner[start..]);
    cells
}
