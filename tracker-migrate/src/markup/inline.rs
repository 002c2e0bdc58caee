//! Inline rewrite rules.
//!
//! Scans a single line left to right. At each position the rule table below is
//! consulted; the first rule that matches emits its Markdown equivalent and
//! returns the index to resume from. Anything no rule claims is copied as-is.
//!
//! | Jira            | Markdown            |
//! |-----------------|---------------------|
//! | `*strong*`      | `**strong**`        |
//! | `-deleted-`     | `~~deleted~~`       |
//! | `{{code}}`      | `` `code` ``        |
//! | `[text\|url]`   | `[text](url)`       |
//! | `[url]`         | `<url>`             |
//! | `[~user]`       | `@user`             |
//! | `[^file]`       | `(Attachment: file)`|
//! | `!file.png\|x!` | `(Attachment: file.png)` |
//! | `!http://i.png!`| `![image](http://i.png)` |
//! | `(/)`, `(x)`, … | emoji               |
//!
//! `_emphasis_` is identical in both dialects. Markdown constructs this module
//! emits (backtick spans, `[text](url)` links, `<url>` autolinks, `**` runs) are recognised and
//! copied untouched, which keeps the conversion idempotent.

/// Jira emoticons and their replacements.
const EMOTICONS: &[(&str, &str)] = &[
    ("(/)", "✅"),
    ("(x)", "❌"),
    ("(!)", "⚠️"),
    ("(i)", "ℹ️"),
    ("(y)", "👍"),
    ("(n)", "👎"),
    ("(*)", "⭐"),
    ("(?)", "❓"),
];

/// Converts the inline markup of one line.
pub(crate) fn convert_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if let Some(next) = try_rule(&chars, i, &mut out) {
            i = next;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Tries every rule that can start at `i`.
fn try_rule(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    match chars[i] {
        '\\' => try_escape(chars, i, out),
        '`' => Some(copy_backtick_span(chars, i, out)),
        '{' => try_monospace(chars, i, out),
        '[' => try_link(chars, i, out),
        '<' => copy_autolink(chars, i, out),
        '!' => try_image(chars, i, out),
        '(' => try_emoticon(chars, i, out),
        '*' => try_strong(chars, i, out),
        '-' => try_deleted(chars, i, out),
        _ => None,
    }
}

/// Copies an escape sequence so the escaped character is not interpreted.
fn try_escape(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let escaped = *chars.get(i + 1)?;
    out.push('\\');
    out.push(escaped);
    Some(i + 2)
}

/// Copies a Markdown code span verbatim, or just the backtick run if unclosed.
fn copy_backtick_span(chars: &[char], i: usize, out: &mut String) -> usize {
    let run = run_length(chars, i, '`');
    let mut j = i + run;

    while j < chars.len() {
        if chars[j] == '`' {
            let closing = run_length(chars, j, '`');
            if closing == run {
                let end = j + closing;
                out.extend(&chars[i..end]);
                return end;
            }
            j += closing;
        } else {
            j += 1;
        }
    }

    out.extend(&chars[i..i + run]);
    i + run
}

/// `{{code}}` -> `` `code` ``
fn try_monospace(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    if chars.get(i + 1) != Some(&'{') {
        return None;
    }
    let start = i + 2;
    let end = find_sequence(chars, start, &['}', '}'])?;
    if end == start {
        return None;
    }

    let content: String = chars[start..end].iter().collect();
    if content.contains('`') {
        out.push_str("`` ");
        out.push_str(&content);
        out.push_str(" ``");
    } else {
        out.push('`');
        out.push_str(&content);
        out.push('`');
    }
    Some(end + 2)
}

/// Links, mentions, attachment links and already-converted Markdown links.
fn try_link(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let start = i + 1;
    let close = find_char(chars, start, ']')?;

    // Markdown link: copy through the closing parenthesis.
    if chars.get(close + 1) == Some(&'(') {
        let end = skip_parentheses(chars, close + 1);
        out.extend(&chars[i..end]);
        return Some(end);
    }

    let inner: String = chars[start..close].iter().collect();
    let end = close + 1;

    if inner.is_empty() || inner == " " || inner.eq_ignore_ascii_case("x") {
        return None;
    }

    if let Some(user) = inner.strip_prefix('~') {
        out.push('@');
        out.push_str(user);
        return Some(end);
    }

    if let Some(file) = inner.strip_prefix('^') {
        out.push_str("(Attachment: ");
        out.push_str(file);
        out.push(')');
        return Some(end);
    }

    if let Some((text, target)) = inner.split_once('|') {
        let url = target.split('|').next().unwrap_or(target).trim();
        let text = text.trim();
        if url.is_empty() {
            return None;
        }
        if text.is_empty() {
            push_autolink(url, out);
        } else {
            out.push('[');
            out.push_str(&convert_inline(text));
            out.push_str("](");
            out.push_str(url);
            out.push(')');
        }
        return Some(end);
    }

    if looks_like_url(&inner) {
        push_autolink(inner.trim(), out);
        return Some(end);
    }

    None
}

/// Copies a `<scheme://...>` autolink verbatim so its URL is not rewritten.
fn copy_autolink(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let close = find_char(chars, i + 1, '>')?;
    let url: String = chars[i + 1..close].iter().collect();
    if !looks_like_url(&url) {
        return None;
    }
    out.extend(&chars[i..=close]);
    Some(close + 1)
}

/// `!file.png|thumbnail!` -> `(Attachment: file.png)`
fn try_image(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let start = i + 1;
    let first = *chars.get(start)?;
    if first.is_whitespace() || first == '[' {
        return None;
    }
    let close = find_char(chars, start, '!')?;

    let inner: String = chars[start..close].iter().collect();
    let name = inner.split('|').next().unwrap_or(&inner);
    if name.ends_with(char::is_whitespace) {
        return None;
    }

    if looks_like_url(name) {
        out.push_str("![image](");
        out.push_str(name);
        out.push(')');
    } else if has_file_extension(name) {
        out.push_str("(Attachment: ");
        out.push_str(name);
        out.push(')');
    } else {
        return None;
    }
    Some(close + 1)
}

/// `(/)` -> ✅ and friends. Only at the start of a word.
fn try_emoticon(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    if i > 0 && !chars[i - 1].is_whitespace() {
        return None;
    }
    EMOTICONS.iter().find_map(|(source, emoji)| {
        let len = source.chars().count();
        let candidate = chars.get(i..i + len)?;
        if candidate.iter().copied().eq(source.chars()) {
            out.push_str(emoji);
            Some(i + len)
        } else {
            None
        }
    })
}

/// `*strong*` -> `**strong**`. Runs of two or more asterisks are copied.
fn try_strong(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let run = run_length(chars, i, '*');
    if run > 1 {
        out.extend(&chars[i..i + run]);
        return Some(i + run);
    }

    let close = find_span_close(chars, i, '*', |prev| prev.is_alphanumeric())?;
    if chars[i + 1..close].contains(&'*') {
        return None;
    }

    let content: String = chars[i + 1..close].iter().collect();
    out.push_str("**");
    out.push_str(&convert_inline(&content));
    out.push_str("**");
    Some(close + 1)
}

/// `-deleted-` -> `~~deleted~~`
fn try_deleted(chars: &[char], i: usize, out: &mut String) -> Option<usize> {
    let close = find_span_close(chars, i, '-', |prev| !prev.is_whitespace())?;

    let content: String = chars[i + 1..close].iter().collect();
    out.push_str("~~");
    out.push_str(&convert_inline(&content));
    out.push_str("~~");
    Some(close + 1)
}

/// Finds the closing delimiter of a `marker`-wrapped span opening at `i`.
///
/// The opener must not follow a character rejected by `blocks_opener` and must
/// be followed by a non-space that is not another marker. The closer must follow
/// a non-space and must not be followed by a word character or another marker.
fn find_span_close(
    chars: &[char],
    i: usize,
    marker: char,
    blocks_opener: impl Fn(char) -> bool,
) -> Option<usize> {
    if i > 0 && blocks_opener(chars[i - 1]) {
        return None;
    }
    let next = *chars.get(i + 1)?;
    if next.is_whitespace() || next == marker {
        return None;
    }

    (i + 2..chars.len()).find(|&j| {
        chars[j] == marker
            && !chars[j - 1].is_whitespace()
            && chars
                .get(j + 1)
                .map_or(true, |after| !after.is_alphanumeric() && *after != marker)
    })
}

fn push_autolink(url: &str, out: &mut String) {
    out.push('<');
    out.push_str(url);
    out.push('>');
}

fn looks_like_url(text: &str) -> bool {
    !text.contains(char::is_whitespace) && (text.contains("://") || text.starts_with("mailto:"))
}

fn has_file_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn run_length(chars: &[char], i: usize, c: char) -> usize {
    chars[i..].iter().take_while(|&&x| x == c).count()
}

fn find_char(chars: &[char], start: usize, target: char) -> Option<usize> {
    chars
        .get(start..)?
        .iter()
        .position(|&c| c == target)
        .map(|offset| start + offset)
}

fn find_sequence(chars: &[char], start: usize, sequence: &[char]) -> Option<usize> {
    chars
        .get(start..)?
        .windows(sequence.len())
        .position(|window| window == sequence)
        .map(|offset| start + offset)
}

/// Skips over parentheses including nested ones, returning the index after the
/// closing parenthesis (or the end of the line if unbalanced).
fn skip_parentheses(chars: &[char], start: usize) -> usize {
    let mut j = start + 1;
    let mut depth = 1;
    while j < chars.len() && depth > 0 {
        match chars[j] {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    j
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_strong() {
        assert_eq!(convert_inline("a *bold* word"), "a **bold** word");
        assert_eq!(convert_inline("*two words*"), "**two words**");
    }

    #[test]
    fn leaves_non_emphasis_asterisks() {
        assert_eq!(convert_inline("2*3*4"), "2*3*4");
        assert_eq!(convert_inline("a * b * c"), "a * b * c");
        assert_eq!(convert_inline("**already**"), "**already**");
        assert_eq!(convert_inline("lonely *star"), "lonely *star");
    }

    #[test]
    fn italic_is_unchanged() {
        assert_eq!(convert_inline("an _italic_ word"), "an _italic_ word");
    }

    #[test]
    fn converts_deleted() {
        assert_eq!(convert_inline("was -removed- here"), "was ~~removed~~ here");
        assert_eq!(convert_inline("well-known 2024-01-02"), "well-known 2024-01-02");
        assert_eq!(convert_inline("5 - 3"), "5 - 3");
    }

    #[test]
    fn converts_monospace() {
        assert_eq!(convert_inline("run {{cargo *test*}}"), "run `cargo *test*`");
        assert_eq!(convert_inline("{{a`b}}"), "`` a`b ``");
    }

    #[test]
    fn copies_backtick_spans() {
        assert_eq!(convert_inline("`*not bold*`"), "`*not bold*`");
        assert_eq!(convert_inline("`` a`b ``"), "`` a`b ``");
        assert_eq!(convert_inline("a ` b"), "a ` b");
    }

    #[test]
    fn converts_links() {
        assert_eq!(
            convert_inline("see [the docs|https://example.com/docs]"),
            "see [the docs](https://example.com/docs)"
        );
        assert_eq!(
            convert_inline("[https://example.com]"),
            "<https://example.com>"
        );
        assert_eq!(convert_inline("ping [~jsmith]"), "ping @jsmith");
        assert_eq!(
            convert_inline("[^design.pdf]"),
            "(Attachment: design.pdf)"
        );
    }

    #[test]
    fn converts_link_text() {
        assert_eq!(
            convert_inline("[*bold* docs|https://x.io]"),
            "[**bold** docs](https://x.io)"
        );
    }

    #[test]
    fn copies_autolinks() {
        assert_eq!(
            convert_inline("<https://x.io/*a*/-b-/!c.png!>"),
            "<https://x.io/*a*/-b-/!c.png!>"
        );
        assert_eq!(convert_inline("a < *b* > c"), "a < **b** > c");
    }

    #[test]
    fn leaves_plain_brackets_and_markdown_links() {
        assert_eq!(convert_inline("[WIP] title"), "[WIP] title");
        assert_eq!(convert_inline("[ ] todo"), "[ ] todo");
        assert_eq!(
            convert_inline("[a *b*](https://x.io/-y-)"),
            "[a *b*](https://x.io/-y-)"
        );
    }

    #[test]
    fn converts_images() {
        assert_eq!(
            convert_inline("!screenshot.png|thumbnail!"),
            "(Attachment: screenshot.png)"
        );
        assert_eq!(
            convert_inline("!https://example.com/a.png!"),
            "![image](https://example.com/a.png)"
        );
        assert_eq!(convert_inline("Hello! World!"), "Hello! World!");
    }

    #[test]
    fn converts_emoticons_at_word_start() {
        assert_eq!(convert_inline("done (/)"), "done ✅");
        assert_eq!(convert_inline("(x) failed"), "❌ failed");
        assert_eq!(convert_inline("f(x)"), "f(x)");
    }

    #[test]
    fn copies_escapes() {
        assert_eq!(convert_inline(r"\*literal\*"), r"\*literal\*");
    }

    #[test]
    fn output_is_a_fixed_point() {
        let inputs = [
            "*bold* and _it_ with {{code}} and [Google|http://g.com] (/) -old-",
            "!shot.png! [^a.txt] [~bob] [http://x.io]",
            "nested *bold with -strike-* text",
            "[https://x.io/*a*]",
            "[https://x.io/!a!b.png!]",
            "[*bold*|https://x.io/-y-]",
        ];
        for input in inputs {
            let once = convert_inline(input);
            assert_eq!(convert_inline(&once), once, "input: {input}");
        }
    }
}
