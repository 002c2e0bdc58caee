//! Jira wiki markup to Markdown.
//!
//! [`convert`] rewrites the Jira dialect into the Markdown dialect the
//! destination renders. The conversion is a pure function:
//!
//! - text without Jira constructs comes back byte-for-byte (after CRLF -> LF);
//! - converting already-converted text is a no-op;
//! - unknown or malformed constructs are copied literally, never dropped.
//!
//! Block structure (headings, lists, code/quote blocks, tables) is handled line
//! by line; everything else goes through the inline rule table.

mod block;
mod html;
mod inline;

use serde::Deserialize;

/// How converted text is handed to the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Markdown as produced by [`convert`].
    Markdown,
    /// Markdown rendered to HTML.
    #[default]
    Html,
}

/// Converts Jira wiki markup to Markdown.
pub fn convert(source: &str) -> String {
    block::convert_blocks(&source.replace("\r\n", "\n"))
}

/// Converts Jira wiki markup and renders it in `mode`.
pub fn render(source: &str, mode: RenderMode) -> String {
    let markdown = convert(source);
    match mode {
        RenderMode::Markdown => markdown,
        RenderMode::Html => html::to_html(&markdown),
    }
}
