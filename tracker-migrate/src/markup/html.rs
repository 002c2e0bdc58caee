use pulldown_cmark::{html, Event, Options, Parser};

/// Renders converted Markdown to HTML. Single line breaks stay line breaks,
/// matching how the source tracker displayed them.
pub(crate) fn to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}
