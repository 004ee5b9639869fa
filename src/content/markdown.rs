use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

fn options() -> Options {
    // Fenced code blocks are part of CommonMark and always on.
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Convert markdown to an HTML fragment.
///
/// Section sources are authored alongside the site, so raw HTML in them is
/// passed through untouched.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

/// Plain text of the first level-one heading, used as the page title.
pub fn first_heading(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut title = String::new();

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => break,
            Event::Text(text) | Event::Code(text) if in_heading => title.push_str(&text),
            _ => {}
        }
    }

    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
