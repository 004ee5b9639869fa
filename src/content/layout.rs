//! HTML layouts wrapped around rendered markdown, plus the slide-deck page.

use super::identifier::ContentId;

/// Per-request details the layout needs.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Nickname of the signed-in user, shown with a sign-out link
    pub signed_in_as: Option<String>,
}

impl PageContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(nickname: impl Into<String>) -> Self {
        Self {
            signed_in_as: Some(nickname.into()),
        }
    }
}

/// Escape text that did not come out of the markdown renderer before it is
/// spliced into a page: site and page titles, GitHub nicknames, deck ids and
/// redirect targets (which land inside attribute values).
pub fn html_escape(text: &str) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut out, c| {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
        out
    })
}

/// Wrap an HTML fragment in the site layout.
///
/// `body_html` is trusted (it comes out of the markdown renderer); `title`,
/// `site_title` and the user nickname are escaped.
pub fn render_layout(site_title: &str, title: &str, body_html: &str, ctx: &PageContext) -> String {
    let escaped_site_title = html_escape(site_title);
    let full_title = if title.is_empty() || title == site_title {
        escaped_site_title.clone()
    } else {
        format!("{} | {}", html_escape(title), escaped_site_title)
    };

    let account = match &ctx.signed_in_as {
        Some(nickname) => format!(
            r#"<span class="nav__user">{}</span> <a class="nav__link" href="/logout">Sign out</a>"#,
            html_escape(nickname)
        ),
        None => String::new(),
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{full_title}</title>
    <link rel="stylesheet" href="/stylesheets/all.css">
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/highlight.js@11/styles/github.min.css">
</head>
<body>
    <header class="nav">
        <a class="nav__brand" href="/">{escaped_site_title}</a>
        <button class="nav__toggle js-mobile-nav" data-target="nav__menu">Menu</button>
        <nav class="nav__menu">{account}</nav>
    </header>
    <main class="content">
{body_html}
    </main>
    <script src="https://cdn.jsdelivr.net/npm/highlight.js@11/lib/highlight.min.js"></script>
    <script src="/javascripts/all.js"></script>
</body>
</html>
"##
    )
}

/// Generate the slide-deck page for a deck identifier.
///
/// The deck itself is markdown fetched client-side from `/decks/<id>.md`,
/// which sits behind the same gate as this page; nothing here checks that it
/// exists.
pub fn render_slides(site_title: &str, id: &ContentId) -> String {
    let escaped_id = html_escape(id.as_str());
    let escaped_site_title = html_escape(site_title);
    let source_url = format!("/decks/{}.md", urlencoding::encode(id.as_str()));

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{escaped_id} | {escaped_site_title}</title>
    <link rel="stylesheet" href="/stylesheets/slides.css">
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }}
        .remark-code, .remark-inline-code {{
            font-family: 'Source Code Pro', Menlo, monospace;
        }}
    </style>
</head>
<body>
    <script src="https://remarkjs.com/downloads/remark-latest.min.js"></script>
    <script>
        remark.create({{
            sourceUrl: "{source_url}",
            ratio: "16:9",
            highlightLanguage: "scheme",
            highlightLines: true
        }});
    </script>
</body>
</html>
"##
    )
}

/// Page that sends the browser on to `target` (used for `/` in static builds).
pub fn render_redirect(target: &str) -> String {
    let escaped = html_escape(target);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta http-equiv="refresh" content="0; url={escaped}">
    <link rel="canonical" href="{escaped}">
</head>
<body>
    <a href="{escaped}">{escaped}</a>
</body>
</html>
"##
    )
}
