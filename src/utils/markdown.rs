use ammonia::Builder;
use comrak::{markdown_to_html, Options};
use std::collections::HashSet;

/// Render a prompt description or comment body to sanitized HTML.
///
/// comrak parses the GFM subset that prompt authors use (code fences,
/// tables, strikethrough, autolinks) and ammonia strips anything that could
/// execute in the browser.
pub fn render_markdown(raw: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true; // ammonia sanitizes below

    let html = markdown_to_html(raw, &options);

    let extra_tags: HashSet<&str> = [
        "h1", "h2", "h3", "h4", "pre", "code", "blockquote", "hr", "table", "thead", "tbody",
        "tr", "th", "td", "del",
    ]
    .into_iter()
    .collect();
    let url_schemes: HashSet<&str> = ["http", "https", "mailto"].into_iter().collect();

    let mut builder = Builder::default();
    builder
        .add_tags(&extra_tags)
        .add_tag_attributes("a", &["href", "title"])
        .add_tag_attributes("code", &["class"])
        .url_schemes(url_schemes)
        .link_rel(Some("noopener noreferrer"));
    builder.clean(&html).to_string()
}

/// First `max_chars` characters of a prompt body for list cards.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
