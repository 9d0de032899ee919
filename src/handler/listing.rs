//! Directory listing rendering

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io;
use std::path::Path;

/// Characters escaped in listing hrefs (path segment context)
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b':');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub name: String,
    pub is_dir: bool,
}

/// Immediate children of `dir`, sorted by name. Names that are not valid
/// UTF-8 are skipped.
pub async fn read_listing(dir: &Path) -> io::Result<Vec<ListingItem>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut items = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        items.push(ListingItem { name, is_dir });
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

/// Render a minimal HTML page linking to every item, relative to the directory
pub fn render_listing(items: &[ListingItem]) -> String {
    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for item in items {
        let suffix = if item.is_dir { "/" } else { "" };
        let href = utf8_percent_encode(&item.name, HREF_ESCAPE);
        html.push_str(&format!(
            "<a href=\"./{href}{suffix}\">{}{suffix}</a>\n",
            escape_html(&item.name)
        ));
    }
    html.push_str("</pre>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
