//! Small text/URL utilities shared by the per-source extraction modules.

use regex::Regex;

/// Collapse newlines, tabs and runs of spaces into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip the query-string suffix from an image URL.
/// `image.jpg?w=300&resize=150` -> `image.jpg`
pub fn clean_image_url(url: &str) -> &str {
    match url.split_once('?') {
        Some((base, _)) => base,
        None => url,
    }
}

/// Derive a chapter/episode label from anchor text, falling back to the
/// chapter or volume number embedded in the href when the text is empty.
pub fn derive_unit_label(text: &str, href: &str) -> String {
    let t = text.trim();
    if !t.is_empty() && t != "#" {
        return t.to_string();
    }
    let lower = href.to_lowercase();
    if let Some(cap) = Regex::new(r"chapter[-/](\d+(?:\.\d+)?)")
        .unwrap()
        .captures(&lower)
    {
        return format!("Ch.{}", &cap[1]);
    }
    if let Some(cap) = Regex::new(r"episode[-/](\d+(?:\.\d+)?)")
        .unwrap()
        .captures(&lower)
    {
        return format!("Ep.{}", &cap[1]);
    }
    href.to_string()
}
