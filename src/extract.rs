//! Declarative selector-fallback extraction.
//!
//! Each source declares an ordered list of typed strategy records instead of
//! scattering per-field conditionals. For every container element the
//! strategies run in priority order; the first one producing a non-empty
//! title AND endpoint wins. An element no strategy can satisfy is skipped
//! silently; markup drift on one card must not fail the whole listing.

use crate::helpers::clean_image_url;
use crate::models::ContentItem;
use scraper::{ElementRef, Selector};

/// Where a field's value comes from within the matched element.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    /// Concatenated text content
    Text,
    /// A named attribute
    Attr(&'static str),
}

/// One selector/source combination attempting to derive a field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub selector: &'static str,
    pub source: FieldSource,
}

/// Thumbnail lookup: attributes are tried in order, the first value that
/// survives normalization wins (lazy-load placeholders count as absent).
#[derive(Debug, Clone, Copy)]
pub struct ThumbRule {
    pub selector: &'static str,
    pub attrs: &'static [&'static str],
}

/// One complete way of reading a listing card.
#[derive(Debug, Clone, Copy)]
pub struct ItemStrategy {
    pub name: &'static str,
    pub title: FieldRule,
    pub endpoint: FieldRule,
    pub thumb: Option<ThumbRule>,
}

/// A container selector plus the ordered strategies applied to each match.
#[derive(Debug, Clone, Copy)]
pub struct ListSchema {
    pub containers: &'static str,
    pub strategies: &'static [ItemStrategy],
}

/// Known lazy-load placeholder image
const LAZY_PLACEHOLDER: &str = "lazy.jpg";

/// Ordered resolution tokens for quality detection. The order, including the
/// suffixed/bare pairs, is a contract shared with the sources; do not
/// reorder or deduplicate.
pub const RESOLUTION_TOKENS: &[&str] = &[
    "1080p", "1080", "720p", "720", "480p", "480", "360p", "360",
];

/// A metadata-row label prefix and the canonical key it maps to.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub prefix: &'static str,
    pub key: &'static str,
}

/// Run a list schema against any element subtree (a parsed document's root,
/// a home section, an AJAX fragment).
pub fn extract_items(root: ElementRef<'_>, schema: &ListSchema) -> Vec<ContentItem> {
    let container_sel = Selector::parse(schema.containers).unwrap();
    let mut items = Vec::new();
    let mut skipped = 0usize;

    for element in root.select(&container_sel) {
        match evaluate_strategies(element, schema.strategies) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!(
            "{} of {} candidates skipped (no strategy satisfied title+endpoint)",
            skipped,
            skipped + items.len()
        );
    }
    items
}

/// Try strategies in declared order; first with non-empty required fields wins.
pub fn evaluate_strategies(
    element: ElementRef<'_>,
    strategies: &[ItemStrategy],
) -> Option<ContentItem> {
    for strategy in strategies {
        let title = field_value(element, &strategy.title);
        let endpoint = field_value(element, &strategy.endpoint);
        if title.is_empty() || endpoint.is_empty() {
            continue;
        }
        let thumb = strategy.thumb.as_ref().and_then(|t| thumb_value(element, t));
        return Some(ContentItem {
            title,
            endpoint,
            thumb,
            ..Default::default()
        });
    }
    None
}

/// Extract one field per its rule; missing matches yield an empty string.
pub fn field_value(element: ElementRef<'_>, rule: &FieldRule) -> String {
    let selector = Selector::parse(rule.selector).unwrap();
    let Some(target) = element.select(&selector).next() else {
        return String::new();
    };
    match rule.source {
        FieldSource::Text => target.text().collect::<String>().trim().to_string(),
        FieldSource::Attr(name) => target
            .value()
            .attr(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Extract and normalize a thumbnail URL, trying attributes in order.
pub fn thumb_value(element: ElementRef<'_>, rule: &ThumbRule) -> Option<String> {
    let selector = Selector::parse(rule.selector).unwrap();
    let target = element.select(&selector).next()?;
    for attr in rule.attrs {
        if let Some(url) = normalize_thumb(target.value().attr(attr).unwrap_or("")) {
            return Some(url);
        }
    }
    None
}

/// Strip the query suffix and treat lazy-load placeholders as absent.
pub fn normalize_thumb(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(LAZY_PLACEHOLDER) {
        return None;
    }
    Some(clean_image_url(trimmed).to_string())
}

/// Detect a stream/download quality from element text, then from a `title`
/// attribute when text matching failed. The first resolution token to match
/// wins and is normalized to the canonical "NNNp" form; a bare "HD"/"SD"
/// keyword is the fallback; with no match at all the quality stays unset,
/// never a placeholder string.
pub fn detect_quality(text: &str, title_attr: Option<&str>) -> Option<String> {
    if let Some(q) = match_resolution(text) {
        return Some(q);
    }
    if let Some(attr) = title_attr {
        if let Some(q) = match_resolution(attr) {
            return Some(q);
        }
    }
    let lower = text.to_lowercase();
    if lower.contains("hd") {
        return Some("HD".to_string());
    }
    if lower.contains("sd") {
        return Some("SD".to_string());
    }
    None
}

fn match_resolution(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for token in RESOLUTION_TOKENS {
        if lower.contains(token) {
            let mut quality = token.to_string();
            if !quality.ends_with('p') {
                quality.push('p');
            }
            return Some(quality);
        }
    }
    None
}

/// Remove a matched resolution token and decorative separators from a server
/// label: "Server - [720p]" with token "720p" -> "Server".
pub fn strip_quality_token(text: &str, quality: &str) -> String {
    let bare = quality.trim_end_matches('p');
    let mut out = String::with_capacity(text.len());
    let stripped = text
        .replace(quality, "")
        .replace(bare, "")
        .replace(['-', '[', ']', '(', ')'], "");
    out.push_str(stripped.trim());
    crate::helpers::clean_text(&out)
}

/// Match a whole-row metadata text like "Status : Ongoing" against a fixed
/// label-prefix dictionary. Unmatched labels are ignored so new rows the
/// source adds do not break extraction.
pub fn metadata_from_text(text: &str, rules: &[LabelRule]) -> Option<(&'static str, String)> {
    for rule in rules {
        if text.contains(rule.prefix) {
            let value = text.replacen(rule.prefix, "", 1).trim().to_string();
            return Some((rule.key, value));
        }
    }
    None
}

/// Match a separate label/value cell pair (label compared case-insensitively).
pub fn metadata_from_pair(
    label: &str,
    value: &str,
    rules: &[LabelRule],
) -> Option<(&'static str, String)> {
    let lower = label.to_lowercase();
    for rule in rules {
        if lower.contains(rule.prefix) {
            return Some((rule.key, value.trim().to_string()));
        }
    }
    None
}
