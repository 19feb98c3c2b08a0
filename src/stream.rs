//! Player-URL resolution via the source's internal AJAX action.
//!
//! The episode page only lists server buttons; the actual player frame comes
//! back as a markup fragment from a form-encoded `player_ajax` POST. Sites
//! wrap the iframe differently across theme updates, so the frame's source
//! attribute is located by a fixed selector cascade, with a literal substring
//! scan as the last resort for fragments that are not even valid markup.

use crate::decoder;
use crate::error::ScrapeError;
use crate::http_client::FetchClient;
use crate::models::StreamTarget;
use scraper::{Html, Selector};

/// WordPress AJAX action resolving a player frame.
const AJAX_ACTION: &str = "player_ajax";

/// Selector cascade tried in this exact order; the first strategy producing
/// a value wins.
const IFRAME_CASCADE: &[(&str, &str)] = &[
    ("iframe", "src"),
    ("div iframe", "src"),
    ("iframe[class]", "src"),
    ("iframe[id]", "src"),
    ("iframe[src]", "src"),
    ("iframe[data-src]", "data-src"),
];

/// Resolve a stream target to its player URL.
///
/// Fails with `StreamNotFound` only when every cascade strategy, including
/// the literal fallback, yields nothing.
pub async fn resolve(
    client: &FetchClient,
    base_url: &str,
    target: &StreamTarget,
) -> Result<String, ScrapeError> {
    let ajax_url = format!("{}/wp-admin/admin-ajax.php", base_url.trim_end_matches('/'));
    let response = client
        .post_form(
            &ajax_url,
            &[
                ("action", AJAX_ACTION),
                ("post", &target.post_id),
                ("nume", &target.nume),
                ("type", &target.kind),
            ],
            None,
        )
        .await?;

    let body = decoder::read_body(response).await?;
    log::debug!(
        "player_ajax response for post {}: {} bytes",
        target.post_id,
        body.len()
    );

    extract_player_src(&body).ok_or(ScrapeError::StreamNotFound)
}

/// Locate the player frame's source attribute in a markup fragment.
pub fn extract_player_src(fragment: &str) -> Option<String> {
    let doc = Html::parse_fragment(fragment);
    for (selector, attr) in IFRAME_CASCADE {
        let sel = Selector::parse(selector).unwrap();
        if let Some(element) = doc.select(&sel).next() {
            if let Some(src) = element.value().attr(attr) {
                if !src.trim().is_empty() {
                    log::debug!("found player frame using selector: {}", selector);
                    return Some(src.trim().to_string());
                }
            }
        }
    }
    literal_src_scan(fragment)
}

/// Last-resort scan for a `src="..."` substring in the raw fragment text.
fn literal_src_scan(fragment: &str) -> Option<String> {
    let start = fragment.find("src=\"")? + 5;
    let end = fragment[start..].find('"')?;
    let src = &fragment[start..start + end];
    if src.is_empty() {
        return None;
    }
    Some(src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_iframe() {
        assert_eq!(
            extract_player_src(r#"<iframe src="https://player.example/v/1"></iframe>"#),
            Some("https://player.example/v/1".to_string())
        );
    }

    #[test]
    fn test_nested_iframe() {
        assert_eq!(
            extract_player_src(r#"<div class="player"><iframe src="https://p/2"></iframe></div>"#),
            Some("https://p/2".to_string())
        );
    }

    #[test]
    fn test_deferred_load_cascade_step() {
        // Only data-src, no plain src: resolved via the data-src step
        assert_eq!(
            extract_player_src(r#"<iframe data-src="X"></iframe>"#),
            Some("X".to_string())
        );
    }

    #[test]
    fn test_first_strategy_in_order_wins() {
        let fragment = r#"<iframe id="late" data-src="deferred"></iframe>
                          <div><iframe src="https://p/early"></iframe></div>"#;
        // The bare `iframe` selector matches the first iframe but it has no
        // src; `div iframe` is the first strategy producing a value
        assert_eq!(
            extract_player_src(fragment),
            Some("https://p/early".to_string())
        );
    }

    #[test]
    fn test_literal_fallback_on_non_markup() {
        let fragment = r#"<script>document.write('<iframe src="https://p/js">');</script>"#;
        // Script content never becomes an element, so the cascade finds no
        // iframe; the literal scan still finds the src pattern
        assert_eq!(
            extract_player_src(fragment),
            Some("https://p/js".to_string())
        );
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(extract_player_src("<p>maintenance</p>"), None);
    }
}
