use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry in a listing (search result, home section row).
///
/// `endpoint` is the item's primary key within its source: every item leaving
/// the extraction pipeline has a non-empty title and endpoint, anything else
/// is discarded before it gets here.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ContentItem {
    pub title: String,
    pub endpoint: String,
    pub thumb: Option<String>,
    /// "Movie", "Series", etc. where the source exposes it
    pub kind: Option<String>,
    pub rating: Option<String>,
    pub status: Option<String>,
}

/// Full detail page for a series / manga.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DetailRecord {
    pub title: String,
    pub thumb: Option<String>,
    pub synopsis: String,
    pub score: Option<String>,
    /// Document order, duplicates permitted
    pub genres: Vec<String>,
    /// Status, Duration, Released, ... keyed by canonical label
    pub metadata: HashMap<String, String>,
    pub units: Vec<ChildUnit>,
}

/// A chapter or episode belonging to a detail record.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChildUnit {
    pub title: String,
    pub endpoint: String,
    pub posted: Option<String>,
    pub views: Option<String>,
}

/// Parsed episode/watch page.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EpisodePage {
    pub title: String,
    pub stream_options: Vec<StreamOption>,
    pub next_endpoint: Option<String>,
    pub prev_endpoint: Option<String>,
    pub all_units: Vec<ChildUnit>,
    pub download_links: Vec<DownloadLink>,
}

/// A selectable player server on an episode page.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamOption {
    pub server: String,
    /// Canonical "NNNp", "HD"/"SD", or None when the source names no quality
    pub quality: Option<String>,
    pub target: StreamTarget,
}

/// Ephemeral input to the stream resolver's AJAX call. Never persisted
/// and never cached.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamTarget {
    pub post_id: String,
    pub nume: String,
    pub kind: String,
}

/// One direct download link on an episode page.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadLink {
    pub server: String,
    pub url: String,
    pub quality: Option<String>,
}

/// A genre/category navigation link.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenreLink {
    pub name: String,
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Response shapes are consumed by an API layer; field names are a contract
    #[test]
    fn test_content_item_json_shape() {
        let item = ContentItem {
            title: "Alpha".to_string(),
            endpoint: "/anime/alpha".to_string(),
            thumb: Some("a.jpg".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["title"], "Alpha");
        assert_eq!(json["endpoint"], "/anime/alpha");
        assert_eq!(json["thumb"], "a.jpg");
        assert!(json["rating"].is_null());
    }

    #[test]
    fn test_stream_option_round_trip() {
        let option = StreamOption {
            server: "Main".to_string(),
            quality: Some("720p".to_string()),
            target: StreamTarget {
                post_id: "11".to_string(),
                nume: "1".to_string(),
                kind: "tv".to_string(),
            },
        };
        let json = serde_json::to_string(&option).unwrap();
        let back: StreamOption = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server, "Main");
        assert_eq!(back.target.post_id, "11");
    }
}
