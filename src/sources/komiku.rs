//! Komiku (manga) markup extraction.
//!
//! List pages mix two card layouts (`.bge` and `article.ls2`), so the list
//! schema carries one strategy per layout and lets the evaluation loop pick
//! whichever matches each card.

use crate::extract::{
    self, extract_items, normalize_thumb, FieldRule, FieldSource, ItemStrategy, LabelRule,
    ListSchema, ThumbRule,
};
use crate::helpers::{clean_text, derive_unit_label};
use crate::models::{ChildUnit, ContentItem, DetailRecord, GenreLink};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "https://komiku.org";
pub const SOURCE: &str = "komiku";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HomeData {
    /// The site removed its trending shelf; kept empty for response-shape
    /// stability with existing consumers.
    pub trending: Vec<ContentItem>,
    pub popular: Vec<ContentItem>,
    pub latest: Vec<ContentItem>,
}

const BGE_STRATEGY: ItemStrategy = ItemStrategy {
    name: "bge",
    title: FieldRule {
        selector: ".kan h3",
        source: FieldSource::Text,
    },
    endpoint: FieldRule {
        selector: ".kan a",
        source: FieldSource::Attr("href"),
    },
    thumb: Some(ThumbRule {
        selector: ".bgei img",
        attrs: &["src", "data-src"],
    }),
};

const LS2_STRATEGY: ItemStrategy = ItemStrategy {
    name: "ls2",
    title: FieldRule {
        selector: ".ls2j h3 a",
        source: FieldSource::Text,
    },
    endpoint: FieldRule {
        selector: ".ls2j h3 a",
        source: FieldSource::Attr("href"),
    },
    thumb: Some(ThumbRule {
        selector: ".ls2v img",
        attrs: &["src", "data-src"],
    }),
};

const LIST_SCHEMA: ListSchema = ListSchema {
    containers: ".bge, article.ls2",
    strategies: &[BGE_STRATEGY, LS2_STRATEGY],
};

const POPULAR_SCHEMA: ListSchema = ListSchema {
    containers: "#Komik_Hot_Manga article.ls2",
    strategies: &[LS2_STRATEGY],
};

const LATEST_SCHEMA: ListSchema = ListSchema {
    containers: "#Terbaru .ls4",
    strategies: &[ItemStrategy {
        name: "ls4",
        title: FieldRule {
            selector: ".ls4j h4 a",
            source: FieldSource::Text,
        },
        endpoint: FieldRule {
            selector: ".ls4j h4 a",
            source: FieldSource::Attr("href"),
        },
        thumb: Some(ThumbRule {
            selector: ".ls4v img",
            attrs: &["src", "data-src"],
        }),
    }],
};

const RECOMMENDATION_SCHEMA: ListSchema = ListSchema {
    containers: "#Terbaru .ls8, .ls8",
    strategies: &[
        ItemStrategy {
            name: "ls8",
            title: FieldRule {
                selector: ".ls8j h3 a",
                source: FieldSource::Text,
            },
            endpoint: FieldRule {
                selector: "a",
                source: FieldSource::Attr("href"),
            },
            thumb: Some(ThumbRule {
                selector: "img",
                attrs: &["src", "data-src"],
            }),
        },
        ItemStrategy {
            name: "ls8-generic",
            title: FieldRule {
                selector: "h3 a",
                source: FieldSource::Text,
            },
            endpoint: FieldRule {
                selector: "a",
                source: FieldSource::Attr("href"),
            },
            thumb: Some(ThumbRule {
                selector: "img",
                attrs: &["src", "data-src"],
            }),
        },
    ],
};

const METADATA_LABELS: &[LabelRule] = &[
    LabelRule {
        prefix: "pengarang",
        key: "Author",
    },
    LabelRule {
        prefix: "status",
        key: "Status",
    },
];

/// Parse a search/browse listing page.
pub fn parse_list(doc: &Html) -> Vec<ContentItem> {
    extract_items(doc.root_element(), &LIST_SCHEMA)
}

/// Parse the homepage's popular and latest shelves.
pub fn parse_home(doc: &Html) -> HomeData {
    HomeData {
        trending: Vec::new(),
        popular: extract_items(doc.root_element(), &POPULAR_SCHEMA),
        latest: extract_items(doc.root_element(), &LATEST_SCHEMA),
    }
}

/// Parse a manga detail page: metadata table, genre list, chapter table.
pub fn parse_detail(doc: &Html) -> DetailRecord {
    let mut detail = DetailRecord::default();

    let title_sel = Selector::parse("#Judul h1").unwrap();
    detail.title = doc
        .select(&title_sel)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))
        .unwrap_or_default();

    let thumb_sel = Selector::parse(".ims img").unwrap();
    detail.thumb = doc
        .select(&thumb_sel)
        .next()
        .and_then(|img| normalize_thumb(img.value().attr("src").unwrap_or("")));

    let desc_sel = Selector::parse(".desc").unwrap();
    detail.synopsis = doc
        .select(&desc_sel)
        .next()
        .map(|d| clean_text(&d.text().collect::<String>()))
        .unwrap_or_default();

    let row_sel = Selector::parse(".inftable tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    for row in doc.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
            continue;
        };
        let label = clean_text(&first.text().collect::<String>());
        let value = clean_text(&last.text().collect::<String>());
        if let Some((key, value)) = extract::metadata_from_pair(&label, &value, METADATA_LABELS) {
            detail.metadata.insert(key.to_string(), value);
        }
    }

    let genre_sel = Selector::parse(".genre li a").unwrap();
    for g in doc.select(&genre_sel) {
        detail.genres.push(clean_text(&g.text().collect::<String>()));
    }

    let chapter_row_sel = Selector::parse("table#Daftar_Chapter tr").unwrap();
    let th_sel = Selector::parse("th").unwrap();
    let link_sel = Selector::parse("td.judulseries a").unwrap();
    let date_sel = Selector::parse("td.tanggalseries").unwrap();
    for row in doc.select(&chapter_row_sel) {
        // Header rows only carry th cells
        if row.select(&th_sel).next().is_some() {
            continue;
        }
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let Some(endpoint) = link.value().attr("href") else {
            continue;
        };
        if endpoint.is_empty() {
            continue;
        }
        // Some rows ship an empty anchor; fall back to the number in the href
        let title = derive_unit_label(&clean_text(&link.text().collect::<String>()), endpoint);
        let posted = row
            .select(&date_sel)
            .next()
            .map(|d| clean_text(&d.text().collect::<String>()))
            .filter(|d| !d.is_empty());
        detail.units.push(ChildUnit {
            title,
            endpoint: endpoint.to_string(),
            posted,
            views: None,
        });
    }

    detail
}

/// Parse a chapter reading page into its page-image URLs.
pub fn parse_chapter_images(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let img_sel = Selector::parse("#Baca_Komik img").unwrap();
    let mut images = Vec::new();
    for img in doc.select(&img_sel) {
        // Lazy-loaded pages keep the real URL in data-src
        let src = [img.value().attr("src"), img.value().attr("data-src")]
            .into_iter()
            .flatten()
            .find_map(normalize_thumb);
        if let Some(src) = src {
            images.push(src);
        }
    }
    images
}

/// Parse the "similar titles" shelf on chapter pages.
pub fn parse_recommendations(doc: &Html) -> Vec<ContentItem> {
    extract_items(doc.root_element(), &RECOMMENDATION_SCHEMA)
}

/// Parse genre navigation links; anything not pointing at `/genre/` is a
/// different kind of menu entry and is dropped.
pub fn parse_genres(doc: &Html) -> Vec<GenreLink> {
    let sel = Selector::parse("ul.genre li a, a[href*='/genre/']").unwrap();
    let mut genres = Vec::new();
    for a in doc.select(&sel) {
        let name = clean_text(&a.text().collect::<String>());
        let Some(endpoint) = a.value().attr("href") else {
            continue;
        };
        if !name.is_empty() && endpoint.contains("/genre/") {
            genres.push(GenreLink {
                name,
                endpoint: endpoint.to_string(),
            });
        }
    }
    genres
}
