//! Winbu (anime/drama) markup extraction.
//!
//! Listing cards share one strategy chain across the home sections and the
//! search results; the search page just wraps cards in `.a-item` instead of
//! `.ml-item`. All parsers are pure: they take an already-decoded document
//! and return normalized records.

use crate::extract::{
    self, detect_quality, evaluate_strategies, normalize_thumb, strip_quality_token, FieldRule,
    FieldSource, ItemStrategy, LabelRule, ThumbRule,
};
use crate::helpers::{clean_text, derive_unit_label};
use crate::models::{
    ChildUnit, ContentItem, DetailRecord, DownloadLink, EpisodePage, GenreLink, StreamOption,
    StreamTarget,
};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "https://winbu.net";
pub const SOURCE: &str = "winbu";

/// Homepage, split into the site's named shelves.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HomeData {
    pub top_series: Vec<ContentItem>,
    pub top_movies: Vec<ContentItem>,
    pub latest_movies: Vec<ContentItem>,
    pub latest_anime: Vec<ContentItem>,
    pub international_series: Vec<ContentItem>,
    pub genres: Vec<GenreLink>,
}

const THUMB: ThumbRule = ThumbRule {
    selector: "img",
    attrs: &["data-original", "src"],
};

/// Card strategies in priority order. The endpoint is always the card's
/// first anchor; the title source is what varies between layouts.
const CARD_STRATEGIES: &[ItemStrategy] = &[
    ItemStrategy {
        name: "info-heading",
        title: FieldRule {
            selector: ".mli-info h2",
            source: FieldSource::Text,
        },
        endpoint: FieldRule {
            selector: "a",
            source: FieldSource::Attr("href"),
        },
        thumb: Some(THUMB),
    },
    ItemStrategy {
        name: "info-judul",
        title: FieldRule {
            selector: ".mli-info .judul",
            source: FieldSource::Text,
        },
        endpoint: FieldRule {
            selector: "a",
            source: FieldSource::Attr("href"),
        },
        thumb: Some(THUMB),
    },
    ItemStrategy {
        name: "info-text",
        title: FieldRule {
            selector: ".mli-info",
            source: FieldSource::Text,
        },
        endpoint: FieldRule {
            selector: "a",
            source: FieldSource::Attr("href"),
        },
        thumb: Some(THUMB),
    },
    // Search results hide the title in the mask anchor's title attribute
    ItemStrategy {
        name: "mask-title",
        title: FieldRule {
            selector: "a.ml-mask",
            source: FieldSource::Attr("title"),
        },
        endpoint: FieldRule {
            selector: "a",
            source: FieldSource::Attr("href"),
        },
        thumb: Some(THUMB),
    },
];

const METADATA_LABELS: &[LabelRule] = &[
    LabelRule {
        prefix: "Status :",
        key: "Status",
    },
    LabelRule {
        prefix: "Duration :",
        key: "Duration",
    },
];

/// Extract one listing card, with the rating/status enrichment the card
/// variants carry in data attributes or decorative elements.
fn extract_card(element: ElementRef<'_>) -> Option<ContentItem> {
    let mut item = evaluate_strategies(element, CARD_STRATEGIES)?;
    item.title = clean_text(&item.title);

    let hidden_sel = Selector::parse(".info-hidden").unwrap();
    if let Some(hidden) = element.select(&hidden_sel).next() {
        if let Some(rating) = hidden.value().attr("data-rating") {
            if !rating.trim().is_empty() {
                item.rating = Some(rating.trim().to_string());
            }
        }
        if let Some(ep) = hidden.value().attr("data-episode") {
            if !ep.is_empty() && ep != "0" {
                item.status = Some(format!("Ep {}", ep));
            }
        }
    }

    // Visual fallback: the starred .mli-mvi row carries the rating as text
    if item.rating.as_deref().unwrap_or("0") == "0" {
        let mvi_sel = Selector::parse(".mli-mvi").unwrap();
        let star_sel = Selector::parse(".fa-star").unwrap();
        for mvi in element.select(&mvi_sel) {
            if mvi.select(&star_sel).next().is_some() {
                let text = clean_text(&mvi.text().collect::<String>());
                if !text.is_empty() {
                    item.rating = Some(text);
                }
            }
        }
    }

    if item.status.is_none() {
        let top_sel = Selector::parse(".mli-topten b").unwrap();
        if let Some(rank) = element.select(&top_sel).next() {
            let text = clean_text(&rank.text().collect::<String>());
            if !text.is_empty() {
                item.status = Some(format!("Rank {}", text));
            }
        }
    }

    Some(item)
}

fn cards_in(section: ElementRef<'_>, container: &str) -> Vec<ContentItem> {
    let sel = Selector::parse(container).unwrap();
    section.select(&sel).filter_map(extract_card).collect()
}

/// Parse the homepage shelves, keyed by each shelf's heading text.
pub fn parse_home(doc: &Html) -> HomeData {
    let mut data = HomeData::default();

    let wrap_sel = Selector::parse(".movies-list-wrap").unwrap();
    let title_sel = Selector::parse(".list-title h2").unwrap();
    for section in doc.select(&wrap_sel) {
        let heading = section
            .select(&title_sel)
            .next()
            .map(|h| h.text().collect::<String>().trim().to_lowercase())
            .unwrap_or_default();

        let target = if heading.contains("top 10 series") {
            &mut data.top_series
        } else if heading.contains("top 10 film") {
            &mut data.top_movies
        } else if heading.contains("anime donghua terbaru") || heading.contains("anime terbaru") {
            &mut data.latest_anime
        } else if heading.contains("film terbaru") {
            &mut data.latest_movies
        } else if heading.contains("jepang korea china barat") {
            &mut data.international_series
        } else {
            continue;
        };
        target.extend(cards_in(section, ".ml-item"));
    }

    let genre_sel = Selector::parse("#List-Anime .list-group-item a").unwrap();
    for a in doc.select(&genre_sel) {
        let name = clean_text(&a.text().collect::<String>());
        let endpoint = a.value().attr("href").unwrap_or("").to_string();
        if !name.is_empty()
            && !endpoint.is_empty()
            && !name.to_lowercase().contains("daftar anime")
        {
            data.genres.push(GenreLink { name, endpoint });
        }
    }

    data
}

/// Search results use `.a-item` wrappers around the same card markup.
pub fn parse_search(doc: &Html) -> Vec<ContentItem> {
    cards_in(doc.root_element(), ".a-item")
}

/// Parse a series detail page.
pub fn parse_detail(doc: &Html) -> DetailRecord {
    let mut detail = DetailRecord::default();
    let container_sel = Selector::parse(".movies-list.movies-list-full .t-item").unwrap();
    let root = doc.root_element();
    let container = doc.select(&container_sel).next().unwrap_or(root);

    let judul_sel = Selector::parse(".mli-info .judul").unwrap();
    detail.title = container
        .select(&judul_sel)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))
        .unwrap_or_default();
    if detail.title.is_empty() {
        let h1_sel = Selector::parse("h1.titless").unwrap();
        detail.title = doc
            .select(&h1_sel)
            .next()
            .map(|t| clean_text(&t.text().collect::<String>()))
            .unwrap_or_default();
    }

    let thumb_sel = Selector::parse(".ml-mask .mli-thumb-box img").unwrap();
    detail.thumb = container
        .select(&thumb_sel)
        .next()
        .and_then(|img| normalize_thumb(img.value().attr("src").unwrap_or("")));

    let desc_sel = Selector::parse(".ml-mask .mli-desc").unwrap();
    detail.synopsis = container
        .select(&desc_sel)
        .next()
        .map(|d| clean_text(&d.text().collect::<String>()))
        .unwrap_or_default();

    let score_sel = Selector::parse(".ml-mask .mli-mvi span[itemprop='ratingValue']").unwrap();
    detail.score = container
        .select(&score_sel)
        .next()
        .map(|s| clean_text(&s.text().collect::<String>()))
        .filter(|s| !s.is_empty());

    // Document order, duplicates kept as the site prints them
    let genre_sel = Selector::parse(".ml-mask .mli-mvi a[itemprop='genre']").unwrap();
    for g in container.select(&genre_sel) {
        detail.genres.push(clean_text(&g.text().collect::<String>()));
    }

    detail.units = season_units(doc);

    let mvi_sel = Selector::parse(".mli-mvi").unwrap();
    for row in container.select(&mvi_sel) {
        let text = clean_text(&row.text().collect::<String>());
        if let Some((key, value)) = extract::metadata_from_text(&text, METADATA_LABELS) {
            detail.metadata.insert(key.to_string(), value);
        }
    }

    detail
}

/// Parse an episode/watch page: player servers, navigation, download links.
pub fn parse_episode_page(doc: &Html) -> EpisodePage {
    let mut page = EpisodePage::default();

    let h1_sel = Selector::parse("h1.titless").unwrap();
    page.title = doc
        .select(&h1_sel)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))
        .unwrap_or_default();
    if page.title.is_empty() {
        let title_sel = Selector::parse("title").unwrap();
        page.title = doc
            .select(&title_sel)
            .next()
            .map(|t| clean_text(&t.text().collect::<String>()))
            .unwrap_or_default();
    }

    let option_sel = Selector::parse(".east_player_option").unwrap();
    for opt in doc.select(&option_sel) {
        let text = clean_text(&opt.text().collect::<String>());
        let title_attr = opt.value().attr("title");
        let quality = detect_quality(&text, title_attr);
        let server = match quality.as_deref() {
            Some(q) if q.ends_with('p') => strip_quality_token(&text, q),
            Some(q) => clean_text(&text.replace(q, "")),
            None => text.clone(),
        };

        let target = StreamTarget {
            post_id: opt.value().attr("data-post").unwrap_or("").to_string(),
            nume: opt.value().attr("data-nume").unwrap_or("").to_string(),
            kind: opt.value().attr("data-type").unwrap_or("").to_string(),
        };
        // An option without post and nume cannot be resolved; drop it
        if target.post_id.is_empty() || target.nume.is_empty() {
            continue;
        }
        page.stream_options.push(StreamOption {
            server,
            quality,
            target,
        });
    }

    let nav_sel = Selector::parse(".naveps .nvsc a").unwrap();
    for a in doc.select(&nav_sel) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let text = a.text().collect::<String>().to_lowercase();
        if text.contains("next") || text.contains("selanjutnya") {
            page.next_endpoint = Some(href.to_string());
        } else if text.contains("prev") || text.contains("sebelumnya") {
            page.prev_endpoint = Some(href.to_string());
        }
    }
    if page.next_endpoint.is_none() {
        page.next_endpoint = first_href(doc, ".fr a");
    }
    if page.prev_endpoint.is_none() {
        page.prev_endpoint = first_href(doc, ".fl a");
    }

    page.all_units = season_units(doc);

    page.download_links = parse_download_links(doc, ".download-eps a");
    if page.download_links.is_empty() {
        page.download_links = parse_download_links(doc, "#download a");
    }

    page
}

/// The season episode list, present on both detail and watch pages.
fn season_units(doc: &Html) -> Vec<ChildUnit> {
    let episode_sel = Selector::parse(".tvseason .les-content a").unwrap();
    let mut units = Vec::new();
    for a in doc.select(&episode_sel) {
        if let Some(href) = a.value().attr("href") {
            units.push(ChildUnit {
                title: derive_unit_label(&clean_text(&a.text().collect::<String>()), href),
                endpoint: href.to_string(),
                posted: None,
                views: None,
            });
        }
    }
    units
}

fn first_href(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.to_string())
}

fn parse_download_links(doc: &Html, selector: &str) -> Vec<DownloadLink> {
    let sel = Selector::parse(selector).unwrap();
    let mut links = Vec::new();
    for a in doc.select(&sel) {
        let server = clean_text(&a.text().collect::<String>());
        let url = a.value().attr("href").unwrap_or("").to_string();
        if url.is_empty() || url.starts_with("javascript") {
            continue;
        }
        let quality = detect_quality(&server, None);
        links.push(DownloadLink {
            server,
            url,
            quality,
        });
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_home_sections_and_genres() {
        let doc = Html::parse_document(
            r#"
            <div class="movies-list-wrap">
              <div class="list-title"><h2>Top 10 Series</h2></div>
              <div class="ml-item">
                <a href="/anime/alpha"></a>
                <img data-original="alpha.jpg?w=200">
                <div class="mli-info"><h2>Alpha</h2></div>
                <div class="info-hidden" data-rating="8.1" data-episode="12"></div>
              </div>
            </div>
            <div class="movies-list-wrap">
              <div class="list-title"><h2>Anime Terbaru</h2></div>
              <div class="ml-item">
                <a href="/anime/beta"></a>
                <div class="mli-info"><span class="judul">Beta</span></div>
              </div>
            </div>
            <div id="List-Anime">
              <li class="list-group-item"><a href="/genre/action">Action</a></li>
              <li class="list-group-item"><a href="/anime-list">Daftar Anime</a></li>
            </div>
            "#,
        );
        let home = parse_home(&doc);
        assert_eq!(home.top_series.len(), 1);
        assert_eq!(home.top_series[0].title, "Alpha");
        assert_eq!(home.top_series[0].endpoint, "/anime/alpha");
        assert_eq!(home.top_series[0].thumb.as_deref(), Some("alpha.jpg"));
        assert_eq!(home.top_series[0].rating.as_deref(), Some("8.1"));
        assert_eq!(home.top_series[0].status.as_deref(), Some("Ep 12"));

        assert_eq!(home.latest_anime.len(), 1);
        assert_eq!(home.latest_anime[0].title, "Beta");

        // The "Daftar Anime" navigation link is filtered out
        assert_eq!(home.genres.len(), 1);
        assert_eq!(home.genres[0].name, "Action");
    }

    #[test]
    fn test_search_uses_mask_title_fallback() {
        let doc = Html::parse_document(
            r#"<div class="a-item">
                 <a class="ml-mask" title="Gamma Series" href="/anime/gamma"></a>
               </div>
               <div class="a-item"><span>no link here</span></div>"#,
        );
        let results = parse_search(&doc);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Gamma Series");
        assert_eq!(results[0].endpoint, "/anime/gamma");
    }

    #[test]
    fn test_parse_detail() {
        let doc = Html::parse_document(
            r#"
            <div class="movies-list movies-list-full"><div class="t-item">
              <div class="mli-info"><span class="judul">Delta</span></div>
              <div class="ml-mask">
                <div class="mli-thumb-box"><img src="d.jpg?x=1"></div>
                <div class="mli-desc"> A  synopsis. </div>
                <div class="mli-mvi"><span itemprop="ratingValue">7.9</span></div>
                <div class="mli-mvi">
                  <a itemprop="genre">Action</a><a itemprop="genre">Drama</a><a itemprop="genre">Action</a>
                </div>
                <div class="mli-mvi">Status : Ongoing</div>
                <div class="mli-mvi">Duration : 24 min</div>
                <div class="mli-mvi">Released : 2020</div>
              </div>
            </div></div>
            <div class="tvseason"><div class="les-content">
              <a href="/e/1">Episode 1</a><a href="/e/2">Episode 2</a>
            </div></div>
            "#,
        );
        let detail = parse_detail(&doc);
        assert_eq!(detail.title, "Delta");
        assert_eq!(detail.thumb.as_deref(), Some("d.jpg"));
        assert_eq!(detail.synopsis, "A synopsis.");
        assert_eq!(detail.score.as_deref(), Some("7.9"));
        // Document order, duplicate kept
        assert_eq!(detail.genres, vec!["Action", "Drama", "Action"]);
        assert_eq!(detail.metadata.get("Status").unwrap(), "Ongoing");
        assert_eq!(detail.metadata.get("Duration").unwrap(), "24 min");
        // Unknown label ignored
        assert!(!detail.metadata.contains_key("Released"));
        assert_eq!(detail.units.len(), 2);
        assert_eq!(detail.units[1].endpoint, "/e/2");
    }

    #[test]
    fn test_parse_episode_page_stream_options() {
        let doc = Html::parse_document(
            r#"
            <h1 class="titless">Delta Episode 2</h1>
            <div class="east_player_option" data-post="11" data-nume="1" data-type="tv">
              Server 720p Main</div>
            <div class="east_player_option" data-post="11" data-nume="2" data-type="tv"
              title="Mirror 480p">Mirror</div>
            <div class="east_player_option" data-post="11" data-nume="3" data-type="tv">
              Server HD</div>
            <div class="east_player_option" data-post="" data-nume="4">Broken</div>
            "#,
        );
        let page = parse_episode_page(&doc);
        assert_eq!(page.title, "Delta Episode 2");
        // The option missing data-post is dropped
        assert_eq!(page.stream_options.len(), 3);

        assert_eq!(page.stream_options[0].quality.as_deref(), Some("720p"));
        assert_eq!(page.stream_options[0].server, "Server Main");
        assert_eq!(page.stream_options[0].target.post_id, "11");

        // Quality found via the title attribute when text had none
        assert_eq!(page.stream_options[1].quality.as_deref(), Some("480p"));

        assert_eq!(page.stream_options[2].quality.as_deref(), Some("HD"));
    }

    #[test]
    fn test_parse_episode_page_quality_left_unset() {
        let doc = Html::parse_document(
            r#"<div class="east_player_option" data-post="9" data-nume="1" data-type="tv">
                 Server</div>"#,
        );
        let page = parse_episode_page(&doc);
        assert_eq!(page.stream_options.len(), 1);
        assert_eq!(page.stream_options[0].quality, None);
        assert_eq!(page.stream_options[0].server, "Server");
    }

    #[test]
    fn test_episode_page_carries_season_episode_list() {
        let doc = Html::parse_document(
            r#"
            <h1 class="titless">Delta Episode 2</h1>
            <div class="east_player_option" data-post="11" data-nume="1" data-type="tv">Main</div>
            <div class="tvseason"><div class="les-content">
              <a href="/e/1">Episode 1</a>
              <a href="/e/2">Episode 2</a>
              <a href="/e/3">Episode 3</a>
            </div></div>
            "#,
        );
        let page = parse_episode_page(&doc);
        assert_eq!(page.all_units.len(), 3);
        assert_eq!(page.all_units[0].title, "Episode 1");
        assert_eq!(page.all_units[2].endpoint, "/e/3");
    }

    #[test]
    fn test_parse_episode_navigation_fallback() {
        let doc = Html::parse_document(
            r#"<div class="naveps"><div class="nvsc">
                 <a href="/e/3">Next Episode</a>
               </div></div>
               <div class="fl"><a href="/e/1"></a></div>"#,
        );
        let page = parse_episode_page(&doc);
        assert_eq!(page.next_endpoint.as_deref(), Some("/e/3"));
        // prev falls back to the .fl anchor
        assert_eq!(page.prev_endpoint.as_deref(), Some("/e/1"));
    }

    #[test]
    fn test_parse_download_links() {
        let doc = Html::parse_document(
            r#"<div class="download-eps">
                 <a href="https://dl.example/720">Mirror 720p</a>
                 <a href="javascript:void(0)">Fake</a>
                 <a href="https://dl.example/raw">Mirror</a>
               </div>"#,
        );
        let page = parse_episode_page(&doc);
        assert_eq!(page.download_links.len(), 2);
        assert_eq!(page.download_links[0].quality.as_deref(), Some("720p"));
        assert_eq!(page.download_links[1].quality, None);
    }
}
