//! Cache-backed read path: every listing/detail operation checks the shared
//! TTL cache, fetches and parses on a miss, then stores the result under a
//! namespaced key. Stream resolution is the one deliberate exception and is
//! never cached here.

use crate::cache::{keys, ttl, TtlCache};
use crate::config::{CacheConfig, HttpConfig};
use crate::decoder;
use crate::error::ScrapeError;
use crate::http_client::FetchClient;
use crate::models::{ChildUnit, ContentItem, DetailRecord, EpisodePage, GenreLink, StreamTarget};
use crate::sources::{komiku, winbu};
use crate::stream;
use scraper::Html;
use std::sync::Arc;

/// Everything the read path can cache, in one value type so both sources
/// share a single cache instance and one sweeper.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    WinbuHome(winbu::HomeData),
    KomikuHome(komiku::HomeData),
    Items(Vec<ContentItem>),
    Genres(Vec<GenreLink>),
    Detail(DetailRecord),
    Episode(EpisodePage),
    Images(Vec<String>),
}

pub type SharedCache = Arc<TtlCache<CachedPayload>>;

/// Build the cache both services share and start its background sweep at
/// the configured interval. Requires a running tokio runtime.
pub fn build_cache(cfg: &CacheConfig) -> SharedCache {
    let cache: SharedCache = Arc::new(TtlCache::new());
    Arc::clone(&cache).start_sweeper(std::time::Duration::from_secs(cfg.sweep_interval_secs));
    cache
}

/// Join a page endpoint onto a source's base URL. Endpoints scraped from
/// the sites are sometimes absolute already.
fn absolute_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http") {
        endpoint.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// A detail page with no episode list is a movie page; the watch page is the
/// detail endpoint itself, surfaced as a single synthetic unit so consumers
/// always have something to play.
fn ensure_watchable_units(detail: &mut DetailRecord, endpoint: &str) {
    if detail.units.is_empty() {
        detail.units.push(ChildUnit {
            title: "Full Movie / Watch".to_string(),
            endpoint: endpoint.to_string(),
            posted: None,
            views: None,
        });
    }
}

/// Winbu anime/drama operations.
pub struct WinbuService {
    client: FetchClient,
    cache: SharedCache,
}

impl WinbuService {
    pub fn new(cache: SharedCache, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: FetchClient::new("Winbu", http)?,
            cache,
        })
    }

    async fn fetch_body(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).await?;
        decoder::read_body(response).await
    }

    pub async fn home(&self) -> Result<winbu::HomeData, ScrapeError> {
        let key = keys::home(winbu::SOURCE);
        if let Some(CachedPayload::WinbuHome(home)) = self.cache.get(&key) {
            return Ok(home);
        }
        let body = self.fetch_body(winbu::BASE_URL).await?;
        let home = {
            let doc = Html::parse_document(&body);
            winbu::parse_home(&doc)
        };
        self.cache
            .set(&key, CachedPayload::WinbuHome(home.clone()), ttl::HOME);
        Ok(home)
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<ContentItem>, ScrapeError> {
        let key = keys::search(winbu::SOURCE, keyword);
        if let Some(CachedPayload::Items(items)) = self.cache.get(&key) {
            return Ok(items);
        }
        let url = format!("{}/?s={}", winbu::BASE_URL, keyword);
        let body = self.fetch_body(&url).await?;
        let items = {
            let doc = Html::parse_document(&body);
            winbu::parse_search(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Items(items.clone()), ttl::SEARCH);
        Ok(items)
    }

    /// Drama listing, derived from the homepage's anime and international
    /// shelves rather than a dedicated page.
    pub async fn drama_list(&self) -> Result<Vec<ContentItem>, ScrapeError> {
        let home = self.home().await?;
        let mut items = home.latest_anime;
        items.extend(home.international_series);
        Ok(items)
    }

    pub async fn genres(&self) -> Result<Vec<GenreLink>, ScrapeError> {
        let key = keys::listing(winbu::SOURCE, "genres");
        if let Some(CachedPayload::Genres(genres)) = self.cache.get(&key) {
            return Ok(genres);
        }
        let genres = self.home().await?.genres;
        self.cache
            .set(&key, CachedPayload::Genres(genres.clone()), ttl::HOME);
        Ok(genres)
    }

    pub async fn detail(&self, endpoint: &str) -> Result<DetailRecord, ScrapeError> {
        let key = keys::detail(winbu::SOURCE, endpoint);
        if let Some(CachedPayload::Detail(detail)) = self.cache.get(&key) {
            return Ok(detail);
        }
        let url = absolute_url(winbu::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let mut detail = {
            let doc = Html::parse_document(&body);
            winbu::parse_detail(&doc)
        };
        ensure_watchable_units(&mut detail, endpoint);
        self.cache
            .set(&key, CachedPayload::Detail(detail.clone()), ttl::DETAIL);
        Ok(detail)
    }

    pub async fn episode(&self, endpoint: &str) -> Result<EpisodePage, ScrapeError> {
        let key = keys::episode(winbu::SOURCE, endpoint);
        if let Some(CachedPayload::Episode(page)) = self.cache.get(&key) {
            return Ok(page);
        }
        let url = absolute_url(winbu::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let page = {
            let doc = Html::parse_document(&body);
            winbu::parse_episode_page(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Episode(page.clone()), ttl::CHAPTER);
        Ok(page)
    }

    /// Resolve a player URL for one of an episode's stream options.
    ///
    /// Intentionally uncached: upstream player URLs rotate quickly and a
    /// stale one fails in the player, not here.
    pub async fn resolve_stream(&self, target: &StreamTarget) -> Result<String, ScrapeError> {
        stream::resolve(&self.client, winbu::BASE_URL, target).await
    }
}

/// Komiku manga operations.
pub struct KomikuService {
    client: FetchClient,
    cache: SharedCache,
}

impl KomikuService {
    pub fn new(cache: SharedCache, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: FetchClient::new("Komiku", http)?,
            cache,
        })
    }

    async fn fetch_body(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).await?;
        decoder::read_body(response).await
    }

    pub async fn home(&self) -> Result<komiku::HomeData, ScrapeError> {
        let key = keys::home(komiku::SOURCE);
        if let Some(CachedPayload::KomikuHome(home)) = self.cache.get(&key) {
            return Ok(home);
        }
        let body = self.fetch_body(komiku::BASE_URL).await?;
        let home = {
            let doc = Html::parse_document(&body);
            komiku::parse_home(&doc)
        };
        self.cache
            .set(&key, CachedPayload::KomikuHome(home.clone()), ttl::HOME);
        Ok(home)
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<ContentItem>, ScrapeError> {
        let key = keys::search(komiku::SOURCE, keyword);
        if let Some(CachedPayload::Items(items)) = self.cache.get(&key) {
            return Ok(items);
        }
        let url = format!("{}/?post_type=manga&s={}", komiku::BASE_URL, keyword);
        let body = self.fetch_body(&url).await?;
        let items = {
            let doc = Html::parse_document(&body);
            komiku::parse_list(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Items(items.clone()), ttl::SEARCH);
        Ok(items)
    }

    /// Fetch any listing endpoint (browse pages, genre pages).
    pub async fn list(&self, endpoint: &str) -> Result<Vec<ContentItem>, ScrapeError> {
        let key = keys::listing(komiku::SOURCE, endpoint);
        if let Some(CachedPayload::Items(items)) = self.cache.get(&key) {
            return Ok(items);
        }
        let url = absolute_url(komiku::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let items = {
            let doc = Html::parse_document(&body);
            komiku::parse_list(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Items(items.clone()), ttl::SEARCH);
        Ok(items)
    }

    pub async fn detail(&self, endpoint: &str) -> Result<DetailRecord, ScrapeError> {
        let key = keys::detail(komiku::SOURCE, endpoint);
        if let Some(CachedPayload::Detail(detail)) = self.cache.get(&key) {
            return Ok(detail);
        }
        let url = absolute_url(komiku::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let detail = {
            let doc = Html::parse_document(&body);
            komiku::parse_detail(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Detail(detail.clone()), ttl::DETAIL);
        Ok(detail)
    }

    pub async fn chapter_images(&self, endpoint: &str) -> Result<Vec<String>, ScrapeError> {
        let key = keys::chapter(komiku::SOURCE, endpoint);
        if let Some(CachedPayload::Images(images)) = self.cache.get(&key) {
            return Ok(images);
        }
        let url = absolute_url(komiku::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let images = komiku::parse_chapter_images(&body);
        self.cache
            .set(&key, CachedPayload::Images(images.clone()), ttl::CHAPTER);
        Ok(images)
    }

    pub async fn recommendations(&self, endpoint: &str) -> Result<Vec<ContentItem>, ScrapeError> {
        let key = keys::listing(komiku::SOURCE, &format!("rec:{}", endpoint));
        if let Some(CachedPayload::Items(items)) = self.cache.get(&key) {
            return Ok(items);
        }
        let url = absolute_url(komiku::BASE_URL, endpoint);
        let body = self.fetch_body(&url).await?;
        let items = {
            let doc = Html::parse_document(&body);
            komiku::parse_recommendations(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Items(items.clone()), ttl::SEARCH);
        Ok(items)
    }

    pub async fn genre_list(&self) -> Result<Vec<GenreLink>, ScrapeError> {
        let key = keys::listing(komiku::SOURCE, "genres");
        if let Some(CachedPayload::Genres(genres)) = self.cache.get(&key) {
            return Ok(genres);
        }
        let url = format!("{}/daftar-komik/", komiku::BASE_URL);
        let body = self.fetch_body(&url).await?;
        let genres = {
            let doc = Html::parse_document(&body);
            komiku::parse_genres(&doc)
        };
        self.cache
            .set(&key, CachedPayload::Genres(genres.clone()), ttl::HOME);
        Ok(genres)
    }
}
