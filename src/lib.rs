// Library interface for aniku_scraper
// Exposes the scrape, cache, and download components to tests and binaries

pub mod cache;
pub mod config;
pub mod decoder;
pub mod downloader;
pub mod error;
pub mod extract;
pub mod helpers;
pub mod http_client;
pub mod models;
pub mod service;
pub mod sources;
pub mod stream;

pub use error::ScrapeError;
