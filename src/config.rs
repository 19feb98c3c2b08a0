use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Route all requests through a SOCKS5 proxy
    #[serde(default)]
    pub proxy_enabled: bool,

    /// Proxy URL, e.g. "socks5://127.0.0.1:9050"
    #[serde(default)]
    pub proxy_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloaderConfig {
    /// Maximum simultaneously in-flight downloads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per item before recording it as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Interval for the background expired-entry sweep in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_download_dir() -> String {
    "Downloads".to_string()
}
fn default_timeout() -> u64 {
    60
}
fn default_concurrency() -> usize {
    5
}
fn default_max_attempts() -> usize {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_sweep_interval() -> u64 {
    300
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            proxy_enabled: false,
            proxy_url: String::new(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            http: HttpConfig::default(),
            downloader: DownloaderConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `config.toml` in the working directory,
    /// falling back to defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(cfg) = toml::from_str::<Config>(&content) {
                    return cfg;
                }
            }
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.download_dir, "Downloads");
        assert_eq!(cfg.http.timeout_secs, 60);
        assert!(!cfg.http.proxy_enabled);
        assert_eq!(cfg.downloader.concurrency, 5);
        assert_eq!(cfg.downloader.max_attempts, 3);
        assert_eq!(cfg.cache.sweep_interval_secs, 300);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            download_dir = "media"

            [http]
            timeout_secs = 10
            proxy_enabled = true
            proxy_url = "socks5://127.0.0.1:9050"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.download_dir, "media");
        assert_eq!(cfg.http.timeout_secs, 10);
        assert!(cfg.http.proxy_enabled);
        assert_eq!(cfg.http.proxy_url, "socks5://127.0.0.1:9050");
        // Sections absent from the file keep their defaults
        assert_eq!(cfg.downloader.concurrency, 5);
        assert_eq!(cfg.downloader.retry_delay_ms, 1000);
    }
}
