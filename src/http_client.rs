use crate::config::HttpConfig;
use crate::error::ScrapeError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::{Client, ClientBuilder, Method, Response, Url};
use std::time::Duration;

/// User-Agent presented on every request. The target sites serve the mobile
/// layout for this UA, which is what the selector schemas are written against.
pub const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; SM-S908B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.230 Mobile Safari/537.36";

/// HTTP client shared by all scrape and download paths.
///
/// Applies a fixed ordered set of browser-like headers, auto-fills the Referer
/// from the target host when the caller did not supply one, and enforces one
/// fixed per-request timeout. Performs no retries: retry policy belongs to the
/// callers that want it (the batch downloader).
pub struct FetchClient {
    client: Client,
    name: String,
}

impl FetchClient {
    /// Create a named client. The name only shows up in log lines.
    pub fn new(name: &str, cfg: &HttpConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"));
        headers.insert(
            "Accept-Language",
            HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            "Accept-Encoding",
            HeaderValue::from_static("gzip, deflate, br"),
        );
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert(
            "Upgrade-Insecure-Requests",
            HeaderValue::from_static("1"),
        );
        headers.insert("Cache-Control", HeaderValue::from_static("max-age=0"));

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            // Some target sites run with expired certificates
            .danger_accept_invalid_certs(true)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if cfg.proxy_enabled {
            match reqwest::Proxy::all(cfg.proxy_url.as_str()) {
                Ok(proxy) => {
                    log::info!("[{}] Using proxy: {}", name, cfg.proxy_url);
                    builder = builder.proxy(proxy);
                }
                Err(e) => {
                    log::warn!("[{}] Proxy setup failed, continuing direct: {}", name, e);
                }
            }
        }

        Ok(Self {
            client: builder.build()?,
            name: name.to_string(),
        })
    }

    /// GET a URL with the standard header set.
    pub async fn get(&self, url: &str) -> Result<Response, ScrapeError> {
        self.get_with_referer(url, None).await
    }

    /// GET a URL with an explicit Referer instead of the host-derived one.
    pub async fn get_with_referer(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<Response, ScrapeError> {
        let request = self.client.get(url);
        self.execute(Method::GET, url, self.with_referer(request, url, referer))
            .await
    }

    /// POST a form-encoded body, as used by the sources' internal AJAX actions.
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<Response, ScrapeError> {
        let request = self
            .client
            .post(url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .form(params);
        self.execute(Method::POST, url, self.with_referer(request, url, referer))
            .await
    }

    fn with_referer(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        referer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let value = match referer {
            Some(r) => Some(r.to_string()),
            // Make it look like navigation from the site's own homepage
            None => host_referer(url),
        };
        match value {
            Some(v) => request.header(REFERER, v),
            None => request,
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ScrapeError> {
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("[{}] {} {} failed: {}", self.name, method, url, e);
                return Err(ScrapeError::from_reqwest(e));
            }
        };

        let status = response.status();
        log::info!("[{}] {} {} -> {}", self.name, method, url, status);

        if !status.is_success() {
            return Err(ScrapeError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// Direct access to the underlying transport. Connections are pooled and
    /// safely reused across concurrent callers.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Build a homepage Referer for the target host: `https://host/`.
fn host_referer(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/", parsed.scheme(), host))
}
