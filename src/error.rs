use thiserror::Error;

/// Error taxonomy for the scraper core.
///
/// Fetch and parse failures surface unchanged to the calling layer; batch
/// operations never raise these per-item, they aggregate and report a summary.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("failed to decode '{encoding}' response body: {source}")]
    Decode {
        encoding: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("no player url found in response after trying all strategies")]
    StreamNotFound,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Classify a reqwest transport error into the taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout(err)
        } else {
            ScrapeError::Network(err)
        }
    }

    /// Stable machine-readable code for the serving layer. API responses carry
    /// this code plus the display message, never internal error text.
    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::Network(_) => "NETWORK_ERROR",
            ScrapeError::Timeout(_) => "TIMEOUT",
            ScrapeError::BadStatus { .. } => "BAD_STATUS",
            ScrapeError::Decode { .. } => "DECODE_ERROR",
            ScrapeError::Parse(_) => "PARSE_ERROR",
            ScrapeError::StreamNotFound => "STREAM_NOT_FOUND",
            ScrapeError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_codes() {
        let err = ScrapeError::BadStatus {
            status: 503,
            url: "https://example.com".to_string(),
        };
        assert_eq!(err.code(), "BAD_STATUS");
        assert!(err.to_string().contains("503"));

        assert_eq!(ScrapeError::StreamNotFound.code(), "STREAM_NOT_FOUND");
        assert_eq!(
            ScrapeError::Parse("bad fragment".to_string()).code(),
            "PARSE_ERROR"
        );
    }
}
