//! Transparent response-body decompression.
//!
//! The fetch client advertises `gzip, deflate, br` itself instead of letting
//! the transport negotiate, so bodies arrive raw and are decoded here based on
//! the declared `Content-Encoding`. An unknown or absent encoding passes
//! through unchanged; a declared encoding whose payload cannot be decompressed
//! aborts the request with a decode error rather than silently handing raw
//! bytes to the parsers.

use crate::error::ScrapeError;
use reqwest::header::CONTENT_ENCODING;
use reqwest::Response;
use std::io::Read;

/// Read a response body to a string, applying the declared content encoding.
pub async fn read_body(response: Response) -> Result<String, ScrapeError> {
    let encoding = response
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    log::debug!("Content-Encoding: '{}'", encoding);

    let raw = response
        .bytes()
        .await
        .map_err(ScrapeError::from_reqwest)?;
    let decoded = decode(&encoding, &raw)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Decode a byte buffer according to its declared encoding.
pub fn decode(encoding: &str, raw: &[u8]) -> Result<Vec<u8>, ScrapeError> {
    match encoding {
        "gzip" => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| ScrapeError::Decode {
                    encoding: "gzip".to_string(),
                    source: e,
                })?;
            Ok(out)
        }
        "deflate" => {
            let mut out = Vec::new();
            flate2::read::ZlibDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| ScrapeError::Decode {
                    encoding: "deflate".to_string(),
                    source: e,
                })?;
            Ok(out)
        }
        "br" => {
            let mut out = Vec::new();
            brotli::Decompressor::new(raw, 4096)
                .read_to_end(&mut out)
                .map_err(|e| ScrapeError::Decode {
                    encoding: "br".to_string(),
                    source: e,
                })?;
            Ok(out)
        }
        // Absent or unrecognized encodings pass through untouched
        _ => Ok(raw.to_vec()),
    }
}
