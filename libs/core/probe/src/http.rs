// [libs/core/probe/src/http.rs]
//! HTTP stage: a GET with redirects disabled at the client level so the
//! engine can walk the redirect chain manually.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::StatusCode;

use crate::errors::ProbeError;

pub const USER_AGENT_STRING: &str = "WebsiteMonitor";
pub const ACCEPT_STRING: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const ACCEPT_ENCODING_STRING: &str = "gzip, deflate, br";
pub const MAX_REDIRECTS: u32 = 12;
pub const MAX_BODY_SAMPLE_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawResponse, ProbeError>;
}

pub struct ReqwestProbeClient {
    client: reqwest::Client,
}

impl ReqwestProbeClient {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT_STRING)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|error| ProbeError::HttpTransportFailure(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProbeClient for ReqwestProbeClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawResponse, ProbeError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_STRING)
            .header(ACCEPT_ENCODING, ACCEPT_ENCODING_STRING)
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ProbeError::Timeout(timeout.as_secs())
                } else {
                    ProbeError::HttpTransportFailure(error.to_string())
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|error| ProbeError::HttpTransportFailure(error.to_string()))?
            .to_vec();

        Ok(RawResponse { status, headers, body })
    }
}

/// `true` if the response deserves a body sample: absent media type, or
/// HTML/text/XML/JSON-ish.
pub fn should_sample_body(headers: &HeaderMap) -> bool {
    match headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) {
        None => true,
        Some(content_type) => {
            let lower = content_type.to_lowercase();
            lower.contains("html") || lower.contains("text") || lower.contains("xml") || lower.contains("json")
        }
    }
}

/// Decompresses a body sample according to `Content-Encoding`, falling
/// back to the raw bytes if decompression fails.
pub fn decode_body_sample(headers: &HeaderMap, raw: &[u8]) -> String {
    let truncated = &raw[..raw.len().min(MAX_BODY_SAMPLE_BYTES)];
    let encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    // reqwest is built with the `brotli` feature, so it already decodes
    // `Content-Encoding: br` bodies transparently and strips the header
    // before we ever see the response; "br" should not reach this match.
    let decompressed = match encoding.as_str() {
        "gzip" => decode_gzip(truncated),
        "deflate" => decode_deflate(truncated),
        _ => None,
    };

    let bytes = decompressed.unwrap_or_else(|| truncated.to_vec());
    String::from_utf8_lossy(&bytes).to_string()
}

fn decode_gzip(bytes: &[u8]) -> Option<Vec<u8>> {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

fn decode_deflate(bytes: &[u8]) -> Option<Vec<u8>> {
    use std::io::Read;
    let mut decoder = flate2::read::DeflateDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

/// Flattens headers into the `"Key: v1, v2\n"` block the heuristics
/// classifier expects.
pub fn header_blob(headers: &HeaderMap) -> String {
    let mut by_key: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for (name, value) in headers.iter() {
        let value_str = value.to_str().unwrap_or("").to_string();
        by_key.entry(name.as_str().to_string()).or_default().push(value_str);
    }
    by_key
        .into_iter()
        .map(|(key, values)| format!("{key}: {}\n", values.join(", ")))
        .collect()
}

pub fn location_header(headers: &HeaderMap) -> Option<String> {
    headers.get(LOCATION).and_then(|value| value.to_str().ok()).map(str::to_string)
}

pub fn is_redirect_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn absent_content_type_is_sampled() {
        let headers = HeaderMap::new();
        assert!(should_sample_body(&headers));
    }

    #[test]
    fn json_content_type_is_sampled_binary_is_not() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(should_sample_body(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert!(!should_sample_body(&headers));
    }

    #[test]
    fn redirect_statuses_recognized() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect_status(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!is_redirect_status(StatusCode::OK));
    }
}
