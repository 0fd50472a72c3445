use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use thiserror::Error;

/// An attachment re-encoded for embedding in a JSON envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 of the raw bytes.
    pub data: String,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("fetch failed with HTTP {status}: {reason}")]
    FetchFailure { status: u16, reason: String },
    #[error("fetch request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// Downloads a file by URL and returns it base64-encoded. No size cap is
/// enforced here; the backend rejects oversized payloads itself.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_and_encode(&self, url: &str) -> Result<EncodedImage, MediaError>;
}

#[derive(Default)]
pub struct HttpMediaFetcher {
    http: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch_and_encode(&self, url: &str) -> Result<EncodedImage, MediaError> {
        let response = self.http.get(url).send().await.map_err(MediaError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::FetchFailure {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_owned(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = response.bytes().await.map_err(MediaError::Request)?;

        Ok(EncodedImage { data: encode_bytes(&bytes), content_type })
    }
}

/// Always "fetches" a one-byte PNG. Keeps the scaffold runnable without a
/// CDN in reach.
#[derive(Default)]
pub struct NoopMediaFetcher;

#[async_trait]
impl MediaFetcher for NoopMediaFetcher {
    async fn fetch_and_encode(&self, _url: &str) -> Result<EncodedImage, MediaError> {
        Ok(EncodedImage { data: encode_bytes(&[0]), content_type: "image/png".to_owned() })
    }
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::{encode_bytes, MediaError, MediaFetcher, NoopMediaFetcher};

    #[test]
    fn encoding_matches_the_standard_alphabet() {
        assert_eq!(encode_bytes(b"governor screenshot"), "Z292ZXJub3Igc2NyZWVuc2hvdA==");
        assert_eq!(encode_bytes(b""), "");
    }

    #[test]
    fn fetch_failure_display_carries_status_and_reason() {
        let error = MediaError::FetchFailure { status: 404, reason: "Not Found".to_owned() };
        let rendered = error.to_string();

        assert!(rendered.contains("404"));
        assert!(rendered.contains("Not Found"));
    }

    #[tokio::test]
    async fn noop_fetcher_returns_an_image_payload() {
        let fetcher = NoopMediaFetcher;
        let image = fetcher
            .fetch_and_encode("https://cdn.example/shot.png")
            .await
            .expect("noop fetch");

        assert_eq!(image.content_type, "image/png");
        assert!(!image.data.is_empty());
    }
}
