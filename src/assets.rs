//! Image sources: data URLs, remote URLs and local files.
//!
//! [`ImageFetcher`] is the seam for remote downloads; `HttpFetcher` is the
//! reqwest-backed implementation (feature `native`). Decoded images are kept
//! in an [`ImageStore`] keyed by URL so rendering never touches the network.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use resvg::usvg::Options;

use crate::error::{MockupError, Result};
use crate::render::raster;

/// Longest side used when rasterizing vector logos.
const SVG_RASTER_SIZE: u32 = 1024;

// ============================================================================
// Fetching
// ============================================================================

/// Downloads raw bytes for http(s) URLs.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`ImageFetcher`] backed by a shared reqwest client.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "native")]
impl HttpFetcher {
    pub fn new(settings: &crate::config::NetworkSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[cfg(feature = "native")]
#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MockupError::ImageLoad(format!("failed to download {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(MockupError::ImageLoad(format!(
                "failed to download {url}: HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MockupError::ImageLoad(format!("failed to read {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Where an image URL points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLocation<'a> {
    Data(&'a str),
    Remote(&'a str),
    Local(&'a Path),
}

impl<'a> ImageLocation<'a> {
    pub fn classify(url: &'a str) -> Self {
        if url.starts_with("data:") {
            ImageLocation::Data(url)
        } else if url.starts_with("http://") || url.starts_with("https://") {
            ImageLocation::Remote(url)
        } else {
            ImageLocation::Local(Path::new(url.strip_prefix("file://").unwrap_or(url)))
        }
    }
}

/// Loads the raw bytes behind an image URL.
pub async fn load_bytes(url: &str, fetcher: &dyn ImageFetcher) -> Result<Vec<u8>> {
    match ImageLocation::classify(url) {
        ImageLocation::Data(data) => decode_data_url(data),
        ImageLocation::Remote(remote) => fetcher.fetch(remote).await,
        #[cfg(feature = "native")]
        ImageLocation::Local(path) => tokio::fs::read(path)
            .await
            .map_err(|e| MockupError::ImageLoad(format!("failed to read {}: {e}", path.display()))),
        #[cfg(not(feature = "native"))]
        ImageLocation::Local(path) => Err(MockupError::ImageLoad(format!(
            "cannot read {} without filesystem access",
            path.display()
        ))),
    }
}

/// Decodes the payload of a `data:` URL.
///
/// Base64 payloads are decoded; plain payloads are percent-decoded.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MockupError::ImageLoad("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MockupError::ImageLoad("data URL has no payload".into()))?;

    if meta.ends_with(";base64") {
        BASE64
            .decode(payload.trim())
            .map_err(|e| MockupError::ImageLoad(format!("invalid base64 in data URL: {e}")))
    } else {
        Ok(percent_decode(payload))
    }
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3])
            && let Ok(value) = u8::from_str_radix(hex, 16)
        {
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Encodes bytes as a base64 data URL, sniffing the MIME type.
pub fn to_data_url(bytes: &[u8]) -> String {
    let mime = if looks_like_svg(bytes) {
        "image/svg+xml"
    } else {
        image::guess_format(bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    };
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg"))
}

/// Decodes raster or SVG bytes into an RGBA bitmap.
pub fn decode_image(bytes: &[u8], svg_opts: &Options) -> Result<RgbaImage> {
    if looks_like_svg(bytes) {
        let svg = std::str::from_utf8(bytes)
            .map_err(|e| MockupError::ImageLoad(format!("SVG is not UTF-8: {e}")))?;
        return raster::render_svg_fit(svg, SVG_RASTER_SIZE, svg_opts);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

// ============================================================================
// ImageStore
// ============================================================================

/// Decoded images keyed by URL, plus URLs that failed to load.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, Arc<RgbaImage>>,
    failed: HashSet<String>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<RgbaImage>> {
        self.images.get(url).cloned()
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, image: RgbaImage) -> Arc<RgbaImage> {
        let url = url.into();
        let image = Arc::new(image);
        self.failed.remove(&url);
        self.images.insert(url, Arc::clone(&image));
        image
    }

    pub fn mark_failed(&mut self, url: impl Into<String>) {
        self.failed.insert(url.into());
    }

    /// Forgets a URL, allowing it to be retried.
    pub fn evict(&mut self, url: &str) {
        self.images.remove(url);
        self.failed.remove(url);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    struct NoNetwork;

    #[async_trait]
    impl ImageFetcher for NoNetwork {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(MockupError::ImageLoad(format!("{url}: HTTP 404 Not Found")))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 3, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn classifies_urls() {
        assert!(matches!(ImageLocation::classify("data:image/png;base64,AA=="), ImageLocation::Data(_)));
        assert!(matches!(ImageLocation::classify("https://cdn/x.png"), ImageLocation::Remote(_)));
        assert_eq!(
            ImageLocation::classify("file:///tmp/logo.png"),
            ImageLocation::Local(Path::new("/tmp/logo.png"))
        );
    }

    #[test]
    fn data_url_roundtrip_decodes_png() {
        let url = to_data_url(&png_bytes());
        assert!(url.starts_with("data:image/png;base64,"));

        let bytes = decode_data_url(&url).unwrap();
        let opts = Options::default();
        let img = decode_image(&bytes, &opts).unwrap();
        assert_eq!(img.dimensions(), (2, 3));
    }

    #[test]
    fn plain_data_url_is_percent_decoded() {
        let url = "data:image/svg+xml,%3Csvg%20xmlns='http://www.w3.org/2000/svg'%20width='4'%20height='2'/%3E";
        let bytes = decode_data_url(url).unwrap();
        assert!(bytes.starts_with(b"<svg xmlns="));
    }

    #[test]
    fn svg_logos_are_rasterized() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="8"><rect width="16" height="8" fill="#000"/></svg>"##;
        let img = decode_image(svg, &Options::default()).unwrap();
        assert_eq!(img.dimensions(), (1024, 512));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode_image(b"definitely not an image", &Options::default()),
            Err(MockupError::ImageLoad(_))
        ));
    }

    #[tokio::test]
    async fn remote_failure_propagates() {
        let err = load_bytes("https://cdn.example/missing.png", &NoNetwork)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn data_urls_skip_the_fetcher() {
        let url = to_data_url(&png_bytes());
        let bytes = load_bytes(&url, &NoNetwork).await.unwrap();
        assert_eq!(bytes, png_bytes());
    }

    #[cfg(not(feature = "native"))]
    #[tokio::test]
    async fn local_files_fail_without_filesystem() {
        let err = load_bytes("/tmp/logo.png", &NoNetwork).await.unwrap_err();
        assert!(matches!(err, MockupError::ImageLoad(msg) if msg.contains("without filesystem access")));
    }

    #[test]
    fn store_tracks_failures() {
        let mut store = ImageStore::new();
        store.mark_failed("a.png");
        assert!(store.has_failed("a.png"));

        store.insert("a.png", RgbaImage::new(1, 1));
        assert!(!store.has_failed("a.png"));
        assert!(store.get("a.png").is_some());

        store.evict("a.png");
        assert!(store.is_empty());
    }
}
