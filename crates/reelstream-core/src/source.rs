//! Playlist transport
//!
//! Endpoints, relative to the configured API base:
//! - `GET /stream/{platform}/{videoId}` returns the master playlist
//! - `GET /playlist/{platform}/{videoId}/{playlistRef}` returns a variant playlist
//! - `GET /segment/{platform}/{videoId}/{segmentRef}` returns a `.ts` payload

use crate::{error::Error, playlist::is_absolute, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Content types accepted for playlist responses
const PLAYLIST_CONTENT_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
    "text/",
];

/// Source of playlist text for a video
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Locator of the master playlist, also used by the Auto entry
    fn master_url(&self, video_id: &str) -> Result<String>;

    /// Prefix that relative variant references resolve against
    fn variant_base(&self, video_id: &str) -> Result<String>;

    /// Fetch master playlist text
    async fn fetch_master(&self, video_id: &str) -> Result<String>;

    /// Fetch a variant playlist by its (possibly resolved) reference
    async fn fetch_variant(&self, video_id: &str, playlist_ref: &str) -> Result<String>;
}

/// Playlist source backed by the streaming REST API
#[derive(Debug, Clone)]
pub struct HttpPlaylistSource {
    client: Client,
    base: Url,
    platform: String,
}

impl HttpPlaylistSource {
    pub fn new(base: Url, platform: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base, platform))
    }

    pub fn with_client(client: Client, base: Url, platform: impl Into<String>) -> Self {
        Self {
            client,
            base,
            platform: platform.into(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Build `<base>/<kind>/<platform>/<videoId>/<rest...>` with escaped segments
    fn endpoint(&self, kind: &str, video_id: &str, rest: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::InvalidConfig(format!("base URL '{}' cannot carry a path", self.base))
            })?;
            segments
                .pop_if_empty()
                .extend([kind, self.platform.as_str(), video_id]);
            if let Some(rest) = rest {
                segments.extend(rest.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }

    /// URL of a segment payload
    pub fn segment_url(&self, video_id: &str, segment_ref: &str) -> Result<Url> {
        if is_absolute(segment_ref) {
            return Ok(Url::parse(segment_ref)?);
        }
        self.endpoint("segment", video_id, Some(segment_ref))
    }

    /// Fetch a segment payload
    #[instrument(skip(self))]
    pub async fn fetch_segment(&self, video_id: &str, segment_ref: &str) -> Result<Bytes> {
        let url = self.segment_url(video_id, segment_ref)?;
        let response = self.send(&url).await?;
        Ok(response.bytes().await?)
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "Fetching playlist");
        let response = self.send(url).await?;

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_playlist_content_type(content_type) {
                return Err(Error::UnsupportedContentType(content_type.to_string()));
            }
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PlaylistSource for HttpPlaylistSource {
    fn master_url(&self, video_id: &str) -> Result<String> {
        Ok(self.endpoint("stream", video_id, None)?.to_string())
    }

    fn variant_base(&self, video_id: &str) -> Result<String> {
        Ok(self.endpoint("playlist", video_id, None)?.to_string())
    }

    #[instrument(skip(self))]
    async fn fetch_master(&self, video_id: &str) -> Result<String> {
        let url = self.endpoint("stream", video_id, None)?;
        self.fetch_text(&url).await
    }

    #[instrument(skip(self))]
    async fn fetch_variant(&self, video_id: &str, playlist_ref: &str) -> Result<String> {
        let url = if is_absolute(playlist_ref) {
            Url::parse(playlist_ref)?
        } else {
            self.endpoint("playlist", video_id, Some(playlist_ref))?
        };
        self.fetch_text(&url).await
    }
}

/// True for HLS playlist MIME types and any `text/*`
pub fn is_playlist_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    PLAYLIST_CONTENT_TYPES
        .iter()
        .any(|accepted| essence.starts_with(accepted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpPlaylistSource {
        HttpPlaylistSource::with_client(
            Client::new(),
            Url::parse("https://api.example.com/v1/").unwrap(),
            "android",
        )
    }

    #[test]
    fn test_endpoint_urls() {
        let source = source();
        assert_eq!(
            source.master_url("42").unwrap(),
            "https://api.example.com/v1/stream/android/42"
        );
        assert_eq!(
            source.variant_base("42").unwrap(),
            "https://api.example.com/v1/playlist/android/42"
        );
        assert_eq!(
            source.segment_url("42", "720p/segment_3.ts").unwrap().as_str(),
            "https://api.example.com/v1/segment/android/42/720p/segment_3.ts"
        );
    }

    #[test]
    fn test_video_id_is_escaped() {
        assert_eq!(
            source().master_url("the movie").unwrap(),
            "https://api.example.com/v1/stream/android/the%20movie"
        );
    }

    #[test]
    fn test_absolute_segment_passes_through() {
        assert_eq!(
            source()
                .segment_url("42", "https://cdn.example.com/a.ts")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.ts"
        );
    }

    #[test]
    fn test_content_types() {
        assert!(is_playlist_content_type("application/vnd.apple.mpegurl"));
        assert!(is_playlist_content_type("application/x-mpegURL; charset=utf-8"));
        assert!(is_playlist_content_type("text/plain"));
        assert!(!is_playlist_content_type("application/json"));
        assert!(!is_playlist_content_type("video/mp2t"));
    }
}
