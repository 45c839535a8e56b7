//! HLS playlist parsing
//!
//! Implements tolerant line scanners for:
//! - Master playlists (`#EXT-X-STREAM-INF` variants)
//! - Media playlists (`#EXTINF` segments and header tags)
//!
//! Neither scanner rejects odd input. A master playlist with no variants
//! yields an empty list and a media playlist with no tags yields zero
//! segments; only non-textual input is reported as an error.

mod attributes;
mod master;
mod media;

pub use attributes::AttributeList;
pub use media::{MediaPlaylist, PlaylistType};

use crate::{error::Error, types::Variant, Result};
use url::Url;

pub(crate) const EXTM3U: &str = "#EXTM3U";
pub(crate) const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";

/// Playlist kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Master,
    Media,
    Unknown,
}

/// Detect playlist kind from content
pub fn detect_playlist_kind(text: &str) -> PlaylistKind {
    if text.contains(STREAM_INF_TAG) {
        PlaylistKind::Master
    } else if text.contains(EXTM3U) || text.contains("#EXTINF") {
        PlaylistKind::Media
    } else {
        PlaylistKind::Unknown
    }
}

/// Parser for master and media playlists
#[derive(Debug, Clone, Default)]
pub struct PlaylistParser {
    /// Prefix for relative variant references
    base_path: Option<String>,
    /// Locator of the master playlist, used by the Auto entry
    master_ref: Option<String>,
}

impl PlaylistParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative variant references against `base`
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Point the Auto entry at the given master playlist locator
    pub fn with_master_ref(mut self, master: impl Into<String>) -> Self {
        self.master_ref = Some(master.into());
        self
    }

    pub fn master_ref(&self) -> &str {
        self.master_ref.as_deref().unwrap_or_default()
    }

    /// Parse a master playlist into variants, Auto first then by mobile score
    pub fn parse_master(&self, text: &str) -> Vec<Variant> {
        master::parse(text, self)
    }

    /// Parse a master playlist from raw bytes
    pub fn parse_master_bytes(&self, bytes: &[u8]) -> Result<Vec<Variant>> {
        Ok(self.parse_master(as_text(bytes)?))
    }

    /// Parse a media playlist into segments and header metadata
    pub fn parse_variant(&self, text: &str) -> MediaPlaylist {
        media::parse(text)
    }

    /// Parse a media playlist from raw bytes
    pub fn parse_variant_bytes(&self, bytes: &[u8]) -> Result<MediaPlaylist> {
        Ok(self.parse_variant(as_text(bytes)?))
    }

    /// Absolute references pass through; relative ones join the base path
    pub fn resolve(&self, reference: &str) -> String {
        if is_absolute(reference) {
            return reference.to_string();
        }
        let Some(base) = self.base_path.as_deref() else {
            return reference.to_string();
        };

        if reference.starts_with('/') {
            if let Ok(joined) = Url::parse(base).and_then(|b| b.join(reference)) {
                return joined.to_string();
            }
        }

        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            reference.trim_start_matches("./")
        )
    }
}

/// True when the reference carries its own scheme and location
pub fn is_absolute(reference: &str) -> bool {
    match Url::parse(reference) {
        Ok(url) => url.has_host() || url.scheme() == "file",
        Err(_) => false,
    }
}

fn as_text(bytes: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("playlist is not text: {}", e)))?;
    if text.contains('\0') {
        return Err(Error::Parse("playlist contains binary data".to_string()));
    }
    Ok(text.trim_start_matches('\u{feff}'))
}
