//! Media (variant) playlist scanner

use crate::types::Segment;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `#EXT-X-PLAYLIST-TYPE` values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistType {
    Vod,
    Event,
    Other(String),
}

impl PlaylistType {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "VOD" => PlaylistType::Vod,
            "EVENT" => PlaylistType::Event,
            _ => PlaylistType::Other(value.trim().to_string()),
        }
    }
}

/// Parsed media playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPlaylist {
    pub version: Option<u32>,
    pub target_duration: Option<f64>,
    pub media_sequence: Option<u64>,
    pub playlist_type: Option<PlaylistType>,
    /// `#EXT-X-ENDLIST` was present
    pub end_list: bool,
    pub segments: Vec<Segment>,
}

impl MediaPlaylist {
    /// Sum of all segment durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }

    /// Segment covering the given playback time
    pub fn segment_at(&self, time: f64) -> Option<&Segment> {
        if time < 0.0 {
            return None;
        }
        let mut start = 0.0;
        for segment in &self.segments {
            let end = start + segment.duration_seconds;
            if time < end {
                return Some(segment);
            }
            start = end;
        }
        None
    }

    /// Explicit VOD type, or a closed playlist without a type tag
    pub fn is_vod(&self) -> bool {
        match &self.playlist_type {
            Some(PlaylistType::Vod) => true,
            Some(_) => false,
            None => self.end_list,
        }
    }
}

pub(super) fn parse(text: &str) -> MediaPlaylist {
    let mut playlist = MediaPlaylist::default();
    // Duration of the last #EXTINF, held until a URI line consumes it
    let mut pending_duration: Option<f64> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            let value = rest.split(',').next().unwrap_or_default().trim();
            let duration = value
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(0.0);
            pending_duration = Some(duration);
        } else if let Some(rest) = line.strip_prefix("#EXT-X-VERSION:") {
            playlist.version = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            playlist.target_duration = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            playlist.media_sequence = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
            playlist.playlist_type = Some(PlaylistType::parse(rest));
        } else if line.starts_with("#EXT-X-ENDLIST") {
            playlist.end_list = true;
        } else if line.starts_with('#') {
            // Other tags and comments leave the pending duration untouched
        } else if let Some(duration) = pending_duration.take() {
            let index = playlist.segments.len();
            playlist.segments.push(Segment {
                uri_ref: line.to_string(),
                duration_seconds: duration,
                index,
            });
        } else {
            debug!(uri = line, "Segment reference without #EXTINF ignored");
        }
    }

    debug!(
        segments = playlist.segments.len(),
        duration = playlist.total_duration(),
        "Media playlist parsed"
    );

    playlist
}
