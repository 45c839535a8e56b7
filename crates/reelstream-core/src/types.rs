//! Core types for Reelstream

use crate::classifier::ClassifiedError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label carried by the synthetic adaptive entry
pub const AUTO_LABEL: &str = "Auto (Adaptive)";

/// Frame rate assumed when a variant does not advertise one
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse a `WIDTHxHEIGHT` attribute value
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.trim().split_once(['x', 'X'])?;
        Some(Self {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    }

    /// Returns quality tier name
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A quality variant advertised by a master playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Resolved locator of the variant playlist (the master itself for Auto)
    pub playlist_ref: String,
    /// Advertised peak bitrate in bits per second
    pub bandwidth_bps: u64,
    pub resolution: Option<Resolution>,
    pub frame_rate: f64,
    /// Informational only
    pub codecs: Option<String>,
    /// Human label such as "720p" or "800kbps"
    pub quality_label: String,
    /// Lower ranks first; favours cheap renditions on mobile data
    pub mobile_score: f64,
    /// True for the synthetic adaptive entry
    pub is_auto: bool,
}

impl Variant {
    /// Build a concrete variant, deriving its label and score
    pub fn new(
        playlist_ref: impl Into<String>,
        bandwidth_bps: u64,
        resolution: Option<Resolution>,
        frame_rate: Option<f64>,
        codecs: Option<String>,
    ) -> Self {
        let frame_rate = frame_rate
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(DEFAULT_FRAME_RATE);
        let height = resolution.map(|r| r.height).unwrap_or(0);

        Self {
            playlist_ref: playlist_ref.into(),
            bandwidth_bps,
            resolution,
            frame_rate,
            codecs,
            quality_label: quality_label(resolution, bandwidth_bps),
            mobile_score: mobile_score(bandwidth_bps, height, frame_rate),
            is_auto: false,
        }
    }

    /// The adaptive pseudo-variant pointing at the master playlist
    pub fn auto(master_ref: impl Into<String>) -> Self {
        Self {
            playlist_ref: master_ref.into(),
            bandwidth_bps: 0,
            resolution: None,
            frame_rate: DEFAULT_FRAME_RATE,
            codecs: None,
            quality_label: AUTO_LABEL.to_string(),
            mobile_score: 0.0,
            is_auto: true,
        }
    }

    /// Variants are identified by their playlist reference
    pub fn same_stream(&self, other: &Variant) -> bool {
        self.playlist_ref == other.playlist_ref
    }
}

/// `bandwidth / 100000 + height penalty + frame rate penalty`
pub fn mobile_score(bandwidth_bps: u64, height: u32, frame_rate: f64) -> f64 {
    let height_penalty = if height > 720 {
        50.0
    } else if height > 480 {
        20.0
    } else if height > 360 {
        10.0
    } else {
        0.0
    };
    let frame_rate_penalty = if frame_rate > 30.0 { 15.0 } else { 0.0 };

    bandwidth_bps as f64 / 100_000.0 + height_penalty + frame_rate_penalty
}

/// Resolution tier when known, otherwise a rounded bitrate
pub fn quality_label(resolution: Option<Resolution>, bandwidth_bps: u64) -> String {
    match resolution {
        Some(r) if r.height > 0 => r.quality_name().to_string(),
        _ if bandwidth_bps >= 1_000_000 => {
            format!("{}Mbps", (bandwidth_bps as f64 / 1_000_000.0).round() as u64)
        }
        _ => format!("{}kbps", (bandwidth_bps as f64 / 1_000.0).round() as u64),
    }
}

/// A media segment from a variant playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment locator exactly as written in the playlist
    pub uri_ref: String,
    /// Duration from the preceding `#EXTINF`
    pub duration_seconds: f64,
    /// Zero-based position within the playlist
    pub index: usize,
}

/// Network class reported by the connectivity observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Wifi,
    #[serde(rename = "cellular_4g")]
    Cellular4G,
    #[serde(rename = "cellular_3g")]
    Cellular3G,
    #[default]
    Unknown,
}

impl std::str::FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wifi" | "wi-fi" | "ethernet" => Ok(NetworkType::Wifi),
            "4g" | "lte" | "cellular_4g" | "5g" => Ok(NetworkType::Cellular4G),
            "3g" | "cellular_3g" | "2g" => Ok(NetworkType::Cellular3G),
            "unknown" | "none" => Ok(NetworkType::Unknown),
            other => Err(format!("unknown network type '{}'", other)),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Wifi => write!(f, "wifi"),
            NetworkType::Cellular4G => write!(f, "cellular_4g"),
            NetworkType::Cellular3G => write!(f, "cellular_3g"),
            NetworkType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Device capabilities injected into the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub low_performance: bool,
}

impl DeviceProfile {
    pub fn standard() -> Self {
        Self { low_performance: false }
    }

    pub fn low_performance() -> Self {
        Self { low_performance: true }
    }
}

/// Playback state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Before `initialize`
    Idle,
    /// Playlist fetch in progress, or a quality switch awaiting the new stream
    Loading,
    /// Stream URL handed to the engine, playback not started
    Ready,
    Playing,
    Paused,
    /// Waiting on data after a seek or stall
    Buffering,
    Ended,
    Error,
}

impl PlaybackState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, target),
            // From Idle
            (Idle, Loading) |
            // From Loading
            (Loading, Ready) | (Loading, Playing) | (Loading, Paused) | (Loading, Error) |
            // From Ready
            (Ready, Playing) | (Ready, Paused) | (Ready, Loading) | (Ready, Buffering) | (Ready, Error) |
            // From Playing
            (Playing, Paused) | (Playing, Buffering) | (Playing, Loading) | (Playing, Ended) | (Playing, Error) |
            // From Paused
            (Paused, Playing) | (Paused, Buffering) | (Paused, Loading) | (Paused, Error) |
            // From Buffering
            (Buffering, Playing) | (Buffering, Paused) | (Buffering, Ready) | (Buffering, Loading) | (Buffering, Error) |
            // From Ended
            (Ended, Buffering) | (Ended, Loading) | (Ended, Error) |
            // From Error
            (Error, Loading)
        )
    }

    /// States in which the engine holds a loaded stream
    pub fn has_stream(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Buffering
                | PlaybackState::Ended
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Runtime state of one playback, mutated only by the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSession {
    pub video_id: String,
    pub current_variant: Option<Variant>,
    pub current_position_seconds: f64,
    pub duration_seconds: f64,
    pub playback_state: PlaybackState,
    /// 0 to 100
    pub buffer_health_ratio: f64,
    pub last_error: Option<ClassifiedError>,
    pub retry_count: u32,
}

impl StreamSession {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            current_variant: None,
            current_position_seconds: 0.0,
            duration_seconds: 0.0,
            playback_state: PlaybackState::Idle,
            buffer_health_ratio: 0.0,
            last_error: None,
            retry_count: 0,
        }
    }

    /// Stream URL currently handed to the engine
    pub fn stream_url(&self) -> Option<&str> {
        self.current_variant.as_ref().map(|v| v.playlist_ref.as_str())
    }
}
