//! Reelstream Core - Adaptive HLS client library
//!
//! This crate provides the core functionality for mobile HLS playback:
//! - Master and media playlist parsing
//! - Network- and device-aware quality selection
//! - Buffer health estimation
//! - Error classification with bounded automatic retry
//! - A session controller driving an external playback engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Reelstream Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playlist   │  │   Quality    │  │    Buffer    │           │
//! │  │    Parser    │  │   Selector   │  │  Estimator   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Stream    │                              │
//! │                    │  Session    │                              │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │   Playlist   │  │  Playback   │  │    Error     │            │
//! │  │    Source    │  │   Engine    │  │  Classifier  │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod playlist;
pub mod selector;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod source;
pub mod timers;
pub mod session;

pub use error::{Error, Result};
pub use types::*;
pub use playlist::{MediaPlaylist, PlaylistParser, PlaylistType};
pub use selector::{MobileDataPolicy, QualitySelector, SelectionContext, SelectionPolicy};
pub use buffer::{BufferConfig, BufferEstimator, BufferHealth};
pub use classifier::{ClassifiedError, ErrorCategory, ErrorClassifier};
pub use config::{Backoff, PlayerConfig, RetryPolicy};
pub use engine::{EngineError, EngineEvent, PlaybackEngine};
pub use source::{HttpPlaylistSource, PlaylistSource};
pub use session::{ControllerEvent, SessionSnapshot, StreamSessionController, SwitchOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Reelstream Core initialized");
}
