//! Error types for Reelstream Core

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client error types
#[derive(Error, Debug)]
pub enum Error {
    // Playlist errors
    #[error("Network request failed: {0}")]
    PlaylistFetch(String),

    #[error("Server responded with status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unsupported playlist format: content type '{0}'")]
    UnsupportedContentType(String),

    #[error("Failed to parse playlist: {0}")]
    Parse(String),

    #[error("Playlist contained no playable variants")]
    NoVariants,

    // Engine errors
    #[error("Playback engine unavailable")]
    EngineUnavailable,

    #[error("Playback engine error: {0}")]
    Engine(String),

    // Session errors
    #[error("Invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Stream session has been disposed")]
    Disposed,

    #[error("Stream session has not been initialized")]
    NotInitialized,

    #[error("Unknown quality label: {0}")]
    UnknownQuality(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Transport errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if retrying the same request could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::PlaylistFetch(_) | Error::Parse(_) | Error::NoVariants => true,
            Error::Network(e) => !e.status().is_some_and(|s| s.is_client_error()),
            Error::HttpStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Returns the error code reported alongside log lines and snapshots
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlaylistFetch(_) => "PLAYLIST_FETCH",
            Error::HttpStatus { .. } => "HTTP_STATUS",
            Error::UnsupportedContentType(_) => "CONTENT_TYPE",
            Error::Parse(_) => "PLAYLIST_PARSE",
            Error::NoVariants => "NO_VARIANTS",
            Error::EngineUnavailable => "ENGINE_UNAVAILABLE",
            Error::Engine(_) => "ENGINE",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::Disposed => "DISPOSED",
            Error::NotInitialized => "NOT_INITIALIZED",
            Error::UnknownQuality(_) => "UNKNOWN_QUALITY",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Url(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_statuses() {
        let server = Error::HttpStatus {
            status: 503,
            url: "https://api.example.com/stream/android/42".to_string(),
        };
        let missing = Error::HttpStatus {
            status: 404,
            url: "https://api.example.com/stream/android/42".to_string(),
        };

        assert!(server.is_recoverable());
        assert!(!missing.is_recoverable());
        assert!(Error::PlaylistFetch("connection reset".into()).is_recoverable());
        assert!(Error::NoVariants.is_recoverable());
        assert!(!Error::UnsupportedContentType("application/json".into()).is_recoverable());
    }

    #[test]
    fn test_status_code_in_message() {
        let err = Error::HttpStatus {
            status: 404,
            url: "https://api.example.com/stream/ios/7".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert_eq!(err.error_code(), "HTTP_STATUS");
    }
}
