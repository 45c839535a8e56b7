//! Playback error classification
//!
//! Maps raw failure messages from the engine or transport to a category, a
//! retry decision, and the only text that is ever shown to the viewer.
//! Matching is plain case-insensitive substring search so the same input
//! always yields the same result.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Format,
    NotFound,
    ServerError,
    Unknown,
}

impl ErrorCategory {
    /// Whether an automatic retry is worth attempting
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network | ErrorCategory::ServerError | ErrorCategory::Unknown
        )
    }

    /// Viewer-facing message for this category
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Network connection problem. Please check your connection and try again."
            }
            ErrorCategory::Format => "This video uses an unsupported format and cannot be played.",
            ErrorCategory::NotFound => "This video is not available.",
            ErrorCategory::ServerError => {
                "The video service is having trouble right now. Please try again later."
            }
            ErrorCategory::Unknown => "Something went wrong while playing this video.",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Format => write!(f, "format"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::ServerError => write!(f, "server_error"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of classifying a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub retryable: bool,
    pub user_message: String,
    /// Raw message, kept for logs only
    pub detail: String,
}

impl ClassifiedError {
    fn new(category: ErrorCategory, detail: &str) -> Self {
        Self {
            category,
            retryable: category.is_retryable(),
            user_message: category.user_message().to_string(),
            detail: detail.to_string(),
        }
    }
}

const FORMAT_MARKERS: &[&str] = &["format", "codec", "unsupported", "decoder", "mime"];
const NOT_FOUND_MARKERS: &[&str] = &["404", "not found", "no such"];
const NETWORK_MARKERS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection",
    "offline",
    "unreachable",
    "dns",
];

/// Substring-based error classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw error message or code
    ///
    /// Checks run in a fixed order: format, not found, 5xx, network, then
    /// the retryable fallback.
    pub fn classify(&self, message: &str) -> ClassifiedError {
        let lowered = message.to_lowercase();

        let category = if contains_any(&lowered, FORMAT_MARKERS) {
            ErrorCategory::Format
        } else if contains_any(&lowered, NOT_FOUND_MARKERS) {
            ErrorCategory::NotFound
        } else if has_server_status(&lowered) {
            ErrorCategory::ServerError
        } else if contains_any(&lowered, NETWORK_MARKERS) {
            ErrorCategory::Network
        } else {
            ErrorCategory::Unknown
        };

        debug!(%category, message, "Classified playback error");
        ClassifiedError::new(category, message)
    }

    /// Classify a crate error
    ///
    /// Transport, status and parse failures are classified from the error
    /// itself; only free-form messages go through substring matching, so a
    /// request URL never influences the category.
    pub fn classify_error(&self, error: &Error) -> ClassifiedError {
        let message = error.to_string();
        let category = match error {
            Error::HttpStatus { status, .. } => status_category(*status),
            Error::Network(e) => match e.status() {
                Some(status) => status_category(status.as_u16()),
                None => ErrorCategory::Network,
            },
            Error::PlaylistFetch(_) => ErrorCategory::Network,
            Error::Parse(_) | Error::NoVariants => ErrorCategory::Unknown,
            Error::UnsupportedContentType(_) => ErrorCategory::Format,
            _ => return self.classify(&message),
        };

        debug!(%category, message, "Classified playback error");
        ClassifiedError::new(category, &message)
    }
}

fn status_category(status: u16) -> ErrorCategory {
    match status {
        404 => ErrorCategory::NotFound,
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::Unknown,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// True if the text holds a standalone three digit number in 500..=599
fn has_server_status(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .any(|code| (500..600).contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_failure() {
        let classified = ErrorClassifier::new().classify("Network request failed");
        assert_eq!(classified.category, ErrorCategory::Network);
        assert!(classified.retryable);
    }

    #[test]
    fn test_timeout_is_network() {
        let classified = ErrorClassifier::new().classify("The request timed out");
        assert_eq!(classified.category, ErrorCategory::Network);
        assert!(classified.retryable);
    }

    #[test]
    fn test_codec_is_terminal() {
        let classified = ErrorClassifier::new().classify("MEDIA_ERR_SRC_NOT_SUPPORTED: codec hvc1");
        assert_eq!(classified.category, ErrorCategory::Format);
        assert!(!classified.retryable);
        assert!(classified.user_message.contains("unsupported format"));
    }

    #[test]
    fn test_not_found_is_terminal() {
        let classified = ErrorClassifier::new().classify("HTTP 404");
        assert_eq!(classified.category, ErrorCategory::NotFound);
        assert!(!classified.retryable);
    }

    #[test]
    fn test_server_error_is_retryable() {
        let classified = ErrorClassifier::new().classify("upstream returned 503");
        assert_eq!(classified.category, ErrorCategory::ServerError);
        assert!(classified.retryable);

        // Longer digit runs are not status codes
        let classified = ErrorClassifier::new().classify("segment 5031 missing bytes");
        assert_eq!(classified.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_unknown_is_retryable_with_generic_message() {
        let classified = ErrorClassifier::new().classify("something odd");
        assert_eq!(classified.category, ErrorCategory::Unknown);
        assert!(classified.retryable);
        assert_eq!(classified.user_message, ErrorCategory::Unknown.user_message());
        assert_ne!(classified.user_message, "something odd");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = ErrorClassifier::new();
        for message in ["Network request failed", "codec error", "HTTP 500", "???"] {
            assert_eq!(classifier.classify(message), classifier.classify(message));
        }
    }

    #[test]
    fn test_classify_crate_errors() {
        let classifier = ErrorClassifier::new();

        let missing = Error::HttpStatus {
            status: 404,
            url: "https://api.example.com/stream/android/9".into(),
        };
        assert_eq!(classifier.classify_error(&missing).category, ErrorCategory::NotFound);

        let down = Error::HttpStatus {
            status: 502,
            url: "https://api.example.com/stream/android/9".into(),
        };
        assert_eq!(classifier.classify_error(&down).category, ErrorCategory::ServerError);

        let content = Error::UnsupportedContentType("application/json".into());
        assert_eq!(classifier.classify_error(&content).category, ErrorCategory::Format);

        let fetch = Error::PlaylistFetch("connection reset by peer".into());
        assert_eq!(classifier.classify_error(&fetch).category, ErrorCategory::Network);
    }

    #[test]
    fn test_request_url_does_not_steer_category() {
        let classifier = ErrorClassifier::new();

        let fetch = Error::PlaylistFetch(
            "error sending request for url (https://api.example.com/stream/android/format-404)".into(),
        );
        let classified = classifier.classify_error(&fetch);
        assert_eq!(classified.category, ErrorCategory::Network);
        assert!(classified.retryable);

        let down = Error::HttpStatus {
            status: 503,
            url: "https://api.example.com/stream/android/unsupported-codec-404".into(),
        };
        assert_eq!(classifier.classify_error(&down).category, ErrorCategory::ServerError);

        let forbidden = Error::HttpStatus {
            status: 403,
            url: "https://api.example.com/stream/android/network-502".into(),
        };
        let classified = classifier.classify_error(&forbidden);
        assert_eq!(classified.category, ErrorCategory::Unknown);
        assert!(classified.retryable);
    }

    #[test]
    fn test_empty_or_garbage_playlist_is_retryable_unknown() {
        let classifier = ErrorClassifier::new();
        for error in [
            Error::NoVariants,
            Error::Parse("playlist contains binary data".into()),
        ] {
            let classified = classifier.classify_error(&error);
            assert_eq!(classified.category, ErrorCategory::Unknown);
            assert!(classified.retryable);
            assert_eq!(classified.user_message, ErrorCategory::Unknown.user_message());
        }
    }
}
