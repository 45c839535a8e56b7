//! Output formatting for CLI

use reelstream_core::{SessionSnapshot, Variant};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON for whole-document output
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Single-line JSON for streamed output
pub fn to_json_line<T: Serialize>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_bandwidth(bps: u64) -> String {
    if bps >= 1_000_000 {
        format!("{:.1}Mbps", bps as f64 / 1_000_000.0)
    } else {
        format!("{}kbps", bps / 1_000)
    }
}

pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// One row of the variant listing
pub fn variant_row(index: usize, variant: &Variant) -> String {
    if variant.is_auto {
        return format!("  {}. {:<16} {}", index, variant.quality_label, variant.playlist_ref);
    }

    let resolution = variant
        .resolution
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "  {}. {:<16} {:>10} {:>10} {:>5.0}fps  score {:>6.1}  {}",
        index,
        variant.quality_label,
        format_bandwidth(variant.bandwidth_bps),
        resolution,
        variant.frame_rate,
        variant.mobile_score,
        variant.playlist_ref
    )
}

/// One line describing a session snapshot
pub fn snapshot_line(snapshot: &SessionSnapshot) -> String {
    let mut line = format!(
        "[{}] {:<9} {:<16} {} / {}  buffer {:>3.0}% ({:?})",
        snapshot.updated_at.format("%H:%M:%S"),
        snapshot.state.to_string(),
        snapshot.quality_label.as_deref().unwrap_or("-"),
        format_seconds(snapshot.position),
        format_seconds(snapshot.duration),
        snapshot.buffer_health_ratio,
        snapshot.buffer_health
    );

    if let Some(error) = &snapshot.error {
        line.push_str(&format!("  error: {} ({})", error.user_message, error.category));
        if snapshot.retry_scheduled {
            line.push_str(&format!(", retry {} scheduled", snapshot.retry_count));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_bandwidth(1_500_000), "1.5Mbps");
        assert_eq!(format_bandwidth(500_000), "500kbps");
        assert_eq!(format_seconds(125.7), "2:05");
    }
}
