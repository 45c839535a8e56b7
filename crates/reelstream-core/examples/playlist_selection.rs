//! Playlist parsing and quality selection example
//!
//! Demonstrates how a master playlist is ranked and which variant each
//! network and device combination would start on.
//!
//! Run with: cargo run -p reelstream-core --example playlist_selection

use reelstream_core::{
    DeviceProfile, ErrorClassifier, NetworkType, PlaylistParser, QualitySelector,
    SelectionContext,
};

const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,FRAME-RATE=60.000,CODECS="avc1.640028,mp4a.40.2"
1080p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1500000,RESOLUTION=1280x720,CODECS="avc1.64001f,mp4a.40.2"
720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=854x480,CODECS="avc1.4d401e,mp4a.40.2"
480p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=500000,RESOLUTION=640x360,CODECS="avc1.4d401e,mp4a.40.2"
360p.m3u8
"#;

fn main() {
    println!("Reelstream Core - Playlist Selection Example");
    println!("============================================\n");

    let parser = PlaylistParser::new()
        .with_base_path("https://api.example.com/playlist/android/42")
        .with_master_ref("https://api.example.com/stream/android/42");
    let variants = parser.parse_master(MASTER);

    println!("Ranked variants:");
    println!("----------------");
    for variant in &variants {
        println!(
            "  {:<16} {:>8} bps  score {:>5.1}  {}",
            variant.quality_label, variant.bandwidth_bps, variant.mobile_score, variant.playlist_ref
        );
    }
    println!();

    let selector = QualitySelector::new();
    let cases = [
        ("Wi-Fi", NetworkType::Wifi, DeviceProfile::standard()),
        ("4G", NetworkType::Cellular4G, DeviceProfile::standard()),
        ("3G", NetworkType::Cellular3G, DeviceProfile::standard()),
        ("Unknown", NetworkType::Unknown, DeviceProfile::standard()),
        ("Wi-Fi, low-end device", NetworkType::Wifi, DeviceProfile::low_performance()),
    ];

    println!("Initial selection:");
    println!("------------------");
    for (name, network, device) in cases {
        let context = SelectionContext::new(network, device);
        if let Some(variant) = selector.select(&variants, &context) {
            println!("  {:<24} -> {}", name, variant.quality_label);
        }
    }
    println!();

    println!("Error classification:");
    println!("---------------------");
    let classifier = ErrorClassifier::new();
    for message in [
        "Network request failed",
        "HTTP 404: not found",
        "Server responded with status 502",
        "Decoder init failed: unsupported codec",
    ] {
        let classified = classifier.classify(message);
        println!(
            "  {:<40} {:<12} retryable={}",
            message,
            classified.category.to_string(),
            classified.retryable
        );
    }
}
