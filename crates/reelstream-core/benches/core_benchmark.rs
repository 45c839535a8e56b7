//! Benchmark tests for reelstream-core operations
//!
//! Run with: cargo bench -p reelstream-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use reelstream_core::buffer::BufferEstimator;
use reelstream_core::classifier::ErrorClassifier;
use reelstream_core::playlist::PlaylistParser;
use reelstream_core::selector::{QualitySelector, SelectionContext};
use reelstream_core::types::*;

// ============================================================================
// Helpers
// ============================================================================

const LADDER: &[(u64, u32, u32)] = &[
    (400_000, 426, 240),
    (800_000, 640, 360),
    (1_400_000, 854, 480),
    (2_800_000, 1280, 720),
    (5_000_000, 1920, 1080),
    (8_000_000, 2560, 1440),
];

fn master_playlist(renditions: usize) -> String {
    let mut text = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for i in 0..renditions {
        let (bandwidth, width, height) = LADDER[i % LADDER.len()];
        text.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{},CODECS=\"avc1.64001f,mp4a.40.2\",FRAME-RATE={}\n",
            bandwidth + i as u64,
            width,
            height,
            if i % 3 == 0 { "60.000" } else { "30.000" }
        ));
        text.push_str(&format!("index_{}.m3u8\n", i));
    }
    text
}

fn media_playlist(segments: usize) -> String {
    let mut text = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n",
    );
    for i in 0..segments {
        text.push_str(&format!("#EXTINF:6.006,\nsegment_{}.ts\n", i));
    }
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

// ============================================================================
// Playlist Benchmarks
// ============================================================================

fn bench_parse_master(c: &mut Criterion) {
    let mut group = c.benchmark_group("playlist_master");
    let parser = PlaylistParser::new()
        .with_base_path("https://api.example.com/playlist/android/42")
        .with_master_ref("https://api.example.com/stream/android/42");

    for renditions in [4, 12, 48] {
        let text = master_playlist(renditions);
        group.bench_with_input(BenchmarkId::from_parameter(renditions), &text, |b, text| {
            b.iter(|| parser.parse_master(black_box(text)))
        });
    }

    group.finish();
}

fn bench_parse_variant(c: &mut Criterion) {
    let mut group = c.benchmark_group("playlist_variant");
    let parser = PlaylistParser::new();

    for segments in [100, 1_000, 10_000] {
        let text = media_playlist(segments);
        group.bench_with_input(BenchmarkId::from_parameter(segments), &text, |b, text| {
            b.iter(|| parser.parse_variant(black_box(text)))
        });
    }

    group.finish();
}

// ============================================================================
// Selection / Classification Benchmarks
// ============================================================================

fn bench_select(c: &mut Criterion) {
    let variants = PlaylistParser::new()
        .with_master_ref("https://api.example.com/stream/android/42")
        .parse_master(&master_playlist(12));
    let selector = QualitySelector::new();

    let contexts = [
        ("wifi", SelectionContext::new(NetworkType::Wifi, DeviceProfile::standard())),
        ("cellular_3g", SelectionContext::new(NetworkType::Cellular3G, DeviceProfile::standard())),
        ("low_performance", SelectionContext::new(NetworkType::Wifi, DeviceProfile::low_performance())),
    ];

    let mut group = c.benchmark_group("select");
    for (name, context) in &contexts {
        group.bench_function(*name, |b| {
            b.iter(|| selector.select(black_box(&variants), black_box(context)))
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = ErrorClassifier::new();
    let messages = [
        "Network request failed",
        "Server responded with status 503 for https://api.example.com/stream/android/42",
        "MEDIA_ERR_SRC_NOT_SUPPORTED: unsupported codec",
        "something odd happened",
    ];

    c.bench_function("classify", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(classifier.classify(black_box(message)));
            }
        })
    });
}

fn bench_buffer_estimate(c: &mut Criterion) {
    let estimator = BufferEstimator::default();
    c.bench_function("buffer_estimate", |b| {
        b.iter(|| {
            let ratio = estimator.estimate(black_box(42.0), black_box(600.0), black_box(Some(61.5)));
            estimator.health(ratio)
        })
    });
}

criterion_group!(
    benches,
    bench_parse_master,
    bench_parse_variant,
    bench_select,
    bench_classify,
    bench_buffer_estimate,
);
criterion_main!(benches);
