//! CLI command implementations

use crate::headless::HeadlessEngine;
use crate::output::{self, OutputFormat};
use reelstream_core::{
    ControllerEvent, DeviceProfile, ErrorClassifier, HttpPlaylistSource, NetworkType,
    PlaybackState, PlayerConfig, PlaylistParser, PlaylistSource, QualitySelector,
    SelectionContext, SessionSnapshot, StreamSessionController, Variant,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

fn http_source(api_base: &str, config: &PlayerConfig) -> anyhow::Result<HttpPlaylistSource> {
    let base = Url::parse(api_base)?;
    Ok(HttpPlaylistSource::new(
        base,
        config.platform.clone(),
        config.request_timeout(),
    )?)
}

async fn fetch_variants(source: &HttpPlaylistSource, video_id: &str) -> anyhow::Result<Vec<Variant>> {
    let text = source.fetch_master(video_id).await?;
    let parser = PlaylistParser::new()
        .with_base_path(source.variant_base(video_id)?)
        .with_master_ref(source.master_url(video_id)?);
    Ok(parser.parse_master(&text))
}

fn device_profile(low_performance: bool) -> DeviceProfile {
    if low_performance {
        DeviceProfile::low_performance()
    } else {
        DeviceProfile::standard()
    }
}

/// List ranked variants
pub async fn inspect(
    api_base: &str,
    config: &PlayerConfig,
    video_id: &str,
    file: Option<&Path>,
    format: &str,
) -> anyhow::Result<()> {
    let variants = match file {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            PlaylistParser::new()
                .with_master_ref(path.display().to_string())
                .parse_master_bytes(&bytes)?
        }
        None => {
            let source = http_source(api_base, config)?;
            fetch_variants(&source, video_id).await?
        }
    };

    if OutputFormat::from(format) == OutputFormat::Json {
        println!("{}", output::to_json(&variants));
        return Ok(());
    }

    println!("Master playlist for {}:", video_id);
    if variants.is_empty() {
        println!("  No variants");
        return Ok(());
    }
    for (i, variant) in variants.iter().enumerate() {
        println!("{}", output::variant_row(i + 1, variant));
    }

    Ok(())
}

/// List segments of one variant
pub async fn segments(
    api_base: &str,
    config: &PlayerConfig,
    video_id: &str,
    quality: Option<&str>,
    limit: usize,
    format: &str,
) -> anyhow::Result<()> {
    let source = http_source(api_base, config)?;
    let variants = fetch_variants(&source, video_id).await?;

    let variant = match quality {
        Some(label) => variants.iter().find(|v| v.quality_label == label),
        None => variants.iter().find(|v| !v.is_auto).or_else(|| variants.first()),
    }
    .ok_or_else(|| anyhow::anyhow!("no variant matches '{}'", quality.unwrap_or("any")))?;

    let text = source.fetch_variant(video_id, &variant.playlist_ref).await?;
    let playlist = PlaylistParser::new().parse_variant(&text);

    if OutputFormat::from(format) == OutputFormat::Json {
        println!("{}", output::to_json(&playlist));
        return Ok(());
    }

    println!("Variant {} ({})", variant.quality_label, variant.playlist_ref);
    println!("  Version: {:?}", playlist.version);
    println!("  Target duration: {:?}", playlist.target_duration);
    println!("  Type: {:?}", playlist.playlist_type);
    println!("  Complete: {}", playlist.end_list);
    println!("  Duration: {}", output::format_seconds(playlist.total_duration()));
    println!("  Segments: {}", playlist.segments.len());

    let shown = if limit == 0 { playlist.segments.len() } else { limit };
    for segment in playlist.segments.iter().take(shown) {
        println!("  #{}: {:.3}s {}", segment.index, segment.duration_seconds, segment.uri_ref);
    }
    if playlist.segments.len() > shown {
        println!("  ... and {} more", playlist.segments.len() - shown);
    }

    Ok(())
}

/// Preview quality selection
pub async fn select(
    api_base: &str,
    config: &PlayerConfig,
    video_id: &str,
    network: NetworkType,
    low_performance: bool,
    quality: Option<String>,
    format: &str,
) -> anyhow::Result<()> {
    let source = http_source(api_base, config)?;
    let variants = fetch_variants(&source, video_id).await?;

    let selector = QualitySelector::new();
    let context = SelectionContext::new(network, device_profile(low_performance)).with_label(quality);
    let selected = selector
        .select(&variants, &context)
        .ok_or_else(|| anyhow::anyhow!("master playlist has no variants"))?;

    if OutputFormat::from(format) == OutputFormat::Json {
        println!("{}", output::to_json(selected));
        return Ok(());
    }

    println!("Policy: {}", selector.policy_name());
    println!("  Network: {}", network);
    println!("  Low-performance device: {}", low_performance);
    println!("Selected:");
    println!("{}", output::variant_row(1, selected));

    Ok(())
}

/// Classify an error message
pub fn classify(message: &str, format: &str) -> anyhow::Result<()> {
    let classified = ErrorClassifier::new().classify(message);

    if OutputFormat::from(format) == OutputFormat::Json {
        println!("{}", output::to_json(&classified));
        return Ok(());
    }

    println!("Category: {}", classified.category);
    println!("Retryable: {}", classified.retryable);
    println!("Message: {}", classified.user_message);
    Ok(())
}

/// Options for a headless session
pub struct PlayOptions {
    pub network: NetworkType,
    pub low_performance: bool,
    pub speed: f64,
    pub run_secs: u64,
    pub switch_network: Option<NetworkType>,
    pub switch_after: u64,
    pub seek: Option<f64>,
}

/// Tracks what was last printed so unchanged snapshots are skipped
struct Reporter {
    format: OutputFormat,
    last: Option<(PlaybackState, Option<String>, u64, bool)>,
}

impl Reporter {
    fn report(&mut self, snapshot: &SessionSnapshot) {
        let key = (
            snapshot.state,
            snapshot.quality_label.clone(),
            snapshot.position as u64,
            snapshot.retry_scheduled,
        );
        if self.last.as_ref() == Some(&key) {
            return;
        }
        self.last = Some(key);

        match self.format {
            OutputFormat::Json => println!("{}", output::to_json_line(snapshot)),
            OutputFormat::Text => println!("{}", output::snapshot_line(snapshot)),
        }
    }
}

/// Session reached a state it will not leave on its own
fn settled(snapshot: &SessionSnapshot) -> bool {
    snapshot.state == PlaybackState::Ended
        || (snapshot.state == PlaybackState::Error && !snapshot.retry_scheduled)
}

/// Run a headless playback session
pub async fn play(
    api_base: &str,
    config: PlayerConfig,
    video_id: &str,
    options: PlayOptions,
    format: &str,
) -> anyhow::Result<()> {
    let source = Arc::new(http_source(api_base, &config)?);
    let (engine, mut engine_events) = HeadlessEngine::new(options.speed);
    let (controller, mut events) = StreamSessionController::new(
        config,
        device_profile(options.low_performance),
        source,
        Box::new(engine),
    );
    let mut controller = controller.with_network(options.network);
    let mut reporter = Reporter {
        format: OutputFormat::from(format),
        last: None,
    };

    info!(video_id, session_id = %controller.id(), "Starting headless session");
    if let Err(e) = controller.initialize(video_id).await {
        warn!(error = %e, "Initialization failed");
    }
    reporter.report(&controller.snapshot());

    if let Some(position) = options.seek {
        if let Err(e) = controller.seek_to(position).await {
            warn!(error = %e, "Seek failed");
        }
        reporter.report(&controller.snapshot());
    }

    if let Some(network) = options.switch_network {
        let tx = controller.event_sender();
        let delay = Duration::from_secs(options.switch_after);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::NetworkChanged(network));
        });
    }

    let run_limit = (options.run_secs > 0).then(|| Duration::from_secs(options.run_secs));
    let deadline = async move {
        match run_limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    while !settled(&controller.snapshot()) {
        let event = tokio::select! {
            Some(event) = engine_events.recv() => ControllerEvent::Engine(event),
            Some(event) = events.recv() => event,
            _ = &mut deadline => {
                info!("Run limit reached");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        if let Err(e) = controller.handle_event(event).await {
            warn!(error = %e, "Event handling failed");
        }
        reporter.report(&controller.snapshot());
    }

    controller.dispose().await;
    reporter.report(&controller.snapshot());

    Ok(())
}
