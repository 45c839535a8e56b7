//! Reelstream CLI - Headless HLS client
//!
//! Features:
//! - Master playlist inspection and variant ranking
//! - Variant playlist segment listing
//! - Quality selection preview per network and device
//! - Error classification
//! - Headless playback sessions against a simulated engine

use clap::{Parser, Subcommand};
use reelstream_core::{NetworkType, PlayerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod headless;
mod output;

/// Reelstream CLI - Adaptive HLS client toolkit
#[derive(Parser)]
#[command(name = "reelstream")]
#[command(version)]
#[command(about = "Inspect HLS playlists and drive headless stream sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Player configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Streaming API base URL
    #[arg(long, default_value = "http://localhost:8080/api/")]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the ranked variants of a video's master playlist
    Inspect {
        /// Video identifier
        video_id: String,

        /// Parse a local master playlist instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List the segments of one variant
    Segments {
        /// Video identifier
        video_id: String,

        /// Quality label of the variant (defaults to the lowest-cost variant)
        #[arg(short, long)]
        quality: Option<String>,

        /// Number of segments to show (0 = all)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show which variant would be selected
    Select {
        /// Video identifier
        video_id: String,

        /// Network type (wifi, 4g, 3g, unknown)
        #[arg(short, long, default_value = "unknown")]
        network: NetworkType,

        /// Treat the device as low-performance
        #[arg(long)]
        low_performance: bool,

        /// Pin a quality label
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Classify an error message
    Classify {
        /// Raw error message or code
        message: String,
    },

    /// Run a headless playback session
    Play {
        /// Video identifier
        video_id: String,

        /// Network type at start (wifi, 4g, 3g, unknown)
        #[arg(short, long, default_value = "unknown")]
        network: NetworkType,

        /// Treat the device as low-performance
        #[arg(long)]
        low_performance: bool,

        /// Playback speed of the simulated engine
        #[arg(long, default_value = "10")]
        speed: f64,

        /// Wall-clock limit in seconds (0 = until the session settles)
        #[arg(long, default_value = "30")]
        run_secs: u64,

        /// Network type to switch to mid-session
        #[arg(long)]
        switch_network: Option<NetworkType>,

        /// Seconds before the network switch
        #[arg(long, default_value = "3")]
        switch_after: u64,

        /// Position to seek to after startup
        #[arg(long)]
        seek: Option<f64>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PlayerConfig> {
    let config = match path {
        Some(path) => PlayerConfig::from_json_file(path)?,
        None => PlayerConfig::default(),
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);
    reelstream_core::init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Inspect { video_id, file } => {
            commands::inspect(&cli.api_base, &config, &video_id, file.as_deref(), &cli.format).await?;
        }
        Commands::Segments { video_id, quality, limit } => {
            commands::segments(&cli.api_base, &config, &video_id, quality.as_deref(), limit, &cli.format)
                .await?;
        }
        Commands::Select { video_id, network, low_performance, quality } => {
            commands::select(
                &cli.api_base,
                &config,
                &video_id,
                network,
                low_performance,
                quality,
                &cli.format,
            )
            .await?;
        }
        Commands::Classify { message } => {
            commands::classify(&message, &cli.format)?;
        }
        Commands::Play {
            video_id,
            network,
            low_performance,
            speed,
            run_secs,
            switch_network,
            switch_after,
            seek,
        } => {
            let options = commands::PlayOptions {
                network,
                low_performance,
                speed,
                run_secs,
                switch_network,
                switch_after,
                seek,
            };
            commands::play(&cli.api_base, config, &video_id, options, &cli.format).await?;
        }
    }

    Ok(())
}
