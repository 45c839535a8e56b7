//! Simulated playback engine for headless sessions
//!
//! Reports readiness immediately after every load or seek and advances the
//! position on a ticker while playing. Events go out on a channel the CLI
//! loop merges with the controller's own events.

use async_trait::async_trait;
use reelstream_core::{EngineError, EngineEvent, PlaybackEngine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const TICK: Duration = Duration::from_millis(250);

/// Seconds of media the simulated network keeps ahead of the playhead
const READ_AHEAD_SECS: f64 = 20.0;

pub struct HeadlessEngine {
    events: mpsc::UnboundedSender<EngineEvent>,
    speed: f64,
    /// Position in milliseconds, shared with the ticker
    position_ms: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
    source: Option<String>,
    live: bool,
}

impl HeadlessEngine {
    pub fn new(speed: f64) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Self {
            events,
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            position_ms: Arc::new(AtomicU64::new(0)),
            ticker: None,
            source: None,
            live: true,
        };
        (engine, rx)
    }

    fn emit(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.events
            .send(event)
            .map_err(|_| EngineError::Rejected("event channel closed".into()))
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        let events = self.events.clone();
        let position_ms = self.position_ms.clone();
        let step_ms = (TICK.as_millis() as f64 * self.speed) as u64;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.tick().await;
            loop {
                interval.tick().await;
                let position = (position_ms.fetch_add(step_ms, Ordering::SeqCst) + step_ms) as f64 / 1000.0;
                let update = EngineEvent::TimeUpdate {
                    position,
                    duration: None,
                    playable_until: Some(position + READ_AHEAD_SECS),
                };
                if events.send(update).is_err() {
                    break;
                }
            }
        }));
    }
}

#[async_trait]
impl PlaybackEngine for HeadlessEngine {
    fn is_live(&self) -> bool {
        self.live
    }

    async fn load(&mut self, url: &str) -> Result<(), EngineError> {
        debug!(url, "Headless engine loading");
        self.stop_ticker();
        self.position_ms.store(0, Ordering::SeqCst);
        self.source = Some(url.to_string());
        self.emit(EngineEvent::ReadyToPlay { duration: None })
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        if self.source.is_none() {
            return Err(EngineError::Rejected("no source loaded".into()));
        }
        self.start_ticker();
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.stop_ticker();
        Ok(())
    }

    async fn seek(&mut self, position: f64) -> Result<(), EngineError> {
        let millis = (position.max(0.0) * 1000.0) as u64;
        self.position_ms.store(millis, Ordering::SeqCst);
        self.emit(EngineEvent::ReadyToPlay { duration: None })
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        self.stop_ticker();
        self.source = None;
        self.live = false;
        Ok(())
    }
}

impl Drop for HeadlessEngine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
