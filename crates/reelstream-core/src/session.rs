//! Stream session controller - main orchestrator for playback
//!
//! Coordinates:
//! - Master playlist loading and parsing
//! - Initial and network-driven quality selection
//! - Position-preserving quality switches and seeks
//! - The playback state machine
//! - Error classification and bounded automatic retry
//!
//! All mutation happens through `&mut self`, so the caller's event loop is
//! the single writer. Engine callbacks, network changes and timer firings
//! arrive as [`ControllerEvent`]s and go through [`StreamSessionController::handle_event`].

use crate::{
    buffer::{BufferEstimator, BufferHealth},
    classifier::{ClassifiedError, ErrorClassifier},
    config::PlayerConfig,
    engine::{EngineCommand, EngineEvent, EngineState, PlaybackEngine},
    error::Error,
    playlist::{detect_playlist_kind, PlaylistKind, PlaylistParser},
    selector::{QualitySelector, SelectionContext},
    source::PlaylistSource,
    timers::{TimerFired, TimerKind, TimerSet},
    types::*,
    Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Inputs consumed by the controller's update function
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Engine(EngineEvent),
    NetworkChanged(NetworkType),
    Timer(TimerFired),
}

/// Result of a quality change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    /// Requested variant was already active
    Unchanged,
}

/// Observable view of the session, published after every mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub video_id: String,
    pub state: PlaybackState,
    pub stream_url: Option<String>,
    pub quality_label: Option<String>,
    pub position: f64,
    pub duration: f64,
    pub buffer_health_ratio: f64,
    pub buffer_health: BufferHealth,
    pub error: Option<ClassifiedError>,
    pub retry_count: u32,
    pub retry_scheduled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Work deferred until the engine confirms a freshly loaded stream
#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    /// Position to seek to once loaded
    position: Option<f64>,
    /// Resume playback after the seek
    resume: bool,
    /// State before the stream was replaced
    prior: PlaybackState,
}

impl PendingRestore {
    fn settled_state(&self) -> PlaybackState {
        if self.resume {
            PlaybackState::Playing
        } else {
            match self.prior {
                PlaybackState::Paused | PlaybackState::Ended | PlaybackState::Buffering => {
                    PlaybackState::Paused
                }
                _ => PlaybackState::Ready,
            }
        }
    }
}

/// Controller owning one stream session and the engine handle
pub struct StreamSessionController {
    id: SessionId,
    config: PlayerConfig,
    device: DeviceProfile,
    source: Arc<dyn PlaylistSource>,
    selector: QualitySelector,
    classifier: ErrorClassifier,
    estimator: BufferEstimator,
    engine: EngineState,
    session: StreamSession,
    variants: Vec<Variant>,
    network: NetworkType,
    pinned_label: Option<String>,
    timers: TimerSet<ControllerEvent>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    pending_restore: Option<PendingRestore>,
    /// State to return to when Buffering clears
    buffering_return: Option<PlaybackState>,
    /// Restore applied by the next scheduled retry
    retry_restore: Option<PendingRestore>,
    playable_until: Option<f64>,
    last_time_update: Option<Instant>,
    alive: bool,
}

impl StreamSessionController {
    /// Create a controller and the receiver its events are delivered on
    ///
    /// The caller drains the receiver and passes each event to
    /// [`handle_event`](Self::handle_event).
    pub fn new(
        config: PlayerConfig,
        device: DeviceProfile,
        source: Arc<dyn PlaylistSource>,
        engine: Box<dyn PlaybackEngine>,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let id = SessionId::new();
        let session = StreamSession::new("");
        let estimator = BufferEstimator::new(config.buffer.clone());
        let (snapshot_tx, _) = watch::channel(Self::snapshot_of(id, &session, &estimator, false));

        let controller = Self {
            id,
            config,
            device,
            source,
            selector: QualitySelector::new(),
            classifier: ErrorClassifier::new(),
            estimator,
            engine: EngineState::attach(engine),
            session,
            variants: Vec::new(),
            network: NetworkType::Unknown,
            pinned_label: None,
            timers: TimerSet::new(events_tx.clone(), ControllerEvent::Timer),
            events_tx,
            snapshot_tx,
            pending_restore: None,
            buffering_return: None,
            retry_restore: None,
            playable_until: None,
            last_time_update: None,
            alive: true,
        };

        (controller, events_rx)
    }

    /// Set the network class known before initialization
    pub fn with_network(mut self, network: NetworkType) -> Self {
        self.network = network;
        self
    }

    /// Replace the default selection policy
    pub fn with_selector(mut self, selector: QualitySelector) -> Self {
        self.selector = selector;
        self
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn state(&self) -> PlaybackState {
        self.session.playback_state
    }

    /// Ranked variants of the loaded master playlist
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn current_variant(&self) -> Option<&Variant> {
        self.session.current_variant.as_ref()
    }

    pub fn network_type(&self) -> NetworkType {
        self.network
    }

    pub fn device(&self) -> DeviceProfile {
        self.device
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Sender for engine glue and network observers
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ControllerEvent> {
        self.events_tx.clone()
    }

    /// Subscribe to session snapshots
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Load a video: fetch, parse, select, and hand the stream to the engine
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn initialize(&mut self, video_id: &str) -> Result<()> {
        self.ensure_alive()?;
        info!(video_id, network = %self.network, "Initializing stream session");

        if self.session.playback_state == PlaybackState::Playing {
            if let Err(e) = self.engine.dispatch(&EngineCommand::Pause).await {
                debug!(error = %e, "Pause before reinitialize failed");
            }
        }

        self.clear_pending();
        self.session = StreamSession::new(video_id);
        self.variants.clear();
        self.playable_until = None;
        self.last_time_update = None;

        self.load(None).await
    }

    /// User-facing retry action; resets the automatic retry budget
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn retry(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if self.session.playback_state != PlaybackState::Error {
            debug!(state = %self.session.playback_state, "Retry ignored outside Error");
            return Ok(());
        }

        self.timers.cancel(TimerKind::Retry);
        self.session.retry_count = 0;
        let restore = self.retry_restore.take();
        self.load(restore).await
    }

    /// Start or resume playback
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn play(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let state = self.session.playback_state;

        match state {
            PlaybackState::Ready | PlaybackState::Paused => {
                self.command(EngineCommand::Play).await?;
                self.transition(PlaybackState::Playing)
            }
            PlaybackState::Playing => Ok(()),
            PlaybackState::Buffering => {
                self.command(EngineCommand::Play).await?;
                self.buffering_return = Some(PlaybackState::Playing);
                Ok(())
            }
            PlaybackState::Loading => {
                if let Some(restore) = self.pending_restore.as_mut() {
                    restore.resume = true;
                }
                Ok(())
            }
            PlaybackState::Idle => Err(Error::NotInitialized),
            PlaybackState::Ended | PlaybackState::Error => Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: PlaybackState::Playing.to_string(),
            }),
        }
    }

    /// Pause playback
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn pause(&mut self) -> Result<()> {
        self.ensure_alive()?;

        match self.session.playback_state {
            PlaybackState::Playing => {
                self.command(EngineCommand::Pause).await?;
                self.transition(PlaybackState::Paused)
            }
            PlaybackState::Buffering => {
                self.command(EngineCommand::Pause).await?;
                self.buffering_return = Some(PlaybackState::Paused);
                Ok(())
            }
            PlaybackState::Loading => {
                if let Some(restore) = self.pending_restore.as_mut() {
                    restore.resume = false;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Swap to another variant, optionally restoring the playback position
    ///
    /// The engine is paused, loaded with the new URL, and left in Loading
    /// until it reports readiness (or the switch timeout fires); only then
    /// is the saved position restored and playback resumed. A newer call
    /// supersedes the pending restore of an older one.
    #[instrument(skip(self, variant), fields(session_id = %self.id, target = %variant.quality_label))]
    pub async fn switch_quality(
        &mut self,
        variant: &Variant,
        preserve_position: bool,
    ) -> Result<SwitchOutcome> {
        self.ensure_alive()?;
        let state = self.session.playback_state;

        match state {
            PlaybackState::Idle => return Err(Error::NotInitialized),
            PlaybackState::Error => {
                return Err(Error::InvalidStateTransition {
                    from: state.to_string(),
                    to: PlaybackState::Loading.to_string(),
                })
            }
            _ => {}
        }

        if !self.variants.iter().any(|v| v.same_stream(variant)) {
            return Err(Error::UnknownQuality(variant.quality_label.clone()));
        }

        if self
            .session
            .current_variant
            .as_ref()
            .is_some_and(|current| current.same_stream(variant))
        {
            debug!("Requested variant already active");
            return Ok(SwitchOutcome::Unchanged);
        }

        let superseded = self.pending_restore.take();
        self.timers.cancel(TimerKind::SwitchTimeout);
        let buffering_return = self.buffering_return.take();
        self.timers.cancel(TimerKind::BufferingTimeout);

        let (saved_position, resume, prior) = match (state, superseded) {
            (PlaybackState::Loading, Some(previous)) => {
                (previous.position, previous.resume, previous.prior)
            }
            (PlaybackState::Buffering, _) => (
                Some(self.session.current_position_seconds),
                buffering_return == Some(PlaybackState::Playing),
                buffering_return.unwrap_or(PlaybackState::Paused),
            ),
            _ => (
                Some(self.session.current_position_seconds),
                state == PlaybackState::Playing,
                state,
            ),
        };
        let position = saved_position.filter(|p| preserve_position && *p > 0.0);

        if state == PlaybackState::Playing {
            self.command(EngineCommand::Pause).await?;
        }
        self.command(EngineCommand::Load(variant.playlist_ref.clone()))
            .await?;

        info!(
            to = %variant.quality_label,
            bandwidth = variant.bandwidth_bps,
            position = ?position,
            resume,
            "Switching quality"
        );

        self.session.current_variant = Some(variant.clone());
        self.playable_until = None;
        self.pending_restore = Some(PendingRestore {
            position,
            resume,
            prior,
        });
        self.transition(PlaybackState::Loading)?;
        self.timers
            .schedule(TimerKind::SwitchTimeout, self.config.switch_settle_timeout());
        self.publish();

        Ok(SwitchOutcome::Switched)
    }

    /// Pin a quality label, or pass `None` to return to policy-driven selection
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn select_quality(&mut self, label: Option<&str>) -> Result<SwitchOutcome> {
        self.ensure_alive()?;

        let target = match label {
            Some(label) => {
                let target = self
                    .variants
                    .iter()
                    .find(|v| v.quality_label == label)
                    .cloned()
                    .ok_or_else(|| Error::UnknownQuality(label.to_string()))?;
                self.pinned_label = Some(label.to_string());
                target
            }
            None => {
                self.pinned_label = None;
                self.selector
                    .select(&self.variants, &self.selection_context())
                    .cloned()
                    .ok_or(Error::NotInitialized)?
            }
        };

        self.switch_quality(&target, true).await
    }

    /// Seek to a position, clamped to the stream bounds
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn seek_to(&mut self, time: f64) -> Result<()> {
        self.ensure_alive()?;
        let target = self.clamp_position(time);
        let state = self.session.playback_state;

        let return_state = match state {
            PlaybackState::Idle => return Err(Error::NotInitialized),
            PlaybackState::Error => {
                return Err(Error::InvalidStateTransition {
                    from: state.to_string(),
                    to: PlaybackState::Buffering.to_string(),
                })
            }
            PlaybackState::Loading => {
                // Retarget the pending switch instead of seeking the old stream
                let Some(restore) = self.pending_restore.as_mut() else {
                    return Err(Error::NotInitialized);
                };
                restore.position = Some(target).filter(|p| *p > 0.0);
                self.session.current_position_seconds = target;
                self.update_buffer_ratio();
                self.publish();
                return Ok(());
            }
            PlaybackState::Buffering => self.buffering_return.unwrap_or(PlaybackState::Paused),
            PlaybackState::Playing => PlaybackState::Playing,
            PlaybackState::Ready => PlaybackState::Ready,
            PlaybackState::Paused | PlaybackState::Ended => PlaybackState::Paused,
        };

        self.command(EngineCommand::Seek(target)).await?;
        debug!(from = self.session.current_position_seconds, to = target, "Seeking");

        self.session.current_position_seconds = target;
        self.buffering_return = Some(return_state);
        self.transition(PlaybackState::Buffering)?;
        self.timers
            .schedule(TimerKind::BufferingTimeout, self.config.seek_settle_timeout());
        self.update_buffer_ratio();
        self.publish();

        Ok(())
    }

    /// Reselect for a new network class; switches only if the pick changed
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn handle_network_change(&mut self, network: NetworkType) -> Result<SwitchOutcome> {
        self.ensure_alive()?;
        let previous = std::mem::replace(&mut self.network, network);
        let state = self.session.playback_state;

        if self.variants.is_empty() || !(state.has_stream() || state == PlaybackState::Loading) {
            debug!(%previous, %network, %state, "Network change recorded");
            return Ok(SwitchOutcome::Unchanged);
        }

        let Some(target) = self
            .selector
            .select(&self.variants, &self.selection_context())
            .cloned()
        else {
            return Ok(SwitchOutcome::Unchanged);
        };

        if self
            .session
            .current_variant
            .as_ref()
            .is_some_and(|current| current.same_stream(&target))
        {
            debug!(%previous, %network, "Recommended variant unchanged");
            return Ok(SwitchOutcome::Unchanged);
        }

        info!(%previous, %network, target = %target.quality_label, "Network change triggers switch");
        self.switch_quality(&target, true).await
    }

    /// Apply one engine callback, network change, or timer firing
    pub async fn handle_event(&mut self, event: ControllerEvent) -> Result<()> {
        if !self.alive {
            debug!(?event, "Event after dispose ignored");
            return Ok(());
        }

        match event {
            ControllerEvent::Engine(event) => self.on_engine_event(event).await,
            ControllerEvent::NetworkChanged(network) => {
                self.handle_network_change(network).await.map(|_| ())
            }
            ControllerEvent::Timer(fired) => self.on_timer(fired).await,
        }
    }

    /// Pause, cancel timers, and release the engine; safe to call repeatedly
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn dispose(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.clear_pending();

        if let Some(mut engine) = self.engine.detach() {
            if engine.is_live() {
                if let Err(e) = engine.pause().await {
                    debug!(error = %e, "Pause during dispose failed");
                }
                if let Err(e) = engine.release().await {
                    warn!(error = %e, "Engine release failed");
                }
            } else {
                debug!("Engine handle already released");
            }
        }

        self.session.playback_state = PlaybackState::Idle;
        self.publish();
        info!(video_id = %self.session.video_id, "Stream session disposed");
    }

    async fn load(&mut self, restore: Option<PendingRestore>) -> Result<()> {
        self.transition(PlaybackState::Loading)?;
        let video_id = self.session.video_id.clone();

        let fetched = self.source.fetch_master(&video_id).await;
        let text = match fetched {
            Ok(text) => text,
            Err(e) => return Err(self.fail(e)),
        };

        let urls = self
            .source
            .master_url(&video_id)
            .and_then(|master| Ok((master, self.source.variant_base(&video_id)?)));
        let (master_url, variant_base) = match urls {
            Ok(urls) => urls,
            Err(e) => return Err(self.fail(e)),
        };

        let parser = PlaylistParser::new()
            .with_base_path(variant_base)
            .with_master_ref(master_url.clone());
        let mut variants = parser.parse_master(&text);

        if variants.is_empty() {
            if detect_playlist_kind(&text) != PlaylistKind::Media {
                return Err(self.fail(Error::NoVariants));
            }
            info!("Entry point is a media playlist; playing it directly");
            variants.push(Variant::auto(master_url));
        }

        info!(variants = variants.len(), "Master playlist loaded");
        self.variants = variants;

        let Some(selected) = self
            .selector
            .select(&self.variants, &self.selection_context())
            .cloned()
        else {
            return Err(self.fail(Error::NoVariants));
        };

        if self.config.probe_variant_duration && !selected.is_auto {
            self.probe_duration(&selected).await;
        }

        self.command(EngineCommand::Load(selected.playlist_ref.clone()))
            .await?;
        info!(
            variant = %selected.quality_label,
            bandwidth = selected.bandwidth_bps,
            "Initial variant selected"
        );

        self.session.current_variant = Some(selected);
        self.session.last_error = None;

        match restore {
            Some(restore) => {
                self.pending_restore = Some(restore);
                self.timers
                    .schedule(TimerKind::SwitchTimeout, self.config.switch_settle_timeout());
                self.publish();
            }
            None => {
                self.transition(PlaybackState::Ready)?;
                if self.config.autoplay {
                    self.command(EngineCommand::Play).await?;
                    self.transition(PlaybackState::Playing)?;
                }
            }
        }

        Ok(())
    }

    async fn probe_duration(&mut self, variant: &Variant) {
        let fetched = self
            .source
            .fetch_variant(&self.session.video_id, &variant.playlist_ref)
            .await;
        match fetched {
            Ok(text) => {
                let playlist = PlaylistParser::new().parse_variant(&text);
                let total = playlist.total_duration();
                if total > 0.0 {
                    debug!(duration = total, segments = playlist.segments.len(), "Duration probed");
                    self.session.duration_seconds = total;
                }
            }
            Err(e) => debug!(error = %e, "Duration probe failed"),
        }
    }

    async fn on_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        let state = self.session.playback_state;
        if matches!(state, PlaybackState::Idle | PlaybackState::Error) {
            debug!(?event, %state, "Engine event ignored");
            return Ok(());
        }

        match event {
            EngineEvent::ReadyToPlay { duration } => {
                if let Some(duration) = duration.filter(|d| d.is_finite() && *d > 0.0) {
                    self.session.duration_seconds = duration;
                }
                self.session.retry_count = 0;

                if self.pending_restore.is_some() {
                    self.complete_restore().await
                } else if state == PlaybackState::Buffering {
                    self.clear_buffering()
                } else {
                    self.publish();
                    Ok(())
                }
            }
            EngineEvent::Stalled => {
                if matches!(state, PlaybackState::Playing | PlaybackState::Paused) {
                    self.buffering_return = Some(state);
                    self.transition(PlaybackState::Buffering)?;
                    self.timers
                        .schedule(TimerKind::BufferingTimeout, self.config.seek_settle_timeout());
                }
                Ok(())
            }
            EngineEvent::TimeUpdate {
                position,
                duration,
                playable_until,
            } => {
                self.on_time_update(position, duration, playable_until);
                Ok(())
            }
            EngineEvent::Ended => {
                if state == PlaybackState::Playing {
                    self.end_playback()
                } else {
                    debug!(%state, "End of stream outside Playing ignored");
                    Ok(())
                }
            }
            EngineEvent::Failed { message } => {
                let classified = self.classifier.classify(&message);
                self.enter_error(classified);
                Ok(())
            }
        }
    }

    fn on_time_update(&mut self, position: f64, duration: Option<f64>, playable_until: Option<f64>) {
        let now = Instant::now();
        let interval = self.config.time_update_interval(self.device);
        if let Some(last) = self.last_time_update {
            if now.duration_since(last) < interval {
                return;
            }
        }
        self.last_time_update = Some(now);

        if let Some(duration) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.session.duration_seconds = duration;
        }

        // The replacement stream reports from zero until the restore lands
        if self.pending_restore.is_some() {
            return;
        }

        if position.is_finite() {
            self.session.current_position_seconds = position.max(0.0);
        }
        self.playable_until = playable_until;
        self.update_buffer_ratio();

        let duration = self.session.duration_seconds;
        if self.session.playback_state == PlaybackState::Playing
            && duration > 0.0
            && self.session.current_position_seconds >= duration
        {
            if let Err(e) = self.end_playback() {
                debug!(error = %e, "End detection failed");
            }
            return;
        }

        self.publish();
    }

    async fn on_timer(&mut self, fired: TimerFired) -> Result<()> {
        if !self.timers.take_fired(fired) {
            return Ok(());
        }

        match fired.kind {
            TimerKind::Retry => {
                if self.session.playback_state != PlaybackState::Error {
                    return Ok(());
                }
                info!(attempt = self.session.retry_count, "Retrying after error");
                let restore = self.retry_restore.take();
                if let Err(e) = self.load(restore).await {
                    debug!(error = %e, "Scheduled retry failed");
                }
                Ok(())
            }
            TimerKind::BufferingTimeout => {
                if self.session.playback_state == PlaybackState::Buffering {
                    warn!("No readiness signal; clearing buffering");
                    self.clear_buffering()?;
                }
                Ok(())
            }
            TimerKind::SwitchTimeout => {
                if self.pending_restore.is_some() {
                    warn!("No readiness signal; completing stream switch");
                    self.complete_restore().await?;
                }
                Ok(())
            }
        }
    }

    /// Seek and resume once the replacement stream is ready
    async fn complete_restore(&mut self) -> Result<()> {
        let Some(restore) = self.pending_restore.take() else {
            return Ok(());
        };
        self.timers.cancel(TimerKind::SwitchTimeout);

        if let Some(position) = restore.position {
            self.command(EngineCommand::Seek(position)).await?;
            self.session.current_position_seconds = position;
        }

        let settled = restore.settled_state();
        if settled == PlaybackState::Playing {
            self.command(EngineCommand::Play).await?;
        }
        self.update_buffer_ratio();
        self.transition(settled)
    }

    fn clear_buffering(&mut self) -> Result<()> {
        self.timers.cancel(TimerKind::BufferingTimeout);
        let Some(return_state) = self.buffering_return.take() else {
            return Ok(());
        };
        if self.session.playback_state != PlaybackState::Buffering {
            return Ok(());
        }
        self.transition(return_state)
    }

    fn end_playback(&mut self) -> Result<()> {
        self.timers.cancel(TimerKind::BufferingTimeout);
        self.buffering_return = None;
        if self.session.duration_seconds > 0.0 {
            self.session.current_position_seconds = self.session.duration_seconds;
        }
        self.update_buffer_ratio();
        info!(video_id = %self.session.video_id, "Playback ended");
        self.transition(PlaybackState::Ended)
    }

    /// Issue an engine command; failures move the session to Error
    async fn command(&mut self, command: EngineCommand) -> Result<()> {
        let result = self.engine.dispatch(&command).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(?command, error = %e, "Engine command failed");
                Err(self.fail(e.into()))
            }
        }
    }

    /// Record a failure and return it to the caller
    fn fail(&mut self, error: Error) -> Error {
        let classified = self.classifier.classify_error(&error);
        self.enter_error(classified);
        error
    }

    fn enter_error(&mut self, classified: ClassifiedError) {
        let prior = self.session.playback_state;
        let was_playing = prior == PlaybackState::Playing
            || self.buffering_return == Some(PlaybackState::Playing)
            || self.pending_restore.is_some_and(|r| r.resume);
        let position = self
            .pending_restore
            .and_then(|r| r.position)
            .unwrap_or(self.session.current_position_seconds);

        self.timers.cancel(TimerKind::SwitchTimeout);
        self.timers.cancel(TimerKind::BufferingTimeout);
        self.pending_restore = None;
        self.buffering_return = None;

        self.session.playback_state = PlaybackState::Error;
        self.session.last_error = Some(classified.clone());

        if classified.retryable && self.config.retry.allows(self.session.retry_count) {
            self.session.retry_count += 1;
            let delay = self.config.retry.delay_for(self.session.retry_count);
            self.retry_restore = (position > 0.0 || was_playing).then_some(PendingRestore {
                position: Some(position).filter(|p| *p > 0.0),
                resume: was_playing,
                prior,
            });
            self.timers.schedule(TimerKind::Retry, delay);
            warn!(
                category = %classified.category,
                attempt = self.session.retry_count,
                delay_ms = delay.as_millis() as u64,
                detail = %classified.detail,
                "Playback error; retry scheduled"
            );
        } else {
            self.timers.cancel(TimerKind::Retry);
            warn!(
                category = %classified.category,
                retryable = classified.retryable,
                detail = %classified.detail,
                "Playback error is terminal"
            );
        }

        info!(from = %prior, to = %PlaybackState::Error, "State transition");
        self.publish();
    }

    /// Transition to new state
    fn transition(&mut self, target: PlaybackState) -> Result<()> {
        let current = self.session.playback_state;
        if current == target {
            return Ok(());
        }
        if !current.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        self.session.playback_state = target;
        info!(from = %current, to = %target, "State transition");
        self.publish();
        Ok(())
    }

    fn clear_pending(&mut self) {
        self.timers.cancel_all();
        self.pending_restore = None;
        self.buffering_return = None;
        self.retry_restore = None;
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.alive {
            Ok(())
        } else {
            Err(Error::Disposed)
        }
    }

    fn selection_context(&self) -> SelectionContext {
        SelectionContext::new(self.network, self.device).with_label(self.pinned_label.clone())
    }

    fn clamp_position(&self, time: f64) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let duration = self.session.duration_seconds;
        if duration > 0.0 {
            time.min(duration)
        } else {
            time
        }
    }

    fn update_buffer_ratio(&mut self) {
        self.session.buffer_health_ratio = self.estimator.estimate(
            self.session.current_position_seconds,
            self.session.duration_seconds,
            self.playable_until,
        );
    }

    fn publish(&self) {
        let snapshot = Self::snapshot_of(
            self.id,
            &self.session,
            &self.estimator,
            self.timers.is_pending(TimerKind::Retry),
        );
        self.snapshot_tx.send_replace(snapshot);
    }

    fn snapshot_of(
        id: SessionId,
        session: &StreamSession,
        estimator: &BufferEstimator,
        retry_scheduled: bool,
    ) -> SessionSnapshot {
        SessionSnapshot {
            session_id: id,
            video_id: session.video_id.clone(),
            state: session.playback_state,
            stream_url: session.stream_url().map(str::to_string),
            quality_label: session.current_variant.as_ref().map(|v| v.quality_label.clone()),
            position: session.current_position_seconds,
            duration: session.duration_seconds,
            buffer_health_ratio: session.buffer_health_ratio,
            buffer_health: estimator.health(session.buffer_health_ratio),
            error: session.last_error.clone(),
            retry_count: session.retry_count,
            retry_scheduled,
            updated_at: Utc::now(),
        }
    }
}
