//! External media-playback engine boundary
//!
//! The engine renders frames and owns the decoder; the session controller
//! only issues commands through [`PlaybackEngine`] and consumes the
//! [`EngineEvent`]s the platform glue forwards back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by an engine handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Playback engine unavailable")]
    Unavailable,

    #[error("Playback engine rejected command: {0}")]
    Rejected(String),
}

impl From<EngineError> for crate::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable => crate::Error::EngineUnavailable,
            EngineError::Rejected(msg) => crate::Error::Engine(msg),
        }
    }
}

/// Capability interface over a platform playback engine
#[async_trait]
pub trait PlaybackEngine: Send {
    /// False once the handle has been released or invalidated
    fn is_live(&self) -> bool;

    /// Replace the current source with the given stream URL
    async fn load(&mut self, url: &str) -> Result<(), EngineError>;

    async fn play(&mut self) -> Result<(), EngineError>;

    async fn pause(&mut self) -> Result<(), EngineError>;

    /// Seek to an absolute position in seconds
    async fn seek(&mut self, position: f64) -> Result<(), EngineError>;

    /// Release decoder resources; the handle is dead afterwards
    async fn release(&mut self) -> Result<(), EngineError>;
}

/// Engine callbacks, forwarded by the platform glue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Enough data is loaded to start or resume playback
    ReadyToPlay { duration: Option<f64> },
    /// Playback starved for data
    Stalled,
    /// Periodic progress report
    TimeUpdate {
        position: f64,
        duration: Option<f64>,
        /// Furthest buffered position, if the engine reports it
        playable_until: Option<f64>,
    },
    /// Playback reached the end of the stream
    Ended,
    /// The engine failed; the message is classified by the controller
    Failed { message: String },
}

/// Commands issued to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Load(String),
    Play,
    Pause,
    Seek(f64),
}

/// Engine handle ownership
pub enum EngineState {
    Detached,
    Attached(Box<dyn PlaybackEngine>),
}

impl EngineState {
    pub fn attach(engine: Box<dyn PlaybackEngine>) -> Self {
        EngineState::Attached(engine)
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, EngineState::Attached(_))
    }

    /// Issue a command; a detached engine makes this a no-op
    pub async fn dispatch(&mut self, command: &EngineCommand) -> Result<(), EngineError> {
        let EngineState::Attached(engine) = self else {
            return Ok(());
        };
        if !engine.is_live() {
            return Err(EngineError::Unavailable);
        }

        match command {
            EngineCommand::Load(url) => engine.load(url).await,
            EngineCommand::Play => engine.play().await,
            EngineCommand::Pause => engine.pause().await,
            EngineCommand::Seek(position) => engine.seek(*position).await,
        }
    }

    /// Take the handle out, leaving the state detached
    pub fn detach(&mut self) -> Option<Box<dyn PlaybackEngine>> {
        match std::mem::replace(self, EngineState::Detached) {
            EngineState::Attached(engine) => Some(engine),
            EngineState::Detached => None,
        }
    }
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Detached => write!(f, "Detached"),
            EngineState::Attached(engine) => write!(f, "Attached(live={})", engine.is_live()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEngine {
        live: bool,
        commands: usize,
    }

    #[async_trait]
    impl PlaybackEngine for CountingEngine {
        fn is_live(&self) -> bool {
            self.live
        }
        async fn load(&mut self, _url: &str) -> Result<(), EngineError> {
            self.commands += 1;
            Ok(())
        }
        async fn play(&mut self) -> Result<(), EngineError> {
            self.commands += 1;
            Ok(())
        }
        async fn pause(&mut self) -> Result<(), EngineError> {
            self.commands += 1;
            Ok(())
        }
        async fn seek(&mut self, _position: f64) -> Result<(), EngineError> {
            self.commands += 1;
            Ok(())
        }
        async fn release(&mut self) -> Result<(), EngineError> {
            self.live = false;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_detached_dispatch_is_noop() {
        let mut state = EngineState::Detached;
        assert!(state.dispatch(&EngineCommand::Play).await.is_ok());
        assert!(state.detach().is_none());
    }

    #[tokio::test]
    async fn test_dead_handle_reports_unavailable() {
        let mut state = EngineState::attach(Box::new(CountingEngine { live: false, commands: 0 }));
        assert_eq!(
            state.dispatch(&EngineCommand::Seek(3.0)).await,
            Err(EngineError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_detach_leaves_detached() {
        let mut state = EngineState::attach(Box::new(CountingEngine { live: true, commands: 0 }));
        assert!(state.dispatch(&EngineCommand::Load("a.m3u8".into())).await.is_ok());
        let mut engine = state.detach().unwrap();
        assert!(!state.is_attached());
        engine.release().await.unwrap();
        assert!(!engine.is_live());
    }
}
