//! Request-facing façade: the three remote operations plus a status query.

use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    descriptor::{self, PipelineDescriptor},
    engine::MediaEngine,
    error::ErrorKind,
    lifecycle::{LoopControl, PipelineManager},
    profile::{ProfileMode, ProfileSource},
    state::{PlaybackState, StateCode},
    stream::{self, StreamKind},
    tokenizer, Result, SessionError,
};

/// A decoded remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Request {
    Record { stream: i32 },
    Play { stream: i32 },
    ChangeState { state: i32 },
    Status,
}

/// Outcome of a remote call. `ok` is the boolean the remote caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReply>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SessionError> for ErrorReply {
    fn from(err: &SessionError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Snapshot of the active pipeline as seen by remote callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub active: bool,
    pub stream: Option<StreamKind>,
    pub state: Option<PlaybackState>,
    pub elements: usize,
    pub faulted: bool,
}

/// The single service object remote calls are dispatched to.
#[derive(Debug)]
pub struct SessionService<E: MediaEngine, S> {
    profiles: S,
    manager: PipelineManager<E>,
    delimiter: char,
    max_elements: usize,
}

impl<E: MediaEngine, S: ProfileSource> SessionService<E, S> {
    pub fn new(engine: E, profiles: S, config: &AppConfig) -> Self {
        Self {
            profiles,
            manager: PipelineManager::new(engine, &config.session),
            delimiter: config.profiles.delimiter,
            max_elements: config.session.element_limit(),
        }
    }

    pub fn manager(&self) -> &PipelineManager<E> {
        &self.manager
    }

    /// Builds the record pipeline for the given stream code.
    pub fn record(&mut self, stream: i32) -> Result<()> {
        self.start(ProfileMode::Record, stream)
    }

    /// Builds the playback pipeline for the given stream code.
    pub fn play(&mut self, stream: i32) -> Result<()> {
        self.start(ProfileMode::Playback, stream)
    }

    /// Drives the active pipeline to the state named by `state` (1 play,
    /// 2 pause, 3 stop) and returns the state now tracked for it.
    pub fn change_state(&mut self, state: i32) -> Result<PlaybackState> {
        let code = StateCode::try_from(state)?;
        self.manager.change_state(code)
    }

    /// Current view of the active pipeline; the default status when none is.
    pub fn status(&self) -> SessionStatus {
        match self.manager.active() {
            Some(active) => SessionStatus {
                active: true,
                stream: Some(active.stream_kind()),
                state: Some(active.state()),
                elements: active.element_names().len(),
                faulted: active.faulted(),
            },
            None => SessionStatus::default(),
        }
    }

    /// Dispatches one remote call and folds the outcome into a [`Reply`].
    pub fn handle(&mut self, request: Request) -> Reply {
        let outcome = match request {
            Request::Record { stream } => self.record(stream),
            Request::Play { stream } => self.play(stream),
            Request::ChangeState { state } => self.change_state(state).map(|_| ()),
            Request::Status => Ok(()),
        };

        let error = outcome.err().map(|err| {
            tracing::warn!(kind = ?err.kind(), error = %err, "request failed");
            ErrorReply::from(&err)
        });
        Reply {
            ok: error.is_none(),
            error,
            status: self.status(),
        }
    }

    /// Handles engine notifications that arrived since the last call.
    pub fn poll(&mut self) -> LoopControl {
        self.manager.dispatch_notifications()
    }

    /// Tears down the active pipeline, if any. The service stays usable.
    pub fn shutdown(&mut self) {
        self.manager.teardown();
    }

    fn start(&mut self, mode: ProfileMode, stream: i32) -> Result<()> {
        let kind = stream::classify(stream)?;
        let raw = self.profiles.load(mode)?;
        tracing::info!(%mode, stream = %kind, profile = %raw, "pipeline requested");

        // From here on the previous pipeline is replaced, even if the new
        // profile turns out to be unusable.
        let descriptor = match self.parse(&raw) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.manager.teardown();
                return Err(err);
            }
        };

        self.manager.build(descriptor, kind)?;
        Ok(())
    }

    fn parse(&self, raw: &str) -> Result<PipelineDescriptor> {
        let tokens = tokenizer::split(raw, self.delimiter)?;
        descriptor::build_with_limit(tokens, self.max_elements)
    }
}
