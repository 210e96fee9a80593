//! Core library for the media session manager.
//!
//! A remote `Record` or `Play` call loads a textual profile, splits it into
//! tokens, walks the tokens into a [`PipelineDescriptor`] and hands that to the
//! [`PipelineManager`], which keeps at most one live pipeline in the media
//! engine. `ChangeState` then drives that pipeline through play, pause and
//! stop. [`SessionService`] ties the steps together behind the remote
//! operations.

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod profile;
pub mod session;
pub mod state;
pub mod stream;
pub mod tokenizer;

pub use config::{AppConfig, ErrorPolicy, ProfileConfig, ServiceConfig, SessionConfig};
pub use descriptor::{ElementSpec, PipelineDescriptor, MAX_ELEMENTS};
#[cfg(feature = "gstreamer")]
pub use engine::GstEngine;
pub use engine::{EngineError, MediaEngine, MemoryEngine, NativeState, Notification};
pub use error::{ErrorKind, Result, SessionError};
pub use lifecycle::{ActivePipeline, LoopControl, PipelineManager};
pub use profile::{FileProfileStore, MemoryProfileStore, ProfileMode, ProfileSource};
pub use session::{ErrorReply, Reply, Request, SessionService, SessionStatus};
pub use state::{PlaybackState, StateCode};
pub use stream::StreamKind;
