//! Boundary to the native media-processing engine.
//!
//! The lifecycle manager only needs a handful of capabilities from the engine:
//! create a pipeline container, instantiate named elements, set properties,
//! link neighbours, drive state transitions and deliver end-of-stream / error
//! notifications. [`MediaEngine`] captures exactly that surface.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "gstreamer")]
pub mod gst;
pub mod memory;

#[cfg(feature = "gstreamer")]
pub use self::gst::GstEngine;
pub use memory::{ElementSnapshot, MemoryEngine, PipelineSnapshot};

/// State requested from the native pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeState {
    Null,
    Paused,
    Playing,
}

impl fmt::Display for NativeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Paused => "paused",
            Self::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// Asynchronous message raised by a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EndOfStream,
    Error { source: String, message: String },
}

/// Failure reported by an engine backend.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no element factory named `{0}`")]
    UnknownFactory(String),
    #[error("element `{element}` has no property `{key}`")]
    UnknownProperty { element: String, key: String },
    #[error("{0}")]
    Backend(String),
}

impl EngineError {
    pub fn backend<T: Into<String>>(msg: T) -> Self {
        Self::Backend(msg.into())
    }
}

/// Capabilities consumed from the native engine.
///
/// Handles are opaque to the caller. Releasing a pipeline frees every element
/// that was added to it.
pub trait MediaEngine {
    type Pipeline;
    type Element;

    fn create_pipeline(&mut self, name: &str) -> Result<Self::Pipeline, EngineError>;

    fn make_element(&mut self, factory: &str, name: &str) -> Result<Self::Element, EngineError>;

    fn set_property(
        &mut self,
        element: &Self::Element,
        key: &str,
        value: &str,
    ) -> Result<(), EngineError>;

    fn add(
        &mut self,
        pipeline: &Self::Pipeline,
        element: &Self::Element,
    ) -> Result<(), EngineError>;

    fn link(
        &mut self,
        upstream: &Self::Element,
        downstream: &Self::Element,
    ) -> Result<(), EngineError>;

    fn set_state(
        &mut self,
        pipeline: &Self::Pipeline,
        state: NativeState,
    ) -> Result<(), EngineError>;

    /// Attaches the notification watch; afterwards [`Self::poll_notification`]
    /// yields the pipeline's end-of-stream and error messages.
    fn watch(&mut self, pipeline: &mut Self::Pipeline) -> Result<(), EngineError>;

    /// Returns the next pending notification without blocking.
    fn poll_notification(&mut self, pipeline: &Self::Pipeline) -> Option<Notification>;

    fn release(&mut self, pipeline: Self::Pipeline);
}
