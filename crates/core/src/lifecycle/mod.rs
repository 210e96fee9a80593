use std::fmt;

use crate::{
    config::{ErrorPolicy, SessionConfig},
    descriptor::PipelineDescriptor,
    engine::{MediaEngine, NativeState, Notification},
    state::{PlaybackState, StateCode},
    stream::StreamKind,
    Result, SessionError,
};

/// Whether the request loop should keep running after notifications were
/// handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// The single live pipeline together with its playback bookkeeping.
#[derive(Debug)]
pub struct ActivePipeline<P> {
    handle: P,
    stream_kind: StreamKind,
    state: PlaybackState,
    elements: Vec<String>,
    faulted: bool,
}

impl<P> ActivePipeline<P> {
    pub fn stream_kind(&self) -> StreamKind {
        self.stream_kind
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Names given to the materialised elements, in link order.
    pub fn element_names(&self) -> &[String] {
        &self.elements
    }

    /// Set once the engine reported an error for this pipeline.
    pub fn faulted(&self) -> bool {
        self.faulted
    }
}

/// Owns the at-most-one active pipeline and applies state changes to it.
///
/// Building always tears the previous pipeline down first. A build that fails
/// part way releases everything it created and leaves no pipeline installed;
/// the previous one is not restored.
pub struct PipelineManager<E: MediaEngine> {
    engine: E,
    pipeline_name: String,
    on_error: ErrorPolicy,
    active: Option<ActivePipeline<E::Pipeline>>,
}

impl<E: MediaEngine> PipelineManager<E> {
    /// Creates a manager with no active pipeline. Pipelines are named after
    /// `config.pipeline_name` and engine errors are handled per `config.on_error`.
    pub fn new(engine: E, config: &SessionConfig) -> Self {
        Self {
            engine,
            pipeline_name: config.pipeline_name.clone(),
            on_error: config.on_error,
            active: None,
        }
    }

    /// The engine backing every pipeline this manager builds.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The installed pipeline, if a build has succeeded since the last teardown.
    pub fn active(&self) -> Option<&ActivePipeline<E::Pipeline>> {
        self.active.as_ref()
    }

    /// Replaces the active pipeline with one built from `descriptor`.
    pub fn build(
        &mut self,
        descriptor: PipelineDescriptor,
        stream_kind: StreamKind,
    ) -> Result<&ActivePipeline<E::Pipeline>> {
        self.teardown();

        if descriptor.is_empty() {
            return Err(SessionError::parse("pipeline descriptor has no elements"));
        }

        let mut pipeline = self.engine.create_pipeline(&self.pipeline_name)?;
        let elements = match self.populate(&mut pipeline, descriptor) {
            Ok(elements) => elements,
            Err(err) => {
                tracing::warn!(error = %err, "pipeline build aborted");
                self.engine.release(pipeline);
                return Err(err);
            }
        };

        tracing::info!(
            stream = %stream_kind,
            elements = elements.len(),
            "pipeline created"
        );
        Ok(&*self.active.insert(ActivePipeline {
            handle: pipeline,
            stream_kind,
            state: PlaybackState::Stopped,
            elements,
            faulted: false,
        }))
    }

    fn populate(
        &mut self,
        pipeline: &mut E::Pipeline,
        descriptor: PipelineDescriptor,
    ) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(descriptor.len());
        let mut previous: Option<E::Element> = None;

        for (index, spec) in descriptor.into_iter().enumerate() {
            let name = index.to_string();
            let element = self
                .engine
                .make_element(&spec.factory, &name)
                .map_err(|err| SessionError::ElementCreation {
                    factory: spec.factory.clone(),
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
            self.engine.add(pipeline, &element)?;

            for (key, value) in &spec.properties {
                tracing::debug!(element = %name, %key, %value, "setting property");
                self.engine
                    .set_property(&element, key, value)
                    .map_err(|err| SessionError::Property {
                        element: name.clone(),
                        key: key.clone(),
                        reason: err.to_string(),
                    })?;
            }

            if let Some(upstream) = &previous {
                self.engine
                    .link(upstream, &element)
                    .map_err(|err| SessionError::Link {
                        upstream: (index - 1).to_string(),
                        downstream: name.clone(),
                        reason: err.to_string(),
                    })?;
            }

            tracing::debug!(factory = %spec.factory, element = %name, "element added");
            previous = Some(element);
            names.push(name);
        }

        self.engine.watch(pipeline)?;
        Ok(names)
    }

    /// Stops and releases the active pipeline. Returns whether one existed.
    pub fn teardown(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        if let Err(err) = self.engine.set_state(&active.handle, NativeState::Null) {
            tracing::warn!(error = %err, "failed to stop pipeline during teardown");
        }
        self.engine.release(active.handle);
        tracing::info!("pipeline released");
        true
    }

    /// Applies a `ChangeState` request to the active pipeline.
    ///
    /// The tracked state only changes once the engine accepted the transition.
    pub fn change_state(&mut self, code: StateCode) -> Result<PlaybackState> {
        let active = self
            .active
            .as_mut()
            .ok_or(SessionError::NoActivePipeline)?;
        let target = code.target();

        self.engine
            .set_state(&active.handle, target.native())
            .map_err(|err| SessionError::StateChange {
                state: target.as_str(),
                reason: err.to_string(),
            })?;

        active.state = target;
        tracing::info!(state = %target, stream = %active.stream_kind, "state changed");
        Ok(target)
    }

    /// Drains pending engine notifications for the active pipeline.
    pub fn dispatch_notifications(&mut self) -> LoopControl {
        let mut control = LoopControl::Continue;
        let Some(active) = self.active.as_mut() else {
            return control;
        };

        while let Some(notification) = self.engine.poll_notification(&active.handle) {
            match notification {
                Notification::EndOfStream => {
                    tracing::info!("end of stream");
                }
                Notification::Error { source, message } => {
                    tracing::error!(%source, %message, "pipeline error");
                    active.faulted = true;
                    if self.on_error == ErrorPolicy::Quit {
                        control = LoopControl::Quit;
                    }
                }
            }

            if let Err(err) = self.engine.set_state(&active.handle, NativeState::Null) {
                tracing::warn!(error = %err, "failed to stop pipeline after notification");
            }
            active.state = PlaybackState::Stopped;
        }

        control
    }
}

impl<E: MediaEngine> fmt::Debug for PipelineManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineManager")
            .field("pipeline_name", &self.pipeline_name)
            .field("on_error", &self.on_error)
            .field("state", &self.active.as_ref().map(|active| active.state))
            .field(
                "elements",
                &self.active.as_ref().map_or(0, |active| active.elements.len()),
            )
            .finish()
    }
}

impl<E: MediaEngine> Drop for PipelineManager<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor,
        engine::{MemoryEngine, Notification},
        tokenizer,
    };

    fn descriptor(raw: &str) -> PipelineDescriptor {
        descriptor::build(tokenizer::split(raw, '!').unwrap()).unwrap()
    }

    fn new_manager(engine: &MemoryEngine) -> PipelineManager<MemoryEngine> {
        PipelineManager::new(engine.clone(), &SessionConfig::default())
    }

    #[test]
    fn builds_a_linear_chain() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);

        let active = manager
            .build(
                descriptor("videotestsrc!0!colorspace!0!videosink!0"),
                StreamKind::Video,
            )
            .unwrap();
        assert_eq!(active.state(), PlaybackState::Stopped);
        assert_eq!(active.stream_kind(), StreamKind::Video);
        assert_eq!(active.element_names(), ["0", "1", "2"]);

        let pipeline = &engine.pipelines()[0];
        assert!(pipeline.watched);
        assert_eq!(
            pipeline.links,
            vec![
                ("0".to_string(), "1".to_string()),
                ("1".to_string(), "2".to_string())
            ]
        );
        assert!(pipeline
            .elements
            .iter()
            .all(|element| element.properties.is_empty()));
    }

    #[test]
    fn applies_properties_to_their_element() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);
        manager
            .build(
                descriptor("filesrc!1!location!clip.mp4!decoder!0"),
                StreamKind::Audio,
            )
            .unwrap();

        let pipeline = &engine.pipelines()[0];
        assert_eq!(pipeline.elements[0].factory, "filesrc");
        assert_eq!(
            pipeline.elements[0].properties,
            vec![("location".to_string(), "clip.mp4".to_string())]
        );
        assert!(pipeline.elements[1].properties.is_empty());
    }

    #[test]
    fn rebuilding_releases_the_previous_pipeline() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);
        manager
            .build(descriptor("a!0!b!0"), StreamKind::Audio)
            .unwrap();
        manager
            .build(descriptor("c!0!d!0!e!0"), StreamKind::Video)
            .unwrap();

        let pipelines = engine.pipelines();
        assert_eq!(pipelines.len(), 2);
        assert!(pipelines[0].released);
        assert_eq!(pipelines[0].state(), NativeState::Null);
        assert_eq!(engine.live_pipelines().len(), 1);
        assert_eq!(engine.live_element_count(), 3);
    }

    #[test]
    fn failed_element_aborts_the_whole_build() {
        let engine = MemoryEngine::new().without_factory("dvddemux");
        let mut manager = new_manager(&engine);
        manager
            .build(descriptor("a!0!b!0"), StreamKind::Audio)
            .unwrap();

        let err = manager
            .build(
                descriptor("filesrc!0!dvddemux!0!fakesink!0"),
                StreamKind::Video,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::ElementCreation { ref factory, ref name, .. }
                if factory == "dvddemux" && name == "1"
        ));
        assert!(manager.active().is_none());
        assert!(engine.live_pipelines().is_empty());
        assert_eq!(engine.live_element_count(), 0);
    }

    #[test]
    fn property_and_link_failures_leave_nothing_behind() {
        let engine = MemoryEngine::new().rejecting_property("bogus");
        let mut manager = new_manager(&engine);
        let err = manager
            .build(descriptor("src!1!bogus!1!sink!0"), StreamKind::Audio)
            .unwrap_err();
        assert!(matches!(err, SessionError::Property { ref key, .. } if key == "bogus"));
        assert!(manager.active().is_none());

        let engine = MemoryEngine::new().rejecting_links_into("sink");
        let mut manager = new_manager(&engine);
        let err = manager
            .build(descriptor("src!0!sink!0"), StreamKind::Audio)
            .unwrap_err();
        assert!(matches!(err, SessionError::Link { .. }));
        assert_eq!(engine.live_element_count(), 0);
    }

    #[test]
    fn change_state_requires_a_pipeline() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);

        let err = manager.change_state(StateCode::Play).unwrap_err();
        assert!(matches!(err, SessionError::NoActivePipeline));
        assert!(engine.pipelines().is_empty());
    }

    #[test]
    fn forwards_transitions_to_the_engine() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);
        manager
            .build(descriptor("a!0!b!0"), StreamKind::Audio)
            .unwrap();

        assert_eq!(
            manager.change_state(StateCode::Play).unwrap(),
            PlaybackState::Playing
        );
        assert_eq!(
            manager.change_state(StateCode::Pause).unwrap(),
            PlaybackState::Paused
        );
        assert_eq!(
            manager.change_state(StateCode::Stop).unwrap(),
            PlaybackState::Stopped
        );

        assert_eq!(
            engine.pipelines()[0].states,
            vec![NativeState::Playing, NativeState::Paused, NativeState::Null]
        );
    }

    #[test]
    fn end_of_stream_stops_the_pipeline() {
        let engine = MemoryEngine::new();
        let mut manager = new_manager(&engine);
        manager
            .build(descriptor("a!0!b!0"), StreamKind::Audio)
            .unwrap();
        manager.change_state(StateCode::Play).unwrap();

        assert!(engine.emit(Notification::EndOfStream));
        assert_eq!(manager.dispatch_notifications(), LoopControl::Continue);

        let active = manager.active().unwrap();
        assert_eq!(active.state(), PlaybackState::Stopped);
        assert!(!active.faulted());
        assert_eq!(engine.pipelines()[0].state(), NativeState::Null);
    }

    #[test]
    fn errors_fault_the_pipeline_and_honour_the_policy() {
        let engine = MemoryEngine::new();
        let config = SessionConfig {
            on_error: ErrorPolicy::Quit,
            ..Default::default()
        };
        let mut manager = PipelineManager::new(engine.clone(), &config);
        manager
            .build(descriptor("a!0!b!0"), StreamKind::Audio)
            .unwrap();
        manager.change_state(StateCode::Play).unwrap();

        engine.emit(Notification::Error {
            source: "0".to_string(),
            message: "resource busy".to_string(),
        });
        assert_eq!(manager.dispatch_notifications(), LoopControl::Quit);
        assert!(manager.active().unwrap().faulted());

        // A faulted pipeline is replaced like any other.
        let active = manager.build(descriptor("c!0"), StreamKind::Video).unwrap();
        assert!(!active.faulted());
    }

    #[test]
    fn dropping_the_manager_releases_the_pipeline() {
        let engine = MemoryEngine::new();
        {
            let mut manager = new_manager(&engine);
            manager.build(descriptor("a!0"), StreamKind::Audio).unwrap();
        }
        assert!(engine.live_pipelines().is_empty());
    }
}
