use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{EngineError, MediaEngine, NativeState, Notification};

/// In-process engine that records every call instead of processing media.
///
/// Clones share the same state, so a test can keep a handle while the
/// lifecycle manager owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    pipelines: Vec<PipelineSnapshot>,
    elements: Vec<ElementRecord>,
    missing_factories: HashSet<String>,
    rejected_properties: HashSet<String>,
    rejected_links: HashSet<String>,
    pending: VecDeque<(usize, Notification)>,
}

#[derive(Debug)]
struct ElementRecord {
    snapshot: ElementSnapshot,
    pipeline: Option<usize>,
}

/// Opaque pipeline handle issued by [`MemoryEngine`].
#[derive(Debug)]
pub struct MemoryPipeline {
    id: usize,
}

/// Opaque element handle issued by [`MemoryEngine`].
#[derive(Debug)]
pub struct MemoryElement {
    id: usize,
}

/// Recorded view of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub name: String,
    pub factory: String,
    pub properties: Vec<(String, String)>,
}

/// Recorded view of one pipeline, including everything done to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub name: String,
    pub elements: Vec<ElementSnapshot>,
    pub links: Vec<(String, String)>,
    pub states: Vec<NativeState>,
    pub watched: bool,
    pub released: bool,
}

impl PipelineSnapshot {
    /// Last state the pipeline was driven to; pipelines start in `Null`.
    pub fn state(&self) -> NativeState {
        self.states.last().copied().unwrap_or(NativeState::Null)
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes [`MediaEngine::make_element`] fail for `factory`.
    pub fn without_factory(self, factory: impl Into<String>) -> Self {
        self.lock().missing_factories.insert(factory.into());
        self
    }

    /// Makes [`MediaEngine::set_property`] fail for `key`.
    pub fn rejecting_property(self, key: impl Into<String>) -> Self {
        self.lock().rejected_properties.insert(key.into());
        self
    }

    /// Makes linking into elements created from `factory` fail.
    pub fn rejecting_links_into(self, factory: impl Into<String>) -> Self {
        self.lock().rejected_links.insert(factory.into());
        self
    }

    /// Queues a notification on the most recently watched live pipeline.
    /// Returns `false` when no such pipeline exists.
    pub fn emit(&self, notification: Notification) -> bool {
        let mut state = self.lock();
        let target = state
            .pipelines
            .iter()
            .rposition(|pipeline| pipeline.watched && !pipeline.released);
        match target {
            Some(id) => {
                state.pending.push_back((id, notification));
                true
            }
            None => false,
        }
    }

    /// Every pipeline ever created, in creation order.
    pub fn pipelines(&self) -> Vec<PipelineSnapshot> {
        let state = self.lock();
        state
            .pipelines
            .iter()
            .enumerate()
            .map(|(id, pipeline)| state.snapshot(id, pipeline))
            .collect()
    }

    /// Pipelines that have been created and not yet released.
    pub fn live_pipelines(&self) -> Vec<PipelineSnapshot> {
        self.pipelines()
            .into_iter()
            .filter(|pipeline| !pipeline.released)
            .collect()
    }

    /// Elements that have not been freed, whether or not they were added to a
    /// pipeline.
    pub fn live_element_count(&self) -> usize {
        let state = self.lock();
        state
            .elements
            .iter()
            .filter(|element| match element.pipeline {
                Some(id) => !state.pipelines[id].released,
                None => true,
            })
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn snapshot(&self, id: usize, pipeline: &PipelineSnapshot) -> PipelineSnapshot {
        let mut snapshot = pipeline.clone();
        snapshot.elements = self
            .elements
            .iter()
            .filter(|element| element.pipeline == Some(id))
            .map(|element| element.snapshot.clone())
            .collect();
        snapshot
    }

    fn live_pipeline(&self, id: usize) -> Result<&PipelineSnapshot, EngineError> {
        match self.pipelines.get(id) {
            Some(pipeline) if !pipeline.released => Ok(pipeline),
            Some(pipeline) => Err(EngineError::backend(format!(
                "pipeline `{}` has been released",
                pipeline.name
            ))),
            None => Err(EngineError::backend(format!("unknown pipeline {id}"))),
        }
    }
}

impl MediaEngine for MemoryEngine {
    type Pipeline = MemoryPipeline;
    type Element = MemoryElement;

    fn create_pipeline(&mut self, name: &str) -> Result<MemoryPipeline, EngineError> {
        let mut state = self.lock();
        state.pipelines.push(PipelineSnapshot {
            name: name.to_string(),
            elements: Vec::new(),
            links: Vec::new(),
            states: Vec::new(),
            watched: false,
            released: false,
        });
        Ok(MemoryPipeline {
            id: state.pipelines.len() - 1,
        })
    }

    fn make_element(&mut self, factory: &str, name: &str) -> Result<MemoryElement, EngineError> {
        let mut state = self.lock();
        if state.missing_factories.contains(factory) {
            return Err(EngineError::UnknownFactory(factory.to_string()));
        }
        state.elements.push(ElementRecord {
            snapshot: ElementSnapshot {
                name: name.to_string(),
                factory: factory.to_string(),
                properties: Vec::new(),
            },
            pipeline: None,
        });
        Ok(MemoryElement {
            id: state.elements.len() - 1,
        })
    }

    fn set_property(
        &mut self,
        element: &MemoryElement,
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.rejected_properties.contains(key) {
            return Err(EngineError::UnknownProperty {
                element: state.elements[element.id].snapshot.name.clone(),
                key: key.to_string(),
            });
        }
        state.elements[element.id]
            .snapshot
            .properties
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn add(
        &mut self,
        pipeline: &MemoryPipeline,
        element: &MemoryElement,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.live_pipeline(pipeline.id)?;
        let record = &mut state.elements[element.id];
        if record.pipeline.is_some() {
            return Err(EngineError::backend(format!(
                "element `{}` already has a parent",
                record.snapshot.name
            )));
        }
        record.pipeline = Some(pipeline.id);
        Ok(())
    }

    fn link(
        &mut self,
        upstream: &MemoryElement,
        downstream: &MemoryElement,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        let from = &state.elements[upstream.id];
        let to = &state.elements[downstream.id];
        if state.rejected_links.contains(&to.snapshot.factory) {
            return Err(EngineError::backend(format!(
                "`{}` has no compatible sink pad",
                to.snapshot.factory
            )));
        }
        let Some(id) = from.pipeline.filter(|id| to.pipeline == Some(*id)) else {
            return Err(EngineError::backend("elements must share a pipeline to be linked"));
        };
        let link = (from.snapshot.name.clone(), to.snapshot.name.clone());
        state.pipelines[id].links.push(link);
        Ok(())
    }

    fn set_state(
        &mut self,
        pipeline: &MemoryPipeline,
        target: NativeState,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.live_pipeline(pipeline.id)?;
        state.pipelines[pipeline.id].states.push(target);
        Ok(())
    }

    fn watch(&mut self, pipeline: &mut MemoryPipeline) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.live_pipeline(pipeline.id)?;
        state.pipelines[pipeline.id].watched = true;
        Ok(())
    }

    fn poll_notification(&mut self, pipeline: &MemoryPipeline) -> Option<Notification> {
        let mut state = self.lock();
        let index = state
            .pending
            .iter()
            .position(|(id, _)| *id == pipeline.id)?;
        state.pending.remove(index).map(|(_, notification)| notification)
    }

    fn release(&mut self, pipeline: MemoryPipeline) {
        let mut state = self.lock();
        if let Some(snapshot) = state.pipelines.get_mut(pipeline.id) {
            snapshot.released = true;
        }
        state.pending.retain(|(id, _)| *id != pipeline.id);
    }
}
