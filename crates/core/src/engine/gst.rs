use gstreamer as gst;
use gstreamer::{glib, prelude::*};

use super::{EngineError, MediaEngine, NativeState, Notification};

/// GStreamer-backed engine. The bus is polled from the caller's loop instead
/// of relying on a GLib main context.
#[derive(Debug)]
pub struct GstEngine {
    _private: (),
}

/// A GStreamer pipeline plus the bus its notifications are read from.
#[derive(Debug)]
pub struct GstPipeline {
    pipeline: gst::Pipeline,
    bus: Option<gst::Bus>,
}

impl GstEngine {
    /// Initialises GStreamer. Safe to call more than once.
    pub fn new() -> Result<Self, EngineError> {
        gst::init().map_err(|err| EngineError::backend(err.to_string()))?;
        Ok(Self { _private: () })
    }
}

impl From<NativeState> for gst::State {
    fn from(state: NativeState) -> Self {
        match state {
            NativeState::Null => gst::State::Null,
            NativeState::Paused => gst::State::Paused,
            NativeState::Playing => gst::State::Playing,
        }
    }
}

impl MediaEngine for GstEngine {
    type Pipeline = GstPipeline;
    type Element = gst::Element;

    fn create_pipeline(&mut self, name: &str) -> Result<GstPipeline, EngineError> {
        Ok(GstPipeline {
            pipeline: gst::Pipeline::with_name(name),
            bus: None,
        })
    }

    fn make_element(&mut self, factory: &str, name: &str) -> Result<gst::Element, EngineError> {
        gst::ElementFactory::make(factory)
            .name(name)
            .build()
            .map_err(|_| EngineError::UnknownFactory(factory.to_string()))
    }

    fn set_property(
        &mut self,
        element: &gst::Element,
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let pspec = element
            .find_property(key)
            .ok_or_else(|| EngineError::UnknownProperty {
                element: element.name().to_string(),
                key: key.to_string(),
            })?;

        // glib panics on writes to read-only or construct-only properties and
        // on values that do not match the property type.
        let flags = pspec.flags();
        if !flags.contains(glib::ParamFlags::WRITABLE)
            || flags.contains(glib::ParamFlags::CONSTRUCT_ONLY)
        {
            return Err(EngineError::backend(format!(
                "property `{key}` of `{}` is not writable",
                element.name()
            )));
        }

        let parsed = glib::Value::deserialize(value, pspec.value_type()).map_err(|_| {
            EngineError::backend(format!(
                "`{value}` is not a valid {} for property `{key}`",
                pspec.value_type().name()
            ))
        })?;
        element.set_property_from_value(key, &parsed);
        Ok(())
    }

    fn add(&mut self, pipeline: &GstPipeline, element: &gst::Element) -> Result<(), EngineError> {
        pipeline
            .pipeline
            .add(element)
            .map_err(|err| EngineError::backend(err.to_string()))
    }

    fn link(
        &mut self,
        upstream: &gst::Element,
        downstream: &gst::Element,
    ) -> Result<(), EngineError> {
        upstream
            .link(downstream)
            .map_err(|err| EngineError::backend(err.to_string()))
    }

    fn set_state(
        &mut self,
        pipeline: &GstPipeline,
        state: NativeState,
    ) -> Result<(), EngineError> {
        pipeline
            .pipeline
            .set_state(state.into())
            .map(|_| ())
            .map_err(|err| EngineError::backend(format!("{err:?}")))
    }

    fn watch(&mut self, pipeline: &mut GstPipeline) -> Result<(), EngineError> {
        let bus = pipeline
            .pipeline
            .bus()
            .ok_or_else(|| EngineError::backend("pipeline has no bus"))?;
        pipeline.bus = Some(bus);
        Ok(())
    }

    fn poll_notification(&mut self, pipeline: &GstPipeline) -> Option<Notification> {
        let bus = pipeline.bus.as_ref()?;
        let message = bus.pop_filtered(&[gst::MessageType::Eos, gst::MessageType::Error])?;

        match message.view() {
            gst::MessageView::Eos(_) => Some(Notification::EndOfStream),
            gst::MessageView::Error(err) => Some(Notification::Error {
                source: message
                    .src()
                    .map(|src| src.path_string().to_string())
                    .unwrap_or_default(),
                message: err.error().to_string(),
            }),
            _ => None,
        }
    }

    fn release(&mut self, pipeline: GstPipeline) {
        if let Err(err) = pipeline.pipeline.set_state(gst::State::Null) {
            tracing::warn!(?err, "failed to reset pipeline before release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(engine: &mut GstEngine) -> gst::Element {
        engine.make_element("fakesrc", "0").unwrap()
    }

    #[test]
    fn parses_values_against_the_property_type() {
        let mut engine = GstEngine::new().unwrap();
        let element = source(&mut engine);

        engine.set_property(&element, "num-buffers", "25").unwrap();
        assert_eq!(element.property::<i32>("num-buffers"), 25);
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let mut engine = GstEngine::new().unwrap();
        let element = source(&mut engine);

        let err = engine.set_property(&element, "num-buffers", "abc").unwrap_err();
        assert!(format!("{err}").contains("abc"));
    }

    #[test]
    fn read_only_property_is_an_error() {
        let mut engine = GstEngine::new().unwrap();
        let element = source(&mut engine);

        let err = engine.set_property(&element, "last-message", "x").unwrap_err();
        assert!(matches!(err, EngineError::Backend(_)));
    }

    #[test]
    fn unknown_property_is_an_error() {
        let mut engine = GstEngine::new().unwrap();
        let element = source(&mut engine);

        let err = engine.set_property(&element, "bogus", "1").unwrap_err();
        assert!(matches!(err, EngineError::UnknownProperty { .. }));
    }
}
