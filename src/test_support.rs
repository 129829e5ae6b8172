//! Shared fixtures for the unit tests: an event-recording sink and stub
//! fallback writers.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;

use crate::error::AccelError;
use crate::ser::SerializeContext;
use crate::sink::DocSink;
use crate::writer::FallbackWriter;

/// One observed sink call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    FieldName(String),
    I32(i32),
    I64(i64),
    Str(String),
    Null,
    Value(serde_json::Value),
    Placeholder,
}

/// A sink that records every call for assertion.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) events: Vec<Event>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl DocSink for RecordingSink {
    fn write_field_name(&mut self, name: &str) -> Result<(), AccelError> {
        self.events.push(Event::FieldName(name.to_string()));
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), AccelError> {
        self.events.push(Event::I32(value));
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), AccelError> {
        self.events.push(Event::I64(value));
        Ok(())
    }

    fn write_str(&mut self, value: &str) -> Result<(), AccelError> {
        self.events.push(Event::Str(value.to_string()));
        Ok(())
    }

    fn write_null(&mut self) -> Result<(), AccelError> {
        self.events.push(Event::Null);
        Ok(())
    }

    fn write_value(&mut self, value: &dyn erased_serde::Serialize) -> Result<(), AccelError> {
        let json = serde_json::to_value(value).map_err(|err| AccelError::Sink(err.to_string()))?;
        self.events.push(Event::Value(json));
        Ok(())
    }

    fn write_placeholder(&mut self) -> Result<(), AccelError> {
        self.events.push(Event::Placeholder);
        Ok(())
    }
}

/// A fallback that emits nothing; for tests that never reach it.
pub(crate) struct NoopFallback;

impl FallbackWriter for NoopFallback {
    fn serialize_as_field(
        &self,
        _instance: &dyn Any,
        _sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        Ok(())
    }

    fn serialize_as_element(
        &self,
        _instance: &dyn Any,
        _sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        Ok(())
    }
}

/// A fallback that writes a recognizable marker so tests can tell which
/// path produced the output.
pub(crate) struct MarkerFallback;

impl MarkerFallback {
    pub(crate) const TAG: &'static str = "via-fallback";
}

impl FallbackWriter for MarkerFallback {
    fn serialize_as_field(
        &self,
        _instance: &dyn Any,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_field_name(Self::TAG)?;
        sink.write_str(Self::TAG)
    }

    fn serialize_as_element(
        &self,
        _instance: &dyn Any,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_str(Self::TAG)
    }
}
