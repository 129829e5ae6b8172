use alloc::string::String;
use alloc::sync::Arc;
use core::any::TypeId;

use crate::error::AccelError;
use crate::sink::DocSink;
use crate::value::AnyValue;

// -----------------------------------------------------------------------------
// ValueSerializer

/// Serializes one property value into a [`DocSink`].
///
/// A serializer is either configured statically on a property writer or
/// resolved at runtime through the [`SerializerResolver`]. The primitive and
/// string hooks default to direct sink writes, so most implementations only
/// provide [`serialize`](Self::serialize).
pub trait ValueSerializer: Send + Sync {
    /// Serializes an object-kind value.
    fn serialize(
        &self,
        value: &dyn AnyValue,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;

    /// Serializes an `i32` value; defaults to a direct sink write.
    fn serialize_i32(
        &self,
        value: i32,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_i32(value)
    }

    /// Serializes an `i64` value; defaults to a direct sink write.
    fn serialize_i64(
        &self,
        value: i64,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_i64(value)
    }

    /// Serializes a string value; defaults to a direct sink write.
    fn serialize_str(
        &self,
        value: &str,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_str(value)
    }

    /// Serializes the representation this serializer uses for null.
    ///
    /// Only invoked when the serializer is configured as a property's
    /// null-serializer.
    fn serialize_null(
        &self,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_null()
    }

    /// Whether `value` counts as empty for skip-if-empty suppression.
    fn is_empty(&self, _value: &dyn AnyValue) -> bool {
        false
    }
}

// -----------------------------------------------------------------------------
// SerdeSerializer

/// The bundled serializer: writes the value through the sink's erased-serde
/// surface. Used whenever the host configures nothing more specific.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerdeSerializer;

impl ValueSerializer for SerdeSerializer {
    fn serialize(
        &self,
        value: &dyn AnyValue,
        sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        sink.write_value(value.as_serialize())
    }
}

// -----------------------------------------------------------------------------
// TypeDiscriminator

/// Emits type information around a polymorphic value.
///
/// When configured on an object writer the value is emitted as
/// `write_prefix`, the serialized value, then `write_suffix`.
pub trait TypeDiscriminator: Send + Sync {
    fn write_prefix(
        &self,
        value: &dyn AnyValue,
        sink: &mut dyn DocSink,
    ) -> Result<(), AccelError>;

    fn write_suffix(
        &self,
        value: &dyn AnyValue,
        sink: &mut dyn DocSink,
    ) -> Result<(), AccelError>;
}

// -----------------------------------------------------------------------------
// SerializerResolver

/// Resolves a serializer for a runtime value type.
///
/// Find-and-cache semantics: resolution may be arbitrarily expensive, and
/// callers are expected to cache the result keyed by the runtime [`TypeId`]
/// (the object writers do so in their per-property snapshot).
pub trait SerializerResolver: Send + Sync {
    fn find_serializer(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Arc<dyn ValueSerializer>, AccelError>;
}

/// The bundled resolver: every runtime type serializes through
/// [`SerdeSerializer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SerdeResolver;

impl SerializerResolver for SerdeResolver {
    fn find_serializer(
        &self,
        _type_id: TypeId,
        _type_name: &'static str,
    ) -> Result<Arc<dyn ValueSerializer>, AccelError> {
        Ok(Arc::new(SerdeSerializer))
    }
}

// -----------------------------------------------------------------------------
// SelfRefPolicy

/// Policy invoked when a property value is the instance currently being
/// serialized, before anything is emitted for that property.
///
/// Returning `Ok(())` lets the writer proceed with normal emission.
pub trait SelfRefPolicy: Send + Sync {
    fn on_self_reference(
        &self,
        property: &str,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;
}

/// Aborts the write with [`AccelError::SelfReference`]. The default policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailOnSelfReference;

impl SelfRefPolicy for FailOnSelfReference {
    fn on_self_reference(
        &self,
        property: &str,
        _sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        Err(AccelError::SelfReference {
            property: String::from(property),
        })
    }
}

/// Logs the cycle and lets emission proceed.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowSelfReference;

impl SelfRefPolicy for AllowSelfReference {
    fn on_self_reference(
        &self,
        property: &str,
        _sink: &mut dyn DocSink,
        _ctx: &SerializeContext,
    ) -> Result<(), AccelError> {
        log::warn!("property `{property}` refers back to its own instance; emitting anyway");
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// SerializeContext

/// Per-run serialization environment shared by all property writers.
///
/// Holds the serializer resolver, the self-reference policy and the sequence
/// shape of the active output (whether suppressed elements must keep their
/// position with a placeholder). The context itself is read-only during a
/// run and may be shared freely across threads.
///
/// # Examples
///
/// ```
/// use reheat::{AllowSelfReference, SerializeContext};
///
/// let ctx = SerializeContext::new()
///     .with_self_ref_policy(std::sync::Arc::new(AllowSelfReference))
///     .with_positional_placeholders(true);
///
/// assert!(ctx.requires_placeholders());
/// ```
pub struct SerializeContext {
    resolver: Arc<dyn SerializerResolver>,
    self_ref: Arc<dyn SelfRefPolicy>,
    positional_placeholders: bool,
}

impl Default for SerializeContext {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl SerializeContext {
    /// Creates a context with the bundled resolver and the fail-fast
    /// self-reference policy.
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(SerdeResolver),
            self_ref: Arc::new(FailOnSelfReference),
            positional_placeholders: false,
        }
    }

    /// Replaces the serializer resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn SerializerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the self-reference policy.
    pub fn with_self_ref_policy(mut self, policy: Arc<dyn SelfRefPolicy>) -> Self {
        self.self_ref = policy;
        self
    }

    /// Declares whether suppressed sequence elements must keep their
    /// position with a placeholder.
    pub fn with_positional_placeholders(mut self, required: bool) -> Self {
        self.positional_placeholders = required;
        self
    }

    /// Whether the active sequence context requires positional placeholders.
    #[inline]
    pub fn requires_placeholders(&self) -> bool {
        self.positional_placeholders
    }

    /// Resolves a serializer for a runtime value type.
    pub fn find_serializer(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Arc<dyn ValueSerializer>, AccelError> {
        self.resolver.find_serializer(type_id, type_name)
    }

    /// Writes the context's default null representation.
    #[inline]
    pub fn default_null(&self, sink: &mut dyn DocSink) -> Result<(), AccelError> {
        sink.write_null()
    }

    /// Runs the configured self-reference policy for `property`.
    pub fn handle_self_reference(
        &self,
        property: &str,
        sink: &mut dyn DocSink,
    ) -> Result<(), AccelError> {
        self.self_ref.on_self_reference(property, sink, self)
    }

    /// Diagnostics hook for a fast-path access-denied event.
    ///
    /// Reported once per event; the affected call is retried through the
    /// fallback writer by the caller.
    pub(crate) fn report_access_problem(&self, owner: &str, err: &AccelError) {
        log::warn!("fast-path read rejected on `{owner}`: {err}; retrying through fallback writer");
    }
}
