//! Accelerated property writers.
//!
//! Eight variants cover the (value kind × field/getter) grid. Each writer
//! wraps the host's generic writer for the same property as its
//! [`FallbackWriter`] and reads through the synthesized accessor instead of
//! the host's reflective path. On an access-denied read the writer reports
//! the event and delegates the call to the fallback; the wiring errors stay
//! fatal.

use core::any::Any;

use crate::error::AccelError;
use crate::ser::SerializeContext;
use crate::sink::DocSink;

mod object;
mod primitive;
mod string;

pub use object::{ObjectFieldWriter, ObjectGetterWriter};
pub use primitive::{IntFieldWriter, IntGetterWriter, LongFieldWriter, LongGetterWriter};
pub use string::{StringFieldWriter, StringGetterWriter};

// -----------------------------------------------------------------------------
// PropertyWriter

/// The uniform surface of an accelerated property writer.
///
/// `serialize_as_field` emits the property in field position (name plus
/// value); `serialize_as_element` emits the value alone in sequence
/// position. A suppressed property touches the sink not at all in field
/// position, and keeps its slot with a placeholder in sequence position when
/// the context requires it.
pub trait PropertyWriter: Send + Sync {
    /// The document field name of the property.
    fn name(&self) -> &str;

    /// Emits the property in field position.
    fn serialize_as_field(
        &self,
        instance: &dyn Any,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;

    /// Emits the property value in sequence position.
    fn serialize_as_element(
        &self,
        instance: &dyn Any,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;
}

// -----------------------------------------------------------------------------
// FallbackWriter

/// The host's generic writer for a property, retried when the accelerated
/// read path is rejected.
///
/// The fallback owns the complete write semantics for the property; after
/// delegation the accelerated writer adds nothing of its own for that call.
pub trait FallbackWriter: Send + Sync {
    /// Emits the property in field position through the generic path.
    fn serialize_as_field(
        &self,
        instance: &dyn Any,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;

    /// Emits the property value in sequence position through the generic
    /// path.
    fn serialize_as_element(
        &self,
        instance: &dyn Any,
        sink: &mut dyn DocSink,
        ctx: &SerializeContext,
    ) -> Result<(), AccelError>;
}
