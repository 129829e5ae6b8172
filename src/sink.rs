use crate::error::AccelError;

// -----------------------------------------------------------------------------
// DocSink

/// The abstract document write surface the property writers emit into.
///
/// The sink defines no document format of its own; a JSON generator, a binary
/// encoder and an event recorder are all valid implementations. Writers only
/// rely on the call-ordering contract: a field-position emission is always
/// `write_field_name` directly followed by exactly one value write, and a
/// suppressed property touches the sink not at all.
pub trait DocSink {
    /// Writes the name of the field about to be emitted.
    fn write_field_name(&mut self, name: &str) -> Result<(), AccelError>;

    /// Writes a 32-bit integer value.
    fn write_i32(&mut self, value: i32) -> Result<(), AccelError>;

    /// Writes a 64-bit integer value.
    fn write_i64(&mut self, value: i64) -> Result<(), AccelError>;

    /// Writes a string value.
    fn write_str(&mut self, value: &str) -> Result<(), AccelError>;

    /// Writes the document's null representation.
    fn write_null(&mut self) -> Result<(), AccelError>;

    /// Writes an arbitrary serializable value.
    fn write_value(&mut self, value: &dyn erased_serde::Serialize) -> Result<(), AccelError>;

    /// Writes a positional placeholder for a suppressed sequence element.
    ///
    /// Defaults to the null representation; sinks with a richer notion of
    /// "absent element" may override this.
    fn write_placeholder(&mut self) -> Result<(), AccelError> {
        self.write_null()
    }
}
