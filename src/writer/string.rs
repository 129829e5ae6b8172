use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::accessor::{MemberRef, PropertyAccessor, PropertyDef, Suppressable};
use crate::error::AccelError;
use crate::ser::{SerializeContext, ValueSerializer};
use crate::sink::DocSink;

use super::{FallbackWriter, PropertyWriter};

/// String suppression resolved at writer construction.
#[derive(Clone)]
enum StrSuppress {
    /// Skip empty strings.
    Empty,
    /// Skip strings equal to the sentinel.
    Text(Box<str>),
}

impl StrSuppress {
    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Empty => text.is_empty(),
            Self::Text(sentinel) => **sentinel == *text,
        }
    }
}

macro_rules! string_writer {
    (
        $(#[$doc:meta])*
        $name:ident {
            read: $read:ident,
            label: $label:literal,
        }
    ) => {
        $(#[$doc])*
        pub struct $name {
            name: Cow<'static, str>,
            member: MemberRef,
            accessor: Option<Arc<dyn PropertyAccessor>>,
            index: usize,
            serializer: Option<Arc<dyn ValueSerializer>>,
            null_serializer: Option<Arc<dyn ValueSerializer>>,
            suppress_nulls: bool,
            suppress: Option<StrSuppress>,
            fallback: Arc<dyn FallbackWriter>,
            broken: AtomicBool,
        }

        impl $name {
            pub(crate) fn new(def: PropertyDef, index: usize) -> Result<Self, AccelError> {
                let suppress = match def.suppress {
                    None => None,
                    Some(Suppressable::Empty) => Some(StrSuppress::Empty),
                    Some(Suppressable::Str(sentinel)) => Some(StrSuppress::Text(sentinel)),
                    Some(other) => {
                        return Err(AccelError::Integration(format!(
                            "{} property `{}` cannot use suppression marker {other:?}",
                            $label, def.member,
                        )));
                    }
                };
                Ok(Self {
                    name: def.name,
                    member: def.member,
                    accessor: None,
                    index,
                    serializer: def.serializer,
                    null_serializer: def.null_serializer,
                    suppress_nulls: def.suppress_nulls,
                    suppress,
                    fallback: def.fallback,
                    broken: AtomicBool::new(false),
                })
            }

            fn duplicate(&self) -> Self {
                Self {
                    name: self.name.clone(),
                    member: self.member,
                    accessor: self.accessor.clone(),
                    index: self.index,
                    serializer: self.serializer.clone(),
                    null_serializer: self.null_serializer.clone(),
                    suppress_nulls: self.suppress_nulls,
                    suppress: self.suppress.clone(),
                    fallback: Arc::clone(&self.fallback),
                    broken: AtomicBool::new(false),
                }
            }

            /// Returns a copy of this writer bound to the synthesized
            /// accessor for its owning type.
            #[must_use]
            pub fn with_accessor(&self, accessor: Arc<dyn PropertyAccessor>) -> Self {
                let mut writer = self.duplicate();
                writer.accessor = Some(accessor);
                writer
            }

            /// Returns a copy of this writer with a static serializer.
            #[must_use]
            pub fn with_serializer(&self, serializer: Arc<dyn ValueSerializer>) -> Self {
                let mut writer = self.duplicate();
                writer.serializer = Some(serializer);
                writer
            }

            /// The member this writer reads.
            #[inline]
            pub const fn member(&self) -> MemberRef {
                self.member
            }

            /// The dispatch index of this property within its bucket.
            #[inline]
            pub const fn index(&self) -> usize {
                self.index
            }

            /// Whether the fast path has been permanently disabled.
            #[inline]
            pub fn is_broken(&self) -> bool {
                self.broken.load(Ordering::Relaxed)
            }

            fn write_null_field(
                &self,
                sink: &mut dyn DocSink,
                ctx: &SerializeContext,
            ) -> Result<(), AccelError> {
                if let Some(null_serializer) = &self.null_serializer {
                    sink.write_field_name(&self.name)?;
                    null_serializer.serialize_null(sink, ctx)
                } else if self.suppress_nulls {
                    Ok(())
                } else {
                    sink.write_field_name(&self.name)?;
                    ctx.default_null(sink)
                }
            }

            fn write_null_element(
                &self,
                sink: &mut dyn DocSink,
                ctx: &SerializeContext,
            ) -> Result<(), AccelError> {
                if let Some(null_serializer) = &self.null_serializer {
                    null_serializer.serialize_null(sink, ctx)
                } else if self.suppress_nulls {
                    if ctx.requires_placeholders() {
                        sink.write_placeholder()
                    } else {
                        Ok(())
                    }
                } else {
                    ctx.default_null(sink)
                }
            }
        }

        impl PropertyWriter for $name {
            #[inline]
            fn name(&self) -> &str {
                &self.name
            }

            fn serialize_as_field(
                &self,
                instance: &dyn Any,
                sink: &mut dyn DocSink,
                ctx: &SerializeContext,
            ) -> Result<(), AccelError> {
                if self.broken.load(Ordering::Relaxed) {
                    return self.fallback.serialize_as_field(instance, sink, ctx);
                }
                let Some(accessor) = &self.accessor else {
                    return Err(AccelError::Integration(format!(
                        "writer for `{}` was never bound to an accessor",
                        self.member,
                    )));
                };
                let value = match accessor.$read(instance, self.index) {
                    Ok(value) => value,
                    Err(err) if err.is_access_denied() => {
                        ctx.report_access_problem(&self.name, &err);
                        self.broken.store(true, Ordering::Relaxed);
                        return self.fallback.serialize_as_field(instance, sink, ctx);
                    }
                    Err(err) => return Err(err),
                };
                match value {
                    None => self.write_null_field(sink, ctx),
                    Some(text) => {
                        if self.suppress.as_ref().is_some_and(|s| s.matches(text)) {
                            return Ok(());
                        }
                        sink.write_field_name(&self.name)?;
                        match &self.serializer {
                            Some(serializer) => serializer.serialize_str(text, sink, ctx),
                            None => sink.write_str(text),
                        }
                    }
                }
            }

            fn serialize_as_element(
                &self,
                instance: &dyn Any,
                sink: &mut dyn DocSink,
                ctx: &SerializeContext,
            ) -> Result<(), AccelError> {
                if self.broken.load(Ordering::Relaxed) {
                    return self.fallback.serialize_as_element(instance, sink, ctx);
                }
                let Some(accessor) = &self.accessor else {
                    return Err(AccelError::Integration(format!(
                        "writer for `{}` was never bound to an accessor",
                        self.member,
                    )));
                };
                let value = match accessor.$read(instance, self.index) {
                    Ok(value) => value,
                    Err(err) if err.is_access_denied() => {
                        ctx.report_access_problem(&self.name, &err);
                        self.broken.store(true, Ordering::Relaxed);
                        return self.fallback.serialize_as_element(instance, sink, ctx);
                    }
                    Err(err) => return Err(err),
                };
                match value {
                    None => self.write_null_element(sink, ctx),
                    Some(text) => {
                        if self.suppress.as_ref().is_some_and(|s| s.matches(text)) {
                            if ctx.requires_placeholders() {
                                return sink.write_placeholder();
                            }
                            return Ok(());
                        }
                        match &self.serializer {
                            Some(serializer) => serializer.serialize_str(text, sink, ctx),
                            None => sink.write_str(text),
                        }
                    }
                }
            }
        }
    };
}

string_writer! {
    /// Accelerated writer for a nullable string property backed by a field.
    StringFieldWriter {
        read: str_field,
        label: "str field",
    }
}

string_writer! {
    /// Accelerated writer for a nullable string property backed by a getter.
    StringGetterWriter {
        read: str_getter,
        label: "str getter",
    }
}
