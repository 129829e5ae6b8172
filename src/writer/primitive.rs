use alloc::borrow::Cow;
use alloc::format;
use alloc::sync::Arc;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::accessor::{MemberRef, PropertyAccessor, PropertyDef};
use crate::error::AccelError;
use crate::ser::{SerializeContext, ValueSerializer};
use crate::sink::DocSink;

use super::{FallbackWriter, PropertyWriter};

macro_rules! primitive_writer {
    (
        $(#[$doc:meta])*
        $name:ident {
            value: $value:ty,
            read: $read:ident,
            write: $write:ident,
            hook: $hook:ident,
            sentinel: $sentinel:ident,
            label: $label:literal,
            mark_broken: $mark:literal,
        }
    ) => {
        $(#[$doc])*
        pub struct $name {
            name: Cow<'static, str>,
            member: MemberRef,
            accessor: Option<Arc<dyn PropertyAccessor>>,
            index: usize,
            serializer: Option<Arc<dyn ValueSerializer>>,
            sentinel: Option<$value>,
            fallback: Arc<dyn FallbackWriter>,
            broken: AtomicBool,
        }

        impl $name {
            pub(crate) fn new(def: PropertyDef, index: usize) -> Result<Self, AccelError> {
                let sentinel = match def.suppress {
                    None => None,
                    Some(crate::accessor::Suppressable::$sentinel(v)) => Some(v),
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
                    sentinel,
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
                    sentinel: self.sentinel,
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

            fn read(
                &self,
                instance: &dyn Any,
                ctx: &SerializeContext,
            ) -> Result<Result<$value, ()>, AccelError> {
                let Some(accessor) = &self.accessor else {
                    return Err(AccelError::Integration(format!(
                        "writer for `{}` was never bound to an accessor",
                        self.member,
                    )));
                };
                match accessor.$read(instance, self.index) {
                    Ok(value) => Ok(Ok(value)),
                    Err(err) if err.is_access_denied() => {
                        ctx.report_access_problem(&self.name, &err);
                        if $mark {
                            self.broken.store(true, Ordering::Relaxed);
                        }
                        Ok(Err(()))
                    }
                    Err(err) => Err(err),
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
                let value = match self.read(instance, ctx)? {
                    Ok(value) => value,
                    Err(()) => return self.fallback.serialize_as_field(instance, sink, ctx),
                };
                if self.sentinel == Some(value) {
                    return Ok(());
                }
                sink.write_field_name(&self.name)?;
                match &self.serializer {
                    Some(serializer) => serializer.$hook(value, sink, ctx),
                    None => sink.$write(value),
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
                let value = match self.read(instance, ctx)? {
                    Ok(value) => value,
                    Err(()) => return self.fallback.serialize_as_element(instance, sink, ctx),
                };
                if self.sentinel == Some(value) {
                    if ctx.requires_placeholders() {
                        return sink.write_placeholder();
                    }
                    return Ok(());
                }
                match &self.serializer {
                    Some(serializer) => serializer.$hook(value, sink, ctx),
                    None => sink.$write(value),
                }
            }
        }
    };
}

primitive_writer! {
    /// Accelerated writer for an `i32` property backed by a field.
    IntFieldWriter {
        value: i32,
        read: int_field,
        write: write_i32,
        hook: serialize_i32,
        sentinel: Int,
        label: "int field",
        mark_broken: true,
    }
}

primitive_writer! {
    /// Accelerated writer for an `i32` property backed by a getter.
    IntGetterWriter {
        value: i32,
        read: int_getter,
        write: write_i32,
        hook: serialize_i32,
        sentinel: Int,
        label: "int getter",
        mark_broken: true,
    }
}

primitive_writer! {
    /// Accelerated writer for an `i64` property backed by a field.
    LongFieldWriter {
        value: i64,
        read: long_field,
        write: write_i64,
        hook: serialize_i64,
        sentinel: Long,
        label: "long field",
        mark_broken: true,
    }
}

primitive_writer! {
    /// Accelerated writer for an `i64` property backed by a getter.
    LongGetterWriter {
        value: i64,
        read: long_getter,
        write: write_i64,
        hook: serialize_i64,
        sentinel: Long,
        label: "long getter",
        mark_broken: true,
    }
}
