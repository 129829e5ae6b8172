use alloc::borrow::Cow;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::accessor::{MemberRef, PropertyAccessor, PropertyDef, Suppressable};
use crate::error::AccelError;
use crate::ser::{SerializeContext, TypeDiscriminator, ValueSerializer};
use crate::sink::DocSink;
use crate::value::{AnyValue, same_instance};

use super::{FallbackWriter, PropertyWriter};

// -----------------------------------------------------------------------------
// DynamicSerializers

/// Entries kept per property before the cache resets to the newest entry.
const MAX_CACHED: usize = 8;

/// Per-property cache of runtime-resolved serializers, keyed by the value's
/// runtime type.
///
/// Reads take an immutable snapshot, so a lookup never blocks on a
/// concurrent insert. Inserts copy the snapshot; a racing insert of the same
/// type may be lost, which only costs a repeated resolution. At
/// [`MAX_CACHED`] entries the cache resets to the newest entry instead of
/// growing.
struct DynamicSerializers {
    snapshot: RwLock<Arc<[(TypeId, Arc<dyn ValueSerializer>)]>>,
}

impl DynamicSerializers {
    fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::from([])),
        }
    }

    fn serializer_for(
        &self,
        value: &dyn AnyValue,
        ctx: &SerializeContext,
    ) -> Result<Arc<dyn ValueSerializer>, AccelError> {
        let type_id = value.as_any().type_id();
        let snapshot = {
            let guard = self.snapshot.read().unwrap_or_else(|err| err.into_inner());
            Arc::clone(&guard)
        };
        for (cached_id, serializer) in snapshot.iter() {
            if *cached_id == type_id {
                return Ok(Arc::clone(serializer));
            }
        }

        let serializer = ctx.find_serializer(type_id, value.type_name())?;
        let mut guard = self.snapshot.write().unwrap_or_else(|err| err.into_inner());
        if !guard.iter().any(|(cached_id, _)| *cached_id == type_id) {
            let mut entries: Vec<(TypeId, Arc<dyn ValueSerializer>)> = if guard.len() >= MAX_CACHED
            {
                Vec::new()
            } else {
                guard.to_vec()
            };
            entries.push((type_id, Arc::clone(&serializer)));
            *guard = entries.into();
        }
        Ok(serializer)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.snapshot
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }
}

// -----------------------------------------------------------------------------
// Object suppression

#[derive(Clone)]
enum ObjectSuppress {
    /// Skip values the resolved serializer reports empty.
    Empty,
    /// Skip values equal to the sentinel.
    Sentinel(Arc<dyn AnyValue + Send + Sync>),
}

impl ObjectSuppress {
    fn matches(&self, serializer: &dyn ValueSerializer, value: &dyn AnyValue) -> bool {
        match self {
            Self::Empty => serializer.is_empty(value),
            Self::Sentinel(sentinel) => sentinel.value_eq(value),
        }
    }
}

// -----------------------------------------------------------------------------
// Object writers

macro_rules! object_writer {
    (
        $(#[$doc:meta])*
        $name:ident {
            read: $read:ident,
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
            null_serializer: Option<Arc<dyn ValueSerializer>>,
            discriminator: Option<Arc<dyn TypeDiscriminator>>,
            suppress_nulls: bool,
            suppress: Option<ObjectSuppress>,
            dynamic: DynamicSerializers,
            fallback: Arc<dyn FallbackWriter>,
            broken: AtomicBool,
        }

        impl $name {
            pub(crate) fn new(def: PropertyDef, index: usize) -> Result<Self, AccelError> {
                let suppress = match def.suppress {
                    None => None,
                    Some(Suppressable::Empty) => Some(ObjectSuppress::Empty),
                    Some(Suppressable::Value(sentinel)) => {
                        Some(ObjectSuppress::Sentinel(sentinel))
                    }
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
                    discriminator: def.discriminator,
                    suppress_nulls: def.suppress_nulls,
                    suppress,
                    dynamic: DynamicSerializers::new(),
                    fallback: def.fallback,
                    broken: AtomicBool::new(false),
                })
            }

            // Copies carry the configuration but start with an empty dynamic
            // cache and an intact fast path.
            fn duplicate(&self) -> Self {
                Self {
                    name: self.name.clone(),
                    member: self.member,
                    accessor: self.accessor.clone(),
                    index: self.index,
                    serializer: self.serializer.clone(),
                    null_serializer: self.null_serializer.clone(),
                    discriminator: self.discriminator.clone(),
                    suppress_nulls: self.suppress_nulls,
                    suppress: self.suppress.clone(),
                    dynamic: DynamicSerializers::new(),
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

            /// Returns a copy of this writer with a static serializer,
            /// bypassing runtime resolution.
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

            fn resolve(
                &self,
                value: &dyn AnyValue,
                ctx: &SerializeContext,
            ) -> Result<Arc<dyn ValueSerializer>, AccelError> {
                match &self.serializer {
                    Some(serializer) => Ok(Arc::clone(serializer)),
                    None => self.dynamic.serializer_for(value, ctx),
                }
            }

            fn write_value(
                &self,
                serializer: &dyn ValueSerializer,
                value: &dyn AnyValue,
                sink: &mut dyn DocSink,
                ctx: &SerializeContext,
            ) -> Result<(), AccelError> {
                match &self.discriminator {
                    Some(discriminator) => {
                        discriminator.write_prefix(value, sink)?;
                        serializer.serialize(value, sink, ctx)?;
                        discriminator.write_suffix(value, sink)
                    }
                    None => serializer.serialize(value, sink, ctx),
                }
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
                        if $mark {
                            self.broken.store(true, Ordering::Relaxed);
                        }
                        return self.fallback.serialize_as_field(instance, sink, ctx);
                    }
                    Err(err) => return Err(err),
                };
                let Some(value) = value else {
                    return self.write_null_field(sink, ctx);
                };

                let serializer = self.resolve(value, ctx)?;
                if self
                    .suppress
                    .as_ref()
                    .is_some_and(|s| s.matches(serializer.as_ref(), value))
                {
                    return Ok(());
                }
                if same_instance(value, instance) {
                    ctx.handle_self_reference(&self.name, sink)?;
                }
                sink.write_field_name(&self.name)?;
                self.write_value(serializer.as_ref(), value, sink, ctx)
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
                        if $mark {
                            self.broken.store(true, Ordering::Relaxed);
                        }
                        return self.fallback.serialize_as_element(instance, sink, ctx);
                    }
                    Err(err) => return Err(err),
                };
                let Some(value) = value else {
                    return self.write_null_element(sink, ctx);
                };

                let serializer = self.resolve(value, ctx)?;
                if self
                    .suppress
                    .as_ref()
                    .is_some_and(|s| s.matches(serializer.as_ref(), value))
                {
                    if ctx.requires_placeholders() {
                        return sink.write_placeholder();
                    }
                    return Ok(());
                }
                if same_instance(value, instance) {
                    ctx.handle_self_reference(&self.name, sink)?;
                }
                self.write_value(serializer.as_ref(), value, sink, ctx)
            }
        }
    };
}

object_writer! {
    /// Accelerated writer for a nullable object property backed by a field.
    ///
    /// An access-denied read disables the fast path permanently.
    ObjectFieldWriter {
        read: object_field,
        label: "object field",
        mark_broken: true,
    }
}

object_writer! {
    /// Accelerated writer for a nullable object property backed by a getter.
    ///
    /// Unlike the other writers an access-denied read only falls back for
    /// the affected call; the next call retries the fast path.
    ObjectGetterWriter {
        read: object_getter,
        label: "object getter",
        mark_broken: false,
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::sync::atomic::AtomicUsize;

    use super::*;
    use crate::ser::{SerdeSerializer, SerializerResolver};

    struct CountingResolver {
        resolved: AtomicUsize,
    }

    impl SerializerResolver for CountingResolver {
        fn find_serializer(
            &self,
            _type_id: TypeId,
            _type_name: &'static str,
        ) -> Result<Arc<dyn ValueSerializer>, AccelError> {
            self.resolved.fetch_add(1, Ordering::Relaxed);
            Ok(Arc::new(SerdeSerializer))
        }
    }

    #[test]
    fn dynamic_cache_resolves_each_type_once() {
        let resolver = Arc::new(CountingResolver {
            resolved: AtomicUsize::new(0),
        });
        let ctx = SerializeContext::new().with_resolver(resolver.clone());
        let cache = DynamicSerializers::new();

        let int_value = 7_i32;
        let str_value = String::from("x");
        cache.serializer_for(&int_value, &ctx).unwrap();
        cache.serializer_for(&int_value, &ctx).unwrap();
        cache.serializer_for(&str_value, &ctx).unwrap();

        assert_eq!(resolver.resolved.load(Ordering::Relaxed), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn dynamic_cache_resets_at_capacity() {
        let resolver = Arc::new(CountingResolver {
            resolved: AtomicUsize::new(0),
        });
        let ctx = SerializeContext::new().with_resolver(resolver.clone());
        let cache = DynamicSerializers::new();

        cache.serializer_for(&0_i8, &ctx).unwrap();
        cache.serializer_for(&0_i16, &ctx).unwrap();
        cache.serializer_for(&0_i32, &ctx).unwrap();
        cache.serializer_for(&0_i64, &ctx).unwrap();
        cache.serializer_for(&0_u8, &ctx).unwrap();
        cache.serializer_for(&0_u16, &ctx).unwrap();
        cache.serializer_for(&0_u32, &ctx).unwrap();
        cache.serializer_for(&0_u64, &ctx).unwrap();
        assert_eq!(cache.len(), MAX_CACHED);

        // The ninth type resets the cache to the newest entry.
        cache.serializer_for(&0_f32, &ctx).unwrap();
        assert_eq!(cache.len(), 1);

        // Entries dropped by the reset resolve again on next use.
        cache.serializer_for(&0_i8, &ctx).unwrap();
        assert_eq!(resolver.resolved.load(Ordering::Relaxed), 10);
    }
}

#[cfg(test)]
mod writer_tests {
    use serde::Serialize;
    use serde_json::json;

    use super::*;
    use crate::accessor::{AccessorCollector, AccessorRegistry};
    use crate::ser::AllowSelfReference;
    use crate::test_support::{Event, MarkerFallback, RecordingSink};

    #[derive(Serialize, PartialEq)]
    struct Badge {
        id: u32,
    }

    #[derive(Serialize, PartialEq)]
    struct Profile {
        badge: Option<Badge>,
        open: bool,
    }

    fn read_badge(profile: &Profile) -> Result<Option<&dyn AnyValue>, AccelError> {
        if !profile.open {
            return Err(AccelError::access_denied("Profile::badge", "sealed"));
        }
        Ok(profile.badge.as_ref().map(|badge| badge as &dyn AnyValue))
    }

    fn read_self(profile: &Profile) -> Result<Option<&dyn AnyValue>, AccelError> {
        Ok(Some(profile))
    }

    fn def(name: &'static str) -> PropertyDef {
        PropertyDef::new(
            name,
            MemberRef::new("object::tests::Profile", name),
            Arc::new(MarkerFallback),
        )
    }

    fn field_writer(
        property: PropertyDef,
        read: crate::accessor::ObjectReader<Profile>,
    ) -> ObjectFieldWriter {
        let registry = AccessorRegistry::new();
        let mut collector = AccessorCollector::<Profile>::new();
        let writer = collector.add_object_field(property, read).unwrap();
        let accessor = collector.find_accessor(&registry).unwrap();
        writer.with_accessor(accessor)
    }

    fn getter_writer(
        property: PropertyDef,
        read: crate::accessor::ObjectReader<Profile>,
    ) -> ObjectGetterWriter {
        let registry = AccessorRegistry::new();
        let mut collector = AccessorCollector::<Profile>::new();
        let writer = collector.add_object_getter(property, read).unwrap();
        let accessor = collector.find_accessor(&registry).unwrap();
        writer.with_accessor(accessor)
    }

    #[test]
    fn fast_path_serializes_through_the_resolved_serializer() {
        let writer = field_writer(def("badge"), read_badge);
        let profile = Profile {
            badge: Some(Badge { id: 7 }),
            open: true,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName("badge".into()),
                Event::Value(json!({ "id": 7 })),
            ]
        );
    }

    #[test]
    fn null_follows_the_configured_policy() {
        let writer = field_writer(def("badge").suppress_nulls(true), read_badge);
        let profile = Profile {
            badge: None,
            open: true,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert!(sink.events.is_empty());
    }

    #[test]
    fn sentinel_suppression_compares_erased_values() {
        let writer = field_writer(
            def("badge").with_suppression(Suppressable::Value(Arc::new(Badge { id: 0 }))),
            read_badge,
        );
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        let masked = Profile {
            badge: Some(Badge { id: 0 }),
            open: true,
        };
        writer.serialize_as_field(&masked, &mut sink, &ctx).unwrap();
        assert!(sink.events.is_empty());

        let visible = Profile {
            badge: Some(Badge { id: 3 }),
            open: true,
        };
        writer.serialize_as_field(&visible, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName("badge".into()),
                Event::Value(json!({ "id": 3 })),
            ]
        );
    }

    #[test]
    fn self_reference_fails_under_the_default_policy() {
        let writer = field_writer(def("me"), read_self);
        let profile = Profile {
            badge: None,
            open: true,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        let err = writer
            .serialize_as_field(&profile, &mut sink, &ctx)
            .unwrap_err();
        assert!(matches!(err, AccelError::SelfReference { .. }));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn self_reference_proceeds_under_the_permissive_policy() {
        let writer = field_writer(def("me"), read_self);
        let profile = Profile {
            badge: None,
            open: true,
        };
        let ctx = SerializeContext::new().with_self_ref_policy(Arc::new(AllowSelfReference));
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName("me".into()),
                Event::Value(json!({ "badge": null, "open": true })),
            ]
        );
    }

    struct AngleBrackets;

    impl TypeDiscriminator for AngleBrackets {
        fn write_prefix(
            &self,
            _value: &dyn AnyValue,
            sink: &mut dyn DocSink,
        ) -> Result<(), AccelError> {
            sink.write_str("<t>")
        }

        fn write_suffix(
            &self,
            _value: &dyn AnyValue,
            sink: &mut dyn DocSink,
        ) -> Result<(), AccelError> {
            sink.write_str("</t>")
        }
    }

    #[test]
    fn discriminator_wraps_the_serialized_value() {
        let writer = field_writer(
            def("badge").with_discriminator(Arc::new(AngleBrackets)),
            read_badge,
        );
        let profile = Profile {
            badge: Some(Badge { id: 1 }),
            open: true,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName("badge".into()),
                Event::Str("<t>".into()),
                Event::Value(json!({ "id": 1 })),
                Event::Str("</t>".into()),
            ]
        );
    }

    #[test]
    fn field_variant_breaks_permanently_on_access_denied() {
        let writer = field_writer(def("badge"), read_badge);
        let mut profile = Profile {
            badge: Some(Badge { id: 7 }),
            open: false,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName(MarkerFallback::TAG.into()),
                Event::Str(MarkerFallback::TAG.into()),
            ]
        );
        assert!(writer.is_broken());

        profile.open = true;
        sink.events.clear();
        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName(MarkerFallback::TAG.into()),
                Event::Str(MarkerFallback::TAG.into()),
            ]
        );
    }

    #[test]
    fn getter_variant_retries_the_fast_path_after_access_denied() {
        let writer = getter_writer(def("badge"), read_badge);
        let mut profile = Profile {
            badge: Some(Badge { id: 7 }),
            open: false,
        };
        let ctx = SerializeContext::new();
        let mut sink = RecordingSink::new();

        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName(MarkerFallback::TAG.into()),
                Event::Str(MarkerFallback::TAG.into()),
            ]
        );
        assert!(!writer.is_broken());

        profile.open = true;
        sink.events.clear();
        writer.serialize_as_field(&profile, &mut sink, &ctx).unwrap();
        assert_eq!(
            sink.events,
            [
                Event::FieldName("badge".into()),
                Event::Value(json!({ "id": 7 })),
            ]
        );
    }
}
