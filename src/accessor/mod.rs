//! Per-type dispatch artifacts for accelerated property access.
//!
//! The collector groups a value type's qualifying properties into eight
//! buckets (four value kinds × field/getter). Synthesis turns the buckets
//! into a [`TypedAccessor`], one stateless artifact per value type exposing
//! uniform "read property value by index" operations, and the registry
//! caches that artifact for the lifetime of the process.

use alloc::boxed::Box;
use core::any::{Any, TypeId};

use crate::error::AccelError;
use crate::value::AnyValue;

mod collector;
mod property;
mod registry;
mod synth;

pub use collector::AccessorCollector;
pub use property::{MemberOrigin, MemberRef, PropertyDef, PropertySpec, Suppressable, ValueKind};
pub use registry::AccessorRegistry;
pub use synth::{FIELD_CHAIN_LIMIT, GETTER_CHAIN_LIMIT, synthesize};

// -----------------------------------------------------------------------------
// Readers

/// Reads an `i32` property from an instance of `T`.
///
/// Readers are plain function pointers: a property read is a pure member
/// access, so they stay stateless, `Copy` and freely shareable. The `Result`
/// exists to express an access-control rejection
/// ([`AccelError::AccessDenied`]) or a host-side failure
/// ([`AccelError::Application`]); both are rare.
pub type IntReader<T> = fn(&T) -> Result<i32, AccelError>;

/// Reads an `i64` property from an instance of `T`.
pub type LongReader<T> = fn(&T) -> Result<i64, AccelError>;

/// Reads a nullable string property from an instance of `T`.
pub type StrReader<T> = fn(&T) -> Result<Option<&str>, AccelError>;

/// Reads a nullable object property from an instance of `T`.
pub type ObjectReader<T> = fn(&T) -> Result<Option<&dyn AnyValue>, AccelError>;

// -----------------------------------------------------------------------------
// DispatchStrategy

/// How a bucket maps a dispatch index onto its reader.
///
/// The two strategies are behaviorally identical; the choice is a pure
/// performance decision made per bucket size at synthesis time and is only
/// observable through [`PropertyAccessor::strategy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// A linear chain of index comparisons in registration order.
    CompareChain,
    /// A dense O(1) jump table over the contiguous index range.
    JumpTable,
}

// -----------------------------------------------------------------------------
// Bucket

/// One non-empty (kind, origin) bucket of a synthesized accessor.
pub(crate) struct Bucket<R> {
    label: &'static str,
    readers: Box<[R]>,
    strategy: DispatchStrategy,
}

impl<R> Bucket<R> {
    pub(crate) fn new(label: &'static str, readers: Box<[R]>, strategy: DispatchStrategy) -> Self {
        Self {
            label,
            readers,
            strategy,
        }
    }

    #[inline]
    pub(crate) fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Maps `index` onto its reader; indices outside `[0, len)` are a
    /// contract violation and fail with the fatal invalid-index error.
    fn select(&self, owner: &'static str, index: usize) -> Result<&R, AccelError> {
        let picked = match self.strategy {
            DispatchStrategy::CompareChain => {
                let mut found = None;
                for (slot, reader) in self.readers.iter().enumerate() {
                    if slot == index {
                        found = Some(reader);
                        break;
                    }
                }
                found
            }
            DispatchStrategy::JumpTable => self.readers.get(index),
        };
        picked.ok_or(AccelError::InvalidIndex {
            owner,
            bucket: self.label,
            index,
            len: self.readers.len(),
        })
    }
}

/// Resolves a bucket operation: absent buckets contributed no operation at
/// generation time and fail with a missing-bucket error.
fn op<'b, R>(
    bucket: Option<&'b Bucket<R>>,
    owner: &'static str,
    label: &'static str,
    index: usize,
) -> Result<&'b R, AccelError> {
    match bucket {
        Some(bucket) => bucket.select(owner, index),
        None => Err(AccelError::MissingBucket {
            owner,
            bucket: label,
        }),
    }
}

// -----------------------------------------------------------------------------
// PropertyAccessor

/// The erased dispatch artifact: uniform "read property value by index"
/// operations over an opaque instance reference.
///
/// One artifact exists per (value type, registry) pair; it is stateless,
/// `Send + Sync`, and safe for unrestricted concurrent invocation. Every
/// operation first performs a checked downcast of the instance to the owning
/// value type; a mismatch signals caller misuse and fails with a typed
/// error rather than undefined behavior.
pub trait PropertyAccessor: Send + Sync {
    /// The type path of the owning value type.
    fn owner(&self) -> &'static str;

    /// The [`TypeId`] of the owning value type.
    fn owner_id(&self) -> TypeId;

    /// The dispatch strategy chosen for a bucket, or `None` if the bucket
    /// was empty at generation time.
    fn strategy(&self, kind: ValueKind, origin: MemberOrigin) -> Option<DispatchStrategy>;

    fn int_field(&self, instance: &dyn Any, index: usize) -> Result<i32, AccelError>;
    fn int_getter(&self, instance: &dyn Any, index: usize) -> Result<i32, AccelError>;
    fn long_field(&self, instance: &dyn Any, index: usize) -> Result<i64, AccelError>;
    fn long_getter(&self, instance: &dyn Any, index: usize) -> Result<i64, AccelError>;
    fn str_field<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a str>, AccelError>;
    fn str_getter<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a str>, AccelError>;
    fn object_field<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn AnyValue>, AccelError>;
    fn object_getter<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn AnyValue>, AccelError>;
}

// -----------------------------------------------------------------------------
// TypedAccessor

/// The synthesized accessor for one value type `T`.
///
/// Holds up to eight reader buckets; empty buckets are `None` and contribute
/// no operation. All fields are immutable after synthesis.
pub struct TypedAccessor<T: 'static> {
    owner: &'static str,
    pub(crate) int_fields: Option<Bucket<IntReader<T>>>,
    pub(crate) int_getters: Option<Bucket<IntReader<T>>>,
    pub(crate) long_fields: Option<Bucket<LongReader<T>>>,
    pub(crate) long_getters: Option<Bucket<LongReader<T>>>,
    pub(crate) str_fields: Option<Bucket<StrReader<T>>>,
    pub(crate) str_getters: Option<Bucket<StrReader<T>>>,
    pub(crate) object_fields: Option<Bucket<ObjectReader<T>>>,
    pub(crate) object_getters: Option<Bucket<ObjectReader<T>>>,
}

impl<T: 'static> TypedAccessor<T> {
    pub(crate) fn empty(owner: &'static str) -> Self {
        Self {
            owner,
            int_fields: None,
            int_getters: None,
            long_fields: None,
            long_getters: None,
            str_fields: None,
            str_getters: None,
            object_fields: None,
            object_getters: None,
        }
    }

    /// Checked downcast of the opaque instance handle to the owning type.
    fn cast<'a>(&self, instance: &'a dyn Any) -> Result<&'a T, AccelError> {
        instance
            .downcast_ref::<T>()
            .ok_or(AccelError::InstanceMismatch {
                expected: self.owner,
            })
    }
}

impl<T: 'static> PropertyAccessor for TypedAccessor<T> {
    #[inline]
    fn owner(&self) -> &'static str {
        self.owner
    }

    #[inline]
    fn owner_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn strategy(&self, kind: ValueKind, origin: MemberOrigin) -> Option<DispatchStrategy> {
        let strategy = match (kind, origin) {
            (ValueKind::Int, MemberOrigin::Field) => self.int_fields.as_ref()?.strategy(),
            (ValueKind::Int, MemberOrigin::Getter) => self.int_getters.as_ref()?.strategy(),
            (ValueKind::Long, MemberOrigin::Field) => self.long_fields.as_ref()?.strategy(),
            (ValueKind::Long, MemberOrigin::Getter) => self.long_getters.as_ref()?.strategy(),
            (ValueKind::Str, MemberOrigin::Field) => self.str_fields.as_ref()?.strategy(),
            (ValueKind::Str, MemberOrigin::Getter) => self.str_getters.as_ref()?.strategy(),
            (ValueKind::Object, MemberOrigin::Field) => self.object_fields.as_ref()?.strategy(),
            (ValueKind::Object, MemberOrigin::Getter) => self.object_getters.as_ref()?.strategy(),
        };
        Some(strategy)
    }

    fn int_field(&self, instance: &dyn Any, index: usize) -> Result<i32, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.int_fields.as_ref(), self.owner, "int field", index)?;
        read(target)
    }

    fn int_getter(&self, instance: &dyn Any, index: usize) -> Result<i32, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.int_getters.as_ref(), self.owner, "int getter", index)?;
        read(target)
    }

    fn long_field(&self, instance: &dyn Any, index: usize) -> Result<i64, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.long_fields.as_ref(), self.owner, "long field", index)?;
        read(target)
    }

    fn long_getter(&self, instance: &dyn Any, index: usize) -> Result<i64, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.long_getters.as_ref(), self.owner, "long getter", index)?;
        read(target)
    }

    fn str_field<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a str>, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.str_fields.as_ref(), self.owner, "str field", index)?;
        read(target)
    }

    fn str_getter<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a str>, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.str_getters.as_ref(), self.owner, "str getter", index)?;
        read(target)
    }

    fn object_field<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn AnyValue>, AccelError> {
        let target = self.cast(instance)?;
        let read = op(self.object_fields.as_ref(), self.owner, "object field", index)?;
        read(target)
    }

    fn object_getter<'a>(
        &self,
        instance: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn AnyValue>, AccelError> {
        let target = self.cast(instance)?;
        let read = op(
            self.object_getters.as_ref(),
            self.owner,
            "object getter",
            index,
        )?;
        read(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_bucket() -> Bucket<IntReader<u8>> {
        Bucket::new(
            "int getter",
            Box::new([
                (|v: &u8| Ok(i32::from(*v))) as IntReader<u8>,
                |v: &u8| Ok(i32::from(*v) + 1),
                |v: &u8| Ok(i32::from(*v) + 2),
            ]),
            DispatchStrategy::CompareChain,
        )
    }

    fn table_bucket() -> Bucket<IntReader<u8>> {
        Bucket::new(
            "int getter",
            Box::new([
                (|v: &u8| Ok(i32::from(*v))) as IntReader<u8>,
                |v: &u8| Ok(i32::from(*v) + 1),
                |v: &u8| Ok(i32::from(*v) + 2),
            ]),
            DispatchStrategy::JumpTable,
        )
    }

    #[test]
    fn strategies_are_behaviorally_identical() {
        let chain = chain_bucket();
        let table = table_bucket();
        let value = 10_u8;

        for index in 0..3 {
            let from_chain = chain.select("u8", index).unwrap()(&value).unwrap();
            let from_table = table.select("u8", index).unwrap()(&value).unwrap();
            assert_eq!(from_chain, from_table);
            assert_eq!(from_chain, 10 + index as i32);
        }
    }

    #[test]
    fn both_strategies_reject_out_of_range_indices() {
        for bucket in [chain_bucket(), table_bucket()] {
            let err = bucket.select("u8", 3).unwrap_err();
            assert!(matches!(
                err,
                AccelError::InvalidIndex {
                    owner: "u8",
                    index: 3,
                    len: 3,
                    ..
                }
            ));
        }
    }

    #[test]
    fn mismatched_instance_fails_with_typed_error() {
        let mut accessor = TypedAccessor::<u8>::empty("u8");
        accessor.int_getters = Some(chain_bucket());

        let wrong = 1_u16;
        let err = accessor.int_getter(&wrong, 0).unwrap_err();
        assert!(matches!(
            err,
            AccelError::InstanceMismatch { expected: "u8" }
        ));
    }

    #[test]
    fn empty_bucket_contributes_no_operation() {
        let accessor = TypedAccessor::<u8>::empty("u8");
        let instance = 1_u8;

        let err = accessor.long_field(&instance, 0).unwrap_err();
        assert!(matches!(
            err,
            AccelError::MissingBucket {
                owner: "u8",
                bucket: "long field",
            }
        ));
        assert_eq!(accessor.strategy(ValueKind::Long, MemberOrigin::Field), None);
    }
}
