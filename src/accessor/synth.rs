use alloc::format;
use alloc::vec::Vec;
use core::any::TypeId;

use crate::error::AccelError;

use super::collector::AccessorCollector;
use super::property::{MemberOrigin, PropertySpec};
use super::{Bucket, DispatchStrategy, TypedAccessor};

/// Largest getter bucket still dispatched through a compare chain.
pub const GETTER_CHAIN_LIMIT: usize = 4;

/// Smallest field bucket dispatched through a jump table.
pub const FIELD_CHAIN_LIMIT: usize = 4;

/// Picks the dispatch strategy for a bucket of `len` readers.
///
/// Getter buckets stay on the compare chain up to and including
/// [`GETTER_CHAIN_LIMIT`]; field buckets switch to the jump table one entry
/// earlier, at [`FIELD_CHAIN_LIMIT`].
pub(crate) const fn strategy_for(origin: MemberOrigin, len: usize) -> DispatchStrategy {
    let chain = match origin {
        MemberOrigin::Getter => len <= GETTER_CHAIN_LIMIT,
        MemberOrigin::Field => len < FIELD_CHAIN_LIMIT,
    };
    if chain {
        DispatchStrategy::CompareChain
    } else {
        DispatchStrategy::JumpTable
    }
}

fn validate<T: 'static>(collector: &AccessorCollector<T>) -> Result<(), AccelError> {
    let owner = collector.owner();
    // Per-bucket counters; every spec must extend its bucket contiguously
    // from zero in registration order.
    let mut next = [0_usize; 8];

    for spec in collector.specs() {
        if spec.member().name().is_empty() || spec.member().declared_by().is_empty() {
            return Err(AccelError::Generation {
                owner,
                detail: format!(
                    "{} property at index {} has an incomplete member reference",
                    spec.bucket(),
                    spec.index()
                ),
            });
        }
        let slot = bucket_slot(spec);
        if spec.index() != next[slot] {
            return Err(AccelError::Generation {
                owner,
                detail: format!(
                    "{} indices are not contiguous: expected {}, found {}",
                    spec.bucket(),
                    next[slot],
                    spec.index()
                ),
            });
        }
        next[slot] += 1;
    }
    Ok(())
}

const fn bucket_slot(spec: &PropertySpec) -> usize {
    let kind = spec.kind() as usize;
    let origin = spec.origin() as usize;
    kind * 2 + origin
}

fn bucket<R: Copy>(
    origin: MemberOrigin,
    label: &'static str,
    readers: &[R],
) -> Option<Bucket<R>> {
    if readers.is_empty() {
        return None;
    }
    let strategy = strategy_for(origin, readers.len());
    Some(Bucket::new(
        label,
        readers.iter().copied().collect::<Vec<_>>().into_boxed_slice(),
        strategy,
    ))
}

/// Turns a finished collector into the dispatch artifact for `T`.
///
/// Fails with [`AccelError::Generation`] when the collected metadata is
/// inconsistent; a failed synthesis produces no artifact and the caller must
/// stay on its generic write path for `T`.
pub fn synthesize<T: 'static>(
    collector: &AccessorCollector<T>,
) -> Result<TypedAccessor<T>, AccelError> {
    validate(collector)?;

    use MemberOrigin::{Field, Getter};
    let mut accessor = TypedAccessor::empty(collector.owner());
    accessor.int_fields = bucket(Field, "int field", collector.int_fields());
    accessor.int_getters = bucket(Getter, "int getter", collector.int_getters());
    accessor.long_fields = bucket(Field, "long field", collector.long_fields());
    accessor.long_getters = bucket(Getter, "long getter", collector.long_getters());
    accessor.str_fields = bucket(Field, "str field", collector.str_fields());
    accessor.str_getters = bucket(Getter, "str getter", collector.str_getters());
    accessor.object_fields = bucket(Field, "object field", collector.object_fields());
    accessor.object_getters = bucket(Getter, "object getter", collector.object_getters());

    log::trace!(
        "generated accessor for `{}` ({} properties, owner id {:?})",
        collector.owner(),
        collector.specs().len(),
        TypeId::of::<T>(),
    );
    Ok(accessor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getter_buckets_chain_up_to_the_limit() {
        assert_eq!(
            strategy_for(MemberOrigin::Getter, 1),
            DispatchStrategy::CompareChain
        );
        assert_eq!(
            strategy_for(MemberOrigin::Getter, GETTER_CHAIN_LIMIT),
            DispatchStrategy::CompareChain
        );
        assert_eq!(
            strategy_for(MemberOrigin::Getter, GETTER_CHAIN_LIMIT + 1),
            DispatchStrategy::JumpTable
        );
    }

    #[test]
    fn synthesized_buckets_carry_the_size_based_strategy() {
        use alloc::sync::Arc;

        use crate::accessor::{
            AccessorCollector, MemberRef, PropertyAccessor, PropertyDef, ValueKind,
        };
        use crate::test_support::NoopFallback;

        let mut collector = AccessorCollector::<u8>::new();
        let def = |name: &'static str| {
            PropertyDef::new(name, MemberRef::new("u8", name), Arc::new(NoopFallback))
        };
        for name in ["a", "b", "c", "d", "e"] {
            collector
                .add_int_getter(def(name), |v| Ok(i32::from(*v)))
                .unwrap();
        }
        for name in ["x", "y", "z"] {
            collector
                .add_long_field(def(name), |v| Ok(i64::from(*v)))
                .unwrap();
        }

        let accessor = synthesize(&collector).unwrap();
        assert_eq!(
            accessor.strategy(ValueKind::Int, MemberOrigin::Getter),
            Some(DispatchStrategy::JumpTable)
        );
        assert_eq!(
            accessor.strategy(ValueKind::Long, MemberOrigin::Field),
            Some(DispatchStrategy::CompareChain)
        );
        assert_eq!(accessor.strategy(ValueKind::Str, MemberOrigin::Field), None);

        let value = 6_u8;
        for index in 0..5 {
            assert_eq!(accessor.int_getter(&value, index).unwrap(), 6);
        }
        assert!(accessor.int_getter(&value, 5).is_err());
    }

    #[test]
    fn incomplete_member_metadata_fails_generation() {
        use alloc::sync::Arc;

        use crate::accessor::{AccessorCollector, MemberRef, PropertyDef};
        use crate::test_support::NoopFallback;

        let mut collector = AccessorCollector::<u8>::new();
        collector
            .add_int_getter(
                PropertyDef::new("value", MemberRef::new("", ""), Arc::new(NoopFallback)),
                |v| Ok(i32::from(*v)),
            )
            .unwrap();

        let Err(err) = synthesize(&collector) else {
            panic!("generation should reject an empty member reference");
        };
        assert!(matches!(err, AccelError::Generation { .. }));
    }

    #[test]
    fn field_buckets_switch_one_entry_earlier() {
        assert_eq!(
            strategy_for(MemberOrigin::Field, FIELD_CHAIN_LIMIT - 1),
            DispatchStrategy::CompareChain
        );
        assert_eq!(
            strategy_for(MemberOrigin::Field, FIELD_CHAIN_LIMIT),
            DispatchStrategy::JumpTable
        );
    }
}
