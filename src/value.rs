use core::any::Any;

// -----------------------------------------------------------------------------
// AnyValue

/// An object-kind property value, erased for dispatch through the write path.
///
/// Implemented automatically for every `'static` type that is serializable
/// and comparable; hosts never implement this by hand. The trait carries just
/// enough surface for the object writers: a downcast handle for serializer
/// specialization, an erased serde view for the default serializer, and
/// equality for sentinel suppression.
///
/// # Examples
///
/// ```
/// use reheat::AnyValue;
///
/// let a = 5_u32;
/// let b = 5_u32;
/// let c = "five";
///
/// assert!(AnyValue::value_eq(&a, &b));
/// assert!(!AnyValue::value_eq(&a, &c));
/// ```
pub trait AnyValue: Any {
    /// A downcastable view of the value.
    fn as_any(&self) -> &dyn Any;

    /// An erased serde view of the value.
    fn as_serialize(&self) -> &dyn erased_serde::Serialize;

    /// Compares against another erased value; `false` whenever the runtime
    /// types differ.
    fn value_eq(&self, other: &dyn AnyValue) -> bool;

    /// The runtime type name, used for serializer resolution diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T> AnyValue for T
where
    T: Any + serde_core::Serialize + PartialEq,
{
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_serialize(&self) -> &dyn erased_serde::Serialize {
        self
    }

    fn value_eq(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

// -----------------------------------------------------------------------------
// Identity

/// Whether `value` is the very instance currently being serialized.
///
/// Requires both address identity and type identity; two zero-sized values of
/// different types may share an address.
pub(crate) fn same_instance(value: &dyn AnyValue, instance: &dyn Any) -> bool {
    let value = value.as_any();
    core::ptr::addr_eq(value as *const dyn Any, instance as *const dyn Any)
        && value.type_id() == instance.type_id()
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[test]
    fn value_eq_requires_matching_types() {
        let int = 7_i64;
        let string = String::from("7");

        assert!(int.value_eq(&7_i64));
        assert!(!int.value_eq(&8_i64));
        assert!(!int.value_eq(&string));
    }

    #[test]
    fn same_instance_is_identity_not_equality() {
        let a = 3_u8;
        let b = 3_u8;

        assert!(same_instance(&a, &a));
        assert!(!same_instance(&a, &b));
    }

    #[test]
    fn same_instance_rejects_type_punned_addresses() {
        struct Marker;
        let value = 0_u8;
        let marker = Marker;

        // Different types never count as the same instance, whatever their
        // addresses happen to be.
        assert!(!same_instance(&value, &marker));
    }
}
