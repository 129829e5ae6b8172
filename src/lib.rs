#![doc = include_str!("../README.md")]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod accessor;
pub mod error;
pub mod ser;
pub mod sink;
pub mod value;
pub mod writer;

#[cfg(test)]
mod test_support;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use accessor::{
    AccessorCollector, AccessorRegistry, DispatchStrategy, FIELD_CHAIN_LIMIT, GETTER_CHAIN_LIMIT,
    IntReader, LongReader, MemberOrigin, MemberRef, ObjectReader, PropertyAccessor, PropertyDef,
    PropertySpec, StrReader, Suppressable, TypedAccessor, ValueKind, synthesize,
};
pub use error::AccelError;
pub use ser::{
    AllowSelfReference, FailOnSelfReference, SelfRefPolicy, SerdeResolver, SerdeSerializer,
    SerializeContext, SerializerResolver, TypeDiscriminator, ValueSerializer,
};
pub use sink::DocSink;
pub use value::AnyValue;
pub use writer::{
    FallbackWriter, IntFieldWriter, IntGetterWriter, LongFieldWriter, LongGetterWriter,
    ObjectFieldWriter, ObjectGetterWriter, PropertyWriter, StringFieldWriter, StringGetterWriter,
};
