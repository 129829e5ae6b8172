use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::type_name;

use crate::error::AccelError;
use crate::writer::{
    IntFieldWriter, IntGetterWriter, LongFieldWriter, LongGetterWriter, ObjectFieldWriter,
    ObjectGetterWriter, StringFieldWriter, StringGetterWriter,
};

use super::property::{MemberOrigin, PropertyDef, PropertySpec, ValueKind};
use super::registry::AccessorRegistry;
use super::synth::synthesize;
use super::{IntReader, LongReader, ObjectReader, PropertyAccessor, StrReader};

// -----------------------------------------------------------------------------
// AccessorCollector

/// Collects the qualifying properties of a value type `T` during one-time
/// writer setup.
///
/// Each `add_*` call appends the property's reader to its bucket, records
/// its [`PropertySpec`], and returns the matching accelerated writer with
/// the dispatch index already assigned. Once every property is registered,
/// [`find_accessor`](Self::find_accessor) synthesizes (or fetches) the
/// dispatch artifact the writers must then be bound to via `with_accessor`.
pub struct AccessorCollector<T: 'static> {
    owner: &'static str,
    int_fields: Vec<IntReader<T>>,
    int_getters: Vec<IntReader<T>>,
    long_fields: Vec<LongReader<T>>,
    long_getters: Vec<LongReader<T>>,
    str_fields: Vec<StrReader<T>>,
    str_getters: Vec<StrReader<T>>,
    object_fields: Vec<ObjectReader<T>>,
    object_getters: Vec<ObjectReader<T>>,
    specs: Vec<PropertySpec>,
}

impl<T: 'static> Default for AccessorCollector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> AccessorCollector<T> {
    /// Creates an empty collector for `T`.
    pub fn new() -> Self {
        Self {
            owner: type_name::<T>(),
            int_fields: Vec::new(),
            int_getters: Vec::new(),
            long_fields: Vec::new(),
            long_getters: Vec::new(),
            str_fields: Vec::new(),
            str_getters: Vec::new(),
            object_fields: Vec::new(),
            object_getters: Vec::new(),
            specs: Vec::new(),
        }
    }

    /// The type path of the collected value type.
    #[inline]
    pub const fn owner(&self) -> &'static str {
        self.owner
    }

    /// Registers an `i32` property backed by a field.
    pub fn add_int_field(
        &mut self,
        def: PropertyDef,
        read: IntReader<T>,
    ) -> Result<IntFieldWriter, AccelError> {
        let index = self.int_fields.len();
        let spec = self.spec(index, ValueKind::Int, MemberOrigin::Field, &def);
        let writer = IntFieldWriter::new(def, index)?;
        self.int_fields.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers an `i32` property backed by a getter.
    pub fn add_int_getter(
        &mut self,
        def: PropertyDef,
        read: IntReader<T>,
    ) -> Result<IntGetterWriter, AccelError> {
        let index = self.int_getters.len();
        let spec = self.spec(index, ValueKind::Int, MemberOrigin::Getter, &def);
        let writer = IntGetterWriter::new(def, index)?;
        self.int_getters.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers an `i64` property backed by a field.
    pub fn add_long_field(
        &mut self,
        def: PropertyDef,
        read: LongReader<T>,
    ) -> Result<LongFieldWriter, AccelError> {
        let index = self.long_fields.len();
        let spec = self.spec(index, ValueKind::Long, MemberOrigin::Field, &def);
        let writer = LongFieldWriter::new(def, index)?;
        self.long_fields.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers an `i64` property backed by a getter.
    pub fn add_long_getter(
        &mut self,
        def: PropertyDef,
        read: LongReader<T>,
    ) -> Result<LongGetterWriter, AccelError> {
        let index = self.long_getters.len();
        let spec = self.spec(index, ValueKind::Long, MemberOrigin::Getter, &def);
        let writer = LongGetterWriter::new(def, index)?;
        self.long_getters.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers a nullable string property backed by a field.
    pub fn add_str_field(
        &mut self,
        def: PropertyDef,
        read: StrReader<T>,
    ) -> Result<StringFieldWriter, AccelError> {
        let index = self.str_fields.len();
        let spec = self.spec(index, ValueKind::Str, MemberOrigin::Field, &def);
        let writer = StringFieldWriter::new(def, index)?;
        self.str_fields.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers a nullable string property backed by a getter.
    pub fn add_str_getter(
        &mut self,
        def: PropertyDef,
        read: StrReader<T>,
    ) -> Result<StringGetterWriter, AccelError> {
        let index = self.str_getters.len();
        let spec = self.spec(index, ValueKind::Str, MemberOrigin::Getter, &def);
        let writer = StringGetterWriter::new(def, index)?;
        self.str_getters.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers a nullable object property backed by a field.
    pub fn add_object_field(
        &mut self,
        def: PropertyDef,
        read: ObjectReader<T>,
    ) -> Result<ObjectFieldWriter, AccelError> {
        let index = self.object_fields.len();
        let spec = self.spec(index, ValueKind::Object, MemberOrigin::Field, &def);
        let writer = ObjectFieldWriter::new(def, index)?;
        self.object_fields.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Registers a nullable object property backed by a getter.
    pub fn add_object_getter(
        &mut self,
        def: PropertyDef,
        read: ObjectReader<T>,
    ) -> Result<ObjectGetterWriter, AccelError> {
        let index = self.object_getters.len();
        let spec = self.spec(index, ValueKind::Object, MemberOrigin::Getter, &def);
        let writer = ObjectGetterWriter::new(def, index)?;
        self.object_getters.push(read);
        self.specs.push(spec);
        Ok(writer)
    }

    /// Whether no property has been registered in any bucket.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The specs of every registered property, in registration order.
    #[inline]
    pub fn specs(&self) -> &[PropertySpec] {
        &self.specs
    }

    /// Fetches the cached accessor for `T` or synthesizes and installs a
    /// new one from the collected properties.
    pub fn find_accessor(
        &self,
        registry: &AccessorRegistry,
    ) -> Result<Arc<dyn PropertyAccessor>, AccelError> {
        if let Some(existing) = registry.get::<T>() {
            return Ok(existing);
        }
        let accessor = synthesize(self)?;
        Ok(registry.install::<T>(Arc::new(accessor)))
    }

    fn spec(
        &self,
        index: usize,
        kind: ValueKind,
        origin: MemberOrigin,
        def: &PropertyDef,
    ) -> PropertySpec {
        PropertySpec::new(index, kind, origin, def.member(), self.owner)
    }

    pub(crate) fn int_fields(&self) -> &[IntReader<T>] {
        &self.int_fields
    }

    pub(crate) fn int_getters(&self) -> &[IntReader<T>] {
        &self.int_getters
    }

    pub(crate) fn long_fields(&self) -> &[LongReader<T>] {
        &self.long_fields
    }

    pub(crate) fn long_getters(&self) -> &[LongReader<T>] {
        &self.long_getters
    }

    pub(crate) fn str_fields(&self) -> &[StrReader<T>] {
        &self.str_fields
    }

    pub(crate) fn str_getters(&self) -> &[StrReader<T>] {
        &self.str_getters
    }

    pub(crate) fn object_fields(&self) -> &[ObjectReader<T>] {
        &self.object_fields
    }

    pub(crate) fn object_getters(&self) -> &[ObjectReader<T>] {
        &self.object_getters
    }
}
