use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use crate::ser::{TypeDiscriminator, ValueSerializer};
use crate::value::AnyValue;
use crate::writer::FallbackWriter;

// -----------------------------------------------------------------------------
// ValueKind / MemberOrigin

/// The value kind of a collected property; one axis of the bucket grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Str,
    Object,
}

/// Whether a property reads a plain field or goes through a getter;
/// the other axis of the bucket grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberOrigin {
    Field,
    Getter,
}

/// Human-readable bucket name used in diagnostics, e.g. `"int getter"`.
pub(crate) const fn bucket_label(kind: ValueKind, origin: MemberOrigin) -> &'static str {
    match (kind, origin) {
        (ValueKind::Int, MemberOrigin::Field) => "int field",
        (ValueKind::Int, MemberOrigin::Getter) => "int getter",
        (ValueKind::Long, MemberOrigin::Field) => "long field",
        (ValueKind::Long, MemberOrigin::Getter) => "long getter",
        (ValueKind::Str, MemberOrigin::Field) => "str field",
        (ValueKind::Str, MemberOrigin::Getter) => "str getter",
        (ValueKind::Object, MemberOrigin::Field) => "object field",
        (ValueKind::Object, MemberOrigin::Getter) => "object getter",
    }
}

// -----------------------------------------------------------------------------
// MemberRef

/// A reference to the member a property reads: its name and the type path
/// that declares it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberRef {
    declared_by: &'static str,
    name: &'static str,
}

impl MemberRef {
    /// Creates a new member reference.
    #[inline]
    pub const fn new(declared_by: &'static str, name: &'static str) -> Self {
        Self { declared_by, name }
    }

    /// The member name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The type path declaring the member.
    #[inline]
    pub const fn declared_by(&self) -> &'static str {
        self.declared_by
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declared_by, self.name)
    }
}

// -----------------------------------------------------------------------------
// PropertySpec

/// The immutable record of one collected property: its bucket coordinates,
/// dispatch index, member reference and owning value type.
///
/// Created during one-time writer setup for a type; never mutated.
#[derive(Clone, Debug)]
pub struct PropertySpec {
    index: usize,
    kind: ValueKind,
    origin: MemberOrigin,
    member: MemberRef,
    owner: &'static str,
}

impl PropertySpec {
    pub(crate) const fn new(
        index: usize,
        kind: ValueKind,
        origin: MemberOrigin,
        member: MemberRef,
        owner: &'static str,
    ) -> Self {
        Self {
            index,
            kind,
            origin,
            member,
            owner,
        }
    }

    /// The 0-based dispatch index within the property's bucket.
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The value kind of the property.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether the property reads a field or a getter.
    #[inline]
    pub const fn origin(&self) -> MemberOrigin {
        self.origin
    }

    /// The member the property reads.
    #[inline]
    pub const fn member(&self) -> MemberRef {
        self.member
    }

    /// The type path of the owning value type.
    #[inline]
    pub const fn owner(&self) -> &'static str {
        self.owner
    }

    /// The diagnostics name of the property's bucket.
    #[inline]
    pub const fn bucket(&self) -> &'static str {
        bucket_label(self.kind, self.origin)
    }
}

// -----------------------------------------------------------------------------
// Suppressable

/// A suppression marker: the condition under which a property is skipped
/// entirely (no field name, no value).
///
/// The sentinel payload must match the property's value kind; a mismatch is
/// an integration error at writer construction.
#[derive(Clone)]
pub enum Suppressable {
    /// Skip when the resolved serializer reports the value empty.
    Empty,
    /// Skip when an `i32` value equals the sentinel.
    Int(i32),
    /// Skip when an `i64` value equals the sentinel.
    Long(i64),
    /// Skip when a string value equals the sentinel.
    Str(Box<str>),
    /// Skip when an object value equals the sentinel.
    Value(Arc<dyn AnyValue + Send + Sync>),
}

impl fmt::Debug for Suppressable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::Value(v) => f.debug_tuple("Value").field(&v.type_name()).finish(),
        }
    }
}

// -----------------------------------------------------------------------------
// PropertyDef

/// The read-only property metadata supplied by the host when registering a
/// property with the collector: the document field name, the member being
/// read, serializer configuration, suppression policy and the generic
/// fallback writer the accelerated variant wraps.
pub struct PropertyDef {
    pub(crate) name: Cow<'static, str>,
    pub(crate) member: MemberRef,
    pub(crate) serializer: Option<Arc<dyn ValueSerializer>>,
    pub(crate) null_serializer: Option<Arc<dyn ValueSerializer>>,
    pub(crate) discriminator: Option<Arc<dyn TypeDiscriminator>>,
    pub(crate) suppress_nulls: bool,
    pub(crate) suppress: Option<Suppressable>,
    pub(crate) fallback: Arc<dyn FallbackWriter>,
}

impl PropertyDef {
    /// Creates a definition with no serializer configuration and no
    /// suppression.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        member: MemberRef,
        fallback: Arc<dyn FallbackWriter>,
    ) -> Self {
        Self {
            name: name.into(),
            member,
            serializer: None,
            null_serializer: None,
            discriminator: None,
            suppress_nulls: false,
            suppress: None,
            fallback,
        }
    }

    /// Configures a static serializer, bypassing runtime resolution.
    pub fn with_serializer(mut self, serializer: Arc<dyn ValueSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Configures the serializer used for null values.
    pub fn with_null_serializer(mut self, serializer: Arc<dyn ValueSerializer>) -> Self {
        self.null_serializer = Some(serializer);
        self
    }

    /// Configures a type discriminator emitted around object values.
    pub fn with_discriminator(mut self, discriminator: Arc<dyn TypeDiscriminator>) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    /// Suppresses emission entirely when the value is null.
    pub fn suppress_nulls(mut self, suppress: bool) -> Self {
        self.suppress_nulls = suppress;
        self
    }

    /// Configures a suppression marker.
    pub fn with_suppression(mut self, marker: Suppressable) -> Self {
        self.suppress = Some(marker);
        self
    }

    /// The document field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member this property reads.
    #[inline]
    pub const fn member(&self) -> MemberRef {
        self.member
    }
}
