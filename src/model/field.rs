//! Field-type algebra of a CTF trace.
//!
//! A closed sum type covers every type a tracer can express; consumers walk
//! it through [`FieldTypeVisitor`], one method per variant. The types carry
//! no serialization logic of their own.

use super::abi::ByteOrder;
use super::error::ModelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Preferred display base of an integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegerBase {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringEncoding {
    Ascii,
    Utf8,
}

/// Semantic tag identifying an integer field as a well-known trace element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntegerRole {
    PacketMagic,
    PacketStreamId,
    PacketContextContentSize,
    PacketContextPacketSize,
    PacketContextEventsDiscarded,
    PacketContextPacketSeqNum,
    DefaultClockTimestamp,
    PacketEndDefaultClockTimestamp,
    StreamInstanceId,
}

impl IntegerRole {
    /// Roles that map the field onto the stream's default clock in TSDL.
    pub fn maps_to_default_clock(self) -> bool {
        matches!(
            self,
            IntegerRole::DefaultClockTimestamp | IntegerRole::PacketEndDefaultClockTimestamp
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegerType {
    pub size_bits: u32,
    pub alignment: u32,
    pub signedness: Signedness,
    pub base: IntegerBase,
    pub byte_order: ByteOrder,
    /// Ordered multiset; a field may carry several roles.
    pub roles: Vec<IntegerRole>,
}

impl IntegerType {
    pub fn new(
        size_bits: u32,
        alignment: u32,
        signedness: Signedness,
        base: IntegerBase,
        byte_order: ByteOrder,
    ) -> Self {
        Self {
            size_bits,
            alignment,
            signedness,
            base,
            byte_order,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: IntegerRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn has_default_clock_role(&self) -> bool {
        self.roles.iter().any(|role| role.maps_to_default_clock())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloatType {
    pub alignment: u32,
    pub mantissa_digits: u32,
    pub exponent_digits: u32,
    pub byte_order: ByteOrder,
}

/// Inclusive value range of an enumeration mapping. `begin == end` denotes a
/// single value. Ranges of distinct mappings may overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingRange<V> {
    pub begin: V,
    pub end: V,
}

impl<V: Copy> MappingRange<V> {
    pub fn single(value: V) -> Self {
        Self {
            begin: value,
            end: value,
        }
    }

    pub fn new(begin: V, end: V) -> Self {
        Self { begin, end }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMapping<V> {
    pub name: String,
    pub range: MappingRange<V>,
}

impl<V> EnumMapping<V> {
    pub fn new(name: impl Into<String>, range: MappingRange<V>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Enumeration over an integer container. Mapping order is preserved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumerationType<V> {
    pub container: IntegerType,
    pub mappings: Vec<EnumMapping<V>>,
}

/// Root scope a field location is resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldLocationRoot {
    PacketHeader,
    PacketContext,
    EventRecordHeader,
    EventRecordCommonContext,
    EventRecordSpecificContext,
    EventRecordPayload,
}

/// Path to a length or selector field, relative to a well-known scope.
///
/// Nested scopes are referenced through the last component only; the
/// tracers guarantee it is unique within the containing scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLocation {
    root: FieldLocationRoot,
    path: Vec<String>,
}

impl FieldLocation {
    pub fn new(root: FieldLocationRoot, path: Vec<String>) -> Result<Self, ModelError> {
        if path.is_empty() {
            return Err(ModelError::EmptyFieldLocation);
        }
        Ok(Self { root, path })
    }

    pub fn root(&self) -> FieldLocationRoot {
        self.root
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Last path component; the one consumed when the location is emitted.
    pub fn tail(&self) -> &str {
        self.path.last().expect("location path is never empty")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticArrayType {
    pub element: Box<FieldType>,
    pub length: u64,
    /// Extra alignment constraint; zero means none.
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicArrayType {
    pub element: Box<FieldType>,
    pub length_location: FieldLocation,
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticBlobType {
    pub length_bytes: u64,
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicBlobType {
    pub length_location: FieldLocation,
    pub alignment: u32,
}

/// Null-terminated string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringType {
    pub encoding: StringEncoding,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticStringType {
    pub length: u64,
    pub encoding: StringEncoding,
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicStringType {
    pub length_location: FieldLocation,
    pub encoding: StringEncoding,
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StructureType {
    pub fields: Vec<Field>,
}

impl StructureType {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

/// Tagged union. Choice names must match the tag enumeration's mapping
/// names verbatim; established readers resolve them by exact comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantType {
    pub tag_location: FieldLocation,
    pub choices: Vec<(String, FieldType)>,
    pub alignment: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldType {
    Integer(IntegerType),
    Float(FloatType),
    SignedEnum(EnumerationType<i64>),
    UnsignedEnum(EnumerationType<u64>),
    StaticArray(StaticArrayType),
    DynamicArray(DynamicArrayType),
    StaticBlob(StaticBlobType),
    DynamicBlob(DynamicBlobType),
    NullTerminatedString(StringType),
    StaticString(StaticStringType),
    DynamicString(DynamicStringType),
    Structure(StructureType),
    /// Variant whose tag is a signed enumeration.
    VariantSigned(VariantType),
    /// Variant whose tag is an unsigned enumeration.
    VariantUnsigned(VariantType),
}

impl FieldType {
    pub fn accept<V: FieldTypeVisitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        match self {
            FieldType::Integer(t) => visitor.visit_integer(t),
            FieldType::Float(t) => visitor.visit_float(t),
            FieldType::SignedEnum(t) => visitor.visit_signed_enum(t),
            FieldType::UnsignedEnum(t) => visitor.visit_unsigned_enum(t),
            FieldType::StaticArray(t) => visitor.visit_static_array(t),
            FieldType::DynamicArray(t) => visitor.visit_dynamic_array(t),
            FieldType::StaticBlob(t) => visitor.visit_static_blob(t),
            FieldType::DynamicBlob(t) => visitor.visit_dynamic_blob(t),
            FieldType::NullTerminatedString(t) => visitor.visit_null_terminated_string(t),
            FieldType::StaticString(t) => visitor.visit_static_string(t),
            FieldType::DynamicString(t) => visitor.visit_dynamic_string(t),
            FieldType::Structure(t) => visitor.visit_structure(t),
            FieldType::VariantSigned(t) => visitor.visit_variant_signed(t),
            FieldType::VariantUnsigned(t) => visitor.visit_variant_unsigned(t),
        }
    }

    /// Whether any integer nested in this type maps onto the default clock.
    pub fn references_default_clock(&self) -> bool {
        match self {
            FieldType::Integer(t) => t.has_default_clock_role(),
            FieldType::SignedEnum(t) => t.container.has_default_clock_role(),
            FieldType::UnsignedEnum(t) => t.container.has_default_clock_role(),
            FieldType::StaticArray(t) => t.element.references_default_clock(),
            FieldType::DynamicArray(t) => t.element.references_default_clock(),
            FieldType::Structure(t) => t
                .fields
                .iter()
                .any(|field| field.field_type.references_default_clock()),
            FieldType::VariantSigned(t) | FieldType::VariantUnsigned(t) => t
                .choices
                .iter()
                .any(|(_, choice)| choice.references_default_clock()),
            FieldType::Float(_)
            | FieldType::StaticBlob(_)
            | FieldType::DynamicBlob(_)
            | FieldType::NullTerminatedString(_)
            | FieldType::StaticString(_)
            | FieldType::DynamicString(_) => false,
        }
    }
}

/// Named member of a structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// One method per [`FieldType`] variant. Visitors own ordering and
/// rendering decisions; the types stay pure data.
pub trait FieldTypeVisitor {
    type Error;

    fn visit_integer(&mut self, t: &IntegerType) -> Result<(), Self::Error>;
    fn visit_float(&mut self, t: &FloatType) -> Result<(), Self::Error>;
    fn visit_signed_enum(&mut self, t: &EnumerationType<i64>) -> Result<(), Self::Error>;
    fn visit_unsigned_enum(&mut self, t: &EnumerationType<u64>) -> Result<(), Self::Error>;
    fn visit_static_array(&mut self, t: &StaticArrayType) -> Result<(), Self::Error>;
    fn visit_dynamic_array(&mut self, t: &DynamicArrayType) -> Result<(), Self::Error>;
    fn visit_static_blob(&mut self, t: &StaticBlobType) -> Result<(), Self::Error>;
    fn visit_dynamic_blob(&mut self, t: &DynamicBlobType) -> Result<(), Self::Error>;
    fn visit_null_terminated_string(&mut self, t: &StringType) -> Result<(), Self::Error>;
    fn visit_static_string(&mut self, t: &StaticStringType) -> Result<(), Self::Error>;
    fn visit_dynamic_string(&mut self, t: &DynamicStringType) -> Result<(), Self::Error>;
    fn visit_structure(&mut self, t: &StructureType) -> Result<(), Self::Error>;
    fn visit_variant_signed(&mut self, t: &VariantType) -> Result<(), Self::Error>;
    fn visit_variant_unsigned(&mut self, t: &VariantType) -> Result<(), Self::Error>;
}
