//! Typed object model of a CTF trace.
//!
//! Pure data plus visitor protocols; serialization lives in [`crate::tsdl`].

pub mod abi;
pub mod clock;
pub mod error;
pub mod event;
pub mod field;
pub mod stream;
pub mod trace;

pub use abi::{Abi, ByteOrder};
pub use clock::ClockClass;
pub use error::ModelError;
pub use event::EventClass;
pub use field::{
    DynamicArrayType, DynamicBlobType, DynamicStringType, EnumMapping, EnumerationType, Field,
    FieldLocation, FieldLocationRoot, FieldType, FieldTypeVisitor, FloatType, IntegerBase,
    IntegerRole, IntegerType, MappingRange, Signedness, StaticArrayType, StaticBlobType,
    StaticStringType, StringEncoding, StringType, StructureType, VariantType,
};
pub use stream::StreamClass;
pub use trace::{EnvValue, EnvironmentVisitor, TraceClass, TraceClassVisitor};
