//! Domain values and their conversion to BSON wire values.
//!
//! The host ORM hands literals and bound parameters over as [`DomainValue`]s. A
//! [`ValueCodec`] maps them onto BSON scalars without widening or narrowing: a 32-bit
//! integer stays a BSON `int32`, a UUID becomes binary subtype 4, and so on.

use bson::{
    Binary, Bson,
    oid::ObjectId,
    spec::BinarySubtype,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DocSqlError, DocSqlResult};

/// A typed, non-null scalar value coming from the host ORM.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    /// Boolean value.
    Boolean(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Timestamp in UTC, stored with millisecond precision on the wire.
    DateTime(DateTime<Utc>),
    /// UUID, stored as BSON binary subtype 4.
    Uuid(Uuid),
    /// Native document database object identifier.
    ObjectId(ObjectId),
    /// Opaque bytes, stored as generic BSON binary.
    Bytes(Vec<u8>),
}

impl DomainValue {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            DomainValue::Boolean(_) => "boolean",
            DomainValue::Int32(_) => "int32",
            DomainValue::Int64(_) => "int64",
            DomainValue::Double(_) => "double",
            DomainValue::String(_) => "string",
            DomainValue::DateTime(_) => "datetime",
            DomainValue::Uuid(_) => "uuid",
            DomainValue::ObjectId(_) => "objectId",
            DomainValue::Bytes(_) => "bytes",
        }
    }
}

impl From<bool> for DomainValue {
    fn from(value: bool) -> Self {
        DomainValue::Boolean(value)
    }
}

impl From<i32> for DomainValue {
    fn from(value: i32) -> Self {
        DomainValue::Int32(value)
    }
}

impl From<i64> for DomainValue {
    fn from(value: i64) -> Self {
        DomainValue::Int64(value)
    }
}

impl From<f64> for DomainValue {
    fn from(value: f64) -> Self {
        DomainValue::Double(value)
    }
}

impl From<&str> for DomainValue {
    fn from(value: &str) -> Self {
        DomainValue::String(value.to_string())
    }
}

impl From<String> for DomainValue {
    fn from(value: String) -> Self {
        DomainValue::String(value)
    }
}

impl From<DateTime<Utc>> for DomainValue {
    fn from(value: DateTime<Utc>) -> Self {
        DomainValue::DateTime(value)
    }
}

impl From<Uuid> for DomainValue {
    fn from(value: Uuid) -> Self {
        DomainValue::Uuid(value)
    }
}

impl From<ObjectId> for DomainValue {
    fn from(value: ObjectId) -> Self {
        DomainValue::ObjectId(value)
    }
}

/// Conversion between domain values and BSON wire values.
pub trait ValueCodec {
    /// Converts a domain value into the wire value that represents it.
    fn to_wire(&self, value: &DomainValue) -> DocSqlResult<Bson>;

    /// Converts a wire value read back from the database into a domain value.
    ///
    /// # Errors
    ///
    /// Returns [`DocSqlError::FeatureNotSupported`] for BSON types with no domain counterpart.
    fn from_wire(&self, value: &Bson) -> DocSqlResult<DomainValue>;
}

impl<C: ValueCodec + ?Sized> ValueCodec for &C {
    fn to_wire(&self, value: &DomainValue) -> DocSqlResult<Bson> {
        (*self).to_wire(value)
    }

    fn from_wire(&self, value: &Bson) -> DocSqlResult<DomainValue> {
        (*self).from_wire(value)
    }
}

/// The exact-type codec used unless the host ORM installs its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValueCodec;

impl ValueCodec for DefaultValueCodec {
    fn to_wire(&self, value: &DomainValue) -> DocSqlResult<Bson> {
        Ok(match value {
            DomainValue::Boolean(b) => Bson::Boolean(*b),
            DomainValue::Int32(i) => Bson::Int32(*i),
            DomainValue::Int64(i) => Bson::Int64(*i),
            DomainValue::Double(d) => Bson::Double(*d),
            DomainValue::String(s) => Bson::String(s.clone()),
            DomainValue::DateTime(dt) => Bson::DateTime(bson::DateTime::from_chrono(*dt)),
            DomainValue::Uuid(u) => Bson::Binary(Binary::from_uuid(bson::Uuid::from_bytes(u.into_bytes()))),
            DomainValue::ObjectId(oid) => Bson::ObjectId(*oid),
            DomainValue::Bytes(bytes) => Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            }),
        })
    }

    fn from_wire(&self, value: &Bson) -> DocSqlResult<DomainValue> {
        match value {
            Bson::Boolean(b) => Ok(DomainValue::Boolean(*b)),
            Bson::Int32(i) => Ok(DomainValue::Int32(*i)),
            Bson::Int64(i) => Ok(DomainValue::Int64(*i)),
            Bson::Double(d) => Ok(DomainValue::Double(*d)),
            Bson::String(s) => Ok(DomainValue::String(s.clone())),
            Bson::DateTime(dt) => Ok(DomainValue::DateTime(dt.to_chrono())),
            Bson::ObjectId(oid) => Ok(DomainValue::ObjectId(*oid)),
            Bson::Binary(binary) => match binary.subtype {
                BinarySubtype::Uuid => <[u8; 16]>::try_from(binary.bytes.as_slice())
                    .map(|bytes| DomainValue::Uuid(Uuid::from_bytes(bytes)))
                    .map_err(|_| DocSqlError::Serialization(format!(
                        "uuid binary must be 16 bytes, got {}",
                        binary.bytes.len(),
                    ))),
                BinarySubtype::Generic => Ok(DomainValue::Bytes(binary.bytes.clone())),
                other => Err(DocSqlError::unsupported(format!("binary subtype {other:?}"))),
            },
            other => Err(DocSqlError::unsupported(format!("wire type {:?}", other.element_type()))),
        }
    }
}
