//! Dynamic values exchanged between accessors and type adapters.
//!
//! [`FieldValue`] is the loosely typed runtime value a property getter
//! produces and a setter consumes. [`ObjectHandle`] is the shared handle to
//! a live record instance; it is what lets one pooled instance be shared by
//! every participant of a reference cycle. Identity equality between
//! handles is pointer equality, never structural.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::schema::{ClassSchema, ConfigObject, Configurable, PropertyDescriptor, SchemaError};

/// An enum value carried with both of its representations so either
/// on-tree form (name or ordinal) can be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, ordinal: i64) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

/// The dynamic value of one property, as read from or written to a record
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Enum(EnumValue),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Record(ObjectHandle),
}

impl FieldValue {
    /// Returns a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Double(_) => "double",
            FieldValue::Text(_) => "text",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Enum(_) => "enum",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
            FieldValue::Record(_) => "record",
        }
    }

    /// Returns true if this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn mismatch(&self, expected: &str) -> SchemaError {
        SchemaError::ValueTypeMismatch {
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
        }
    }

    pub fn into_bool(self) -> Result<bool, SchemaError> {
        match self {
            FieldValue::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_int(self) -> Result<i64, SchemaError> {
        match self {
            FieldValue::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn into_double(self) -> Result<f64, SchemaError> {
        match self {
            FieldValue::Double(d) => Ok(d),
            FieldValue::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("double")),
        }
    }

    pub fn into_text(self) -> Result<String, SchemaError> {
        match self {
            FieldValue::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, SchemaError> {
        match self {
            FieldValue::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    pub fn into_enum(self) -> Result<EnumValue, SchemaError> {
        match self {
            FieldValue::Enum(e) => Ok(e),
            other => Err(other.mismatch("enum")),
        }
    }

    pub fn into_list(self) -> Result<Vec<FieldValue>, SchemaError> {
        match self {
            FieldValue::List(l) => Ok(l),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_map(self) -> Result<BTreeMap<String, FieldValue>, SchemaError> {
        match self {
            FieldValue::Map(m) => Ok(m),
            other => Err(other.mismatch("map")),
        }
    }

    pub fn into_record(self) -> Result<ObjectHandle, SchemaError> {
        match self {
            FieldValue::Record(h) => Ok(h),
            other => Err(other.mismatch("record")),
        }
    }

    /// Like [`into_text`](Self::into_text) but maps null to `None`.
    pub fn into_opt_text(self) -> Result<Option<String>, SchemaError> {
        match self {
            FieldValue::Null => Ok(None),
            other => other.into_text().map(Some),
        }
    }

    /// Like [`into_record`](Self::into_record) but maps null to `None`.
    pub fn into_opt_record(self) -> Result<Option<ObjectHandle>, SchemaError> {
        match self {
            FieldValue::Null => Ok(None),
            other => other.into_record().map(Some),
        }
    }

    pub fn as_record(&self) -> Option<&ObjectHandle> {
        match self {
            FieldValue::Record(h) => Some(h),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<EnumValue> for FieldValue {
    fn from(e: EnumValue) -> Self {
        FieldValue::Enum(e)
    }
}

impl From<ObjectHandle> for FieldValue {
    fn from(h: ObjectHandle) -> Self {
        FieldValue::Record(h)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A shared, mutable handle to a live record instance plus its schema.
///
/// Cloning the handle shares the instance; [`same_instance`]
/// (`Arc::ptr_eq`) is the identity test used by cycle-resolution
/// guarantees. Lock discipline is short closure-scoped read/write
/// sections; no lock is held across adapter calls.
///
/// [`same_instance`]: ObjectHandle::same_instance
#[derive(Clone)]
pub struct ObjectHandle {
    schema: Arc<ClassSchema>,
    object: Arc<RwLock<Box<dyn ConfigObject>>>,
}

impl ObjectHandle {
    /// Wraps an existing instance of a configurable type.
    pub fn new<T: Configurable>(value: T) -> Result<Self, SchemaError> {
        let schema = crate::schema::schema_of::<T>()?;
        Ok(Self {
            schema,
            object: Arc::new(RwLock::new(Box::new(value))),
        })
    }

    /// Allocates a bare/default instance of the schema's type.
    pub fn from_schema(schema: &Arc<ClassSchema>) -> Self {
        Self {
            schema: schema.clone(),
            object: Arc::new(RwLock::new(schema.instantiate())),
        }
    }

    /// The schema of the held instance.
    pub fn schema(&self) -> &Arc<ClassSchema> {
        &self.schema
    }

    /// Identity equality: both handles point at the same live instance.
    pub fn same_instance(&self, other: &ObjectHandle) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    /// Runs `f` against the concrete instance.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, SchemaError> {
        let guard = self.object.read().unwrap();
        // Deref through the Box so the downcast sees the held object, not
        // the box (the ConfigObject blanket impl covers both).
        let concrete = (**guard)
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| SchemaError::AccessorTypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
            })?;
        Ok(f(concrete))
    }

    /// Runs `f` against the concrete instance, mutably.
    pub fn with_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, SchemaError> {
        let mut guard = self.object.write().unwrap();
        let concrete = (**guard)
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| SchemaError::AccessorTypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
            })?;
        Ok(f(concrete))
    }

    /// Reads one property through its registered getter.
    pub fn get(&self, property: &PropertyDescriptor) -> Result<FieldValue, SchemaError> {
        let getter = property.getter.ok_or_else(|| SchemaError::MissingAccessor {
            class: self.schema.class_name().to_string(),
            property: property.name.clone(),
            accessor: "getter",
        })?;
        let guard = self.object.read().unwrap();
        getter(guard.as_ref())
    }

    /// Writes one property through its registered setter.
    pub fn set(&self, property: &PropertyDescriptor, value: FieldValue) -> Result<(), SchemaError> {
        let setter = property.setter.ok_or_else(|| SchemaError::MissingAccessor {
            class: self.schema.class_name().to_string(),
            property: property.name.clone(),
            accessor: "setter",
        })?;
        let mut guard = self.object.write().unwrap();
        setter(guard.as_mut(), value)
    }

    /// Reads the identity (UUID) of the held instance, if its type
    /// declares an identity property and the value is set.
    pub fn identity(&self) -> Result<Option<String>, SchemaError> {
        let Some(property) = self.schema.identity_property() else {
            return Ok(None);
        };
        match self.get(property)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) if s.is_empty() => Ok(None),
            FieldValue::Text(s) => Ok(Some(s)),
            other => Err(SchemaError::ValueTypeMismatch {
                expected: "text identity".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectHandle({} @ {:p})",
            self.schema.class_name(),
            Arc::as_ptr(&self.object)
        )
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}
