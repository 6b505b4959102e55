//! Schema descriptors for record types.
//!
//! A [`ClassSchema`] is the cached, ordered structural description of a
//! record type: one [`PropertyDescriptor`] per property, carrying the
//! property's node name, its container kind, behavioral flags (identity,
//! reference, defaults), and accessor function pointers. Descriptors are
//! plain data built once per type by [`Configurable::build_schema`] and
//! memoized for the process lifetime (see [`registry`]); they are immutable
//! after construction.
//!
//! There is no runtime reflection here. Accessors are statically registered
//! `fn` pointers operating on `&dyn ConfigObject` with an internal
//! downcast, and element schemas for generic parameters are derived lazily
//! through [`SchemaSource`] function pointers so that reference cycles in
//! the schema graph terminate.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub mod errors;
pub mod paths;
pub mod registry;
pub mod value;

pub use errors::SchemaError;
pub use registry::{register_class, schema_by_name, schema_of};
pub use value::{EnumValue, FieldValue, ObjectHandle};

use crate::constants::{EXTENSIONS_KEY, HASH_KEY, UUID_KEY};
use crate::tree::ConfigNode;

/// Object-safe base trait for all record instances handled by the engine.
///
/// Implemented blanket-wise for every `Any + Send + Sync` type; concrete
/// access always goes through a downcast inside a statically registered
/// accessor.
pub trait ConfigObject: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + Sync> ConfigObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A record type that carries a statically registered schema.
pub trait Configurable: Default + Send + Sync + 'static {
    /// The simple class name, used for extension-bag dispatch and custom
    /// adapter registration.
    fn class_name() -> &'static str;

    /// Build this type's schema descriptor. Called at most a handful of
    /// times; the first stored result wins and is cached for the process
    /// lifetime.
    fn build_schema() -> Result<ClassSchema, SchemaError>;
}

/// Downcast helper for accessor bodies.
pub fn downcast_ref<T: 'static>(obj: &dyn ConfigObject) -> Result<&T, SchemaError> {
    obj.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| SchemaError::AccessorTypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// Mutable downcast helper for accessor bodies.
pub fn downcast_mut<T: 'static>(obj: &mut dyn ConfigObject) -> Result<&mut T, SchemaError> {
    obj.as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| SchemaError::AccessorTypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// Reads one property off a record instance.
pub type Getter = fn(&dyn ConfigObject) -> Result<FieldValue, SchemaError>;

/// Writes one property onto a record instance.
pub type Setter = fn(&mut dyn ConfigObject, FieldValue) -> Result<(), SchemaError>;

/// Lazily resolves the schema of a related record type. Function pointer
/// rather than `Arc` so that mutually referencing record types terminate.
pub type SchemaSource = fn() -> Result<Arc<ClassSchema>, SchemaError>;

/// The container shape of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// A single primitive value.
    Scalar,
    /// A fixed-shape primitive sequence.
    Array,
    /// An ordered collection.
    List,
    /// An unordered collection; serialized in canonical (sorted) order.
    Set,
    /// String-keyed entries.
    Map,
    /// A nested record.
    Record,
    /// The open, class-name-keyed bag of polymorphic sub-records.
    ExtensionMap,
}

/// The primitive type of a scalar property or container element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Double,
    Text,
    /// Serialized as a base64 text primitive.
    Bytes,
    Enum,
}

/// Behavioral tags attached to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropertyTag {
    /// Excluded from optimistic-lock hash calculation.
    OlockIgnore,
}

/// How an enum property is represented on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRepr {
    /// By variant name (text primitive).
    #[default]
    Name,
    /// By ordinal position (integer primitive).
    Ordinal,
}

/// Structural description of one property of a record type.
///
/// Container elements are described by a nested pseudo-descriptor with an
/// empty name (`element`).
#[derive(Clone)]
pub struct PropertyDescriptor {
    /// Node name this property serializes under.
    pub name: String,
    pub kind: ContainerKind,
    /// Primitive type for `Scalar` properties and scalar elements.
    pub scalar: Option<ScalarKind>,
    /// Pseudo-descriptor for container elements (Array/List/Set/Map).
    pub element: Option<Box<PropertyDescriptor>>,
    /// Lazy schema of the related record type (Record kind and references).
    pub record: Option<SchemaSource>,
    /// Resolved type name, used for custom adapter lookup.
    pub type_name: Option<String>,
    pub is_reference: bool,
    pub is_weak_reference: bool,
    pub is_identity: bool,
    /// A required property with no value and no default fails validation.
    pub required: bool,
    /// For maps of records: the element property that carries the map key,
    /// used for simple/persistable path translation.
    pub map_key: Option<String>,
    /// Synthesized for absent properties on load; pruned when equal on save.
    pub default: Option<ConfigNode>,
    /// Enum variant names in ordinal order.
    pub enum_values: Vec<String>,
    pub enum_repr: EnumRepr,
    pub tags: BTreeSet<PropertyTag>,
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scalar", &self.scalar)
            .field("type_name", &self.type_name)
            .field("is_reference", &self.is_reference)
            .field("is_identity", &self.is_identity)
            .finish_non_exhaustive()
    }
}

impl PropertyDescriptor {
    fn base(name: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            scalar: None,
            element: None,
            record: None,
            type_name: None,
            is_reference: false,
            is_weak_reference: false,
            is_identity: false,
            required: false,
            map_key: None,
            default: None,
            enum_values: Vec::new(),
            enum_repr: EnumRepr::default(),
            tags: BTreeSet::new(),
            getter: None,
            setter: None,
        }
    }

    fn scalar_of(name: impl Into<String>, scalar: ScalarKind) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::Scalar);
        descriptor.scalar = Some(scalar);
        descriptor
    }

    /// A boolean property.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::scalar_of(name, ScalarKind::Bool)
    }

    /// An integer property.
    pub fn int(name: impl Into<String>) -> Self {
        Self::scalar_of(name, ScalarKind::Int)
    }

    /// A floating-point property.
    pub fn double(name: impl Into<String>) -> Self {
        Self::scalar_of(name, ScalarKind::Double)
    }

    /// A text property.
    pub fn text(name: impl Into<String>) -> Self {
        Self::scalar_of(name, ScalarKind::Text)
    }

    /// A byte-array property, serialized as base64 text.
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::scalar_of(name, ScalarKind::Bytes)
    }

    /// An enum property with the given variant names in ordinal order.
    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        let mut descriptor = Self::scalar_of(name, ScalarKind::Enum);
        descriptor.enum_values = values.iter().map(|v| v.to_string()).collect();
        descriptor
    }

    /// A nested record property.
    pub fn record<T: Configurable>(name: impl Into<String>) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::Record);
        descriptor.record = Some(registry::schema_of::<T>);
        descriptor.type_name = Some(T::class_name().to_string());
        descriptor
    }

    /// A strong (identity-resolved) reference to a record.
    pub fn reference<T: Configurable>(name: impl Into<String>) -> Self {
        let mut descriptor = Self::record::<T>(name);
        descriptor.is_reference = true;
        descriptor
    }

    /// A weak reference, resolved by store lookup rather than the identity
    /// pool; not required to support cycles.
    pub fn weak_reference<T: Configurable>(name: impl Into<String>) -> Self {
        let mut descriptor = Self::reference::<T>(name);
        descriptor.is_weak_reference = true;
        descriptor
    }

    /// The reserved identity property.
    pub fn uuid() -> Self {
        let mut descriptor = Self::scalar_of(UUID_KEY, ScalarKind::Text);
        descriptor.is_identity = true;
        descriptor.tags.insert(PropertyTag::OlockIgnore);
        descriptor
    }

    /// The reserved optimistic-lock hash property.
    pub fn olock_hash() -> Self {
        let mut descriptor = Self::scalar_of(HASH_KEY, ScalarKind::Text);
        descriptor.tags.insert(PropertyTag::OlockIgnore);
        descriptor
    }

    /// The reserved extension bag property.
    pub fn extension_bag() -> Self {
        Self::base(EXTENSIONS_KEY, ContainerKind::ExtensionMap)
    }

    /// An ordered list property over `element`.
    pub fn list_of(name: impl Into<String>, element: PropertyDescriptor) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::List);
        descriptor.element = Some(Box::new(element));
        descriptor
    }

    /// An array property over `element`.
    pub fn array_of(name: impl Into<String>, element: PropertyDescriptor) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::Array);
        descriptor.element = Some(Box::new(element));
        descriptor
    }

    /// A set property over `element`; serialized in canonical order.
    pub fn set_of(name: impl Into<String>, element: PropertyDescriptor) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::Set);
        descriptor.element = Some(Box::new(element));
        descriptor
    }

    /// A string-keyed map property over `element`.
    pub fn map_of(name: impl Into<String>, element: PropertyDescriptor) -> Self {
        let mut descriptor = Self::base(name, ContainerKind::Map);
        descriptor.element = Some(Box::new(element));
        descriptor
    }

    /// Marks this property as required: absence with no default fails
    /// validation at load time.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares the default value, synthesized when absent and pruned when
    /// equal on save.
    pub fn with_default(mut self, default: impl Into<ConfigNode>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Attaches a behavioral tag.
    pub fn tag(mut self, tag: PropertyTag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Names the element property carrying a map entry's key.
    pub fn keyed_by(mut self, map_key: impl Into<String>) -> Self {
        self.map_key = Some(map_key.into());
        self
    }

    /// Chooses the on-tree enum representation.
    pub fn repr(mut self, repr: EnumRepr) -> Self {
        self.enum_repr = repr;
        self
    }

    /// Registers the accessor function pointers for this property.
    pub fn accessors(mut self, getter: Getter, setter: Setter) -> Self {
        self.getter = Some(getter);
        self.setter = Some(setter);
        self
    }

    /// Returns true if the property carries the given tag.
    pub fn has_tag(&self, tag: PropertyTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Resolves the related record schema, if any.
    pub fn record_schema(&self) -> Result<Option<Arc<ClassSchema>>, SchemaError> {
        self.record.map(|source| source()).transpose()
    }

    /// The element pseudo-descriptor of a container property.
    pub fn element_descriptor(&self) -> Option<&PropertyDescriptor> {
        self.element.as_deref()
    }

    /// Returns true if this is a pseudo-descriptor for container elements.
    pub fn is_element(&self) -> bool {
        self.name.is_empty()
    }
}

/// The cached, ordered structural description of a record type.
#[derive(Debug, Clone)]
pub struct ClassSchema {
    class_name: &'static str,
    type_id: TypeId,
    properties: Vec<PropertyDescriptor>,
    identity: Option<usize>,
    olock: Option<usize>,
    extension_bag: Option<usize>,
    is_extension: bool,
    construct: fn() -> Box<dyn ConfigObject>,
}

impl ClassSchema {
    /// Starts building the schema for `T`.
    pub fn builder<T: Configurable>() -> ClassSchemaBuilder {
        ClassSchemaBuilder {
            class_name: T::class_name(),
            type_id: TypeId::of::<T>(),
            construct: || Box::new(T::default()),
            properties: Vec::new(),
            is_extension: false,
        }
    }

    /// The simple class name.
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// The `TypeId` of the described record type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// All property descriptors, in declaration order (base class
    /// properties first).
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks up a property by node name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The identity property, if the type declares one.
    pub fn identity_property(&self) -> Option<&PropertyDescriptor> {
        self.identity.map(|i| &self.properties[i])
    }

    /// The reserved lock-hash property, if the type opts into optimistic
    /// locking.
    pub fn olock_property(&self) -> Option<&PropertyDescriptor> {
        self.olock.map(|i| &self.properties[i])
    }

    /// Returns true if the type opts into optimistic locking.
    pub fn has_olock(&self) -> bool {
        self.olock.is_some()
    }

    /// The extension bag property, if declared.
    pub fn extension_bag_property(&self) -> Option<&PropertyDescriptor> {
        self.extension_bag.map(|i| &self.properties[i])
    }

    /// Returns true if this class is an extension attached through another
    /// record's extension bag.
    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    /// Allocates a bare/default instance of the described type.
    pub fn instantiate(&self) -> Box<dyn ConfigObject> {
        (self.construct)()
    }
}

/// Builder for [`ClassSchema`]; validation happens in [`finish`](Self::finish).
pub struct ClassSchemaBuilder {
    class_name: &'static str,
    type_id: TypeId,
    construct: fn() -> Box<dyn ConfigObject>,
    properties: Vec<PropertyDescriptor>,
    is_extension: bool,
}

impl ClassSchemaBuilder {
    /// Copies the properties of a base schema, walking the inheritance
    /// chain exactly once (the base already contains its own ancestors).
    pub fn inherit(mut self, base: &ClassSchema) -> Self {
        self.properties.extend(base.properties.iter().cloned());
        self
    }

    /// Marks this class as an extension (attachable via extension bags).
    /// Extensions must not declare identity properties.
    pub fn extension(mut self) -> Self {
        self.is_extension = true;
        self
    }

    /// Declares a property. Declaration order is preserved.
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Validates and finalizes the schema. Fails fast on duplicate
    /// identity declarations or identity-bearing extensions; these are
    /// construction-time defects.
    pub fn finish(self) -> Result<ClassSchema, SchemaError> {
        let mut identity = None;
        let mut olock = None;
        let mut extension_bag = None;
        for (index, property) in self.properties.iter().enumerate() {
            if self
                .properties
                .iter()
                .skip(index + 1)
                .any(|other| other.name == property.name)
            {
                return Err(SchemaError::DuplicateProperty {
                    class: self.class_name.to_string(),
                    property: property.name.clone(),
                });
            }
            if property.is_identity {
                if identity.is_some() {
                    return Err(SchemaError::DuplicateIdentity {
                        class: self.class_name.to_string(),
                    });
                }
                identity = Some(index);
            }
            if property.name == HASH_KEY {
                olock = Some(index);
            }
            if property.kind == ContainerKind::ExtensionMap {
                extension_bag = Some(index);
            }
        }
        if self.is_extension && identity.is_some() {
            return Err(SchemaError::IdentityInExtension {
                class: self.class_name.to_string(),
            });
        }
        Ok(ClassSchema {
            class_name: self.class_name,
            type_id: self.type_id,
            properties: self.properties,
            identity,
            olock,
            extension_bag,
            is_extension: self.is_extension,
            construct: self.construct,
        })
    }
}
