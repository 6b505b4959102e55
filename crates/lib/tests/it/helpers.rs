//! Shared fixtures for the integration suite.
//!
//! The fixture records model a small device-configuration domain: a
//! `Device` owning application entities (a keyed map of records) and
//! network connections (a list of records), application entities holding a
//! strong reference back to their device (the cycle the resolver must
//! break), plus an `AuditLogger` extension class.

use std::collections::BTreeMap;
use std::sync::Arc;

use conftree::adapter::AdapterRegistry;
use conftree::schema::{
    ClassSchema, Configurable, EnumRepr, EnumValue, FieldValue, ObjectHandle, PropertyDescriptor,
    SchemaError, downcast_mut, downcast_ref, register_class,
};
use conftree::serializer::TreeSerializer;
use conftree::store::{
    CachingDecorator, Configuration, DefaultsDecorator, InMemoryConfiguration, OlockDecorator,
    ReferenceIndexDecorator,
};
use uuid::Uuid;

pub const DEFAULT_VENDOR: &str = "ACME";
pub const DEFAULT_PORT: i64 = 104;

/// Transport protocol spoken on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Dicom,
    Hl7,
    Web,
}

impl Protocol {
    pub const NAMES: [&'static str; 3] = ["DICOM", "HL7", "WEB"];

    pub fn to_value(self) -> EnumValue {
        let ordinal = self as i64;
        EnumValue::new(Self::NAMES[ordinal as usize], ordinal)
    }

    pub fn from_value(value: EnumValue) -> Result<Self, SchemaError> {
        match value.ordinal {
            0 => Ok(Protocol::Dicom),
            1 => Ok(Protocol::Hl7),
            2 => Ok(Protocol::Web),
            _ => Err(SchemaError::ValueTypeMismatch {
                expected: "Protocol ordinal 0..=2".to_string(),
                actual: value.ordinal.to_string(),
            }),
        }
    }
}

/// Whether a connection requires transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    #[default]
    Plain,
    Tls,
}

impl Security {
    pub const NAMES: [&'static str; 2] = ["PLAIN", "TLS"];

    pub fn to_value(self) -> EnumValue {
        let ordinal = self as i64;
        EnumValue::new(Self::NAMES[ordinal as usize], ordinal)
    }

    pub fn from_value(value: EnumValue) -> Result<Self, SchemaError> {
        match value.ordinal {
            0 => Ok(Security::Plain),
            1 => Ok(Security::Tls),
            _ => Err(SchemaError::ValueTypeMismatch {
                expected: "Security ordinal 0..=1".to_string(),
                actual: value.ordinal.to_string(),
            }),
        }
    }
}

/// A network connection: plain composition record, no identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub host: String,
    pub port: i64,
    pub protocol: Protocol,
    /// Serialized by ordinal, unlike `protocol`.
    pub security: Security,
    pub ciphers: Vec<String>,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            protocol: Protocol::default(),
            security: Security::default(),
            ciphers: Vec::new(),
        }
    }
}

impl Configurable for Connection {
    fn class_name() -> &'static str {
        "Connection"
    }

    fn build_schema() -> Result<ClassSchema, SchemaError> {
        ClassSchema::builder::<Connection>()
            .property(
                PropertyDescriptor::text("host").required().accessors(
                    |o| Ok(FieldValue::Text(downcast_ref::<Connection>(o)?.host.clone())),
                    |o, v| {
                        downcast_mut::<Connection>(o)?.host = v.into_text()?;
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::int("port")
                    .with_default(DEFAULT_PORT)
                    .accessors(
                        |o| Ok(FieldValue::Int(downcast_ref::<Connection>(o)?.port)),
                        |o, v| {
                            downcast_mut::<Connection>(o)?.port = v.into_int()?;
                            Ok(())
                        },
                    ),
            )
            .property(
                PropertyDescriptor::enumeration("protocol", &Protocol::NAMES).accessors(
                    |o| {
                        Ok(FieldValue::Enum(
                            downcast_ref::<Connection>(o)?.protocol.to_value(),
                        ))
                    },
                    |o, v| {
                        if !v.is_null() {
                            downcast_mut::<Connection>(o)?.protocol =
                                Protocol::from_value(v.into_enum()?)?;
                        }
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::enumeration("security", &Security::NAMES)
                    .repr(EnumRepr::Ordinal)
                    .accessors(
                        |o| {
                            Ok(FieldValue::Enum(
                                downcast_ref::<Connection>(o)?.security.to_value(),
                            ))
                        },
                        |o, v| {
                            if !v.is_null() {
                                downcast_mut::<Connection>(o)?.security =
                                    Security::from_value(v.into_enum()?)?;
                            }
                            Ok(())
                        },
                    ),
            )
            .property(
                PropertyDescriptor::set_of("ciphers", PropertyDescriptor::text("")).accessors(
                    |o| {
                        Ok(FieldValue::List(
                            downcast_ref::<Connection>(o)?
                                .ciphers
                                .iter()
                                .map(|c| FieldValue::Text(c.clone()))
                                .collect(),
                        ))
                    },
                    |o, v| {
                        downcast_mut::<Connection>(o)?.ciphers = match v {
                            FieldValue::Null => Vec::new(),
                            other => other
                                .into_list()?
                                .into_iter()
                                .map(FieldValue::into_text)
                                .collect::<Result<_, _>>()?,
                        };
                        Ok(())
                    },
                ),
            )
            .finish()
    }
}

/// An application entity: identity-bearing, lock-enabled, and holding the
/// strong back-reference to its device that closes the test cycle.
#[derive(Debug, Clone, Default)]
pub struct AppEntity {
    pub uuid: String,
    pub olock_hash: Option<String>,
    pub ae_title: String,
    pub counter: i64,
    pub description: Option<String>,
    pub device: Option<ObjectHandle>,
    pub forward_to: Option<ObjectHandle>,
}

impl AppEntity {
    pub fn named(ae_title: &str) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            ae_title: ae_title.to_string(),
            ..Self::default()
        }
    }
}

impl Configurable for AppEntity {
    fn class_name() -> &'static str {
        "AppEntity"
    }

    fn build_schema() -> Result<ClassSchema, SchemaError> {
        ClassSchema::builder::<AppEntity>()
            .property(PropertyDescriptor::uuid().accessors(
                |o| Ok(FieldValue::Text(downcast_ref::<AppEntity>(o)?.uuid.clone())),
                |o, v| {
                    if let Some(uuid) = v.into_opt_text()? {
                        downcast_mut::<AppEntity>(o)?.uuid = uuid;
                    }
                    Ok(())
                },
            ))
            .property(PropertyDescriptor::olock_hash().accessors(
                |o| Ok(FieldValue::from(downcast_ref::<AppEntity>(o)?.olock_hash.clone())),
                |o, v| {
                    downcast_mut::<AppEntity>(o)?.olock_hash = v.into_opt_text()?;
                    Ok(())
                },
            ))
            .property(
                PropertyDescriptor::text("aeTitle").required().accessors(
                    |o| Ok(FieldValue::Text(downcast_ref::<AppEntity>(o)?.ae_title.clone())),
                    |o, v| {
                        downcast_mut::<AppEntity>(o)?.ae_title = v.into_text()?;
                        Ok(())
                    },
                ),
            )
            .property(PropertyDescriptor::int("counter").with_default(0).accessors(
                |o| Ok(FieldValue::Int(downcast_ref::<AppEntity>(o)?.counter)),
                |o, v| {
                    downcast_mut::<AppEntity>(o)?.counter = v.into_int()?;
                    Ok(())
                },
            ))
            .property(
                PropertyDescriptor::text("description")
                    .with_default("(unconfigured)")
                    .accessors(
                        |o| Ok(FieldValue::from(downcast_ref::<AppEntity>(o)?.description.clone())),
                        |o, v| {
                            downcast_mut::<AppEntity>(o)?.description = v.into_opt_text()?;
                            Ok(())
                        },
                    ),
            )
            .property(
                PropertyDescriptor::reference::<Device>("device").accessors(
                    |o| Ok(FieldValue::from(downcast_ref::<AppEntity>(o)?.device.clone())),
                    |o, v| {
                        downcast_mut::<AppEntity>(o)?.device = v.into_opt_record()?;
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::weak_reference::<AppEntity>("forwardTo").accessors(
                    |o| Ok(FieldValue::from(downcast_ref::<AppEntity>(o)?.forward_to.clone())),
                    |o, v| {
                        downcast_mut::<AppEntity>(o)?.forward_to = v.into_opt_record()?;
                        Ok(())
                    },
                ),
            )
            .finish()
    }
}

/// The root fixture record: identity, optimistic locking, a keyed map of
/// entities, a list of connections, and an extension bag.
#[derive(Debug, Clone)]
pub struct Device {
    pub uuid: String,
    pub olock_hash: Option<String>,
    pub device_name: String,
    pub vendor: Option<String>,
    pub installed: bool,
    pub entities: BTreeMap<String, ObjectHandle>,
    pub connections: Vec<ObjectHandle>,
    pub extensions: BTreeMap<String, ObjectHandle>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            olock_hash: None,
            device_name: String::new(),
            vendor: None,
            installed: true,
            entities: BTreeMap::new(),
            connections: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }
}

impl Device {
    pub fn named(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_string(),
            ..Self::default()
        }
    }
}

impl Configurable for Device {
    fn class_name() -> &'static str {
        "Device"
    }

    fn build_schema() -> Result<ClassSchema, SchemaError> {
        ClassSchema::builder::<Device>()
            .property(PropertyDescriptor::uuid().accessors(
                |o| Ok(FieldValue::Text(downcast_ref::<Device>(o)?.uuid.clone())),
                |o, v| {
                    if let Some(uuid) = v.into_opt_text()? {
                        downcast_mut::<Device>(o)?.uuid = uuid;
                    }
                    Ok(())
                },
            ))
            .property(PropertyDescriptor::olock_hash().accessors(
                |o| Ok(FieldValue::from(downcast_ref::<Device>(o)?.olock_hash.clone())),
                |o, v| {
                    downcast_mut::<Device>(o)?.olock_hash = v.into_opt_text()?;
                    Ok(())
                },
            ))
            .property(
                PropertyDescriptor::text("deviceName").required().accessors(
                    |o| Ok(FieldValue::Text(downcast_ref::<Device>(o)?.device_name.clone())),
                    |o, v| {
                        downcast_mut::<Device>(o)?.device_name = v.into_text()?;
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::text("vendor")
                    .with_default(DEFAULT_VENDOR)
                    .accessors(
                        |o| Ok(FieldValue::from(downcast_ref::<Device>(o)?.vendor.clone())),
                        |o, v| {
                            downcast_mut::<Device>(o)?.vendor = v.into_opt_text()?;
                            Ok(())
                        },
                    ),
            )
            .property(
                PropertyDescriptor::bool("installed").with_default(true).accessors(
                    |o| Ok(FieldValue::Bool(downcast_ref::<Device>(o)?.installed)),
                    |o, v| {
                        downcast_mut::<Device>(o)?.installed = v.into_bool()?;
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::map_of(
                    "appEntities",
                    PropertyDescriptor::record::<AppEntity>(""),
                )
                .keyed_by("aeTitle")
                .accessors(
                    |o| {
                        Ok(FieldValue::Map(
                            downcast_ref::<Device>(o)?
                                .entities
                                .iter()
                                .map(|(k, h)| (k.clone(), FieldValue::Record(h.clone())))
                                .collect(),
                        ))
                    },
                    |o, v| {
                        downcast_mut::<Device>(o)?.entities = match v {
                            FieldValue::Null => BTreeMap::new(),
                            other => other
                                .into_map()?
                                .into_iter()
                                .map(|(k, fv)| Ok((k, fv.into_record()?)))
                                .collect::<Result<_, SchemaError>>()?,
                        };
                        Ok(())
                    },
                ),
            )
            .property(
                PropertyDescriptor::list_of(
                    "connections",
                    PropertyDescriptor::record::<Connection>(""),
                )
                .accessors(
                    |o| {
                        Ok(FieldValue::List(
                            downcast_ref::<Device>(o)?
                                .connections
                                .iter()
                                .map(|h| FieldValue::Record(h.clone()))
                                .collect(),
                        ))
                    },
                    |o, v| {
                        downcast_mut::<Device>(o)?.connections = match v {
                            FieldValue::Null => Vec::new(),
                            other => other
                                .into_list()?
                                .into_iter()
                                .map(FieldValue::into_record)
                                .collect::<Result<_, _>>()?,
                        };
                        Ok(())
                    },
                ),
            )
            .property(PropertyDescriptor::extension_bag().accessors(
                |o| {
                    Ok(FieldValue::Map(
                        downcast_ref::<Device>(o)?
                            .extensions
                            .iter()
                            .map(|(k, h)| (k.clone(), FieldValue::Record(h.clone())))
                            .collect(),
                    ))
                },
                |o, v| {
                    downcast_mut::<Device>(o)?.extensions = match v {
                        FieldValue::Null => BTreeMap::new(),
                        other => other
                            .into_map()?
                            .into_iter()
                            .map(|(k, fv)| Ok((k, fv.into_record()?)))
                            .collect::<Result<_, SchemaError>>()?,
                    };
                    Ok(())
                },
            ))
            .finish()
    }
}

/// Extension class attachable to a device's extension bag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditLogger {
    pub enabled: bool,
    pub destination: String,
}

impl Configurable for AuditLogger {
    fn class_name() -> &'static str {
        "AuditLogger"
    }

    fn build_schema() -> Result<ClassSchema, SchemaError> {
        ClassSchema::builder::<AuditLogger>()
            .extension()
            .property(PropertyDescriptor::bool("enabled").accessors(
                |o| Ok(FieldValue::Bool(downcast_ref::<AuditLogger>(o)?.enabled)),
                |o, v| {
                    if !v.is_null() {
                        downcast_mut::<AuditLogger>(o)?.enabled = v.into_bool()?;
                    }
                    Ok(())
                },
            ))
            .property(PropertyDescriptor::text("destination").accessors(
                |o| {
                    Ok(FieldValue::Text(
                        downcast_ref::<AuditLogger>(o)?.destination.clone(),
                    ))
                },
                |o, v| {
                    if let Some(destination) = v.into_opt_text()? {
                        downcast_mut::<AuditLogger>(o)?.destination = destination;
                    }
                    Ok(())
                },
            ))
            .finish()
    }
}

/// A serializer over a fresh default registry, with every fixture class
/// registered for by-name (extension) dispatch.
pub fn serializer() -> TreeSerializer {
    register_class::<Device>().unwrap();
    register_class::<AppEntity>().unwrap();
    register_class::<Connection>().unwrap();
    register_class::<AuditLogger>().unwrap();
    TreeSerializer::new(Arc::new(AdapterRegistry::new()))
}

/// A connection fixture with distinguishable values.
pub fn sample_connection(host: &str, port: i64) -> ObjectHandle {
    ObjectHandle::new(Connection {
        host: host.to_string(),
        port,
        protocol: Protocol::Hl7,
        security: Security::Tls,
        ciphers: vec!["TLS_AES_128".to_string(), "TLS_AES_256".to_string()],
    })
    .unwrap()
}

/// A device with two entities ("p1", "p2") and one connection; the
/// entities hold the back-reference to the device (the canonical cycle).
pub fn sample_device(name: &str) -> ObjectHandle {
    let device = ObjectHandle::new(Device::named(name)).unwrap();
    let mut entities = BTreeMap::new();
    for title in ["p1", "p2"] {
        let mut entity = AppEntity::named(title);
        entity.device = Some(device.clone());
        // Non-default values so pure round trips compare exactly; the
        // defaults pass has its own tests.
        entity.description = Some(format!("{title} endpoint"));
        entity.counter = 1;
        entities.insert(title.to_string(), ObjectHandle::new(entity).unwrap());
    }
    let connections = vec![sample_connection("pacs.example.org", 11112)];
    device
        .with_mut::<Device, _>(|d| {
            d.vendor = Some("Umbra Imaging".to_string());
            d.entities = entities;
            d.connections = connections;
        })
        .unwrap();
    device
}

/// The full decorator stack over an in-memory backend, in the order the
/// engine expects: defaults outermost, then olock, reference index, cache,
/// backend.
pub fn decorated_store() -> Arc<dyn Configuration> {
    let backend = Arc::new(InMemoryConfiguration::new());
    let cached = Arc::new(CachingDecorator::new(backend));
    let indexed = Arc::new(ReferenceIndexDecorator::new(cached).unwrap());
    let locked = Arc::new(OlockDecorator::new(indexed));
    Arc::new(DefaultsDecorator::new(locked))
}
