//! Object/tree round trips across container shapes, normalization of
//! loosely typed input, and default-value handling.

use conftree::constants::EXTENSIONS_KEY;
use conftree::schema::schema_of;
use conftree::serializer::{fill_defaults, filter_defaults};
use conftree::tree::{ConfigNode, Path};

use crate::helpers::{
    AppEntity, AuditLogger, Connection, DEFAULT_VENDOR, Device, Protocol, Security,
    sample_device, serializer,
};

#[test]
fn nested_record_round_trip_is_exact() {
    let ser = serializer();
    let original = sample_device("scanner1");
    let tree = ser.to_tree(&original).unwrap();

    let schema = schema_of::<Device>().unwrap();
    let reloaded = ser.load(&tree, &schema).unwrap();

    // Same tree again: structural equality through a full round trip.
    let tree_again = ser.to_tree(&reloaded).unwrap();
    assert_eq!(tree_again, tree);

    // Spot-check typed content survived.
    reloaded
        .with::<Device, _>(|d| {
            assert_eq!(d.device_name, "scanner1");
            assert_eq!(d.vendor.as_deref(), Some("Umbra Imaging"));
            assert_eq!(d.entities.len(), 2);
            assert_eq!(d.connections.len(), 1);
        })
        .unwrap();
    let connection = reloaded
        .with::<Device, _>(|d| d.connections[0].clone())
        .unwrap();
    connection
        .with::<Connection, _>(|c| {
            assert_eq!(c.host, "pacs.example.org");
            assert_eq!(c.protocol, Protocol::Hl7);
            assert_eq!(c.security, Security::Tls);
            // Set canonicalization sorts members.
            assert_eq!(c.ciphers, vec!["TLS_AES_128", "TLS_AES_256"]);
        })
        .unwrap();
}

#[test]
fn enums_serialize_per_declared_representation() {
    let ser = serializer();
    let tree = ser.to_tree(&sample_device("scanner1")).unwrap();
    let connection = tree
        .get_at(&Path::parse("/connections/0").unwrap())
        .unwrap();
    // protocol travels by name, security by ordinal.
    assert_eq!(connection.get("protocol").unwrap().as_text(), Some("HL7"));
    assert_eq!(connection.get("security").unwrap().as_int(), Some(1));
}

#[test]
fn loose_text_input_normalizes_before_conversion() {
    let ser = serializer();
    let schema = schema_of::<Connection>().unwrap();
    // The shape a text-only preference backend would hand us.
    let loose = ConfigNode::object()
        .with("host", "archive.example.org")
        .with("port", "2762")
        .with("security", "1")
        .with("ciphers", "[\"TLS_AES_256\"]");
    let loaded = ser.load(&loose, &schema).unwrap();
    loaded
        .with::<Connection, _>(|c| {
            assert_eq!(c.port, 2762);
            assert_eq!(c.security, Security::Tls);
            assert_eq!(c.ciphers, vec!["TLS_AES_256"]);
        })
        .unwrap();
}

#[test]
fn default_normalization_round_trip() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();

    // A device whose vendor equals the declared default.
    let device = sample_device("plain");
    device
        .with_mut::<Device, _>(|d| d.vendor = Some(DEFAULT_VENDOR.to_string()))
        .unwrap();
    let mut tree = ser.to_tree(&device).unwrap();
    filter_defaults(&mut tree, &schema).unwrap();

    // Default-equal property absent after filtering.
    assert!(tree.get("vendor").is_none());
    assert!(tree.get("installed").is_none());

    // Deserializing the filtered tree restores the default value.
    let reloaded = ser.load(&tree, &schema).unwrap();
    reloaded
        .with::<Device, _>(|d| {
            assert_eq!(d.vendor.as_deref(), Some(DEFAULT_VENDOR));
            assert!(d.installed);
        })
        .unwrap();
}

#[test]
fn fill_defaults_synthesizes_nested_nodes() {
    let schema = schema_of::<Device>().unwrap();
    let mut tree = ConfigNode::object().with("deviceName", "bare").with(
        "appEntities",
        ConfigNode::object().with("a", ConfigNode::object().with("aeTitle", "a")),
    );
    fill_defaults(&mut tree, &schema).unwrap();
    assert_eq!(
        tree.get("vendor").unwrap().as_text(),
        Some(DEFAULT_VENDOR)
    );
    // Defaults recurse into map-of-record entries.
    let entity = tree.get_at(&Path::parse("/appEntities/a").unwrap()).unwrap();
    assert_eq!(entity.get("counter").unwrap().as_int(), Some(0));
}

#[test]
fn empty_containers_are_pruned_on_write() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();
    let device = conftree::schema::ObjectHandle::new(Device::named("empty")).unwrap();
    let mut tree = ser.to_tree(&device).unwrap();
    filter_defaults(&mut tree, &schema).unwrap();
    assert!(tree.get("appEntities").is_none());
    assert!(tree.get("connections").is_none());
    assert!(tree.get(EXTENSIONS_KEY).is_none());
}

#[test]
fn missing_required_property_is_fatal() {
    let ser = serializer();
    let schema = schema_of::<Connection>().unwrap();
    let tree = ConfigNode::object().with("port", 11112);
    let err = ser.load(&tree, &schema).unwrap_err();
    assert!(err.is_validation_failed());
}

#[test]
fn extension_bag_round_trips_known_classes() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();

    let device = sample_device("extended");
    let logger = conftree::schema::ObjectHandle::new(AuditLogger {
        enabled: true,
        destination: "syslog://audit".to_string(),
    })
    .unwrap();
    device
        .with_mut::<Device, _>(|d| {
            d.extensions.insert("AuditLogger".to_string(), logger);
        })
        .unwrap();

    let tree = ser.to_tree(&device).unwrap();
    let stored = tree
        .get_at(&Path::parse("/_extensions/AuditLogger").unwrap())
        .unwrap();
    assert_eq!(stored.get("enabled").unwrap().as_bool(), Some(true));

    let reloaded = ser.load(&tree, &schema).unwrap();
    let logger = reloaded
        .with::<Device, _>(|d| d.extensions.get("AuditLogger").cloned())
        .unwrap()
        .expect("extension survives the round trip");
    logger
        .with::<AuditLogger, _>(|l| {
            assert!(l.enabled);
            assert_eq!(l.destination, "syslog://audit");
        })
        .unwrap();
}

#[test]
fn unknown_extension_class_is_skipped_not_fatal() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();
    let mut tree = ser.to_tree(&sample_device("tolerant")).unwrap();
    if let Some(bag) = tree.get_mut(EXTENSIONS_KEY) {
        bag.insert("GhostExtension", ConfigNode::object().with("x", 1));
    }

    let reloaded = ser.load(&tree, &schema).unwrap();
    reloaded
        .with::<Device, _>(|d| {
            assert!(!d.extensions.contains_key("GhostExtension"));
            // The rest of the record loaded normally.
            assert_eq!(d.device_name, "tolerant");
        })
        .unwrap();
}

#[test]
fn entity_map_keys_and_contents_survive() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();
    let tree = ser.to_tree(&sample_device("mapped")).unwrap();
    let reloaded = ser.load(&tree, &schema).unwrap();
    let titles = reloaded
        .with::<Device, _>(|d| d.entities.keys().cloned().collect::<Vec<_>>())
        .unwrap();
    assert_eq!(titles, vec!["p1", "p2"]);
    let p1 = reloaded
        .with::<Device, _>(|d| d.entities["p1"].clone())
        .unwrap();
    p1.with::<AppEntity, _>(|e| assert_eq!(e.description.as_deref(), Some("p1 endpoint")))
        .unwrap();
}
