//! Cycle resolution, identity pooling, and reference lookups through the
//! backing store.

use conftree::resolver::LoadOptions;
use conftree::schema::schema_of;
use conftree::tree::Path;

use crate::helpers::{AppEntity, Device, sample_device, serializer};

#[test]
fn cyclic_graph_resolves_to_shared_instances() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();
    let tree = ser.to_tree(&sample_device("cyclic")).unwrap();

    // Loading terminates despite the device <-> entity cycle.
    let device = ser.load(&tree, &schema).unwrap();

    let (p1, p2) = device
        .with::<Device, _>(|d| (d.entities["p1"].clone(), d.entities["p2"].clone()))
        .unwrap();

    // Each entity's back-reference is the very device instance we loaded:
    // identity equality, not a structural copy.
    for entity in [&p1, &p2] {
        let back = entity
            .with::<AppEntity, _>(|e| e.device.clone())
            .unwrap()
            .expect("back-reference resolved");
        assert!(back.same_instance(&device));
    }
    // And exactly one instance per identity: the two entities share their
    // device, not copies of it.
    assert!(!p1.same_instance(&p2));
}

#[test]
fn reference_resolves_through_the_store() {
    let ser = serializer();
    let entity_schema = schema_of::<AppEntity>().unwrap();
    let store = crate::helpers::decorated_store();
    let device_path = Path::parse("/devices/networked").unwrap();

    ser.persist_to_store(&store, &device_path, &sample_device("networked"))
        .unwrap();

    // Load just one entity subtree; its device reference points outside
    // the loaded subtree and resolves via the store's uuid index.
    let entity_path = Path::parse("/devices/networked/appEntities/p1").unwrap();
    let entity = ser
        .load_from_store(&store, &entity_path, &entity_schema, LoadOptions::default())
        .unwrap();
    let device = entity
        .with::<AppEntity, _>(|e| e.device.clone())
        .unwrap()
        .expect("resolved through store");
    device
        .with::<Device, _>(|d| assert_eq!(d.device_name, "networked"))
        .unwrap();
}

#[test]
fn unresolvable_strong_reference_is_an_error() {
    let ser = serializer();
    let entity_schema = schema_of::<AppEntity>().unwrap();
    let tree = conftree::tree::ConfigNode::object()
        .with("aeTitle", "orphan")
        .with("device", "00000000-0000-0000-0000-000000000000");
    // No store attached: strong references cannot be resolved at all.
    let err = ser.load(&tree, &entity_schema).unwrap_err();
    assert_eq!(err.module(), "resolver");
}

#[test]
fn dangling_weak_reference_resolves_to_none() {
    let ser = serializer();
    let entity_schema = schema_of::<AppEntity>().unwrap();
    let store = crate::helpers::decorated_store();
    let path = Path::parse("/entities/w1").unwrap();

    let entity = conftree::schema::ObjectHandle::new(AppEntity::named("w1")).unwrap();
    ser.persist_to_store(&store, &path, &entity).unwrap();

    // Stamp a weak reference to an identity that exists nowhere.
    let mut tree = store.node(&path, Some(&entity_schema)).unwrap().unwrap();
    tree.insert("forwardTo", "11111111-2222-3333-4444-555555555555");
    store.persist_node(&path, tree, Some(&entity_schema)).unwrap();

    let reloaded = ser
        .load_from_store(&store, &path, &entity_schema, LoadOptions::default())
        .unwrap();
    reloaded
        .with::<AppEntity, _>(|e| assert!(e.forward_to.is_none()))
        .unwrap();
}

#[test]
fn weak_reference_resolves_when_target_exists() {
    let ser = serializer();
    let entity_schema = schema_of::<AppEntity>().unwrap();
    let store = crate::helpers::decorated_store();

    let target = conftree::schema::ObjectHandle::new(AppEntity::named("target")).unwrap();
    let target_uuid = target.identity().unwrap().unwrap();
    ser.persist_to_store(&store, &Path::parse("/entities/target").unwrap(), &target)
        .unwrap();

    let mut source = AppEntity::named("source");
    source.forward_to = None;
    let source_handle = conftree::schema::ObjectHandle::new(source).unwrap();
    let source_path = Path::parse("/entities/source").unwrap();
    ser.persist_to_store(&store, &source_path, &source_handle).unwrap();
    let mut tree = store.node(&source_path, Some(&entity_schema)).unwrap().unwrap();
    tree.insert("forwardTo", target_uuid.as_str());
    store
        .persist_node(&source_path, tree, Some(&entity_schema))
        .unwrap();

    let reloaded = ser
        .load_from_store(&store, &source_path, &entity_schema, LoadOptions::default())
        .unwrap();
    let forwarded = reloaded
        .with::<AppEntity, _>(|e| e.forward_to.clone())
        .unwrap()
        .expect("weak target found");
    forwarded
        .with::<AppEntity, _>(|e| assert_eq!(e.ae_title, "target"))
        .unwrap();
}

#[test]
fn serializing_reference_without_identity_fails() {
    let ser = serializer();
    let device = sample_device("anon");
    // Blank out the referenced device's identity.
    device
        .with_mut::<Device, _>(|d| d.uuid = String::new())
        .unwrap();
    let err = ser.to_tree(&device).unwrap_err();
    assert!(err.is_unserializable());
}

#[test]
fn one_pool_spans_one_load_operation() {
    let ser = serializer();
    let schema = schema_of::<Device>().unwrap();
    let tree = ser.to_tree(&sample_device("scoped")).unwrap();

    // Two separate loads are two separate operations: distinct pools,
    // distinct instances.
    let first = ser.load(&tree, &schema).unwrap();
    let second = ser.load(&tree, &schema).unwrap();
    assert!(!first.same_instance(&second));
}
