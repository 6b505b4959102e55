//! Store contract semantics through the decorator pipeline, plus backend
//! error propagation.

use std::sync::Arc;

use conftree::constants::UUID_KEY;
use conftree::schema::{ClassSchema, schema_of};
use conftree::store::{Configuration, InMemoryConfiguration, StoreError};
use conftree::tree::{ConfigNode, Path, SearchIter};
use conftree::{Error, Result};

use crate::helpers::{Device, sample_device, serializer};

#[test]
fn persist_preserves_children_absent_from_the_new_subtree() {
    let store = crate::helpers::decorated_store();
    let path = Path::parse("/devices/merge").unwrap();

    store
        .persist_node(
            &path,
            ConfigNode::object().with("deviceName", "merge").with("keep", "me"),
            None,
        )
        .unwrap();
    store
        .persist_node(&path, ConfigNode::object().with("deviceName", "renamed"), None)
        .unwrap();

    let node = store.node(&path, None).unwrap().unwrap();
    assert_eq!(node.get("deviceName").unwrap().as_text(), Some("renamed"));
    assert_eq!(node.get("keep").unwrap().as_text(), Some("me"));
}

#[test]
fn node_exists_and_absence_are_not_errors() {
    let store = crate::helpers::decorated_store();
    let path = Path::parse("/devices/present").unwrap();
    assert!(!store.node_exists(&path).unwrap());
    assert!(store.node(&path, None).unwrap().is_none());

    store
        .persist_node(&path, ConfigNode::object().with("x", 1), None)
        .unwrap();
    assert!(store.node_exists(&path).unwrap());
}

#[test]
fn search_through_the_full_stack() {
    let ser = serializer();
    let store = crate::helpers::decorated_store();
    for name in ["alpha", "beta"] {
        let path = Path::parse(&format!("/devices/{name}")).unwrap();
        ser.persist_to_store(&store, &path, &sample_device(name)).unwrap();
    }

    let found: Vec<_> = store
        .search(&Path::parse("/devices/*[deviceName='beta']").unwrap())
        .unwrap()
        .collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("deviceName").unwrap().as_text(), Some("beta"));

    // Entity-level search across all devices.
    let entities = store
        .search(&Path::parse("/devices/*/appEntities/*[aeTitle='p1']").unwrap())
        .unwrap()
        .count();
    assert_eq!(entities, 2);
}

#[test]
fn uuid_lookup_uses_the_index_and_scan_fallback() {
    let ser = serializer();
    let store = crate::helpers::decorated_store();
    let path = Path::parse("/devices/indexed").unwrap();
    let device = sample_device("indexed");
    ser.persist_to_store(&store, &path, &device).unwrap();

    let uuid = device.identity().unwrap().unwrap();
    assert_eq!(
        store.lookup_uuid(&uuid).unwrap().unwrap().to_string(),
        "/devices/indexed"
    );

    // A bare backend without the index decorator answers by scanning.
    let bare = InMemoryConfiguration::new();
    bare.persist_node(
        &Path::parse("/d").unwrap(),
        ConfigNode::object().with(UUID_KEY, "scan-me"),
        None,
    )
    .unwrap();
    assert_eq!(
        bare.lookup_uuid("scan-me").unwrap().unwrap().to_string(),
        "/d"
    );
}

#[test]
fn remove_semantics_through_the_stack() {
    let store = crate::helpers::decorated_store();
    let path = Path::parse("/devices/gone").unwrap();
    store
        .persist_node(&path, ConfigNode::object().with("x", 1), None)
        .unwrap();
    store.remove_node(&path).unwrap();
    assert!(!store.node_exists(&path).unwrap());

    // Absent leaf: tolerated. Absent parent: error.
    store.remove_node(&path).unwrap();
    let err = store
        .remove_node(&Path::parse("/void/child").unwrap())
        .unwrap_err();
    assert!(err.is_not_found());
}

/// A backend that fails every operation, for error propagation tests.
struct FailingBackend;

impl Configuration for FailingBackend {
    fn root(&self) -> Result<ConfigNode> {
        Err(StoreError::backend(
            "root",
            "/",
            std::io::Error::other("directory service unavailable"),
        )
        .into())
    }

    fn node(&self, path: &Path, _schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        Err(StoreError::backend(
            "node",
            path.to_string(),
            std::io::Error::other("directory service unavailable"),
        )
        .into())
    }

    fn persist_node(
        &self,
        path: &Path,
        _node: ConfigNode,
        _schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        Err(StoreError::backend(
            "persist",
            path.to_string(),
            std::io::Error::other("directory service unavailable"),
        )
        .into())
    }

    fn remove_node(&self, path: &Path) -> Result<()> {
        Err(StoreError::backend(
            "remove",
            path.to_string(),
            std::io::Error::other("directory service unavailable"),
        )
        .into())
    }

    fn refresh_node(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn search(&self, _pattern: &Path) -> Result<SearchIter> {
        Ok(SearchIter::empty())
    }
}

#[test]
fn backend_failures_are_wrapped_with_context_not_swallowed() {
    let backend: Arc<dyn Configuration> = Arc::new(FailingBackend);
    let path = Path::parse("/devices/x").unwrap();

    let err = backend.node(&path, None).unwrap_err();
    assert!(err.is_backend_error());
    match err {
        Error::Store(StoreError::Backend { operation, path, .. }) => {
            assert_eq!(operation, "node");
            assert_eq!(path, "/devices/x");
        }
        other => panic!("expected wrapped backend error, got {other:?}"),
    }
}

#[test]
fn refresh_is_visible_through_the_whole_stack() {
    // The cache sits below the olock/defaults decorators; refresh at the
    // top must reach it.
    let store = crate::helpers::decorated_store();
    let schema = schema_of::<Device>().unwrap();
    let ser = serializer();
    let path = Path::parse("/devices/fresh").unwrap();

    ser.persist_to_store(&store, &path, &sample_device("fresh")).unwrap();
    let before = store.node(&path, Some(&schema)).unwrap().unwrap();
    assert_eq!(before.get("deviceName").unwrap().as_text(), Some("fresh"));

    store.refresh_node(&path).unwrap();
    let after = store.node(&path, Some(&schema)).unwrap().unwrap();
    assert_eq!(after.get("deviceName").unwrap().as_text(), Some("fresh"));
}
