//! Process-wide schema cache and class-name index.
//!
//! Schemas are a pure function of the record type, so they are cached
//! globally, keyed by `TypeId`. Population is lazy with first-writer-wins
//! semantics: concurrent callers may compute a schema twice, but only one
//! result is ever stored and observed. The parallel name index serves
//! extension-bag dispatch, where sub-records are keyed by their class's
//! simple name on the tree.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::schema::{ClassSchema, Configurable, SchemaError};

type SchemaCache = RwLock<HashMap<TypeId, Arc<ClassSchema>>>;
type NameIndex = RwLock<HashMap<String, Arc<ClassSchema>>>;

fn cache() -> &'static SchemaCache {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

fn name_index() -> &'static NameIndex {
    static INDEX: OnceLock<NameIndex> = OnceLock::new();
    INDEX.get_or_init(Default::default)
}

/// Returns the cached schema for `T`, building it on first use.
///
/// Safe to call concurrently; duplicate computation is possible but
/// duplicate storage is not, so every caller observes the same `Arc`.
pub fn schema_of<T: Configurable>() -> Result<Arc<ClassSchema>, SchemaError> {
    let type_id = TypeId::of::<T>();
    if let Some(found) = cache().read().unwrap().get(&type_id) {
        return Ok(found.clone());
    }
    // Build outside any lock: build_schema may recurse into schema_of for
    // composed record types.
    let built = Arc::new(T::build_schema()?);
    let winner = {
        let mut map = cache().write().unwrap();
        map.entry(type_id).or_insert(built).clone()
    };
    name_index()
        .write()
        .unwrap()
        .entry(winner.class_name().to_string())
        .or_insert_with(|| winner.clone());
    Ok(winner)
}

/// Eagerly registers `T` so it can be found by class name.
///
/// Extension classes must be registered before a tree containing them is
/// loaded; unknown class names in an extension bag are skipped with a
/// warning.
pub fn register_class<T: Configurable>() -> Result<(), SchemaError> {
    schema_of::<T>().map(|_| ())
}

/// Looks up a previously registered schema by its simple class name.
pub fn schema_by_name(name: &str) -> Option<Arc<ClassSchema>> {
    name_index().read().unwrap().get(name).cloned()
}
