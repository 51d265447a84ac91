// Whole-collection JSON encoding on top of a key-value backend

use crate::kv::KeyValueStore;
use crate::record::Record;
use eyre::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Serialize `records` as a JSON array and write it under the collection key
pub fn write_collection<T, K>(kv: &mut K, records: &[T]) -> Result<()>
where
    T: Record,
    K: KeyValueStore + ?Sized,
{
    let key = T::collection_key();
    let json = serde_json::to_string(records).context("Failed to serialize collection")?;
    kv.set(key, &json).with_context(|| format!("Failed to write collection {}", key))?;
    debug!(key, count = records.len(), "Wrote collection");
    Ok(())
}

/// Read the collection stored under its key
///
/// Returns `Ok(None)` if the key is absent and an error if it cannot be read or parsed.
/// Records repeating an earlier id are dropped; the first occurrence wins.
pub fn read_collection<T, K>(kv: &K) -> Result<Option<Vec<T>>>
where
    T: Record,
    K: KeyValueStore + ?Sized,
{
    let key = T::collection_key();
    let Some(json) = kv.get(key).with_context(|| format!("Failed to read collection {}", key))? else {
        return Ok(None);
    };

    let records: Vec<T> = serde_json::from_str(&json).with_context(|| format!("Failed to parse collection {}", key))?;

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.id().to_string()) {
            unique.push(record);
        } else {
            warn!(key, id = record.id(), "Dropping record with duplicate id");
        }
    }

    debug!(key, count = unique.len(), "Loaded collection");
    Ok(Some(unique))
}

/// Read a collection, falling back to `default` when it is absent or unusable
pub fn load_or_default<T, K, F>(kv: &K, default: F) -> Vec<T>
where
    T: Record,
    K: KeyValueStore + ?Sized,
    F: FnOnce() -> Vec<T>,
{
    match read_collection(kv) {
        Ok(Some(records)) => records,
        Ok(None) => {
            debug!(key = T::collection_key(), "Collection not persisted yet, using default");
            default()
        }
        Err(e) => {
            warn!(key = T::collection_key(), error = ?e, "Failed to load collection, using default");
            default()
        }
    }
}
