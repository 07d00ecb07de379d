//! JSON snapshot of the in-memory store
//!
//! Opaque debugging/replay snapshot; the production store lives with the
//! persistence collaborator.

use std::fs;
use std::path::Path;

use crate::core::FlowResult;

use super::{InMemoryStore, MemoryStore};

/// Write the store as pretty JSON, creating parent directories
pub fn save_snapshot(store: &InMemoryStore, path: impl AsRef<Path>) -> FlowResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(store)?;
    fs::write(path, json)?;

    tracing::info!("Saved {} memory records to {:?}", store.len(), path);
    Ok(())
}

/// Load a store written by [`save_snapshot`]
pub fn load_snapshot(path: impl AsRef<Path>) -> FlowResult<InMemoryStore> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let store: InMemoryStore = serde_json::from_str(&json)?;

    tracing::info!("Loaded {} memory records from {:?}", store.len(), path);
    Ok(store)
}

/// Load a snapshot if the file exists, otherwise start empty
pub fn load_or_empty(path: impl AsRef<Path>) -> FlowResult<InMemoryStore> {
    let path = path.as_ref();
    if path.exists() {
        load_snapshot(path)
    } else {
        tracing::info!("No memory snapshot at {:?}, starting empty", path);
        Ok(InMemoryStore::default())
    }
}
