//! In-memory artifact store for finished podcast audio.
//!
//! Entries live for the lifetime of the process: there is no eviction and no
//! capacity bound.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Maps a generated audio id to the audio bytes of one finished run.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    entries: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under a fresh random (v4 UUID) id and return the id.
    pub fn put(&self, bytes: Vec<u8>) -> String {
        let id = Uuid::new_v4().to_string();
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), Arc::from(bytes));
        id
    }

    /// Fetch the bytes stored under `id`.
    pub fn get(&self, id: &str) -> Option<Arc<[u8]>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
