//! In-memory store for tests

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{ArtifactStore, StoreEntry};
use crate::error::{VaultError, VaultResult};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    files: Mutex<BTreeMap<String, (DateTime<Utc>, Vec<u8>)>>,
    undeletable: Mutex<BTreeSet<String>>,
    uploads: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, name: &str, modified: DateTime<Utc>, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), (modified, content.to_vec()));
    }

    pub(crate) fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).map(|(_, c)| c.clone())
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub(crate) fn refuse_delete(&self, name: &str) {
        self.undeletable.lock().unwrap().insert(name.to_string());
    }
}

impl ArtifactStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn ensure_root(&self) -> VaultResult<()> {
        Ok(())
    }

    fn list(&self) -> VaultResult<Vec<StoreEntry>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, (modified, content))| StoreEntry {
                name: name.clone(),
                modified: *modified,
                size: content.len() as u64,
            })
            .collect())
    }

    fn upload(&self, name: &str, source: &mut dyn Read) -> VaultResult<u64> {
        let mut content = Vec::new();
        source.read_to_end(&mut content)?;
        let size = content.len() as u64;
        self.insert(name, Utc::now(), &content);
        self.uploads.lock().unwrap().push(name.to_string());
        Ok(size)
    }

    fn download(&self, name: &str) -> VaultResult<Box<dyn Read>> {
        let content = self
            .content(name)
            .ok_or_else(|| VaultError::artifact_not_found(name))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn delete(&self, name: &str) -> VaultResult<()> {
        if self.undeletable.lock().unwrap().contains(name) {
            return Err(VaultError::Remote(format!("Permission denied: {name}")));
        }
        self.files.lock().unwrap().remove(name);
        Ok(())
    }
}
