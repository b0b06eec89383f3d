//! Directory-backed artifact store

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{ArtifactStore, StoreEntry};
use crate::error::{VaultError, VaultResult};

/// Suffix of in-flight uploads; renamed into place once complete
const PARTIAL_SUFFIX: &str = ".part";

/// A flat directory on a mounted filesystem
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path of an entry
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for DirStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn ensure_root(&self) -> VaultResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    fn list(&self) -> VaultResult<Vec<StoreEntry>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read directory {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VaultError::Io(format!("Failed to read directory entry: {}", e))
            })?;
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
            listed.push(StoreEntry {
                name,
                modified,
                size: metadata.len(),
            });
        }

        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn upload(&self, name: &str, source: &mut dyn Read) -> VaultResult<u64> {
        let target = self.path_of(name);
        let partial = self.path_of(&format!("{name}{PARTIAL_SUFFIX}"));

        let copied = write_partial(&partial, source).map_err(|e| {
            let _ = fs::remove_file(&partial);
            VaultError::Remote(format!("Failed to write {}: {}", target.display(), e))
        })?;

        fs::rename(&partial, &target).map_err(|e| {
            let _ = fs::remove_file(&partial);
            VaultError::Remote(format!("Failed to rename into {}: {}", target.display(), e))
        })?;

        Ok(copied)
    }

    fn download(&self, name: &str) -> VaultResult<Box<dyn Read>> {
        let path = self.path_of(name);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                VaultError::artifact_not_found(path.display().to_string())
            } else {
                VaultError::Io(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn delete(&self, name: &str) -> VaultResult<()> {
        let path = self.path_of(name);
        fs::remove_file(&path)
            .map_err(|e| VaultError::Io(format!("Failed to delete {}: {}", path.display(), e)))
    }
}

fn write_partial(path: &Path, source: &mut dyn Read) -> io::Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let copied = io::copy(source, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::new(temp_dir.path().join("nope"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_upload_download_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::new(temp_dir.path().join("nested").join("remote"));
        store.ensure_root().unwrap();

        let written = store.upload("a.zip", &mut &b"payload"[..]).unwrap();
        assert_eq!(written, 7);
        assert!(!store.path_of("a.zip.part").exists());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a.zip");
        assert_eq!(listed[0].size, 7);

        let mut content = String::new();
        store
            .download("a.zip")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "payload");

        store.delete("a.zip").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("f.zip"), b"x").unwrap();

        let store = DirStore::new(temp_dir.path());
        let names: Vec<_> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["f.zip".to_string()]);
    }

    #[test]
    fn test_download_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::new(temp_dir.path());
        let err = store.download("missing.zip").err().unwrap();
        assert!(err.is_not_found());
    }
}
