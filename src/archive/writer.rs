//! Crash-safe archive writer
//!
//! An existing artifact is renamed aside to its sidecar before the new
//! container is created, and only removed once the new container is fully
//! written and synced. Any failure in between removes the partial file and
//! renames the sidecar back, so the target path never ends up half-written
//! or lost.
//!
//! [`StagedArchive`] rolls back on drop unless committed, so an early return
//! through `?` anywhere in the caller cannot leave the staged state behind.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::naming::sidecar_path;
use crate::error::{VaultError, VaultResult};
use crate::report::Reporter;

/// Statement appended after the account fragment
pub const RELOAD_STATEMENT: &str = "FLUSH PRIVILEGES;";

/// Lifecycle of one archive write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Target moved aside (if present) and new container opened
    Staged,
    /// Content is being streamed into the entry
    Writing,
    Committed,
    RolledBack,
}

/// Name of the single entry inside an artifact
pub fn entry_name(database: &str) -> String {
    format!("{database}.sql")
}

/// Creates artifacts inside one backup directory
pub struct ArchiveWriter<'a> {
    dir: PathBuf,
    reporter: &'a dyn Reporter,
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(dir: impl Into<PathBuf>, reporter: &'a dyn Reporter) -> Self {
        Self {
            dir: dir.into(),
            reporter,
        }
    }

    /// Move any existing `name` aside and open a fresh container with one
    /// entry for `database`.
    ///
    /// Fails without touching anything if a sidecar from an earlier cycle is
    /// still present; recovery has to resolve it first.
    pub fn stage(&self, name: &str, database: &str) -> VaultResult<StagedArchive<'a>> {
        let target = self.dir.join(name);
        let sidecar = sidecar_path(&target);

        if sidecar.exists() {
            return Err(VaultError::Archive(format!(
                "Leftover sidecar {} must be recovered before writing {}",
                sidecar.display(),
                name
            )));
        }

        let moved_aside = if target.exists() {
            fs::rename(&target, &sidecar).map_err(|e| {
                VaultError::Archive(format!(
                    "Failed to move existing {} aside: {}",
                    name, e
                ))
            })?;
            Some(sidecar)
        } else {
            None
        };

        let mut staged = StagedArchive {
            name: name.to_string(),
            target,
            sidecar: moved_aside,
            zip: None,
            state: WriteState::Staged,
            reporter: self.reporter,
        };

        let file = File::create(&staged.target).map_err(|e| {
            VaultError::Archive(format!("Failed to create {}: {}", name, e))
        })?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(true);
        zip.start_file(entry_name(database), options).map_err(|e| {
            VaultError::Archive(format!("Failed to open entry in {}: {}", name, e))
        })?;
        staged.zip = Some(zip);

        Ok(staged)
    }

    /// Write a complete artifact from a dump stream and an optional account
    /// fragment
    pub fn write(
        &self,
        name: &str,
        database: &str,
        dump: &mut dyn Read,
        grants: Option<&str>,
    ) -> VaultResult<PathBuf> {
        let mut staged = self.stage(name, database)?;
        staged.copy_dump(dump)?;
        staged.append_grants(grants)?;
        staged.commit()
    }
}

/// An artifact in the middle of being written
pub struct StagedArchive<'a> {
    name: String,
    target: PathBuf,
    sidecar: Option<PathBuf>,
    zip: Option<ZipWriter<File>>,
    state: WriteState,
    reporter: &'a dyn Reporter,
}

impl<'a> StagedArchive<'a> {
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Whether a previous artifact was moved aside
    pub fn has_sidecar(&self) -> bool {
        self.sidecar.is_some()
    }

    fn entry(&mut self) -> VaultResult<&mut ZipWriter<File>> {
        let name = &self.name;
        self.zip
            .as_mut()
            .ok_or_else(|| VaultError::Archive(format!("{} is no longer open", name)))
    }

    /// Stream dump bytes into the entry
    pub fn copy_dump<R: Read + ?Sized>(&mut self, dump: &mut R) -> VaultResult<u64> {
        self.state = WriteState::Writing;
        let name = self.name.clone();
        let zip = self.entry()?;
        io::copy(dump, zip).map_err(|e| {
            VaultError::Archive(format!("Failed to stream dump into {}: {}", name, e))
        })
    }

    /// Append the account fragment and the reload statement
    pub fn append_grants(&mut self, fragment: Option<&str>) -> VaultResult<()> {
        let Some(fragment) = fragment.filter(|f| !f.is_empty()) else {
            return Ok(());
        };
        self.state = WriteState::Writing;
        let name = self.name.clone();
        let zip = self.entry()?;
        let block = format!("\n\n{fragment}\n\n{RELOAD_STATEMENT}\n");
        zip.write_all(block.as_bytes()).map_err(|e| {
            VaultError::Archive(format!("Failed to append accounts to {}: {}", name, e))
        })
    }

    /// Finalize the container, sync it and drop the sidecar
    pub fn commit(mut self) -> VaultResult<PathBuf> {
        let zip = self
            .zip
            .take()
            .ok_or_else(|| VaultError::Archive(format!("{} is no longer open", self.name)))?;
        let file = zip.finish().map_err(|e| {
            VaultError::Archive(format!("Failed to finalize {}: {}", self.name, e))
        })?;
        file.sync_all().map_err(|e| {
            VaultError::Archive(format!("Failed to sync {}: {}", self.name, e))
        })?;
        drop(file);

        self.state = WriteState::Committed;
        if let Some(sidecar) = self.sidecar.take() {
            if let Err(e) = fs::remove_file(&sidecar) {
                self.reporter.warn(&format!(
                    "Could not remove sidecar {}: {}",
                    sidecar.display(),
                    e
                ));
            }
        }
        Ok(self.target.clone())
    }

    fn rollback(&mut self) {
        drop(self.zip.take());

        if let Err(e) = fs::remove_file(&self.target) {
            if e.kind() != io::ErrorKind::NotFound {
                self.reporter.warn(&format!(
                    "Could not remove partial {}: {}",
                    self.target.display(),
                    e
                ));
            }
        }

        if let Some(sidecar) = self.sidecar.take() {
            match fs::rename(&sidecar, &self.target) {
                Ok(()) => self
                    .reporter
                    .warn(&format!("Restored previous {} after failed write", self.name)),
                Err(e) => self.reporter.warn(&format!(
                    "Could not restore {} from {}: {}",
                    self.name,
                    sidecar.display(),
                    e
                )),
            }
        }

        self.state = WriteState::RolledBack;
    }
}

impl Drop for StagedArchive<'_> {
    fn drop(&mut self) {
        if !matches!(self.state, WriteState::Committed | WriteState::RolledBack) {
            self.rollback();
        }
    }
}
