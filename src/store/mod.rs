//! Artifact stores
//!
//! The retention pruner, the sync engine and remote fetch all see a backup
//! directory through [`ArtifactStore`]: a flat listing of entries with
//! modification time and size, streamed upload and download, deletion, and
//! recursive creation of the root. `DirStore` backs it with a filesystem
//! directory, which covers the local backup directory as well as a mounted
//! remote target. `SftpStore` reaches a directory on an SSH server.

mod dir;
#[cfg(test)]
pub(crate) mod memory;
mod sftp;

use std::io::Read;

use chrono::{DateTime, Utc};

use crate::error::VaultResult;

pub use dir::DirStore;
pub use sftp::{SftpStore, SshEndpoint};

/// One file as observed in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Abstract file-transfer capability over one flat directory
pub trait ArtifactStore {
    /// Human-readable location, used in messages
    fn location(&self) -> String;

    /// Create the root directory (and parents) if missing
    fn ensure_root(&self) -> VaultResult<()>;

    /// Every regular file in the root; a missing root lists as empty
    fn list(&self) -> VaultResult<Vec<StoreEntry>>;

    /// Stream `source` into `name`, replacing any existing entry.
    /// Returns the number of bytes stored.
    fn upload(&self, name: &str, source: &mut dyn Read) -> VaultResult<u64>;

    /// Open `name` for streaming reads
    fn download(&self, name: &str) -> VaultResult<Box<dyn Read>>;

    /// Remove `name`
    fn delete(&self, name: &str) -> VaultResult<()>;
}
