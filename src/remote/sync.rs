//! Mirroring the local backup directory to the remote store
//!
//! After a sync the remote holds exactly the local artifacts. An artifact is
//! uploaded when the remote copy is missing, older than the local file, or
//! (with encryption on) not exactly one header larger than the local file,
//! which catches copies written before encryption was enabled. Remote
//! artifacts with no local counterpart are deleted.

use std::collections::{BTreeMap, BTreeSet};

use crate::archive::naming::is_artifact_name;
use crate::crypto::{encrypted_size, ArchiveCipher};
use crate::error::{VaultError, VaultResult};
use crate::report::Reporter;
use crate::store::{ArtifactStore, StoreEntry};

/// What a sync would do, before touching anything
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub uploads: Vec<String>,
    pub deletions: Vec<String>,
}

/// What a sync did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
    /// Remote deletions that failed and were skipped
    pub failed_deletions: Vec<String>,
    pub unchanged: usize,
}

fn artifacts_only(entries: Vec<StoreEntry>) -> Vec<StoreEntry> {
    entries
        .into_iter()
        .filter(|e| is_artifact_name(&e.name))
        .collect()
}

/// Decide uploads and deletions from both listings
pub fn plan_sync(local: &[StoreEntry], remote: &[StoreEntry], encrypted: bool) -> SyncPlan {
    let remote_by_name: BTreeMap<&str, &StoreEntry> =
        remote.iter().map(|e| (e.name.as_str(), e)).collect();
    let local_names: BTreeSet<&str> = local.iter().map(|e| e.name.as_str()).collect();

    let uploads = local
        .iter()
        .filter(|loc| match remote_by_name.get(loc.name.as_str()) {
            None => true,
            Some(rem) => {
                loc.modified > rem.modified
                    || (encrypted && rem.size != encrypted_size(loc.size))
            }
        })
        .map(|loc| loc.name.clone())
        .collect();

    let deletions = remote
        .iter()
        .filter(|rem| !local_names.contains(rem.name.as_str()))
        .map(|rem| rem.name.clone())
        .collect();

    SyncPlan { uploads, deletions }
}

/// Make `remote` mirror the artifacts in `local`.
///
/// An upload failure aborts the sync with the artifact name attached; a
/// failed remote delete is reported and skipped.
pub fn sync(
    local: &dyn ArtifactStore,
    remote: &dyn ArtifactStore,
    cipher: Option<&ArchiveCipher>,
    reporter: &dyn Reporter,
) -> VaultResult<SyncReport> {
    let local_entries = artifacts_only(local.list()?);

    remote.ensure_root()?;
    let remote_entries = artifacts_only(remote.list().map_err(|e| {
        VaultError::Remote(format!("Failed to list {}: {}", remote.location(), e))
    })?);

    if cipher.is_some() {
        reporter.info("Remote copies are encrypted");
    } else {
        reporter.info("Remote copies are not encrypted");
    }

    let plan = plan_sync(&local_entries, &remote_entries, cipher.is_some());
    let mut report = SyncReport {
        unchanged: local_entries.len() - plan.uploads.len(),
        ..Default::default()
    };

    for name in plan.uploads {
        upload_one(local, remote, cipher, &name)
            .map_err(|e| VaultError::Remote(format!("Failed to upload {}: {}", name, e)))?;
        reporter.info(&format!("Uploaded {}", name));
        report.uploaded.push(name);
    }

    for name in plan.deletions {
        match remote.delete(&name) {
            Ok(()) => {
                reporter.info(&format!("Removed {} from {}", name, remote.location()));
                report.deleted.push(name);
            }
            Err(e) => {
                reporter.warn(&format!("Could not remove remote {}: {}", name, e));
                report.failed_deletions.push(name);
            }
        }
    }

    Ok(report)
}

fn upload_one(
    local: &dyn ArtifactStore,
    remote: &dyn ArtifactStore,
    cipher: Option<&ArchiveCipher>,
    name: &str,
) -> VaultResult<u64> {
    let source = local.download(name)?;
    let mut reader = match cipher {
        Some(cipher) => cipher.encrypting_reader(source)?,
        None => source,
    };
    remote.upload(name, &mut reader)
}
