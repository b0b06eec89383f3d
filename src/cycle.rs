//! One backup cycle, top to bottom
//!
//! Free-space check, sidecar recovery, account redistribution, one artifact
//! per database, retention on the local and remote stores, then the remote
//! sync. Artifacts are written strictly one after another. A failed artifact
//! stops the cycle; artifacts written before it stay in place.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::archive::naming::artifact_name;
use crate::archive::recovery::{recover_sidecars, RecoveryReport};
use crate::archive::writer::ArchiveWriter;
use crate::crypto::ArchiveCipher;
use crate::disk::{check_free_space, DEFAULT_MIN_FREE_BYTES};
use crate::dump::DatabaseServer;
use crate::error::{VaultError, VaultResult};
use crate::grants::redistribute;
use crate::remote::sync::{sync, SyncReport};
use crate::report::Reporter;
use crate::retention::{prune, PruneOutcome, RetentionPolicy};
use crate::store::{ArtifactStore, DirStore};

/// What a cycle did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub recovered: RecoveryReport,
    pub written: Vec<PathBuf>,
    pub local_prune: Option<PruneOutcome>,
    pub remote_prune: Option<PruneOutcome>,
    pub sync: Option<SyncReport>,
}

/// Parameters of one cycle
pub struct BackupCycle<'a> {
    backup_dir: PathBuf,
    host: String,
    date: NaiveDate,
    policy: RetentionPolicy,
    min_free_bytes: u64,
    remote: Option<&'a dyn ArtifactStore>,
    cipher: Option<&'a ArchiveCipher>,
    reporter: &'a dyn Reporter,
}

impl<'a> BackupCycle<'a> {
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        host: impl Into<String>,
        date: NaiveDate,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            host: host.into(),
            date,
            policy: RetentionPolicy::default(),
            min_free_bytes: DEFAULT_MIN_FREE_BYTES,
            remote: None,
            cipher: None,
            reporter,
        }
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn min_free_bytes(mut self, bytes: u64) -> Self {
        self.min_free_bytes = bytes;
        self
    }

    /// Mirror to `store` after the local work, encrypting with `cipher`
    pub fn remote(
        mut self,
        store: &'a dyn ArtifactStore,
        cipher: Option<&'a ArchiveCipher>,
    ) -> Self {
        self.remote = Some(store);
        self.cipher = cipher;
        self
    }

    pub fn run(&self, server: &dyn DatabaseServer) -> VaultResult<CycleReport> {
        let reporter = self.reporter;
        let mut report = CycleReport::default();

        std::fs::create_dir_all(&self.backup_dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;
        check_free_space(&self.backup_dir, self.min_free_bytes, reporter)?;
        report.recovered = recover_sidecars(&self.backup_dir, reporter);

        let databases = server.list_databases()?;
        if databases.is_empty() {
            reporter.info("No user databases found; nothing to back up");
            return Ok(report);
        }

        let export = server.export_accounts().unwrap_or_else(|e| {
            reporter.warn(&format!(
                "Account export failed, archives will not include accounts: {}",
                e
            ));
            String::new()
        });
        let accounts = redistribute(&export, reporter);
        if !accounts.identities.is_empty() {
            reporter.info(&format!(
                "Found {} account(s): {}",
                accounts.identities.len(),
                accounts.identities.join(", ")
            ));
        }

        let writer = ArchiveWriter::new(&self.backup_dir, reporter);
        for database in &databases {
            let name = artifact_name(self.date, &self.host, database);
            let path = self
                .write_one(&writer, server, &name, database, accounts.fragment_for(database))
                .map_err(|e| {
                    VaultError::Archive(format!("Backup of database {} failed: {}", database, e))
                })?;
            reporter.info(&format!("Wrote {}", name));
            report.written.push(path);
        }

        let local = DirStore::new(self.backup_dir.clone());
        report.local_prune = self.prune_store(&local);
        if let Some(remote) = self.remote {
            report.remote_prune = self.prune_store(remote);
            report.sync = Some(sync(&local, remote, self.cipher, reporter)?);
        }

        Ok(report)
    }

    fn write_one(
        &self,
        writer: &ArchiveWriter<'_>,
        server: &dyn DatabaseServer,
        name: &str,
        database: &str,
        fragment: Option<&str>,
    ) -> VaultResult<PathBuf> {
        let mut staged = writer.stage(name, database)?;
        let mut dump = server.open_dump(database)?;
        staged.copy_dump(&mut *dump)?;
        dump.finish()?;
        staged.append_grants(fragment)?;
        staged.commit()
    }

    fn prune_store(&self, store: &dyn ArtifactStore) -> Option<PruneOutcome> {
        match prune(store, &self.policy, self.date, self.reporter) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.reporter.warn(&format!(
                    "Retention on {} failed: {}",
                    store.location(),
                    e
                ));
                None
            }
        }
    }
}
