//! Restoring a backup day into the server
//!
//! Every artifact of the selected day is replayed in order through the
//! server's SQL import. Each entry carries its own accounts, so a restore
//! also recreates the accounts that had grants on the database.

use std::path::Path;

use chrono::NaiveDate;

use crate::archive::catalog::{artifacts_of_latest_day, BackupArtifact};
use crate::archive::reader::with_sql_entry;
use crate::dump::DatabaseServer;
use crate::error::{VaultError, VaultResult};
use crate::report::Reporter;
use crate::store::DirStore;

/// Artifacts a restore would replay: the latest backup day in `dir`, or the
/// latest day strictly before `before`
pub fn select_restore_day(
    dir: &Path,
    before: Option<NaiveDate>,
) -> VaultResult<Vec<BackupArtifact>> {
    let artifacts = artifacts_of_latest_day(&DirStore::new(dir), before)?;
    if artifacts.is_empty() {
        return Err(VaultError::artifact_not_found(match before {
            Some(date) => format!("backup day before {}", date),
            None => format!("any backup in {}", dir.display()),
        }));
    }
    Ok(artifacts)
}

/// Feed each artifact's SQL entry into the server, stopping at the first
/// failure
pub fn restore_artifacts(
    dir: &Path,
    artifacts: &[BackupArtifact],
    server: &dyn DatabaseServer,
    reporter: &dyn Reporter,
) -> VaultResult<usize> {
    for artifact in artifacts {
        reporter.info(&format!("Restoring {}", artifact.name));
        with_sql_entry(&dir.join(&artifact.name), |entry| server.import_sql(entry)).map_err(
            |e| VaultError::Dump(format!("Restore of {} failed: {}", artifact.name, e)),
        )?;
    }
    reporter.info(&format!("Restored {} artifact(s)", artifacts.len()));
    Ok(artifacts.len())
}
