//! `dumpvault sync`: mirror the backup directory to the remote

use super::require_remote;
use crate::config::Settings;
use crate::error::VaultResult;
use crate::remote::sync;
use crate::report::TracingReporter;
use crate::store::DirStore;

pub fn handle_sync_command(settings: &Settings) -> VaultResult<()> {
    let remote = require_remote(settings, "sync")?;
    let cipher = remote.cipher();

    let store = remote.store();
    let report = sync(
        &DirStore::new(&settings.backup_dir),
        store.as_ref(),
        cipher.as_ref(),
        &TracingReporter,
    )?;

    println!(
        "Remote: {} uploaded, {} removed, {} unchanged",
        report.uploaded.len(),
        report.deleted.len(),
        report.unchanged
    );
    if !report.failed_deletions.is_empty() {
        println!(
            "Could not remove {} remote file(s); see log",
            report.failed_deletions.len()
        );
    }
    Ok(())
}
