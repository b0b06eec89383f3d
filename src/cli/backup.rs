//! `dumpvault backup`: run one full cycle

use chrono::Local;

use crate::config::Settings;
use crate::cycle::BackupCycle;
use crate::disk::format_size;
use crate::dump::MysqlClient;
use crate::error::VaultResult;
use crate::report::TracingReporter;

pub fn handle_backup_command(settings: &Settings) -> VaultResult<()> {
    let reporter = TracingReporter;
    let server = MysqlClient::new(settings.connection(), settings.mysql_password.clone());
    let today = Local::now().date_naive();

    let remote_store = settings.remote.as_ref().map(|r| r.store());
    let cipher = settings.remote_cipher();

    let mut cycle = BackupCycle::new(
        &settings.backup_dir,
        settings.hostname_for_backup(),
        today,
        &reporter,
    )
    .retention(settings.retention)
    .min_free_bytes(settings.min_free_bytes);
    if let Some(store) = remote_store.as_deref() {
        cycle = cycle.remote(store, cipher.as_ref());
    }

    let report = cycle.run(&server)?;

    if report.written.is_empty() {
        println!("No databases to back up.");
        return Ok(());
    }

    println!("Backup complete");
    println!("===============");
    for path in &report.written {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        println!("  {} ({})", name, format_size(size));
    }
    println!();

    if let Some(prune) = &report.local_prune {
        println!("Expired locally: {}", prune.deleted.len());
    }
    if let Some(prune) = &report.remote_prune {
        println!("Expired remotely: {}", prune.deleted.len());
    }
    if let Some(sync) = &report.sync {
        println!(
            "Remote: {} uploaded, {} removed, {} unchanged",
            sync.uploaded.len(),
            sync.deleted.len(),
            sync.unchanged
        );
    }

    Ok(())
}
