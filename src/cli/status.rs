//! `dumpvault status`: configuration and local artifacts

use std::path::Path;

use chrono::NaiveDate;

use crate::archive::catalog::list_artifacts;
use crate::config::Settings;
use crate::disk::format_size;
use crate::error::VaultResult;
use crate::retention::KeepSets;
use crate::store::DirStore;

pub fn handle_status_command(
    config_path: &Path,
    settings: &Settings,
    today: NaiveDate,
) -> VaultResult<()> {
    println!("dumpvault Configuration");
    println!("=======================");
    println!("Config file:      {}", config_path.display());
    println!(
        "Server:           {}@{}:{}",
        settings.mysql_user, settings.mysql_host, settings.mysql_port
    );
    println!("Artifact host:    {}", settings.hostname_for_backup());
    println!("Backup directory: {}", settings.backup_dir.display());
    let retention = &settings.retention;
    println!(
        "Retention:        {} daily, {} weekly, {} monthly, {} yearly",
        retention.daily, retention.weekly, retention.monthly, retention.yearly
    );
    match &settings.remote {
        Some(remote) => println!(
            "Remote:           {} (encryption {})",
            remote.store().location(),
            if remote.cipher().is_some() { "on" } else { "off" }
        ),
        None => println!("Remote:           not configured"),
    }
    println!();

    let artifacts = list_artifacts(&DirStore::new(&settings.backup_dir))?;
    if artifacts.is_empty() {
        println!("No backups found.");
        println!("Create one with: dumpvault backup");
        return Ok(());
    }

    let sets = KeepSets::compute(retention, today);
    println!("Local Backups");
    println!("=============");
    for artifact in &artifacts {
        let kept_as = match sets.reason(artifact.date) {
            Some(class) => class.to_string(),
            None => "expired".to_string(),
        };
        println!(
            "  {}  {:<7}  {:>9}  {}",
            artifact.date.format("%Y-%m-%d"),
            kept_as,
            format_size(artifact.size),
            artifact.name
        );
    }
    println!();
    println!("Total: {} backup(s)", artifacts.len());

    Ok(())
}
