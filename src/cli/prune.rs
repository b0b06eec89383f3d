//! `dumpvault prune`: apply the retention policy

use chrono::NaiveDate;

use crate::archive::catalog::list_artifacts;
use crate::config::Settings;
use crate::error::VaultResult;
use crate::report::TracingReporter;
use crate::retention::{prune, KeepSets};
use crate::store::{ArtifactStore, DirStore};

pub fn handle_prune_command(settings: &Settings, today: NaiveDate, force: bool) -> VaultResult<()> {
    let local = DirStore::new(&settings.backup_dir);
    let remote = settings.remote.as_ref().map(|r| r.store());

    let sets = KeepSets::compute(&settings.retention, today);
    let expired: Vec<String> = list_artifacts(&local)?
        .into_iter()
        .filter(|a| !sets.keeps(a.date))
        .map(|a| a.name)
        .collect();

    if !force {
        if expired.is_empty() {
            println!("No backups to prune.");
            return Ok(());
        }
        println!("Prune Summary");
        println!("=============");
        for name in &expired {
            println!("  {}", name);
        }
        println!();
        println!("To be deleted: {} local backup(s)", expired.len());
        println!("To delete them, run again with --force flag:");
        println!("  dumpvault prune --force");
        return Ok(());
    }

    let reporter = TracingReporter;
    let mut stores: Vec<&dyn ArtifactStore> = vec![&local];
    if let Some(remote) = remote.as_deref() {
        stores.push(remote);
    }

    for store in stores {
        let outcome = prune(store, &settings.retention, today, &reporter)?;
        println!(
            "{}: {} deleted, {} kept{}",
            store.location(),
            outcome.deleted.len(),
            outcome.kept.len(),
            if outcome.failed.is_empty() {
                String::new()
            } else {
                format!(", {} could not be deleted", outcome.failed.len())
            }
        );
    }

    Ok(())
}
