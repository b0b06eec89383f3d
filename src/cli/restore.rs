//! `dumpvault restore`: replay a backup day into the server

use chrono::NaiveDate;

use crate::config::Settings;
use crate::disk::format_size;
use crate::dump::MysqlClient;
use crate::error::VaultResult;
use crate::report::TracingReporter;
use crate::restore::{restore_artifacts, select_restore_day};

pub fn handle_restore_command(
    settings: &Settings,
    before: Option<NaiveDate>,
    force: bool,
) -> VaultResult<()> {
    let artifacts = select_restore_day(&settings.backup_dir, before)?;

    println!("Restore Plan");
    println!("============");
    println!("Backup day: {}", artifacts[0].date.format("%Y-%m-%d"));
    for artifact in &artifacts {
        println!("  {} ({})", artifact.name, format_size(artifact.size));
    }
    println!();

    if !force {
        println!("WARNING: This replaces the listed databases and their accounts on");
        println!("{}:{}.", settings.mysql_host, settings.mysql_port);
        println!("To proceed, run again with --force flag:");
        match before {
            Some(date) => println!("  dumpvault restore --before {} --force", date),
            None => println!("  dumpvault restore --force"),
        }
        return Ok(());
    }

    let server = MysqlClient::new(settings.connection(), settings.mysql_password.clone());
    let count = restore_artifacts(&settings.backup_dir, &artifacts, &server, &TracingReporter)?;
    println!("Restore complete: {} database(s)", count);
    Ok(())
}
