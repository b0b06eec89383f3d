//! `dumpvault fetch`: download artifacts from the remote

use std::path::PathBuf;

use super::require_remote;
use crate::config::Settings;
use crate::error::VaultResult;
use crate::remote::fetch;
use crate::report::TracingReporter;

pub fn handle_fetch_command(
    settings: &Settings,
    pattern: &str,
    dest: Option<PathBuf>,
) -> VaultResult<()> {
    let remote = require_remote(settings, "fetch")?;
    let cipher = remote.cipher();
    let dest = dest.unwrap_or_else(|| settings.backup_dir.clone());

    let store = remote.store();
    let saved = fetch(store.as_ref(), pattern, &dest, cipher.as_ref(), &TracingReporter)?;

    for path in &saved {
        println!("Saved {}", path.display());
    }
    println!("Fetched {} file(s)", saved.len());
    Ok(())
}
