//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the library operations.

pub mod backup;
pub mod fetch;
pub mod prune;
pub mod restore;
pub mod status;
pub mod sync;

use crate::config::{RemoteSettings, Settings};
use crate::error::{VaultError, VaultResult};

pub use backup::handle_backup_command;
pub use fetch::handle_fetch_command;
pub use prune::handle_prune_command;
pub use restore::handle_restore_command;
pub use status::handle_status_command;
pub use sync::handle_sync_command;

/// The remote section, or a configuration error naming the command
fn require_remote<'a>(settings: &'a Settings, command: &str) -> VaultResult<&'a RemoteSettings> {
    settings.remote.as_ref().ok_or_else(|| {
        VaultError::Config(format!(
            "'{}' needs a \"remote\" section with a target directory",
            command
        ))
    })
}
