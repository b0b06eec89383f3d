//! Config file resolution
//!
//! ## Resolution Order
//!
//! 1. `--config <path>` on the command line
//! 2. `DUMPVAULT_CONFIG` environment variable (if set and non-empty)
//! 3. `config.json` next to the executable, if it exists
//! 4. Platform config directory: `~/.config/dumpvault/config.json` on Linux,
//!    the equivalent application-support folder elsewhere

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{VaultError, VaultResult};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DUMPVAULT_CONFIG";

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolve the config file path for this process
pub fn resolve_config_path(flag: Option<&Path>) -> VaultResult<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    resolve_with(flag, std::env::var_os(CONFIG_ENV), exe_dir)
}

fn resolve_with(
    flag: Option<&Path>,
    env: Option<OsString>,
    exe_dir: Option<PathBuf>,
) -> VaultResult<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(candidate) = exe_dir.map(|dir| dir.join(CONFIG_FILE_NAME)) {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    ProjectDirs::from("", "", "dumpvault")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or_else(|| {
            VaultError::Config("Could not determine a configuration directory".to_string())
        })
}
