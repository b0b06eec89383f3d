//! Free-space precheck for the backup volume

use std::path::Path;

use crate::error::{VaultError, VaultResult};
use crate::report::Reporter;

/// Default minimum free space before a cycle starts (100 MiB)
pub const DEFAULT_MIN_FREE_BYTES: u64 = 100 * 1024 * 1024;

/// Refuse to proceed when `dir`'s volume has less than `min_free` bytes
/// available. A failed space query is reported and treated as enough space.
pub fn check_free_space(dir: &Path, min_free: u64, reporter: &dyn Reporter) -> VaultResult<()> {
    if min_free == 0 {
        return Ok(());
    }

    match fs2::available_space(dir) {
        Ok(available) if available < min_free => Err(VaultError::InsufficientSpace {
            available,
            required: min_free,
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            reporter.warn(&format!(
                "Could not determine free space on {}: {}",
                dir.display(),
                e
            ));
            Ok(())
        }
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
