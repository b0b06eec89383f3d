//! Reading the SQL entry back out of an artifact

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::error::{VaultError, VaultResult};

fn open_archive(path: &Path) -> VaultResult<ZipArchive<File>> {
    let file = File::open(path)
        .map_err(|e| VaultError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    ZipArchive::new(file).map_err(|e| {
        VaultError::Archive(format!("{} is not a readable archive: {}", path.display(), e))
    })
}

/// Name of the first `.sql` entry in the artifact
fn sql_entry_name(archive: &ZipArchive<File>) -> Option<String> {
    archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".sql"))
        .map(str::to_string)
}

/// Run `f` over a streaming reader of the artifact's SQL entry
pub fn with_sql_entry<T>(
    path: &Path,
    f: impl FnOnce(&mut dyn Read) -> VaultResult<T>,
) -> VaultResult<T> {
    let mut archive = open_archive(path)?;
    let name = sql_entry_name(&archive).ok_or_else(|| {
        VaultError::Archive(format!("{} contains no SQL entry", path.display()))
    })?;
    let mut entry = archive
        .by_name(&name)
        .map_err(|e| VaultError::Archive(format!("Failed to read {}: {}", name, e)))?;
    f(&mut entry)
}

/// Whole SQL entry as text
pub fn read_sql_entry(path: &Path) -> VaultResult<String> {
    with_sql_entry(path, |entry| {
        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(|e| {
            VaultError::Archive(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(content)
    })
}
