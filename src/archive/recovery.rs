//! Sidecar recovery
//!
//! Runs before any new write. Only sidecars of artifact names are touched.
//! A sidecar left behind by an interrupted cycle either still holds the
//! only good copy or is stale:
//!
//! - no target next to it: the sidecar becomes the target
//! - sidecar at least as large as the target: the target is a partial
//!   write, the sidecar replaces it
//! - otherwise the target is complete and the sidecar is removed

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::naming::target_of_sidecar;
use crate::report::Reporter;

/// What recovery did, per file name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Sidecars renamed into an empty target slot
    pub restored: Vec<String>,
    /// Sidecars that replaced a partial target
    pub replaced: Vec<String>,
    /// Stale sidecars removed
    pub discarded: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty() && self.replaced.is_empty() && self.discarded.is_empty()
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve every sidecar in `dir`. Failures are reported, never fatal.
pub fn recover_sidecars(dir: &Path, reporter: &dyn Reporter) -> RecoveryReport {
    let mut report = RecoveryReport::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            reporter.warn(&format!(
                "Could not scan {} for sidecars: {}",
                dir.display(),
                e
            ));
            return report;
        }
    };

    let sidecars: Vec<(PathBuf, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| target_of_sidecar(&path).map(|target| (path, target)))
        .collect();

    for (sidecar, target) in sidecars {
        let label = file_label(&target);
        let sidecar_len = match fs::metadata(&sidecar) {
            Ok(m) => m.len(),
            Err(e) => {
                reporter.warn(&format!("Could not inspect {}: {}", sidecar.display(), e));
                continue;
            }
        };

        match fs::metadata(&target) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match fs::rename(&sidecar, &target) {
                    Ok(()) => {
                        reporter.info(&format!("Restored {} from sidecar", label));
                        report.restored.push(label);
                    }
                    Err(e) => reporter.warn(&format!("Could not restore {}: {}", label, e)),
                }
            }
            Err(e) => {
                reporter.warn(&format!("Could not inspect {}: {}", target.display(), e));
            }
            Ok(target_meta) if sidecar_len >= target_meta.len() => {
                let replaced =
                    fs::remove_file(&target).and_then(|_| fs::rename(&sidecar, &target));
                match replaced {
                    Ok(()) => {
                        reporter.warn(&format!(
                            "Replaced partial {} with its sidecar",
                            label
                        ));
                        report.replaced.push(label);
                    }
                    Err(e) => reporter.warn(&format!("Could not recover {}: {}", label, e)),
                }
            }
            Ok(_) => match fs::remove_file(&sidecar) {
                Ok(()) => {
                    reporter.info(&format!("Removed stale sidecar of {}", label));
                    report.discarded.push(label);
                }
                Err(e) => reporter.warn(&format!(
                    "Could not remove sidecar {}: {}",
                    sidecar.display(),
                    e
                )),
            },
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::naming::sidecar_path;
    use crate::report::MemoryReporter;
    use tempfile::TempDir;

    const NAME: &str = "mysql_backup_20250101_h_db.zip";

    #[test]
    fn test_sidecar_without_target_is_restored() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(NAME);
        fs::write(sidecar_path(&target), b"good").unwrap();

        let report = recover_sidecars(temp_dir.path(), &MemoryReporter::new());

        assert_eq!(report.restored, vec![NAME.to_string()]);
        assert_eq!(fs::read(&target).unwrap(), b"good");
        assert!(!sidecar_path(&target).exists());
    }

    #[test]
    fn test_larger_sidecar_replaces_partial_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(NAME);
        fs::write(&target, b"par").unwrap();
        fs::write(sidecar_path(&target), b"complete").unwrap();

        let reporter = MemoryReporter::new();
        let report = recover_sidecars(temp_dir.path(), &reporter);

        assert_eq!(report.replaced, vec![NAME.to_string()]);
        assert_eq!(fs::read(&target).unwrap(), b"complete");
        assert!(!sidecar_path(&target).exists());
        assert_eq!(reporter.warnings().len(), 1);
    }

    #[test]
    fn test_equal_size_prefers_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(NAME);
        fs::write(&target, b"newer").unwrap();
        fs::write(sidecar_path(&target), b"older").unwrap();

        let report = recover_sidecars(temp_dir.path(), &MemoryReporter::new());

        assert_eq!(report.replaced.len(), 1);
        assert_eq!(fs::read(&target).unwrap(), b"older");
    }

    #[test]
    fn test_smaller_sidecar_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(NAME);
        fs::write(&target, b"complete new archive").unwrap();
        fs::write(sidecar_path(&target), b"old").unwrap();

        let report = recover_sidecars(temp_dir.path(), &MemoryReporter::new());

        assert_eq!(report.discarded, vec![NAME.to_string()]);
        assert_eq!(fs::read(&target).unwrap(), b"complete new archive");
        assert!(!sidecar_path(&target).exists());
    }

    #[test]
    fn test_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let report = recover_sidecars(&temp_dir.path().join("absent"), &MemoryReporter::new());
        assert!(report.is_empty());
    }

    #[test]
    fn test_user_sav_files_are_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.sav"), b"mine").unwrap();
        fs::write(temp_dir.path().join("photo.zip.sav"), b"also mine").unwrap();
        fs::write(temp_dir.path().join("notes.zip"), b"x").unwrap();

        let reporter = MemoryReporter::new();
        let report = recover_sidecars(temp_dir.path(), &reporter);

        assert!(report.is_empty());
        assert!(reporter.entries().is_empty());
        assert_eq!(fs::read(temp_dir.path().join("notes.sav")).unwrap(), b"mine");
        assert_eq!(fs::read(temp_dir.path().join("notes.zip")).unwrap(), b"x");
        assert!(temp_dir.path().join("photo.zip.sav").exists());
        assert!(!temp_dir.path().join("photo.zip.zip").exists());
    }
}
