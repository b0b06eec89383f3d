//! Artifact naming convention
//!
//! `mysql_backup_<YYYYMMDD>_<host-token>_<database>.zip`. The embedded date
//! is the backup date; any file not matching the pattern is not an artifact.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Fixed prefix of every artifact name
pub const ARTIFACT_PREFIX: &str = "mysql_backup_";

/// Container extension (without dot)
pub const CONTAINER_EXT: &str = "zip";

/// Recovery sidecar extension (without dot)
pub const SIDECAR_EXT: &str = "sav";

/// Host part of an artifact name: `localhost` for an empty host, every
/// character outside `[A-Za-z0-9_.-]` replaced with `_`.
pub fn host_token(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        return "localhost".to_string();
    }
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Name of the artifact for `database` backed up from `host` on `date`
pub fn artifact_name(date: NaiveDate, host: &str, database: &str) -> String {
    format!(
        "{}{}_{}_{}.{}",
        ARTIFACT_PREFIX,
        date.format("%Y%m%d"),
        host_token(host),
        database,
        CONTAINER_EXT
    )
}

/// Backup date encoded in an artifact name, or `None` if `name` is not an
/// artifact
pub fn parse_artifact_date(name: &str) -> Option<NaiveDate> {
    let rest = name.strip_prefix(ARTIFACT_PREFIX)?;
    let stem = rest.strip_suffix(&format!(".{}", CONTAINER_EXT))?;
    if stem.len() < 9 || !stem.is_char_boundary(8) {
        return None;
    }
    let (digits, tail) = stem.split_at(8);
    let has_host_and_database = tail.len() > 1;
    if !digits.bytes().all(|b| b.is_ascii_digit())
        || !tail.starts_with('_')
        || !has_host_and_database
    {
        return None;
    }

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether `name` follows the artifact naming convention
pub fn is_artifact_name(name: &str) -> bool {
    parse_artifact_date(name).is_some()
}

/// Sidecar path for a target: same path, container extension replaced
pub fn sidecar_path(target: &Path) -> PathBuf {
    target.with_extension(SIDECAR_EXT)
}

/// Target path a sidecar protects, or `None` if `path` is not the sidecar
/// of an artifact
pub fn target_of_sidecar(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?;
    if ext != SIDECAR_EXT {
        return None;
    }
    let target = path.with_extension(CONTAINER_EXT);
    let name = target.file_name()?.to_str()?;
    is_artifact_name(name).then_some(target)
}
