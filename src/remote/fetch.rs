//! Retrieving artifacts from the remote store
//!
//! A pattern is a bare file name, optionally with `*` and `?` wildcards that
//! are expanded against the remote listing. Without wildcards the name must
//! be an artifact name. Encrypted copies are decrypted on the way down.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::archive::naming::is_artifact_name;
use crate::crypto::{open_download, ArchiveCipher};
use crate::error::{VaultError, VaultResult};
use crate::report::Reporter;
use crate::store::ArtifactStore;

/// Appended to the local name when the plain name is already taken
pub const COLLISION_SUFFIX: &str = ".local";

/// Reject empty patterns and anything that could leave the remote directory
pub fn validate_pattern(pattern: &str) -> VaultResult<()> {
    if pattern.is_empty()
        || pattern.contains("..")
        || pattern.contains('/')
        || pattern.contains('\\')
    {
        return Err(VaultError::Validation(format!(
            "'{}' must be a plain file name without path components",
            pattern
        )));
    }
    Ok(())
}

pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

fn wildcard_regex(pattern: &str) -> VaultResult<Regex> {
    let mut source = String::from("^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    Regex::new(&source)
        .map_err(|e| VaultError::Validation(format!("Invalid pattern '{}': {}", pattern, e)))
}

/// Remote names a pattern refers to
pub fn resolve_pattern(remote: &dyn ArtifactStore, pattern: &str) -> VaultResult<Vec<String>> {
    validate_pattern(pattern)?;

    if !has_wildcard(pattern) {
        if !is_artifact_name(pattern) {
            return Err(VaultError::Validation(format!(
                "'{}' is not a backup artifact name",
                pattern
            )));
        }
        return Ok(vec![pattern.to_string()]);
    }

    let matcher = wildcard_regex(pattern)?;
    let names: Vec<String> = remote
        .list()
        .map_err(|e| VaultError::Remote(format!("Failed to list {}: {}", remote.location(), e)))?
        .into_iter()
        .map(|e| e.name)
        .filter(|name| matcher.is_match(name))
        .collect();

    if names.is_empty() {
        return Err(VaultError::artifact_not_found(format!(
            "{} (no remote match)",
            pattern
        )));
    }
    Ok(names)
}

/// Local path for `name`, sidestepping an existing file
fn local_path_for(dest_dir: &Path, name: &str) -> PathBuf {
    let plain = dest_dir.join(name);
    if plain.exists() {
        dest_dir.join(format!("{name}{COLLISION_SUFFIX}"))
    } else {
        plain
    }
}

/// Download everything `pattern` refers to into `dest_dir`.
///
/// Returns the local paths written, in remote listing order. Stops at the
/// first failed transfer; files already saved stay in place.
pub fn fetch(
    remote: &dyn ArtifactStore,
    pattern: &str,
    dest_dir: &Path,
    cipher: Option<&ArchiveCipher>,
    reporter: &dyn Reporter,
) -> VaultResult<Vec<PathBuf>> {
    let names = resolve_pattern(remote, pattern)?;

    fs::create_dir_all(dest_dir).map_err(|e| {
        VaultError::Io(format!(
            "Failed to create directory {}: {}",
            dest_dir.display(),
            e
        ))
    })?;

    let mut saved = Vec::with_capacity(names.len());
    for name in names {
        let path = local_path_for(dest_dir, &name);
        fetch_one(remote, &name, &path, cipher)
            .map_err(|e| VaultError::Remote(format!("Failed to fetch {}: {}", name, e)))?;
        reporter.info(&format!("Fetched {} to {}", name, path.display()));
        saved.push(path);
    }
    Ok(saved)
}

fn fetch_one(
    remote: &dyn ArtifactStore,
    name: &str,
    path: &Path,
    cipher: Option<&ArchiveCipher>,
) -> VaultResult<u64> {
    let mut source = open_download(cipher, remote.download(name)?)?;

    let result = File::create(path).and_then(|mut file| {
        let copied = io::copy(&mut source, &mut file)?;
        file.flush()?;
        file.sync_all()?;
        Ok(copied)
    });

    result.map_err(|e| {
        let _ = fs::remove_file(path);
        VaultError::Io(format!("Failed to write {}: {}", path.display(), e))
    })
}
