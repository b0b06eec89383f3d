//! Settings for dumpvault
//!
//! One JSON file holds the server connection, the backup directory, the
//! retention policy and the optional remote mirror. Relative paths in the
//! file are taken relative to the file's own directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{ArchiveCipher, SecureString};
use crate::disk::DEFAULT_MIN_FREE_BYTES;
use crate::dump::command::Connection;
use crate::error::{VaultError, VaultResult};
use crate::retention::RetentionPolicy;
use crate::store::{ArtifactStore, DirStore, SftpStore, SshEndpoint};

/// Remote mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Target directory; on the SFTP server when `ssh` is set, otherwise a
    /// mounted filesystem
    pub dir: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshEndpoint>,

    /// Passphrase for encrypting remote copies; empty or absent disables
    /// encryption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<SecureString>,
}

impl RemoteSettings {
    /// The mirror store. SFTP stores connect on first use.
    pub fn store(&self) -> Box<dyn ArtifactStore> {
        match &self.ssh {
            Some(endpoint) => Box::new(SftpStore::new(endpoint.clone(), self.dir.clone())),
            None => Box::new(DirStore::new(self.dir.clone())),
        }
    }

    pub fn cipher(&self) -> Option<ArchiveCipher> {
        self.passphrase
            .as_ref()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| ArchiveCipher::new(SecureString::new(p)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default = "default_mysql_host")]
    pub mysql_host: String,

    /// Name used in artifact names when `mysql_host` is a loopback address
    #[serde(default)]
    pub mysql_hostname: String,

    #[serde(default = "default_mysql_port")]
    pub mysql_port: u16,

    #[serde(default = "default_mysql_user")]
    pub mysql_user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_password: Option<SecureString>,

    /// Directory holding `mysql`, `mysqldump` and `mysqlpump`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql_bin: Option<PathBuf>,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Additional log destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub retention: RetentionPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,

    /// Minimum free space on the backup volume before a cycle starts
    #[serde(default = "default_min_free_bytes")]
    pub min_free_bytes: u64,

    /// Deadline for `mysql` queries (database listing, version, accounts)
    #[serde(default = "default_mysql_timeout_secs")]
    pub mysql_timeout_secs: u64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_mysql_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mysql_user() -> String {
    "root".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_min_free_bytes() -> u64 {
    DEFAULT_MIN_FREE_BYTES
}

fn default_mysql_timeout_secs() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            mysql_host: default_mysql_host(),
            mysql_hostname: String::new(),
            mysql_port: default_mysql_port(),
            mysql_user: default_mysql_user(),
            mysql_password: None,
            mysql_bin: None,
            backup_dir: default_backup_dir(),
            log_file: None,
            retention: RetentionPolicy::default(),
            remote: None,
            min_free_bytes: default_min_free_bytes(),
            mysql_timeout_secs: default_mysql_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults if the file doesn't exist.
    /// Relative paths are resolved against the file's directory.
    pub fn load_or_default(path: &Path) -> VaultResult<Self> {
        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to read settings file {}: {}",
                    path.display(),
                    e
                ))
            })?;

            serde_json::from_str::<Settings>(&contents).map_err(|e| {
                VaultError::Config(format!(
                    "Failed to parse settings file {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            Settings::default()
        };

        if let Some(base) = path.parent() {
            settings.resolve_relative(base);
        }
        Ok(settings)
    }

    fn resolve_relative(&mut self, base: &Path) {
        let absolute = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        absolute(&mut self.backup_dir);
        if let Some(log_file) = self.log_file.as_mut() {
            absolute(log_file);
        }
        if let Some(bin) = self.mysql_bin.as_mut() {
            absolute(bin);
        }
        if let Some(remote) = self.remote.as_mut() {
            match remote.ssh.as_mut() {
                Some(endpoint) => {
                    if let Some(key) = endpoint.key_file.as_mut() {
                        absolute(key);
                    }
                }
                None => absolute(&mut remote.dir),
            }
        }
    }

    /// Host name used in artifact names
    pub fn hostname_for_backup(&self) -> String {
        let host = self.mysql_host.trim();
        let alias = self.mysql_hostname.trim();
        if (host == "localhost" || host == "127.0.0.1") && !alias.is_empty() {
            return alias.to_string();
        }
        if host.is_empty() {
            return "localhost".to_string();
        }
        host.to_string()
    }

    /// Client connection parameters
    pub fn connection(&self) -> Connection {
        Connection {
            host: self.mysql_host.trim().to_string(),
            port: self.mysql_port,
            user: self.mysql_user.clone(),
            bin_dir: self.mysql_bin.clone(),
            timeout: self.mysql_timeout(),
        }
    }

    /// Deadline for a single `mysql` query
    pub fn mysql_timeout(&self) -> Duration {
        Duration::from_secs(self.mysql_timeout_secs.max(1))
    }

    /// Remote cipher, if the remote mirror has a passphrase
    pub fn remote_cipher(&self) -> Option<ArchiveCipher> {
        self.remote.as_ref().and_then(RemoteSettings::cipher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.mysql_port, 3306);
        assert_eq!(settings.mysql_user, "root");
        assert_eq!(settings.retention, RetentionPolicy::default());
        assert_eq!(settings.min_free_bytes, 100 * 1024 * 1024);
        assert!(settings.remote.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "mysql_host": "db1", "retention": { "daily": 7 },
                "remote": { "dir": "mirror", "passphrase": "  s3cret " } }"#,
        )
        .unwrap();

        let settings = Settings::load_or_default(&path).unwrap();
        assert_eq!(settings.mysql_host, "db1");
        assert_eq!(settings.retention.daily, 7);
        assert_eq!(settings.retention.weekly, 3);
        assert_eq!(settings.backup_dir, temp_dir.path().join("backups"));

        let remote = settings.remote.as_ref().unwrap();
        assert_eq!(remote.dir, temp_dir.path().join("mirror"));
        assert!(settings.remote_cipher().is_some());
    }

    #[test]
    fn test_blank_passphrase_disables_encryption() {
        let remote = RemoteSettings {
            dir: PathBuf::from("/mnt/x"),
            ssh: None,
            passphrase: Some(SecureString::new("   ")),
        };
        assert!(remote.cipher().is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&temp_dir.path().join("none.json")).unwrap();
        assert_eq!(settings.backup_dir, temp_dir.path().join("backups"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load_or_default(&path),
            Err(VaultError::Config(_))
        ));
    }

    #[test]
    fn test_ssh_remote_keeps_server_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "mysql_timeout_secs": 5,
                "remote": { "dir": "backups/mysql",
                    "ssh": { "host": "nas", "user": "backup", "key_file": "id_ed25519" } } }"#,
        )
        .unwrap();

        let settings = Settings::load_or_default(&path).unwrap();
        assert_eq!(settings.mysql_timeout(), Duration::from_secs(5));

        let remote = settings.remote.as_ref().unwrap();
        assert_eq!(remote.dir, PathBuf::from("backups/mysql"));
        let endpoint = remote.ssh.as_ref().unwrap();
        assert_eq!(endpoint.port, 22);
        assert_eq!(
            endpoint.key_file.as_deref(),
            Some(temp_dir.path().join("id_ed25519").as_path())
        );
        assert_eq!(remote.store().location(), "sftp://backup@nas:22/backups/mysql");
    }

    #[test]
    fn test_hostname_for_backup() {
        let mut settings = Settings::default();
        settings.mysql_host = "127.0.0.1".to_string();
        settings.mysql_hostname = "prod-db".to_string();
        assert_eq!(settings.hostname_for_backup(), "prod-db");

        settings.mysql_host = "db.example.com".to_string();
        assert_eq!(settings.hostname_for_backup(), "db.example.com");

        settings.mysql_host = String::new();
        assert_eq!(settings.hostname_for_backup(), "localhost");
    }
}
