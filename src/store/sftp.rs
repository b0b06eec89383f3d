//! SFTP-backed artifact store
//!
//! Connects on first use and keeps one session for the lifetime of the
//! store. The TCP dial and every blocking SSH call are bounded by the
//! endpoint's timeout. Host keys are not verified.

use std::cell::OnceCell;
use std::fmt::Display;
use std::io::{self, BufReader, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssh2::{ErrorCode, FileStat, RenameFlags, Session, Sftp};
use tracing::debug;

use super::{ArtifactStore, StoreEntry};
use crate::crypto::SecureString;
use crate::error::{VaultError, VaultResult};

/// SFTP status for a path that does not exist
const SFTP_NO_SUCH_FILE: i32 = 2;

const PARTIAL_SUFFIX: &str = ".part";

/// Where and how to log in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshEndpoint {
    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecureString>,

    /// Private key, tried before the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// Bound on the TCP dial and on each blocking SSH operation
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl SshEndpoint {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    fn password(&self) -> Option<&SecureString> {
        self.password.as_ref().filter(|p| !p.is_empty())
    }
}

/// A flat directory on an SFTP server
pub struct SftpStore {
    endpoint: SshEndpoint,
    root: PathBuf,
    sftp: OnceCell<Sftp>,
}

impl SftpStore {
    pub fn new(endpoint: SshEndpoint, root: impl Into<PathBuf>) -> Self {
        Self {
            endpoint,
            root: root.into(),
            sftp: OnceCell::new(),
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn error(&self, action: &str, e: impl Display) -> VaultError {
        VaultError::Remote(format!("Failed to {} {}: {}", action, self.location(), e))
    }

    fn sftp(&self) -> VaultResult<&Sftp> {
        if let Some(sftp) = self.sftp.get() {
            return Ok(sftp);
        }
        let sftp = self.connect()?;
        Ok(self.sftp.get_or_init(|| sftp))
    }

    fn connect(&self) -> VaultResult<Sftp> {
        let endpoint = &self.endpoint;
        if endpoint.key_file.is_none() && endpoint.password().is_none() {
            return Err(VaultError::Config(format!(
                "No SSH key file or password configured for {}",
                self.location()
            )));
        }

        let timeout = endpoint.timeout();
        let address = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| self.error("resolve", e))?
            .next()
            .ok_or_else(|| {
                VaultError::Remote(format!("{} has no usable address", endpoint.host))
            })?;

        debug!("Connecting to {}", self.location());
        let tcp = TcpStream::connect_timeout(&address, timeout)
            .map_err(|e| self.error("connect to", e))?;
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(|e| self.error("configure connection to", e))?;

        let mut session = Session::new().map_err(|e| self.error("start SSH session for", e))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| self.error("complete SSH handshake with", e))?;
        self.authenticate(&session)?;

        session
            .sftp()
            .map_err(|e| self.error("open SFTP channel on", e))
    }

    fn authenticate(&self, session: &Session) -> VaultResult<()> {
        let endpoint = &self.endpoint;
        if let Some(key) = &endpoint.key_file {
            if let Err(e) = session.userauth_pubkey_file(&endpoint.user, None, key, None) {
                debug!("Key {} rejected: {}", key.display(), e);
            }
        }
        if !session.authenticated() {
            if let Some(password) = endpoint.password() {
                session
                    .userauth_password(&endpoint.user, password.as_str())
                    .map_err(|e| self.error("authenticate with", e))?;
            }
        }
        if !session.authenticated() {
            return Err(VaultError::Remote(format!(
                "Authentication as {} rejected by {}",
                endpoint.user,
                self.location()
            )));
        }
        Ok(())
    }
}

fn is_missing(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE))
}

/// Every directory from the top of `root` down to `root` itself
fn ancestry(root: &Path) -> Vec<PathBuf> {
    let mut current = PathBuf::new();
    let mut dirs = Vec::new();
    for component in root.components() {
        current.push(component);
        if matches!(component, Component::Normal(_)) {
            dirs.push(current.clone());
        }
    }
    dirs
}

fn modified_time(stat: &FileStat) -> DateTime<Utc> {
    stat.mtime
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}

fn write_remote(sftp: &Sftp, path: &Path, source: &mut dyn Read) -> io::Result<u64> {
    let mut file = sftp.create(path)?;
    io::copy(source, &mut file)
}

impl ArtifactStore for SftpStore {
    fn location(&self) -> String {
        let endpoint = &self.endpoint;
        format!(
            "sftp://{}@{}:{}/{}",
            endpoint.user,
            endpoint.host,
            endpoint.port,
            self.root.display().to_string().trim_start_matches('/')
        )
    }

    fn ensure_root(&self) -> VaultResult<()> {
        let sftp = self.sftp()?;
        for dir in ancestry(&self.root) {
            match sftp.stat(&dir) {
                Ok(stat) if stat.is_dir() => {}
                Ok(_) => {
                    return Err(VaultError::Remote(format!(
                        "{} on {} is not a directory",
                        dir.display(),
                        self.location()
                    )))
                }
                Err(e) if is_missing(&e) => {
                    sftp.mkdir(&dir, 0o755).map_err(|e| {
                        VaultError::Remote(format!(
                            "Failed to create {} on {}: {}",
                            dir.display(),
                            self.location(),
                            e
                        ))
                    })?;
                }
                // chrooted accounts often cannot stat their parents
                Err(e) => debug!("Cannot inspect {}: {}", dir.display(), e),
            }
        }
        Ok(())
    }

    fn list(&self) -> VaultResult<Vec<StoreEntry>> {
        let sftp = self.sftp()?;
        let entries = match sftp.readdir(&self.root) {
            Ok(entries) => entries,
            Err(e) if is_missing(&e) => return Ok(Vec::new()),
            Err(e) => return Err(self.error("list", e)),
        };

        let mut listed: Vec<StoreEntry> = entries
            .into_iter()
            .filter(|(_, stat)| stat.is_file())
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(StoreEntry {
                    name,
                    modified: modified_time(&stat),
                    size: stat.size.unwrap_or(0),
                })
            })
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn upload(&self, name: &str, source: &mut dyn Read) -> VaultResult<u64> {
        let sftp = self.sftp()?;
        let target = self.path_of(name);
        let partial = self.path_of(&format!("{name}{PARTIAL_SUFFIX}"));

        let copied = write_remote(sftp, &partial, source).map_err(|e| {
            let _ = sftp.unlink(&partial);
            self.error(&format!("write {} to", name), e)
        })?;

        let flags = RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE;
        if sftp.rename(&partial, &target, Some(flags)).is_err() {
            // SFTP v3 servers refuse to rename over an existing file
            let _ = sftp.unlink(&target);
            sftp.rename(&partial, &target, None).map_err(|e| {
                let _ = sftp.unlink(&partial);
                self.error(&format!("rename {} on", name), e)
            })?;
        }

        Ok(copied)
    }

    fn download(&self, name: &str) -> VaultResult<Box<dyn Read>> {
        let sftp = self.sftp()?;
        let file = sftp.open(&self.path_of(name)).map_err(|e| {
            if is_missing(&e) {
                VaultError::artifact_not_found(format!("{} on {}", name, self.location()))
            } else {
                self.error(&format!("open {} on", name), e)
            }
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn delete(&self, name: &str) -> VaultResult<()> {
        let sftp = self.sftp()?;
        sftp.unlink(&self.path_of(name))
            .map_err(|e| self.error(&format!("delete {} on", name), e))
    }
}
