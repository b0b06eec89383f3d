//! Subprocess-backed [`DatabaseServer`] using the MySQL client tools
//!
//! Dumps stream straight from the `mysqldump` stdout pipe into the archive
//! writer; the pipe buffer bounds how far the producer can run ahead.
//! Short queries run under the connection's deadline and are killed when
//! they overrun it.

use std::cell::OnceCell;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::command::{display_command, is_mariadb_version, parse_database_list, Connection};
use super::{DatabaseServer, DumpStream};
use crate::crypto::SecureString;
use crate::error::{VaultError, VaultResult};

/// Environment variable the client tools read the password from
const PASSWORD_ENV: &str = "MYSQL_PWD";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read a pipe to the end on a separate thread
fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = Vec::new();
        let _ = pipe.read_to_end(&mut text);
        String::from_utf8_lossy(&text).into_owned()
    })
}

fn joined(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

pub struct MysqlClient {
    connection: Connection,
    password: Option<SecureString>,
    mariadb: OnceCell<bool>,
}

impl MysqlClient {
    pub fn new(connection: Connection, password: Option<SecureString>) -> Self {
        Self {
            connection,
            password: password.filter(|p| !p.is_empty()),
            mariadb: OnceCell::new(),
        }
    }

    fn command(&self, program: &Path, args: &[String]) -> Command {
        debug!("Running {}", display_command(program, args));
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if let Some(password) = &self.password {
            command.env(PASSWORD_ENV, password.as_str());
        }
        command
    }

    /// Run a client tool to completion and return its stdout
    fn capture(&self, program: &Path, args: &[String]) -> VaultResult<String> {
        let mut child = self
            .command(program, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VaultError::Dump(format!("Failed to run {}: {}", program.display(), e))
            })?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let timeout = self.connection.timeout;
        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(VaultError::Dump(format!(
                        "{} did not finish within {}s",
                        program.display(),
                        timeout.as_secs()
                    )));
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(VaultError::Dump(format!(
                        "Failed to wait for {}: {}",
                        program.display(),
                        e
                    )));
                }
            }
        };

        let stdout = joined(stdout);
        if !status.success() {
            return Err(VaultError::Dump(format!(
                "{} exited with {}: {}",
                program.display(),
                status,
                joined(stderr).trim()
            )));
        }
        Ok(stdout)
    }

    /// Whether the server is MariaDB; asked once per client
    pub fn is_mariadb(&self) -> VaultResult<bool> {
        if let Some(mariadb) = self.mariadb.get() {
            return Ok(*mariadb);
        }
        let program = self.connection.program("mysql");
        let output = self.capture(&program, &self.connection.query_args("SELECT @@version"))?;
        let mariadb = is_mariadb_version(&output);
        let _ = self.mariadb.set(mariadb);
        Ok(mariadb)
    }
}

impl DatabaseServer for MysqlClient {
    fn list_databases(&self) -> VaultResult<Vec<String>> {
        let program = self.connection.program("mysql");
        let output = self.capture(&program, &self.connection.query_args("SHOW DATABASES"))?;
        Ok(parse_database_list(&output))
    }

    fn export_accounts(&self) -> VaultResult<String> {
        let (program, args) = self.connection.account_export(self.is_mariadb()?);
        self.capture(&program, &args)
    }

    fn open_dump(&self, database: &str) -> VaultResult<Box<dyn DumpStream>> {
        let program = self.connection.program("mysqldump");
        let args = self.connection.dump_args(database, self.is_mariadb()?);

        let mut child = self
            .command(&program, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VaultError::Dump(format!("Failed to start dump of {}: {}", database, e))
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take().map(drain);

        let mut dump = ChildDump {
            database: database.to_string(),
            child,
            stdout: None,
            stderr,
            finished: false,
        };
        dump.stdout = Some(stdout.ok_or_else(|| {
            VaultError::Dump(format!("No output pipe for dump of {}", database))
        })?);
        Ok(Box::new(dump))
    }

    fn import_sql(&self, source: &mut dyn Read) -> VaultResult<()> {
        let program = self.connection.program("mysql");
        let mut child = self
            .command(&program, &self.connection.base_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VaultError::Dump(format!("Failed to start {}: {}", program.display(), e))
            })?;

        let copied = match child.stdin.take() {
            Some(mut stdin) => io::copy(source, &mut stdin).map(|_| ()),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "no input pipe")),
        };

        let output = child.wait_with_output().map_err(|e| {
            VaultError::Dump(format!("Failed to wait for {}: {}", program.display(), e))
        })?;
        if !output.status.success() {
            return Err(VaultError::Dump(format!(
                "Import failed with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        copied.map_err(|e| VaultError::Dump(format!("Failed to feed SQL to import: {}", e)))
    }
}

/// A running `mysqldump`
struct ChildDump {
    database: String,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl Read for ChildDump {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Ok(0),
        }
    }
}

impl DumpStream for ChildDump {
    fn finish(mut self: Box<Self>) -> VaultResult<()> {
        self.finished = true;
        drop(self.stdout.take());

        let status = self.child.wait().map_err(|e| {
            VaultError::Dump(format!("Failed to wait for dump of {}: {}", self.database, e))
        })?;
        let stderr = joined(self.stderr.take());

        if !status.success() {
            return Err(VaultError::Dump(format!(
                "Dump of {} failed with {}: {}",
                self.database,
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for ChildDump {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
