//! Command lines for the MySQL client tools

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Schemas that are never backed up
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "performance_schema", "mysql", "sys"];

/// Connection parameters shared by every client invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Directory holding the client binaries; `None` searches `PATH`
    pub bin_dir: Option<PathBuf>,
    /// Deadline for short `mysql` queries, also passed as the client's
    /// connect timeout
    pub timeout: Duration,
}

impl Connection {
    /// Path of a client executable
    pub fn program(&self, name: &str) -> PathBuf {
        let file = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
        match &self.bin_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    /// `-h`, `-P`, `-u`; the password travels in the environment
    pub fn base_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-P".to_string(),
            self.port.to_string(),
            "-u".to_string(),
            self.user.clone(),
        ]
    }

    /// Run a single statement through the `mysql` client
    pub fn query_args(&self, statement: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.push(format!("--connect-timeout={}", self.timeout.as_secs().max(1)));
        args.push("-e".to_string());
        args.push(statement.to_string());
        args
    }

    /// Consistent dump of one database including stored code
    pub fn dump_args(&self, database: &str, mariadb: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(
            ["--single-transaction", "--routines", "--triggers", "--events"]
                .iter()
                .map(|s| s.to_string()),
        );
        if !mariadb {
            args.push("--set-gtid-purged=OFF".to_string());
        }
        args.push("--databases".to_string());
        args.push(database.to_string());
        args
    }

    /// Program and arguments exporting all accounts
    pub fn account_export(&self, mariadb: bool) -> (PathBuf, Vec<String>) {
        let mut args = self.base_args();
        if mariadb {
            args.push("--system=users".to_string());
            (self.program("mysqldump"), args)
        } else {
            args.push("--exclude-databases=%".to_string());
            args.push("--users".to_string());
            (self.program("mysqlpump"), args)
        }
    }
}

/// Database names from `SHOW DATABASES` output
pub fn parse_database_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "Database")
        .filter(|line| !SYSTEM_SCHEMAS.contains(line))
        .map(str::to_string)
        .collect()
}

/// Whether `SELECT @@version` output names a MariaDB server
pub fn is_mariadb_version(output: &str) -> bool {
    output.to_ascii_lowercase().contains("mariadb")
}

/// Printable form of a command line, for logs
pub fn display_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
