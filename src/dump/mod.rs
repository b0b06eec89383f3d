//! Database server collaborator
//!
//! The backup cycle never talks to a server directly. It asks a
//! [`DatabaseServer`] for the databases to back up, the bulk account export,
//! and one dump stream per database; restore feeds SQL back through it.

pub mod command;
pub mod mysql;

use std::io::Read;

use crate::error::VaultResult;

pub use mysql::MysqlClient;

/// Raw SQL bytes of one database, consumed as a stream
pub trait DumpStream: Read {
    /// Called after the stream reached its end; reports whether the
    /// producer itself succeeded. Dropping an unfinished stream cancels the
    /// producer.
    fn finish(self: Box<Self>) -> VaultResult<()>;
}

pub trait DatabaseServer {
    /// Databases to back up, system schemas excluded
    fn list_databases(&self) -> VaultResult<Vec<String>>;

    /// Every account with its credential and privilege statements, possibly
    /// empty
    fn export_accounts(&self) -> VaultResult<String>;

    /// Start dumping `database`
    fn open_dump(&self, database: &str) -> VaultResult<Box<dyn DumpStream>>;

    /// Execute an SQL script read from `source`
    fn import_sql(&self, source: &mut dyn Read) -> VaultResult<()>;
}
