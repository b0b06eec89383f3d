//! dumpvault - crash-safe MySQL/MariaDB dump archives
//!
//! This library backs up every user database of a MySQL or MariaDB server
//! into one zip artifact per database and day, keeps a calendar-based
//! retention window, and mirrors the backup directory to a remote target
//! with optional encryption.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Config file resolution and settings
//! - `error`: Custom error types
//! - `report`: Reporter capability for non-fatal conditions
//! - `grants`: Splitting an account export into per-database fragments
//! - `archive`: Artifact naming, crash-safe writing, recovery and reading
//! - `retention`: Calendar classification and pruning
//! - `store`: Flat artifact stores (local directory or remote mount)
//! - `crypto`: Streaming encryption of remote copies
//! - `remote`: Mirroring to and fetching from the remote store
//! - `dump`: The database server collaborator
//! - `disk`: Free-space precheck of the backup volume
//! - `cycle`: One complete backup cycle
//! - `restore`: Replaying a backup day into the server
//! - `cli`: Command handlers for the `dumpvault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use dumpvault::config::{resolve_config_path, Settings};
//!
//! let path = resolve_config_path(None)?;
//! let settings = Settings::load_or_default(&path)?;
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod cycle;
pub mod disk;
pub mod dump;
pub mod error;
pub mod grants;
pub mod remote;
pub mod report;
pub mod restore;
pub mod retention;
pub mod store;

pub use error::{VaultError, VaultResult};
