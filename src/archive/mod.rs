//! Backup artifacts
//!
//! One artifact is a zip container holding a single `<database>.sql` entry:
//! the database dump, followed by the accounts whose privileges apply to
//! that database.

pub mod catalog;
pub mod naming;
pub mod reader;
pub mod recovery;
pub mod writer;

pub use catalog::{artifacts_of_latest_day, list_artifacts, BackupArtifact};
pub use naming::{artifact_name, is_artifact_name, parse_artifact_date, sidecar_path};
pub use reader::{read_sql_entry, with_sql_entry};
pub use recovery::{recover_sidecars, RecoveryReport};
pub use writer::{ArchiveWriter, StagedArchive, WriteState};
