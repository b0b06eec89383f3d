//! Remote copies of the backup directory

pub mod fetch;
pub mod sync;

pub use fetch::{fetch, resolve_pattern, validate_pattern};
pub use sync::{plan_sync, sync, SyncPlan, SyncReport};
