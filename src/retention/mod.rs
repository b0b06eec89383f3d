//! Calendar retention
//!
//! Backup dates are classified as daily, weekly (Sunday), monthly (last day
//! of the month) or yearly (December 31). The policy keeps the most recent
//! days plus the most recent few of each period end.

pub mod classify;
pub mod prune;
pub mod window;

pub use classify::{classify, RetentionClass};
pub use prune::{prune, PruneOutcome};
pub use window::{KeepSets, RetentionPolicy};
