//! Applying a retention policy to a store

use chrono::NaiveDate;

use super::window::{KeepSets, RetentionPolicy};
use crate::archive::catalog::list_artifacts;
use crate::error::VaultResult;
use crate::report::Reporter;
use crate::store::ArtifactStore;

/// Result of one pruning pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    /// Artifacts whose deletion failed; they remain in the store
    pub failed: Vec<String>,
}

/// Delete every artifact in `store` outside the policy's keep-sets.
///
/// Non-artifact files are never touched. A failed delete is reported and the
/// pass continues; only a failed listing is an error. Running it twice with
/// the same `today` deletes nothing the second time.
pub fn prune(
    store: &dyn ArtifactStore,
    policy: &RetentionPolicy,
    today: NaiveDate,
    reporter: &dyn Reporter,
) -> VaultResult<PruneOutcome> {
    let sets = KeepSets::compute(policy, today);
    let mut outcome = PruneOutcome::default();

    for artifact in list_artifacts(store)? {
        if sets.keeps(artifact.date) {
            outcome.kept.push(artifact.name);
            continue;
        }

        match store.delete(&artifact.name) {
            Ok(()) => {
                reporter.info(&format!(
                    "Removed expired backup {} from {}",
                    artifact.name,
                    store.location()
                ));
                outcome.deleted.push(artifact.name);
            }
            Err(e) => {
                reporter.warn(&format!(
                    "Could not remove expired backup {}: {}",
                    artifact.name, e
                ));
                outcome.failed.push(artifact.name);
            }
        }
    }

    Ok(outcome)
}
