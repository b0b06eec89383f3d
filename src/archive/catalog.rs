//! Artifact listing by backup date

use chrono::{DateTime, NaiveDate, Utc};

use super::naming::parse_artifact_date;
use crate::error::VaultResult;
use crate::store::ArtifactStore;

/// A stored artifact with its decoded backup date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub name: String,
    pub date: NaiveDate,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Every artifact in `store`, oldest backup date first
pub fn list_artifacts(store: &dyn ArtifactStore) -> VaultResult<Vec<BackupArtifact>> {
    let mut artifacts: Vec<BackupArtifact> = store
        .list()?
        .into_iter()
        .filter_map(|entry| {
            parse_artifact_date(&entry.name).map(|date| BackupArtifact {
                name: entry.name,
                date,
                modified: entry.modified,
                size: entry.size,
            })
        })
        .collect();

    artifacts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    Ok(artifacts)
}

/// Artifacts of the most recent backup day, optionally only days strictly
/// before `before`
pub fn artifacts_of_latest_day(
    store: &dyn ArtifactStore,
    before: Option<NaiveDate>,
) -> VaultResult<Vec<BackupArtifact>> {
    let artifacts: Vec<BackupArtifact> = list_artifacts(store)?
        .into_iter()
        .filter(|a| before.map_or(true, |limit| a.date < limit))
        .collect();

    let Some(latest) = artifacts.iter().map(|a| a.date).max() else {
        return Ok(Vec::new());
    };
    Ok(artifacts.into_iter().filter(|a| a.date == latest).collect())
}
