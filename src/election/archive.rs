//! Archived elections and vote reset
//!
//! An archive freezes a tally under a name. Its results are a deep copy with a
//! Blake3 content hash, so later catalog or vote changes cannot alter it and
//! tampering is detectable. Resetting wipes every live vote and voted flag in
//! one store operation, gated by a literal confirmation phrase.

use super::catalog::Catalog;
use super::tally::{Tally, TallyReport};
use crate::integrity::{Hash, IntegrityUtils};
use crate::store::{BallotStore, FlagCache};
use crate::types::{Candidate, CandidateId, Category, CategoryId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Frozen result line for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedCandidate {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub class_level: String,
    pub vote_count: u64,
    pub percentage: u32,
}

/// Frozen results for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedCategory {
    pub category_id: CategoryId,
    pub category_name: String,
    pub candidates: Vec<ArchivedCandidate>,
}

/// Named, immutable snapshot of a tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedElection {
    pub id: Uuid,
    pub election_name: String,
    pub archived_at: DateTime<Utc>,
    pub total_voters: usize,
    pub results: Vec<ArchivedCategory>,
    pub archived_by: String,
    /// Hex Blake3 digest over name, voter total and results
    pub content_hash: String,
}

impl ArchivedElection {
    /// Freeze `report` under `election_name`
    pub fn snapshot(
        election_name: &str,
        report: &TallyReport,
        archived_by: impl Into<String>,
    ) -> Result<Self> {
        let election_name = election_name.trim();
        if election_name.is_empty() {
            return Err(Error::validation("Please enter a name for this archive"));
        }

        let results = snapshot_results(report);
        let hash = content_hash(election_name, report.total_voters, &results)?;

        Ok(Self {
            id: Uuid::new_v4(),
            election_name: election_name.to_string(),
            archived_at: Utc::now(),
            total_voters: report.total_voters,
            results,
            archived_by: archived_by.into(),
            content_hash: IntegrityUtils::hash_to_hex(&hash),
        })
    }

    /// Recompute the content hash and compare it with the stored one
    pub fn verify_integrity(&self) -> Result<bool> {
        let stored = IntegrityUtils::hex_to_hash(&self.content_hash)?;
        let actual = content_hash(&self.election_name, self.total_voters, &self.results)?;
        Ok(IntegrityUtils::constant_time_eq(&stored, &actual))
    }

    pub fn category(&self, category_id: CategoryId) -> Option<&ArchivedCategory> {
        self.results.iter().find(|c| c.category_id == category_id)
    }
}

/// Nested category/candidate copy of a report, in catalog order
pub fn snapshot_results(report: &TallyReport) -> Vec<ArchivedCategory> {
    report
        .categories
        .iter()
        .map(|category| ArchivedCategory {
            category_id: category.category_id,
            category_name: category.category_name.clone(),
            candidates: category
                .candidates
                .iter()
                .map(|candidate| ArchivedCandidate {
                    candidate_id: candidate.candidate_id,
                    candidate_name: candidate.name.clone(),
                    class_level: candidate.class_level.clone(),
                    vote_count: candidate.votes,
                    percentage: candidate.percentage,
                })
                .collect(),
        })
        .collect()
}

fn content_hash(
    election_name: &str,
    total_voters: usize,
    results: &[ArchivedCategory],
) -> Result<Hash> {
    let content = serde_json::to_vec(&(election_name, total_voters, results))?;
    Ok(IntegrityUtils::hash(&content))
}

/// Outcome of a vote reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    pub votes_removed: usize,
    pub voters_cleared: usize,
    pub local_markers_cleared: usize,
    /// Set when the device markers could not be cleared after the store wipe
    pub local_markers_error: Option<String>,
}

/// Stores archives and performs resets
pub struct ArchiveEngine<S> {
    store: Arc<S>,
    flags: Arc<dyn FlagCache>,
    reset_phrase: String,
}

impl<S: BallotStore> ArchiveEngine<S> {
    pub fn new(store: Arc<S>, flags: Arc<dyn FlagCache>, reset_phrase: impl Into<String>) -> Self {
        Self {
            store,
            flags,
            reset_phrase: reset_phrase.into(),
        }
    }

    /// Snapshot `tally` over the given catalog and persist it
    pub async fn archive(
        &self,
        name: &str,
        categories: &[Category],
        candidates: &[Candidate],
        tally: &Tally,
        archived_by: &str,
    ) -> Result<ArchivedElection> {
        let catalog = Catalog::new(categories.to_vec(), candidates.to_vec());
        let report = TallyReport::build(&catalog, tally);
        let archive = ArchivedElection::snapshot(name, &report, archived_by)?;

        self.store.insert_archive(archive.clone()).await?;

        tracing::info!(
            "📦 Election archived: name={}, voters={}, categories={}, by={}",
            archive.election_name,
            archive.total_voters,
            archive.results.len(),
            archive.archived_by
        );
        Ok(archive)
    }

    /// All archives, newest first
    pub async fn list_archives(&self) -> Result<Vec<ArchivedElection>> {
        self.store.list_archives().await
    }

    pub async fn get_archive(&self, id: Uuid) -> Result<ArchivedElection> {
        self.store
            .get_archive(id)
            .await?
            .ok_or_else(|| Error::not_found("Archive", id))
    }

    /// Remove one archive; live votes are untouched
    pub async fn delete_archive(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_archive(id).await? {
            return Err(Error::not_found("Archive", id));
        }
        tracing::info!("🗑️ Archive deleted: {}", id);
        Ok(())
    }

    /// Wipe all live votes and voted flags
    pub async fn reset_votes(&self, confirmation: &str) -> Result<ResetReport> {
        if !IntegrityUtils::phrase_matches(confirmation, &self.reset_phrase) {
            tracing::warn!("🚫 Vote reset refused: confirmation phrase mismatch");
            return Err(Error::validation(format!(
                "Please type \"{}\" to confirm",
                self.reset_phrase
            )));
        }

        let summary = self.store.reset_votes().await?;

        // The store wipe has committed; a marker failure must not hide that
        let (local_markers_cleared, local_markers_error) =
            match self.flags.clear_voting_markers() {
                Ok(cleared) => (cleared, None),
                Err(err) => {
                    tracing::warn!("⚠️ Votes reset but device markers were not cleared: {}", err);
                    (0, Some(err.to_string()))
                }
            };

        tracing::warn!(
            "♻️ All votes reset: votes_removed={}, voters_cleared={}, local_markers_cleared={}",
            summary.votes_removed,
            summary.voters_cleared,
            local_markers_cleared
        );

        Ok(ResetReport {
            votes_removed: summary.votes_removed,
            voters_cleared: summary.voters_cleared,
            local_markers_cleared,
            local_markers_error,
        })
    }
}
