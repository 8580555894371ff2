//! Ballot submission
//!
//! Submission flow:
//! 1. Check the authoritative voted flag in the store (device markers are hints)
//! 2. Validate the selection against the current catalog
//! 3. Insert one entry per category as a single batch
//! 4. Read back the voter's rows to detect a half-recorded ballot and discard
//!    it, so the voter is neither counted nor locked out of a retry
//! 5. Mirror the result into the device-local markers

use super::catalog::Catalog;
use super::session::Selection;
use crate::store::{BallotStore, FlagCache};
use crate::types::VoteEntry;
use crate::{Error, Result, validation_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Proof of a recorded ballot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionReceipt {
    pub student_id: String,
    pub entries: Vec<VoteEntry>,
    pub submitted_at: DateTime<Utc>,
}

/// Writes complete ballots exactly once per voter
pub struct SubmissionEngine<S> {
    store: Arc<S>,
    flags: Arc<dyn FlagCache>,
}

impl<S: BallotStore> SubmissionEngine<S> {
    pub fn new(store: Arc<S>, flags: Arc<dyn FlagCache>) -> Self {
        Self { store, flags }
    }

    /// Check that `selection` names exactly one valid candidate per category
    pub fn validate_selection(catalog: &Catalog, selection: &Selection) -> Result<()> {
        if catalog.is_empty() {
            return Err(validation_error!("There are no categories to vote in"));
        }

        for (category_id, candidate_id) in selection {
            let category = catalog
                .category(*category_id)
                .ok_or_else(|| validation_error!("Unknown category {} in ballot", category_id))?;
            let candidate = catalog.candidate(*candidate_id).ok_or_else(|| {
                validation_error!("Unknown candidate {} in ballot", candidate_id)
            })?;
            if candidate.category_id != category.id {
                return Err(validation_error!(
                    "{} is not standing for {}",
                    candidate.name,
                    category.name
                ));
            }
        }

        let missing: Vec<&str> = catalog
            .categories()
            .iter()
            .filter(|c| !selection.contains_key(&c.id))
            .map(|c| c.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(validation_error!(
                "Please vote in all categories before submitting (missing: {})",
                missing.join(", ")
            ));
        }

        Ok(())
    }

    /// Authoritative voted state from the store
    pub async fn has_voted(&self, student_id: &str) -> Result<bool> {
        let voter = self
            .store
            .find_voter(student_id)
            .await?
            .ok_or_else(|| Error::not_found("Voter", student_id))?;
        Ok(voter.has_voted)
    }

    /// Record a complete ballot for `student_id`
    pub async fn submit(&self, student_id: &str, selection: &Selection) -> Result<SubmissionReceipt> {
        if self.has_voted(student_id).await? {
            // Keep the device hint in line with the store
            self.flags.mark_voted(student_id)?;
            return Err(Error::already_voted(student_id));
        }

        let catalog = Catalog::load(self.store.as_ref()).await?;
        Self::validate_selection(&catalog, selection)?;

        let entries: Vec<VoteEntry> = catalog
            .categories()
            .iter()
            .filter_map(|category| {
                selection
                    .get(&category.id)
                    .map(|candidate_id| VoteEntry::new(student_id, category.id, *candidate_id))
            })
            .collect();
        let expected = entries.len();

        if let Err(err) = self.store.insert_ballot(entries.clone()).await {
            return Err(self.classify_failure(student_id, expected, err).await);
        }

        let landed = self.store.count_voter_entries(student_id).await?;
        if landed != expected {
            tracing::error!(
                "🚨 Ballot read-back mismatch: student={}, landed={}, expected={}",
                student_id,
                landed,
                expected
            );
            self.discard_partial(student_id).await;
            return Err(Error::PartialBallot {
                student_id: student_id.to_string(),
                landed,
                expected,
            });
        }

        self.flags.mark_voted(student_id)?;

        tracing::info!(
            "🗳️ Ballot recorded: student={}, entries={}",
            student_id,
            expected
        );

        Ok(SubmissionReceipt {
            student_id: student_id.to_string(),
            entries,
            submitted_at: Utc::now(),
        })
    }

    /// Decide whether a failed insert left rows behind
    async fn classify_failure(&self, student_id: &str, expected: usize, err: Error) -> Error {
        match err {
            Error::Store { .. } => match self.store.count_voter_entries(student_id).await {
                Ok(0) => {
                    tracing::warn!(
                        "⚠️ Ballot insert failed cleanly: student={}, error={}",
                        student_id,
                        err
                    );
                    err
                }
                Ok(landed) => {
                    tracing::error!(
                        "🚨 Partial ballot detected: student={}, landed={}, expected={}",
                        student_id,
                        landed,
                        expected
                    );
                    self.discard_partial(student_id).await;
                    Error::PartialBallot {
                        student_id: student_id.to_string(),
                        landed,
                        expected,
                    }
                }
                Err(read_err) => {
                    tracing::error!(
                        "🚨 Ballot state unknown after failed insert: student={}, error={}, read_back={}",
                        student_id,
                        err,
                        read_err
                    );
                    err
                }
            },
            other => other,
        }
    }

    /// Roll back an incomplete ballot so the voter can submit again
    async fn discard_partial(&self, student_id: &str) {
        match self.store.discard_ballot(student_id).await {
            Ok(removed) => tracing::warn!(
                "↩️ Partial ballot discarded: student={}, rows_removed={}",
                student_id,
                removed
            ),
            Err(err) => tracing::error!(
                "🚨 Partial ballot could not be discarded: student={}, error={}",
                student_id,
                err
            ),
        }
    }
}
