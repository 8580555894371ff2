//! In-memory [`BallotStore`] backend
//!
//! All tables sit behind one `RwLock`, so every write operation is a single
//! critical section. That gives the transactional ballot insert, the
//! write-time (student, category) uniqueness check and the atomic reset the
//! store contract asks for.
//!
//! [`StoreFault`] lets callers make the next operations misbehave the way a
//! remote backend can (half-applied batch, failing page, slow page).

use async_trait::async_trait;
use super::{BallotStore, CascadeSummary, ResetSummary};
use crate::election::archive::ArchivedElection;
use crate::types::{Candidate, CandidateId, Category, CategoryId, VoteEntry, Voter};
use crate::{Error, Result, store_error};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Injected misbehaviour for exercising failure paths
#[derive(Debug, Clone, PartialEq)]
pub enum StoreFault {
    /// Next ballot insert writes only its first `landed` rows, leaves the voter
    /// unflagged, then fails
    PartialBallotInsert { landed: usize },
    /// Next ballot insert fails before writing anything
    RejectBallotInsert,
    /// Every vote page starting at `offset` fails
    VotePageFailure { offset: usize },
    /// Every vote page read is delayed
    SlowVotePages { delay: Duration },
}

impl StoreFault {
    fn is_ballot_fault(&self) -> bool {
        matches!(
            self,
            StoreFault::PartialBallotInsert { .. } | StoreFault::RejectBallotInsert
        )
    }
}

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    candidates: Vec<Candidate>,
    voters: HashMap<String, Voter>,
    votes: Vec<VoteEntry>,
    ballot_keys: HashSet<(String, CategoryId)>,
    archives: Vec<ArchivedElection>,
}

impl Tables {
    fn remove_votes_where(&mut self, predicate: impl Fn(&VoteEntry) -> bool) -> usize {
        let before = self.votes.len();
        let ballot_keys = &mut self.ballot_keys;
        self.votes.retain(|vote| {
            if predicate(vote) {
                ballot_keys.remove(&(vote.student_id.clone(), vote.category_id));
                false
            } else {
                true
            }
        });
        before - self.votes.len()
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    faults: Mutex<Vec<StoreFault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault; ballot faults fire once, page faults until cleared
    pub fn inject_fault(&self, fault: StoreFault) -> Result<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| store_error!("Fault registry lock error"))?;
        faults.push(fault);
        Ok(())
    }

    /// Disarm every pending fault
    pub fn clear_faults(&self) -> Result<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| store_error!("Fault registry lock error"))?;
        faults.clear();
        Ok(())
    }

    /// Total vote rows currently stored
    pub fn vote_row_count(&self) -> Result<usize> {
        Ok(self.read_tables()?.votes.len())
    }

    fn read_tables(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| store_error!("Store read error"))
    }

    fn write_tables(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| store_error!("Store write error"))
    }

    fn take_ballot_fault(&self) -> Result<Option<StoreFault>> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| store_error!("Fault registry lock error"))?;
        let position = faults.iter().position(StoreFault::is_ballot_fault);
        Ok(position.map(|index| faults.remove(index)))
    }

    fn page_faults(&self) -> Result<Vec<StoreFault>> {
        let faults = self
            .faults
            .lock()
            .map_err(|_| store_error!("Fault registry lock error"))?;
        Ok(faults
            .iter()
            .filter(|fault| !fault.is_ballot_fault())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BallotStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.read_tables()?.categories.clone();
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(categories)
    }

    async fn insert_category(&self, category: Category) -> Result<()> {
        let mut tables = self.write_tables()?;
        if tables.categories.iter().any(|c| c.id == category.id) {
            return Err(store_error!("Category {} already exists", category.id));
        }
        tables.categories.push(category);
        Ok(())
    }

    async fn update_category(&self, mut category: Category) -> Result<()> {
        let mut tables = self.write_tables()?;
        let recorded = tables
            .votes
            .iter()
            .filter(|v| v.category_id == category.id)
            .count();
        if recorded > 0 {
            return Err(Error::validation(format!(
                "Category {} already has {} recorded votes and can no longer be edited",
                category.name, recorded
            )));
        }

        let existing = tables
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or_else(|| Error::not_found("Category", category.id))?;
        category.created_at = existing.created_at;
        *existing = category;
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<CascadeSummary> {
        let mut tables = self.write_tables()?;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        if tables.categories.len() == before {
            return Err(Error::not_found("Category", id));
        }

        let candidates_before = tables.candidates.len();
        tables.candidates.retain(|c| c.category_id != id);
        let candidates_removed = candidates_before - tables.candidates.len();
        let votes_removed = tables.remove_votes_where(|vote| vote.category_id == id);

        Ok(CascadeSummary {
            categories_removed: 1,
            candidates_removed,
            votes_removed,
        })
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let mut candidates = self.read_tables()?.candidates.clone();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(candidates)
    }

    async fn insert_candidate(&self, candidate: Candidate) -> Result<()> {
        let mut tables = self.write_tables()?;
        if !tables.categories.iter().any(|c| c.id == candidate.category_id) {
            return Err(Error::not_found("Category", candidate.category_id));
        }
        if tables.candidates.iter().any(|c| c.id == candidate.id) {
            return Err(store_error!("Candidate {} already exists", candidate.id));
        }
        tables.candidates.push(candidate);
        Ok(())
    }

    async fn update_candidate(&self, mut candidate: Candidate) -> Result<()> {
        let mut tables = self.write_tables()?;
        if !tables.categories.iter().any(|c| c.id == candidate.category_id) {
            return Err(Error::not_found("Category", candidate.category_id));
        }

        let has_votes = tables.votes.iter().any(|v| v.candidate_id == candidate.id);
        let existing = tables
            .candidates
            .iter_mut()
            .find(|c| c.id == candidate.id)
            .ok_or_else(|| Error::not_found("Candidate", candidate.id))?;

        if existing.category_id != candidate.category_id && has_votes {
            return Err(Error::validation(format!(
                "Candidate {} already has votes and cannot change category",
                existing.name
            )));
        }

        candidate.created_at = existing.created_at;
        *existing = candidate;
        Ok(())
    }

    async fn delete_candidate(&self, id: CandidateId) -> Result<CascadeSummary> {
        let mut tables = self.write_tables()?;
        let before = tables.candidates.len();
        tables.candidates.retain(|c| c.id != id);
        if tables.candidates.len() == before {
            return Err(Error::not_found("Candidate", id));
        }

        let votes_removed = tables.remove_votes_where(|vote| vote.candidate_id == id);

        Ok(CascadeSummary {
            categories_removed: 0,
            candidates_removed: 1,
            votes_removed,
        })
    }

    async fn find_voter(&self, student_id: &str) -> Result<Option<Voter>> {
        Ok(self.read_tables()?.voters.get(student_id).cloned())
    }

    async fn insert_voter(&self, voter: Voter) -> Result<()> {
        let mut tables = self.write_tables()?;
        if tables.voters.contains_key(&voter.student_id) {
            return Err(store_error!("Voter {} already exists", voter.student_id));
        }
        tables.voters.insert(voter.student_id.clone(), voter);
        Ok(())
    }

    async fn insert_ballot(&self, entries: Vec<VoteEntry>) -> Result<()> {
        let Some(first) = entries.first() else {
            return Err(Error::validation("A ballot needs at least one entry"));
        };
        let student_id = first.student_id.clone();
        if entries.iter().any(|e| e.student_id != student_id) {
            return Err(Error::validation(
                "All entries of a ballot must belong to one student",
            ));
        }

        let fault = self.take_ballot_fault()?;
        let mut tables = self.write_tables()?;

        let voter = tables
            .voters
            .get(&student_id)
            .ok_or_else(|| Error::not_found("Voter", &student_id))?;
        if voter.has_voted {
            return Err(Error::already_voted(&student_id));
        }

        let mut batch_keys = HashSet::new();
        for entry in &entries {
            let key = (student_id.clone(), entry.category_id);
            if tables.ballot_keys.contains(&key) {
                return Err(Error::already_voted(&student_id));
            }
            if !batch_keys.insert(key) {
                return Err(Error::validation(format!(
                    "Ballot contains two entries for category {}",
                    entry.category_id
                )));
            }
        }

        match fault {
            Some(StoreFault::RejectBallotInsert) => {
                return Err(store_error!("Ballot insert rejected by backend"));
            }
            Some(StoreFault::PartialBallotInsert { landed }) => {
                for entry in entries.into_iter().take(landed) {
                    tables
                        .ballot_keys
                        .insert((student_id.clone(), entry.category_id));
                    tables.votes.push(entry);
                }
                return Err(store_error!("Connection lost during ballot insert"));
            }
            _ => {}
        }

        tables.ballot_keys.extend(batch_keys);
        tables.votes.extend(entries);
        if let Some(voter) = tables.voters.get_mut(&student_id) {
            voter.has_voted = true;
        }
        Ok(())
    }

    async fn discard_ballot(&self, student_id: &str) -> Result<usize> {
        let mut tables = self.write_tables()?;
        let voter = tables
            .voters
            .get_mut(student_id)
            .ok_or_else(|| Error::not_found("Voter", student_id))?;
        voter.has_voted = false;
        Ok(tables.remove_votes_where(|vote| vote.student_id == student_id))
    }

    async fn fetch_votes(&self, range: Range<usize>) -> Result<Vec<VoteEntry>> {
        let mut delay = None;
        for fault in self.page_faults()? {
            match fault {
                StoreFault::VotePageFailure { offset } if offset == range.start => {
                    return Err(store_error!("Vote page at offset {} failed", offset));
                }
                StoreFault::SlowVotePages { delay: d } => delay = Some(d),
                _ => {}
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let tables = self.read_tables()?;
        let end = range.end.min(tables.votes.len());
        if range.start >= end {
            return Ok(Vec::new());
        }
        Ok(tables.votes[range.start..end].to_vec())
    }

    async fn count_voter_entries(&self, student_id: &str) -> Result<usize> {
        let tables = self.read_tables()?;
        Ok(tables
            .votes
            .iter()
            .filter(|vote| vote.student_id == student_id)
            .count())
    }

    async fn reset_votes(&self) -> Result<ResetSummary> {
        let mut tables = self.write_tables()?;
        let votes_removed = tables.votes.len();
        tables.votes.clear();
        tables.ballot_keys.clear();

        let mut voters_cleared = 0;
        for voter in tables.voters.values_mut() {
            if voter.has_voted {
                voter.has_voted = false;
                voters_cleared += 1;
            }
        }

        Ok(ResetSummary {
            votes_removed,
            voters_cleared,
        })
    }

    async fn insert_archive(&self, archive: ArchivedElection) -> Result<()> {
        let mut tables = self.write_tables()?;
        if tables.archives.iter().any(|a| a.id == archive.id) {
            return Err(store_error!("Archive {} already exists", archive.id));
        }
        tables.archives.push(archive);
        Ok(())
    }

    async fn list_archives(&self) -> Result<Vec<ArchivedElection>> {
        let tables = self.read_tables()?;
        // Reverse first so equal timestamps still come out newest-inserted first
        let mut archives: Vec<ArchivedElection> = tables.archives.iter().rev().cloned().collect();
        archives.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        Ok(archives)
    }

    async fn get_archive(&self, id: Uuid) -> Result<Option<ArchivedElection>> {
        let tables = self.read_tables()?;
        Ok(tables.archives.iter().find(|a| a.id == id).cloned())
    }

    async fn delete_archive(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.write_tables()?;
        let before = tables.archives.len();
        tables.archives.retain(|a| a.id != id);
        Ok(tables.archives.len() != before)
    }
}
