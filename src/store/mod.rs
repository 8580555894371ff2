//! Persistence boundary for the election engine
//!
//! The engines only talk to storage through [`BallotStore`] and to the
//! device-local voted markers through [`FlagCache`]. Guarantees every backend
//! must provide:
//! 1. `insert_ballot` is all-or-nothing and marks the voter voted in the same unit
//! 2. At most one vote entry per (student, category), checked at write time
//! 3. `reset_votes` wipes every vote entry and voted flag in one operation
//! 4. `fetch_votes` pages over a stable row order

pub mod flags;
pub mod memory;

use async_trait::async_trait;
use crate::Result;
use crate::election::archive::ArchivedElection;
use crate::types::{Candidate, CandidateId, Category, CategoryId, VoteEntry, Voter};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use uuid::Uuid;

pub use flags::{FlagCache, HAS_VOTED_KEY, MemoryFlags, VOTED_KEY_PREFIX};
pub use memory::{MemoryStore, StoreFault};

/// Rows removed by a cascading catalog delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub categories_removed: usize,
    pub candidates_removed: usize,
    pub votes_removed: usize,
}

/// Rows touched by a vote reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub votes_removed: usize,
    pub voters_cleared: usize,
}

/// Storage operations over categories, candidates, voters, vote entries and
/// archived elections
#[async_trait]
pub trait BallotStore: Send + Sync {
    /// All categories by ascending display order, then creation time
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn insert_category(&self, category: Category) -> Result<()>;

    /// Replace a category; refused once any vote entry references it
    async fn update_category(&self, category: Category) -> Result<()>;

    /// Remove a category together with its candidates and their vote entries
    async fn delete_category(&self, id: CategoryId) -> Result<CascadeSummary>;

    /// All candidates in creation order
    async fn list_candidates(&self) -> Result<Vec<Candidate>>;

    async fn insert_candidate(&self, candidate: Candidate) -> Result<()>;

    async fn update_candidate(&self, candidate: Candidate) -> Result<()>;

    /// Remove a candidate together with its vote entries
    async fn delete_candidate(&self, id: CandidateId) -> Result<CascadeSummary>;

    async fn find_voter(&self, student_id: &str) -> Result<Option<Voter>>;

    /// Insert a new voter; fails if the student id is taken
    async fn insert_voter(&self, voter: Voter) -> Result<()>;

    /// Record a whole ballot and set the voter's voted flag as one unit
    ///
    /// Fails with `AlreadyVoted` when the voter is flagged or any
    /// (student, category) pair already exists, leaving the store unchanged.
    async fn insert_ballot(&self, entries: Vec<VoteEntry>) -> Result<()>;

    /// Remove every vote entry of one voter and clear their voted flag
    ///
    /// Compensation for a ballot that landed incompletely. Returns the number
    /// of rows removed.
    async fn discard_ballot(&self, student_id: &str) -> Result<usize>;

    /// Vote entries at row positions `range`; empty once past the end
    async fn fetch_votes(&self, range: Range<usize>) -> Result<Vec<VoteEntry>>;

    /// Number of vote entries recorded for one voter
    async fn count_voter_entries(&self, student_id: &str) -> Result<usize>;

    /// Delete every vote entry and clear every voted flag in one operation
    async fn reset_votes(&self) -> Result<ResetSummary>;

    async fn insert_archive(&self, archive: ArchivedElection) -> Result<()>;

    /// All archives, newest first
    async fn list_archives(&self) -> Result<Vec<ArchivedElection>>;

    async fn get_archive(&self, id: Uuid) -> Result<Option<ArchivedElection>>;

    /// Remove one archive; `false` if it did not exist
    async fn delete_archive(&self, id: Uuid) -> Result<bool>;
}
