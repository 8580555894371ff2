//! Ballot lifecycle, tally and archive engines
//!
//! [`ElectionContext`] binds the engines to one store and one device flag
//! cache and applies the role rules: students register and vote,
//! administrators manage the catalog, view results, archive and reset.

pub mod archive;
pub mod catalog;
pub mod session;
pub mod submission;
pub mod tally;

use crate::config::ElectionConfig;
use crate::store::{BallotStore, CascadeSummary, FlagCache, MemoryFlags, MemoryStore};
use crate::types::{Candidate, CandidateId, Category, CategoryId, Identity, Voter};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub use archive::{ArchiveEngine, ArchivedCandidate, ArchivedCategory, ArchivedElection, ResetReport};
pub use catalog::{Catalog, CatalogService};
pub use session::{BallotSession, Selection, SelectionLine};
pub use submission::{SubmissionEngine, SubmissionReceipt};
pub use tally::{
    CandidateStanding, CategoryResult, ResultRow, Tally, TallyEngine, TallyReport, percentage,
};

/// Voted state of a student as seen by the store and by this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub student_id: String,
    /// Authoritative flag from the store
    pub has_voted: bool,
    /// Device-local marker; advisory only
    pub device_marker: bool,
}

impl VoterStatus {
    pub fn can_vote(&self) -> bool {
        !self.has_voted
    }

    /// Device marker disagrees with the store
    pub fn is_marker_stale(&self) -> bool {
        self.device_marker != self.has_voted
    }
}

/// Headline numbers for the administrator dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_voters: usize,
    pub categories: usize,
    pub candidates: usize,
    pub archives: usize,
}

/// Facade over the election engines
pub struct ElectionContext<S: BallotStore = MemoryStore> {
    store: Arc<S>,
    flags: Arc<dyn FlagCache>,
    catalog: CatalogService<S>,
    submission: SubmissionEngine<S>,
    tally: TallyEngine<S>,
    archive: ArchiveEngine<S>,
    config: ElectionConfig,
}

impl ElectionContext<MemoryStore> {
    /// Context over a fresh in-memory store and flag cache
    pub fn in_memory(config: ElectionConfig) -> Result<Self> {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryFlags::new()),
            config,
        )
    }

    /// Create context for testing
    pub fn for_testing() -> Result<Self> {
        Self::in_memory(ElectionConfig::for_testing())
    }
}

impl<S: BallotStore> ElectionContext<S> {
    pub fn new(store: Arc<S>, flags: Arc<dyn FlagCache>, config: ElectionConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            catalog: CatalogService::new(store.clone()),
            submission: SubmissionEngine::new(store.clone(), flags.clone()),
            tally: TallyEngine::new(store.clone(), config.clone()),
            archive: ArchiveEngine::new(store.clone(), flags.clone(), config.reset_phrase.clone()),
            store,
            flags,
            config,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn flags(&self) -> &Arc<dyn FlagCache> {
        &self.flags
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Voters
    // -------------------------------------------------------------------------

    /// Sign a student in, registering them on first use
    ///
    /// A known student id must come with the name it was registered under.
    pub async fn register_voter(&self, student_id: &str, name: &str) -> Result<Identity> {
        let student_id = student_id.trim();
        let name = name.trim();
        if student_id.is_empty() || name.is_empty() {
            return Err(Error::validation("Please fill in all fields"));
        }

        let voter = match self.store.find_voter(student_id).await? {
            Some(voter) => voter,
            None => {
                let voter = Voter::new(student_id, name);
                match self.store.insert_voter(voter.clone()).await {
                    Ok(()) => {
                        tracing::info!("🎓 Student registered: {}", student_id);
                        voter
                    }
                    // Lost a registration race; use whichever record won
                    Err(err) => self.store.find_voter(student_id).await?.ok_or(err)?,
                }
            }
        };

        if voter.name != name {
            tracing::warn!("🔐 Sign-in rejected: name mismatch for {}", student_id);
            return Err(Error::unauthorized(
                "Invalid student ID or name. Please check your credentials.",
            ));
        }

        Ok(Identity::student(student_id))
    }

    /// Voted state for a signed-in student
    pub async fn voter_status(&self, identity: &Identity) -> Result<VoterStatus> {
        let student_id = identity.require_student()?;
        let has_voted = self.submission.has_voted(student_id).await?;
        let device_marker = self.flags.voted_hint(student_id)?;

        let status = VoterStatus {
            student_id: student_id.to_string(),
            has_voted,
            device_marker,
        };
        if status.is_marker_stale() {
            tracing::warn!(
                "⚠️ Device voted marker disagrees with store: student={}, store={}, device={}",
                student_id,
                has_voted,
                device_marker
            );
        }
        Ok(status)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Current categories and candidates; readable by any signed-in caller
    pub async fn catalog(&self) -> Result<Catalog> {
        self.catalog.snapshot().await
    }

    pub async fn create_category(&self, identity: &Identity, category: Category) -> Result<Category> {
        identity.require_admin()?;
        self.catalog.create_category(category).await
    }

    pub async fn update_category(&self, identity: &Identity, category: Category) -> Result<()> {
        identity.require_admin()?;
        self.catalog.update_category(category).await
    }

    pub async fn delete_category(&self, identity: &Identity, id: CategoryId) -> Result<CascadeSummary> {
        identity.require_admin()?;
        self.catalog.delete_category(id).await
    }

    pub async fn create_candidate(
        &self,
        identity: &Identity,
        candidate: Candidate,
    ) -> Result<Candidate> {
        identity.require_admin()?;
        self.catalog.create_candidate(candidate).await
    }

    pub async fn update_candidate(&self, identity: &Identity, candidate: Candidate) -> Result<()> {
        identity.require_admin()?;
        self.catalog.update_candidate(candidate).await
    }

    pub async fn delete_candidate(
        &self,
        identity: &Identity,
        id: CandidateId,
    ) -> Result<CascadeSummary> {
        identity.require_admin()?;
        self.catalog.delete_candidate(id).await
    }

    // -------------------------------------------------------------------------
    // Ballots
    // -------------------------------------------------------------------------

    /// Open a ballot for a student who has not voted yet
    pub async fn start_ballot(&self, identity: &Identity) -> Result<BallotSession> {
        let student_id = identity.require_student()?;
        if self.submission.has_voted(student_id).await? {
            return Err(Error::already_voted(student_id));
        }
        Ok(BallotSession::new(student_id))
    }

    /// Submit a session's selection; the session is emptied on success
    pub async fn submit_ballot(
        &self,
        identity: &Identity,
        session: &mut BallotSession,
    ) -> Result<SubmissionReceipt> {
        let student_id = identity.require_student()?;
        if session.student_id() != student_id {
            return Err(Error::unauthorized(
                "ballot session belongs to a different student",
            ));
        }
        if session.is_submitted() {
            return Err(Error::already_voted(student_id));
        }

        let receipt = self.submission.submit(student_id, session.selection()).await?;
        session.finish();
        Ok(receipt)
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    pub async fn compute_tally(&self, identity: &Identity) -> Result<Tally> {
        identity.require_admin()?;
        self.tally.compute_tally().await
    }

    pub async fn results(&self, identity: &Identity) -> Result<TallyReport> {
        identity.require_admin()?;
        self.tally.compute_report().await
    }

    pub async fn dashboard(&self, identity: &Identity) -> Result<DashboardStats> {
        identity.require_admin()?;
        let tally = self.tally.compute_tally().await?;
        let catalog = self.catalog.snapshot().await?;
        let archives = self.archive.list_archives().await?;

        Ok(DashboardStats {
            total_voters: tally.total_voters,
            categories: catalog.category_count(),
            candidates: catalog.candidate_count(),
            archives: archives.len(),
        })
    }

    // -------------------------------------------------------------------------
    // Archives and reset
    // -------------------------------------------------------------------------

    /// Tally the current votes and freeze them under `name`
    pub async fn archive_results(&self, identity: &Identity, name: &str) -> Result<ArchivedElection> {
        let username = identity.require_admin()?;
        if name.trim().is_empty() {
            return Err(Error::validation("Please enter a name for this archive"));
        }

        let tally = self.tally.compute_tally().await?;
        let catalog = self.catalog.snapshot().await?;
        self.archive
            .archive(
                name,
                catalog.categories(),
                catalog.candidates(),
                &tally,
                username,
            )
            .await
    }

    pub async fn list_archives(&self, identity: &Identity) -> Result<Vec<ArchivedElection>> {
        identity.require_admin()?;
        self.archive.list_archives().await
    }

    pub async fn get_archive(&self, identity: &Identity, id: Uuid) -> Result<ArchivedElection> {
        identity.require_admin()?;
        self.archive.get_archive(id).await
    }

    pub async fn delete_archive(&self, identity: &Identity, id: Uuid) -> Result<()> {
        identity.require_admin()?;
        self.archive.delete_archive(id).await
    }

    /// Irreversibly remove every live vote and voted flag
    pub async fn reset_votes(&self, identity: &Identity, confirmation: &str) -> Result<ResetReport> {
        let username = identity.require_admin()?;
        tracing::info!("♻️ Vote reset requested by {}", username);
        self.archive.reset_votes(confirmation).await
    }
}
