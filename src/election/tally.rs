//! Vote counting
//!
//! The engine reads the whole vote set page by page before aggregating, so a
//! failed or truncated read never produces a partial tally. Reads are bounded
//! by a page budget and a time budget; exceeding either reports
//! [`Error::TallyIncomplete`].

use super::catalog::Catalog;
use crate::config::ElectionConfig;
use crate::store::BallotStore;
use crate::types::{CandidateId, CategoryId, VoteEntry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Share of `category_total` held by `votes`, rounded half-up to a whole percent
///
/// Zero when the category has no votes.
///
/// ```rust
/// use student_vote::election::tally::percentage;
///
/// assert_eq!(percentage(1, 3), 33);
/// assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
/// assert_eq!(percentage(0, 0), 0);
/// ```
pub fn percentage(votes: u64, category_total: u64) -> u32 {
    if category_total == 0 {
        return 0;
    }
    ((votes as f64 / category_total as f64) * 100.0 + 0.5).floor() as u32
}

/// Raw aggregate over every vote entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    /// Entries per candidate
    pub per_candidate: HashMap<CandidateId, u64>,
    /// Distinct students across all entries
    pub total_voters: usize,
    /// Entries read
    pub total_entries: usize,
    /// Pages fetched, including the terminating empty page
    pub pages_read: usize,
}

impl Tally {
    /// Aggregate a fully read vote set
    pub fn from_entries(entries: &[VoteEntry]) -> Self {
        let mut per_candidate: HashMap<CandidateId, u64> = HashMap::new();
        let mut voters: HashSet<&str> = HashSet::new();

        for entry in entries {
            *per_candidate.entry(entry.candidate_id).or_insert(0) += 1;
            voters.insert(entry.student_id.as_str());
        }

        Self {
            per_candidate,
            total_voters: voters.len(),
            total_entries: entries.len(),
            pages_read: 0,
        }
    }

    pub fn votes_for(&self, candidate_id: CandidateId) -> u64 {
        self.per_candidate.get(&candidate_id).copied().unwrap_or(0)
    }

    /// Votes received by every candidate currently standing in `category_id`
    pub fn category_total(&self, catalog: &Catalog, category_id: CategoryId) -> u64 {
        catalog
            .candidates_in(category_id)
            .map(|c| self.votes_for(c.id))
            .sum()
    }

    pub fn percentage_for(
        &self,
        catalog: &Catalog,
        candidate_id: CandidateId,
        category_id: CategoryId,
    ) -> u32 {
        percentage(
            self.votes_for(candidate_id),
            self.category_total(catalog, category_id),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }
}

/// One candidate's line in a category result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStanding {
    pub candidate_id: CandidateId,
    pub name: String,
    pub class_level: String,
    pub votes: u64,
    pub percentage: u32,
}

/// Counts and percentages for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category_id: CategoryId,
    pub category_name: String,
    pub total_votes: u64,
    /// Candidates in catalog order
    pub candidates: Vec<CandidateStanding>,
}

impl CategoryResult {
    /// Candidates by descending votes; equal counts keep catalog order
    pub fn ranked(&self) -> Vec<&CandidateStanding> {
        let mut ranked: Vec<&CandidateStanding> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }

    /// First-ranked candidate, provided it has at least one vote
    pub fn leader(&self) -> Option<&CandidateStanding> {
        self.ranked().into_iter().next().filter(|c| c.votes > 0)
    }

    /// Every candidate sharing the top count (empty when nobody has votes)
    pub fn leaders(&self) -> Vec<&CandidateStanding> {
        match self.leader() {
            Some(top) => self
                .candidates
                .iter()
                .filter(|c| c.votes == top.votes)
                .collect(),
            None => Vec::new(),
        }
    }

    /// More than one candidate shares the top count
    pub fn is_tied(&self) -> bool {
        self.leaders().len() > 1
    }
}

/// Flat result line consumed by CSV and print collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub category: String,
    pub candidate: String,
    pub class_level: String,
    pub votes: u64,
    pub percentage: u32,
}

/// Tally laid out over the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyReport {
    pub total_voters: usize,
    pub categories: Vec<CategoryResult>,
}

impl TallyReport {
    pub fn build(catalog: &Catalog, tally: &Tally) -> Self {
        let categories = catalog
            .categories()
            .iter()
            .map(|category| {
                let total_votes = tally.category_total(catalog, category.id);
                let candidates = catalog
                    .candidates_in(category.id)
                    .map(|candidate| {
                        let votes = tally.votes_for(candidate.id);
                        CandidateStanding {
                            candidate_id: candidate.id,
                            name: candidate.name.clone(),
                            class_level: candidate.class_level.clone(),
                            votes,
                            percentage: percentage(votes, total_votes),
                        }
                    })
                    .collect();

                CategoryResult {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    total_votes,
                    candidates,
                }
            })
            .collect();

        Self {
            total_voters: tally.total_voters,
            categories,
        }
    }

    pub fn category(&self, category_id: CategoryId) -> Option<&CategoryResult> {
        self.categories.iter().find(|c| c.category_id == category_id)
    }

    /// Flat rows in catalog order
    pub fn export_rows(&self) -> Vec<ResultRow> {
        self.categories
            .iter()
            .flat_map(|category| {
                category.candidates.iter().map(|candidate| ResultRow {
                    category: category.category_name.clone(),
                    candidate: candidate.name.clone(),
                    class_level: candidate.class_level.clone(),
                    votes: candidate.votes,
                    percentage: candidate.percentage,
                })
            })
            .collect()
    }
}

/// Reads every vote entry and aggregates them
pub struct TallyEngine<S> {
    store: Arc<S>,
    config: ElectionConfig,
}

impl<S: BallotStore> TallyEngine<S> {
    pub fn new(store: Arc<S>, config: ElectionConfig) -> Self {
        Self { store, config }
    }

    /// Count every vote entry in the store
    pub async fn compute_tally(&self) -> Result<Tally> {
        let pages_read = AtomicUsize::new(0);
        let read = tokio::time::timeout(
            self.config.tally_timeout(),
            self.read_all_entries(&pages_read),
        )
        .await;

        let entries = match read {
            Ok(entries) => entries?,
            Err(_) => {
                let pages = pages_read.load(Ordering::Relaxed);
                tracing::warn!(
                    "⏱️ Tally abandoned after {}s and {} pages",
                    self.config.tally_timeout_seconds,
                    pages
                );
                return Err(Error::TallyIncomplete {
                    pages_read: pages,
                    reason: format!(
                        "time budget of {}s exceeded",
                        self.config.tally_timeout_seconds
                    ),
                });
            }
        };

        let mut tally = Tally::from_entries(&entries);
        tally.pages_read = pages_read.load(Ordering::Relaxed);

        tracing::info!(
            "📊 Tally computed: entries={}, voters={}, pages={}",
            tally.total_entries,
            tally.total_voters,
            tally.pages_read
        );
        Ok(tally)
    }

    /// Tally laid out over the current catalog
    pub async fn compute_report(&self) -> Result<TallyReport> {
        let tally = self.compute_tally().await?;
        let catalog = Catalog::load(self.store.as_ref()).await?;
        Ok(TallyReport::build(&catalog, &tally))
    }

    async fn read_all_entries(&self, pages_read: &AtomicUsize) -> Result<Vec<VoteEntry>> {
        let page_size = self.config.tally_page_size;
        let mut entries = Vec::new();
        let mut from = 0;

        loop {
            let pages = pages_read.load(Ordering::Relaxed);
            if pages >= self.config.tally_max_pages {
                return Err(Error::TallyIncomplete {
                    pages_read: pages,
                    reason: format!(
                        "page budget of {} exhausted",
                        self.config.tally_max_pages
                    ),
                });
            }

            let page = self.store.fetch_votes(from..from + page_size).await?;
            pages_read.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("📄 Tally page: offset={}, rows={}", from, page.len());

            if page.is_empty() {
                break;
            }
            entries.extend(page);
            from += page_size;
        }

        Ok(entries)
    }
}
