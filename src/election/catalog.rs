//! Categories and candidates
//!
//! [`Catalog`] is a read-only snapshot used to present choices, validate
//! ballots and lay out tallies. [`CatalogService`] carries the administrator
//! writes through to the store.

use crate::store::{BallotStore, CascadeSummary};
use crate::types::{Candidate, CandidateId, Category, CategoryId};
use crate::Result;
use std::sync::Arc;

/// Ordered snapshot of categories and their candidates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    categories: Vec<Category>,
    candidates: Vec<Candidate>,
}

impl Catalog {
    /// Build a snapshot, ordering categories by display order and candidates by
    /// creation time
    pub fn new(mut categories: Vec<Category>, mut candidates: Vec<Candidate>) -> Self {
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self {
            categories,
            candidates,
        }
    }

    /// Read the current catalog from a store
    pub async fn load<S: BallotStore>(store: &S) -> Result<Self> {
        let categories = store.list_categories().await?;
        let candidates = store.list_candidates().await?;
        Ok(Self::new(categories, candidates))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Candidates standing in `category_id`, in creation order
    pub fn candidates_in(&self, category_id: CategoryId) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.category_id == category_id)
    }

    /// Category at ballot position `index`
    pub fn category_at(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Administrator writes over categories and candidates
pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S: BallotStore> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn snapshot(&self) -> Result<Catalog> {
        Catalog::load(self.store.as_ref()).await
    }

    pub async fn create_category(&self, category: Category) -> Result<Category> {
        category.validate()?;
        self.store.insert_category(category.clone()).await?;
        tracing::info!("📂 Category created: {} ({})", category.name, category.id);
        Ok(category)
    }

    /// Edit a category; refused once any ballot references it
    pub async fn update_category(&self, category: Category) -> Result<()> {
        category.validate()?;
        self.store.update_category(category).await
    }

    /// Delete a category with its candidates and their votes
    pub async fn delete_category(&self, id: CategoryId) -> Result<CascadeSummary> {
        let summary = self.store.delete_category(id).await?;
        tracing::info!(
            "🗑️ Category deleted: id={}, candidates_removed={}, votes_removed={}",
            id,
            summary.candidates_removed,
            summary.votes_removed
        );
        Ok(summary)
    }

    pub async fn create_candidate(&self, candidate: Candidate) -> Result<Candidate> {
        candidate.validate()?;
        self.store.insert_candidate(candidate.clone()).await?;
        tracing::info!(
            "👤 Candidate created: {} in category {}",
            candidate.name,
            candidate.category_id
        );
        Ok(candidate)
    }

    pub async fn update_candidate(&self, candidate: Candidate) -> Result<()> {
        candidate.validate()?;
        self.store.update_candidate(candidate).await
    }

    pub async fn delete_candidate(&self, id: CandidateId) -> Result<CascadeSummary> {
        let summary = self.store.delete_candidate(id).await?;
        tracing::info!(
            "🗑️ Candidate deleted: id={}, votes_removed={}",
            id,
            summary.votes_removed
        );
        Ok(summary)
    }
}
