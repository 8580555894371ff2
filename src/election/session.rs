//! In-progress ballot for one voter
//!
//! Selections live only in memory until the ballot is submitted. Logging out
//! consumes the session; a successful submission empties it.

use super::catalog::Catalog;
use crate::types::{Candidate, CandidateId, Category, CategoryId};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Chosen candidate per category
pub type Selection = BTreeMap<CategoryId, CandidateId>;

/// One line of the confirmation summary
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionLine<'a> {
    pub category: &'a Category,
    pub candidate: Option<&'a Candidate>,
}

/// Selection state and review cursor for a signed-in voter
#[derive(Debug, Clone, PartialEq)]
pub struct BallotSession {
    student_id: String,
    selection: Selection,
    cursor: usize,
    submitted: bool,
}

impl BallotSession {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            selection: Selection::new(),
            cursor: 0,
            submitted: false,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Candidate chosen for `category_id`, if any
    pub fn selected(&self, category_id: CategoryId) -> Option<CandidateId> {
        self.selection.get(&category_id).copied()
    }

    /// Choose `candidate_id` for `category_id`, replacing an earlier choice
    pub fn select_candidate(
        &mut self,
        category_id: CategoryId,
        candidate_id: CandidateId,
    ) -> Option<CandidateId> {
        self.selection.insert(category_id, candidate_id)
    }

    /// Choose a candidate in the category under the cursor
    pub fn vote_current(&mut self, catalog: &Catalog, candidate_id: CandidateId) -> Result<()> {
        let category = self
            .current_category(catalog)
            .ok_or_else(|| Error::validation("There is no category to vote in"))?;
        let candidate = catalog
            .candidate(candidate_id)
            .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
        if candidate.category_id != category.id {
            return Err(Error::validation(format!(
                "{} is not standing for {}",
                candidate.name, category.name
            )));
        }
        let category_id = category.id;
        self.select_candidate(category_id, candidate_id);
        Ok(())
    }

    pub fn clear_selection(&mut self, category_id: CategoryId) -> Option<CandidateId> {
        self.selection.remove(&category_id)
    }

    /// Every category in the catalog has a selection
    pub fn is_complete(&self, catalog: &Catalog) -> bool {
        !catalog.is_empty()
            && catalog
                .categories()
                .iter()
                .all(|c| self.selection.contains_key(&c.id))
    }

    /// Categories still waiting for a choice, in ballot order
    pub fn missing_categories<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Category> {
        catalog
            .categories()
            .iter()
            .filter(|c| !self.selection.contains_key(&c.id))
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_category<'a>(&self, catalog: &'a Catalog) -> Option<&'a Category> {
        catalog.category_at(self.cursor)
    }

    /// Advance to the next category; `false` when already on the last one
    pub fn next(&mut self, catalog: &Catalog) -> bool {
        if self.cursor + 1 < catalog.category_count() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Step back one category; `false` when already on the first one
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn go_to(&mut self, catalog: &Catalog, index: usize) -> Result<()> {
        if index >= catalog.category_count() {
            return Err(Error::validation(format!(
                "Category position {} is out of range (ballot has {})",
                index + 1,
                catalog.category_count()
            )));
        }
        self.cursor = index;
        Ok(())
    }

    /// Position of the cursor through the ballot, in percent
    pub fn progress(&self, catalog: &Catalog) -> f64 {
        let total = catalog.category_count();
        if total == 0 {
            return 0.0;
        }
        ((self.cursor + 1) as f64 / total as f64) * 100.0
    }

    /// Confirmation list: every category with the chosen candidate
    pub fn summary<'a>(&self, catalog: &'a Catalog) -> Vec<SelectionLine<'a>> {
        catalog
            .categories()
            .iter()
            .map(|category| SelectionLine {
                category,
                candidate: self
                    .selected(category.id)
                    .and_then(|id| catalog.candidate(id)),
            })
            .collect()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Drop selection state after a recorded ballot
    pub(crate) fn finish(&mut self) {
        self.selection.clear();
        self.cursor = 0;
        self.submitted = true;
    }

    /// End the session without submitting; nothing is persisted
    pub fn logout(self) {
        tracing::debug!(
            "👋 Ballot session discarded: student={}, selections={}",
            self.student_id,
            self.selection.len()
        );
    }
}
