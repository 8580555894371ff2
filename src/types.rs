//! # Core Types for the Student Election Engine
//!
//! Records shared by the catalog, ballot, tally and archive components. All
//! records derive `Serialize`/`Deserialize` so a store backend can persist them
//! as-is.
//!
//! ## Type Categories
//!
//! ### Reference Data
//! - [`Category`]: an electable office, ordered by `display_order`
//! - [`Candidate`]: a nominee belonging to one category
//!
//! ### Voting Records
//! - [`Voter`]: a registered student with the authoritative voted flag
//! - [`VoteEntry`]: one voter's choice for one category
//!
//! ### Caller Identity
//! - [`Identity`]: the resolved sign-in record handed over by the login layer
//!
//! ## Usage Examples
//!
//! ```rust
//! use student_vote::types::*;
//!
//! let president = Category::new("President", "Leads the student council", 1);
//! let alice = Candidate::new("Alice Mensah", president.id, "SHS 3");
//!
//! assert_eq!(alice.category_id, president.id);
//! assert_eq!(president.icon, "star");
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a [`Category`]
pub type CategoryId = Uuid;

/// Identifier of a [`Candidate`]
pub type CandidateId = Uuid;

/// Icon assigned to categories created without one
pub const DEFAULT_CATEGORY_ICON: &str = "star";

/// Class level recorded for students registered at first sign-in
pub const UNKNOWN_CLASS_LEVEL: &str = "Unknown";

/// An electable office grouping candidates
///
/// Categories are listed by ascending `display_order`; categories sharing an
/// order fall back to creation time. A ballot is complete only when every
/// category has a selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique category identifier
    pub id: CategoryId,

    /// Display name (e.g. "Head Prefect")
    pub name: String,

    /// Short explanation shown above the candidate list
    pub description: String,

    /// Icon key understood by the presentation layer
    pub icon: String,

    /// Position in the ballot, ascending
    pub display_order: i32,

    /// When this category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category with the default icon
    pub fn new(name: impl Into<String>, description: impl Into<String>, display_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            display_order,
            created_at: Utc::now(),
        }
    }

    /// Replace the icon key
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Check the fields an administrator is allowed to submit
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Category name must not be blank"));
        }
        Ok(())
    }
}

/// A nominee standing in exactly one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Unique candidate identifier
    pub id: CandidateId,

    /// Candidate's display name
    pub name: String,

    /// Category this candidate stands in
    pub category_id: CategoryId,

    /// Portrait location; empty when none was uploaded
    pub image_url: String,

    /// Campaign statement
    pub manifesto: String,

    /// School class of the candidate (e.g. "SHS 2")
    pub class_level: String,

    /// When this candidate was created; candidates are listed in this order
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Create a new candidate without portrait or manifesto
    pub fn new(
        name: impl Into<String>,
        category_id: CategoryId,
        class_level: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id,
            image_url: String::new(),
            manifesto: String::new(),
            class_level: class_level.into(),
            created_at: Utc::now(),
        }
    }

    /// Attach a campaign statement
    pub fn with_manifesto(mut self, manifesto: impl Into<String>) -> Self {
        self.manifesto = manifesto.into();
        self
    }

    /// Attach a portrait location
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    /// Check the fields an administrator is allowed to submit
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Candidate name must not be blank"));
        }
        Ok(())
    }
}

/// A registered student
///
/// `has_voted` is the authoritative voted flag. It is set in the same store
/// operation that records the ballot and is only cleared by a global reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voter {
    pub student_id: String,
    pub name: String,
    pub class_level: String,
    pub has_voted: bool,
    pub registered_at: DateTime<Utc>,
}

impl Voter {
    /// Create a not-yet-voted voter record
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            class_level: UNKNOWN_CLASS_LEVEL.to_string(),
            has_voted: false,
            registered_at: Utc::now(),
        }
    }
}

/// One voter's recorded choice for one category
///
/// Entries are immutable once written. A completed ballot produces exactly one
/// entry per category for the voter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteEntry {
    pub id: Uuid,
    pub candidate_id: CandidateId,
    pub category_id: CategoryId,
    pub student_id: String,
    pub created_at: DateTime<Utc>,
}

impl VoteEntry {
    pub fn new(
        student_id: impl Into<String>,
        category_id: CategoryId,
        candidate_id: CandidateId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            category_id,
            student_id: student_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Resolved caller identity supplied by the external login collaborator
///
/// The engine never checks credentials; it only uses the role to gate
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Identity {
    Student { student_id: String },
    Admin { username: String },
}

impl Identity {
    pub fn student(student_id: impl Into<String>) -> Self {
        Self::Student {
            student_id: student_id.into(),
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::Admin {
            username: username.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    /// Student id of a student caller, or `Unauthorized`
    pub fn require_student(&self) -> Result<&str> {
        match self {
            Self::Student { student_id } => Ok(student_id),
            Self::Admin { username } => Err(Error::unauthorized(format!(
                "administrator {username} cannot cast a ballot"
            ))),
        }
    }

    /// Username of an administrator caller, or `Unauthorized`
    pub fn require_admin(&self) -> Result<&str> {
        match self {
            Self::Admin { username } => Ok(username),
            Self::Student { .. } => Err(Error::unauthorized(
                "this operation requires an administrator",
            )),
        }
    }
}
