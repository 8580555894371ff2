//! Error handling for the election engine

/// Result type alias for the election engine
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the election engine
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Rejected input: incomplete ballot, blank archive name, wrong reset phrase
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The voter already has a recorded ballot
    #[error("Student {student_id} has already voted. Each student can only vote once.")]
    AlreadyVoted { student_id: String },

    /// Operation not permitted for the caller's role
    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Backend failure; nothing was committed
    #[error("Store error: {message}")]
    Store { message: String },

    /// Some but not all ballot rows for a voter landed in the store; the
    /// landed rows are discarded before this is returned
    #[error(
        "Ballot for student {student_id} was only partially recorded ({landed} of {expected} entries)"
    )]
    PartialBallot {
        student_id: String,
        landed: usize,
        expected: usize,
    },

    /// The tally could not read the whole vote set within its budget
    #[error("Tally incomplete after {pages_read} pages: {reason}")]
    TallyIncomplete { pages_read: usize, reason: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new already-voted error
    pub fn already_voted(student_id: impl Into<String>) -> Self {
        Self::AlreadyVoted {
            student_id: student_id.into(),
        }
    }

    /// Create a new authorization error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the same call may succeed if simply retried
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Store { .. } | Self::PartialBallot { .. } | Self::TallyIncomplete { .. }
        )
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::Error::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! store_error {
    ($msg:expr) => {
        $crate::Error::store($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::store(format!($fmt, $($arg)*))
    };
}
