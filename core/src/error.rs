//! Error types for the reservation core.

use crate::types::{CarolId, Team};
use thiserror::Error;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures raised by a storage tier.
///
/// Messages may contain backend detail and are meant for logs, not for end
/// users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing database rejected or could not run the operation.
    #[error("Database error: {0}")]
    Database(String),

    /// Reading or writing the local data files failed.
    #[error("File store error: {0}")]
    Io(String),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No storage tier was available for the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Startup configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A restricted runtime was started without a remote store.
    #[error(
        "A remote store is required in a restricted runtime. Set DATABASE_URL to a PostgreSQL connection string."
    )]
    RemoteRequired,
}

/// Request-level validation failures. Checked in declaration order; the first
/// failure is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The branch name was empty after trimming.
    #[error("Branch name is required")]
    BranchNameRequired,

    /// The request did not add up to exactly two selections.
    #[error("Exactly 2 carols must be selected (not 1, not 3 or more). You selected {count}.")]
    SelectionCount {
        /// Number of selections in the request
        count: usize,
    },

    /// A custom carol was indicated but its text is blank.
    #[error("Custom carol text cannot be blank")]
    BlankCustomText,

    /// The team is not one of the two fixed identifiers.
    #[error("Team selection is required (Team 1 or Team 2), got {team:?}")]
    InvalidTeam {
        /// Team as supplied
        team: String,
    },

    /// The branch already holds this team slot.
    #[error("Branch {branch} has already selected {team}.")]
    TeamAlreadyClaimed {
        /// Branch name
        branch: String,
        /// Team already held
        team: Team,
    },
}

/// A problem with one requested carol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemProblem {
    /// No catalog item has this id.
    #[error("Carol with ID {id} not found")]
    NotFound {
        /// Requested id
        id: CarolId,
    },

    /// Another branch (or this one) already holds the carol.
    #[error("Carol \"{name}\" has already been selected by branch \"{branch}\"")]
    AlreadyClaimed {
        /// Requested id
        id: CarolId,
        /// Carol name
        name: String,
        /// Current claimant
        branch: String,
    },

    /// The same id appears more than once in the request.
    #[error("Carol with ID {id} was requested more than once")]
    Duplicate {
        /// Repeated id
        id: CarolId,
    },
}

/// Errors returned by [`crate::ReservationService`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Request-level validation failed; nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One or more carols could not be claimed; nothing was changed.
    #[error("Some carols could not be selected: {}", summarize(.0))]
    Conflicts(Vec<ItemProblem>),

    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ReservationError {
    /// Human-readable reasons, one per problem.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Conflicts(problems) => problems.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }

    /// Returns `true` if the caller can fix the request and try again.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflicts(_))
    }
}

fn summarize(problems: &[ItemProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
