//! Domain types for carol reservations.
//!
//! Catalog items are the reservable units, teams are the two fixed slots a
//! branch can occupy, and submissions are the audit trail of successful
//! reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a catalog item.
///
/// Pre-seeded carols use ids up to [`CarolId::MAX_SEEDED`]; free-text
/// substitutes are assigned ids above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarolId(i64);

impl CarolId {
    /// Placeholder for records whose id could not be read. Never matches a lookup.
    pub const UNASSIGNED: Self = Self(0);

    /// Highest id reserved for the seeded catalog.
    pub const MAX_SEEDED: Self = Self(19);

    /// Creates a `CarolId` from a raw integer.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner integer
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this id identifies a real catalog row.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 > 0
    }

    /// The id following this one, or `None` past `i64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl From<i64> for CarolId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CarolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Teams
// ============================================================================

/// One of the two fixed team slots a branch may occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// "Team 1"
    #[serde(rename = "Team 1")]
    Team1,
    /// "Team 2"
    #[serde(rename = "Team 2")]
    Team2,
}

impl Team {
    /// Both teams, in display order.
    pub const ALL: [Self; 2] = [Self::Team1, Self::Team2];

    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Team1 => "Team 1",
            Self::Team2 => "Team 2",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not exactly one of the team identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team: {0:?}")]
pub struct UnknownTeam(pub String);

impl FromStr for Team {
    type Err = UnknownTeam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Team 1" => Ok(Self::Team1),
            "Team 2" => Ok(Self::Team2),
            other => Err(UnknownTeam(other.to_string())),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A catalog item in canonical form.
///
/// Produced by [`crate::normalize::normalize`]; business logic only ever sees
/// this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable id
    pub id: CarolId,
    /// Display name
    pub name: String,
    /// Whether a branch has claimed this carol
    pub selected: bool,
    /// Claiming branch (present iff selected)
    pub branch: Option<String>,
    /// Claimed team slot (present iff selected)
    pub team: Option<Team>,
}

impl CatalogItem {
    /// Creates an unclaimed catalog item.
    #[must_use]
    pub fn unclaimed(id: CarolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            selected: false,
            branch: None,
            team: None,
        }
    }

    /// Marks the item as claimed by `branch` for `team`.
    pub fn claim(&mut self, branch: &str, team: Team) {
        self.selected = true;
        self.branch = Some(branch.to_string());
        self.team = Some(team);
    }

    /// Returns the item to the unclaimed state.
    pub fn release(&mut self) {
        self.selected = false;
        self.branch = None;
        self.team = None;
    }

    /// Whether the item is claimed by `branch`, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn claimed_by_ignore_case(&self, branch: &str) -> bool {
        self.selected
            && self
                .branch
                .as_deref()
                .is_some_and(|b| same_branch_ignore_case(b, branch))
    }
}

/// Case-insensitive branch comparison used by reset and listing operations.
///
/// Both sides are trimmed and upper-cased before comparing.
#[must_use]
pub fn same_branch_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_uppercase() == b.trim().to_uppercase()
}

/// A catalog record exactly as a store returned it.
///
/// Every field is an arbitrary JSON value because persisted rows drift: ids
/// arrive as numbers or strings, `selected` as booleans, numbers or strings,
/// and empty columns as `null`, `""`, or missing entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCatalogItem {
    /// Raw id
    #[serde(default)]
    pub id: Value,
    /// Raw name
    #[serde(default)]
    pub name: Value,
    /// Raw selected flag
    #[serde(default)]
    pub selected: Value,
    /// Raw branch
    #[serde(default)]
    pub branch: Value,
    /// Raw team
    #[serde(default)]
    pub team: Value,
}

impl From<&CatalogItem> for RawCatalogItem {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: Value::from(item.id.get()),
            name: Value::from(item.name.clone()),
            selected: Value::from(item.selected),
            branch: item.branch.clone().map_or(Value::Null, Value::from),
            team: item.team.map_or(Value::Null, |t| Value::from(t.as_str())),
        }
    }
}

// ============================================================================
// Submissions
// ============================================================================

/// Payload for appending a submission to the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    /// Trimmed branch name
    pub branch_name: String,
    /// Claimed team slot
    pub team: Team,
    /// Regular (non-custom) carols claimed
    pub carol_ids: Vec<CarolId>,
    /// Free-text substitute, if any
    pub custom_carol_text: Option<String>,
    /// Structured diagnostics attached to the submission
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

/// A recorded reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Log-assigned id
    pub id: i64,
    /// Branch name
    pub branch_name: String,
    /// Claimed team slot
    pub team: Team,
    /// Regular (non-custom) carols claimed
    pub carol_ids: Vec<CarolId>,
    /// Free-text substitute (display text only)
    pub custom_carol_text: Option<String>,
    /// Structured diagnostics
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Insert time
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Builds the stored record from an insert payload.
    #[must_use]
    pub fn from_new(id: i64, new: NewSubmission, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            branch_name: new.branch_name,
            team: new.team,
            carol_ids: new.carol_ids,
            custom_carol_text: new.custom_carol_text,
            diagnostics: new.diagnostics,
            submitted_at,
        }
    }
}
