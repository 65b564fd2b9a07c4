//! Diesel model definitions for database tables
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable structs: for INSERT queries (writing data)
//!
//! TypeScript types are auto-generated via ts-rs. Run:
//!   cargo test export_bindings
//! Generated files go to: bindings/

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::diesel_schema::*;
use crate::error::CrediError;

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Get current UTC timestamp as ISO 8601 string for SQLite TEXT columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

// ============================================================================
// Vote Values
// ============================================================================

/// A vote as submitted by a caller.
///
/// `Neutral` is the wire value `0` and means "no vote": it is never stored.
/// Casting `Neutral` withdraws an existing vote by deleting its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i64")]
pub enum VoteValue {
    Down,
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i32(self) -> i32 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == VoteValue::Neutral
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = CrediError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            other => Err(CrediError::InvalidInput(format!(
                "Invalid vote value: {} (expected -1, 0 or 1)",
                other
            ))),
        }
    }
}

impl From<VoteValue> for i32 {
    fn from(value: VoteValue) -> Self {
        value.as_i32()
    }
}

impl std::fmt::Display for VoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

// ============================================================================
// User Models
// ============================================================================

/// A caller, keyed by network address
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub ip: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub ip: &'a str,
    pub created_at: &'a str,
}

// ============================================================================
// Site Models
// ============================================================================

/// A rated website, keyed by domain name
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sites)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Site {
    pub domain: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sites)]
pub struct NewSite<'a> {
    pub domain: &'a str,
    pub created_at: &'a str,
}

// ============================================================================
// Tally Models
// ============================================================================

/// Cumulative community votes for a site (API response as-is)
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize, TS)]
#[diesel(table_name = tallies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Tally {
    #[serde(rename = "site")]
    pub site_domain: String,
    #[ts(type = "number")]
    pub up_votes: i64,
    #[ts(type = "number")]
    pub down_votes: i64,
}

impl Tally {
    /// Zero tally for a domain that has never been voted on
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            site_domain: domain.into(),
            up_votes: 0,
            down_votes: 0,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tallies)]
pub struct NewTally<'a> {
    pub site_domain: &'a str,
    pub up_votes: i64,
    pub down_votes: i64,
}

// ============================================================================
// Vote Models
// ============================================================================

/// A stored ledger entry. `value` is always -1 or 1.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = votes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Vote {
    pub user_ip: String,
    pub site_domain: String,
    pub value: i32,
    pub updated_at: String,
}

impl Vote {
    /// Decode the stored value. A stored 0 means the ledger was written
    /// around the orchestrator.
    pub fn vote_value(&self) -> Result<VoteValue, CrediError> {
        match VoteValue::try_from(i64::from(self.value))? {
            VoteValue::Neutral => Err(CrediError::Inconsistent(format!(
                "Stored neutral vote for ({}, {})",
                self.user_ip, self.site_domain
            ))),
            value => Ok(value),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub struct NewVote<'a> {
    pub user_ip: &'a str,
    pub site_domain: &'a str,
    pub value: i32,
    pub updated_at: &'a str,
}

// ============================================================================
// Credibility Score Models
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = credibility_scores)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CredibilityScore {
    pub site_domain: String,
    pub score: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credibility_scores)]
pub struct NewCredibilityScore<'a> {
    pub site_domain: &'a str,
    pub score: f64,
    pub created_at: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_value_from_wire() {
        assert_eq!(VoteValue::try_from(-1i64).unwrap(), VoteValue::Down);
        assert_eq!(VoteValue::try_from(0i64).unwrap(), VoteValue::Neutral);
        assert_eq!(VoteValue::try_from(1i64).unwrap(), VoteValue::Up);
    }

    #[test]
    fn test_vote_value_rejects_out_of_range() {
        for bad in [-2, 2, 5, i64::MIN, i64::MAX] {
            assert!(matches!(
                VoteValue::try_from(bad),
                Err(CrediError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_vote_value_serde() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).unwrap(), "-1");
        let up: VoteValue = serde_json::from_str("1").unwrap();
        assert_eq!(up, VoteValue::Up);
        assert!(serde_json::from_str::<VoteValue>("3").is_err());
    }

    #[test]
    fn test_stored_neutral_vote_is_inconsistent() {
        let vote = Vote {
            user_ip: "10.0.0.1".into(),
            site_domain: "example.com".into(),
            value: 0,
            updated_at: current_timestamp(),
        };
        assert!(matches!(vote.vote_value(), Err(CrediError::Inconsistent(_))));
    }

    #[test]
    fn test_tally_serializes_site_key() {
        let json = serde_json::to_value(Tally::empty("example.com")).unwrap();
        assert_eq!(json["site"], "example.com");
        assert_eq!(json["up_votes"], 0);
        assert_eq!(json["down_votes"], 0);
    }
}
