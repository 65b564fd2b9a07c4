//! Vote service - the vote-cast orchestrator and vote/tally read paths
//!
//! A vote submission resolves the caller and the domain, reads the existing
//! ledger entry, mutates the ledger and applies the matching tally delta, all
//! in one `BEGIN IMMEDIATE` transaction. Read paths never create records.

use std::sync::Arc;

use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::{tallies, users, votes, CrediDb, Tally, VoteValue};
use crate::error::CrediError;

use super::events::{EventBus, VoteEvent};
use super::registry::DomainRegistry;

/// A committed change to one (user, domain) vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub from: VoteValue,
    pub to: VoteValue,
}

/// One of the caller's own votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserVote {
    pub site: String,
    #[ts(type = "-1 | 1")]
    pub value: VoteValue,
}

/// Cast a vote on an open connection.
///
/// Returns `None` when nothing changed. Callers own the transaction; the
/// HTTP path goes through [`VoteService::cast_vote`], the demo seeder calls
/// this directly from inside the registering transaction.
pub fn cast_vote_in(
    conn: &mut SqliteConnection,
    registry: &DomainRegistry,
    user_ip: &str,
    domain: &str,
    value: VoteValue,
) -> Result<Option<VoteTransition>, CrediError> {
    // Withdrawing a vote that does not exist materializes nothing
    if value.is_neutral() && votes::get_vote(conn, user_ip, domain)?.is_none() {
        return Ok(None);
    }

    users::get_or_create_user(conn, user_ip)?;
    registry.resolve(conn, domain)?;

    let old = match votes::get_vote(conn, user_ip, domain)? {
        Some(existing) => {
            let old = existing.vote_value()?;
            if old == value {
                return Ok(None);
            }
            if value.is_neutral() {
                votes::delete_vote(conn, user_ip, domain)?;
            } else {
                votes::update_vote(conn, user_ip, domain, value)?;
            }
            old
        }
        None => {
            if value.is_neutral() {
                return Ok(None);
            }
            votes::insert_vote(conn, user_ip, domain, value)?;
            VoteValue::Neutral
        }
    };

    tallies::apply_delta(conn, domain, value, old)?;

    Ok(Some(VoteTransition {
        from: old,
        to: value,
    }))
}

/// Vote service for casting votes and reading tallies
pub struct VoteService {
    db: Arc<CrediDb>,
    registry: DomainRegistry,
    events: Arc<EventBus>,
}

impl VoteService {
    /// Create a new vote service
    pub fn new(db: Arc<CrediDb>, registry: DomainRegistry, events: Arc<EventBus>) -> Self {
        Self {
            db,
            registry,
            events,
        }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Tally for a domain; zeros if the domain was never registered
    pub fn get_tally(&self, domain: &str) -> Result<Tally, CrediError> {
        validate_domain(domain)?;
        let tally = self.db.with_conn(|conn| tallies::get_tally(conn, domain))?;
        Ok(tally.unwrap_or_else(|| Tally::empty(domain)))
    }

    /// Every registered tally, ordered by domain
    pub fn list_tallies(&self) -> Result<Vec<Tally>, CrediError> {
        self.db.with_conn(tallies::list_tallies)
    }

    /// The caller's vote on a domain; `Neutral` if none
    pub fn get_vote_for_user(&self, user_ip: &str, domain: &str) -> Result<VoteValue, CrediError> {
        validate_user(user_ip)?;
        validate_domain(domain)?;

        match self.db.with_conn(|conn| votes::get_vote(conn, user_ip, domain))? {
            Some(vote) => vote.vote_value(),
            None => Ok(VoteValue::Neutral),
        }
    }

    /// Every vote the caller holds, ordered by domain
    pub fn list_votes_for_user(&self, user_ip: &str) -> Result<Vec<UserVote>, CrediError> {
        validate_user(user_ip)?;

        let rows = self
            .db
            .with_conn(|conn| votes::list_votes_for_user(conn, user_ip))?;
        rows.into_iter()
            .map(|vote| {
                Ok(UserVote {
                    value: vote.vote_value()?,
                    site: vote.site_domain,
                })
            })
            .collect()
    }

    /// Whether the caller has ever been recorded
    pub fn user_exists(&self, user_ip: &str) -> Result<bool, CrediError> {
        validate_user(user_ip)?;
        Ok(self
            .db
            .with_conn(|conn| users::get_user(conn, user_ip))?
            .is_some())
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Cast a raw integer vote. Values outside -1, 0 and 1 are rejected.
    pub fn cast_vote(&self, user_ip: &str, domain: &str, value: i64) -> Result<bool, CrediError> {
        let value = VoteValue::try_from(value)?;
        self.cast(user_ip, domain, value)
    }

    /// Withdraw the caller's vote on a domain
    pub fn remove_vote(&self, user_ip: &str, domain: &str) -> Result<bool, CrediError> {
        self.cast(user_ip, domain, VoteValue::Neutral)
    }

    /// Cast a vote. Returns true if the ledger and tally changed.
    pub fn cast(&self, user_ip: &str, domain: &str, value: VoteValue) -> Result<bool, CrediError> {
        validate_user(user_ip)?;
        validate_domain(domain)?;

        let transition = self
            .db
            .transaction(|conn| cast_vote_in(conn, &self.registry, user_ip, domain, value))?;

        match transition {
            Some(VoteTransition { from, to }) => {
                self.events
                    .emit(VoteEvent::for_transition(user_ip, domain, from, to));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn validate_user(user_ip: &str) -> Result<(), CrediError> {
    if user_ip.trim().is_empty() {
        return Err(CrediError::Unauthorized(
            "Could not determine client address".into(),
        ));
    }
    if user_ip.len() > 45 {
        return Err(CrediError::InvalidInput(format!(
            "Client address too long: {}",
            user_ip
        )));
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), CrediError> {
    if domain.trim().is_empty() {
        return Err(CrediError::InvalidInput("Domain must not be empty".into()));
    }
    Ok(())
}
