//! Tally aggregator: per-site up/down counters
//!
//! Counters only move through [`apply_delta`], which mirrors exactly one
//! ledger mutation. They are never recomputed by rescanning votes.

use diesel::prelude::*;

use super::diesel_schema::tallies;
use super::models::{Tally, VoteValue};
use crate::error::CrediError;

/// Counter adjustments for a single vote transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TallyDelta {
    pub up: i64,
    pub down: i64,
}

impl TallyDelta {
    /// Delta for moving one user's vote from `old` to `new`
    pub fn between(new: VoteValue, old: VoteValue) -> Self {
        let mut delta = TallyDelta::default();
        if new == old {
            return delta;
        }

        match old {
            VoteValue::Up => delta.up -= 1,
            VoteValue::Down => delta.down -= 1,
            VoteValue::Neutral => {}
        }
        match new {
            VoteValue::Up => delta.up += 1,
            VoteValue::Down => delta.down += 1,
            VoteValue::Neutral => {}
        }

        delta
    }

    pub fn is_zero(&self) -> bool {
        self.up == 0 && self.down == 0
    }
}

/// Get the tally for a domain
pub fn get_tally(conn: &mut SqliteConnection, domain: &str) -> Result<Option<Tally>, CrediError> {
    tallies::table
        .find(domain)
        .select(Tally::as_select())
        .first(conn)
        .optional()
        .map_err(CrediError::from)
}

/// List every tally, ordered by domain
pub fn list_tallies(conn: &mut SqliteConnection) -> Result<Vec<Tally>, CrediError> {
    tallies::table
        .select(Tally::as_select())
        .order(tallies::site_domain.asc())
        .load(conn)
        .map_err(CrediError::from)
}

/// Apply the delta for a vote moving from `old` to `new` on `domain`.
///
/// Fails with `Inconsistent` if the domain has no tally: every site is
/// created with one, so a missing tally means the pairing was broken.
pub fn apply_delta(
    conn: &mut SqliteConnection,
    domain: &str,
    new: VoteValue,
    old: VoteValue,
) -> Result<(), CrediError> {
    let delta = TallyDelta::between(new, old);
    if delta.is_zero() {
        return Ok(());
    }

    let updated = diesel::update(tallies::table.find(domain))
        .set((
            tallies::up_votes.eq(tallies::up_votes + delta.up),
            tallies::down_votes.eq(tallies::down_votes + delta.down),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(CrediError::Inconsistent(format!(
            "Tally not found for domain: {}",
            domain
        )));
    }

    Ok(())
}
