//! Vote ledger: at most one vote per (user, site)

use diesel::prelude::*;

use super::diesel_schema::votes;
use super::models::{current_timestamp, NewVote, Vote, VoteValue};
use crate::error::CrediError;

/// Get the vote a user cast on a domain
pub fn get_vote(
    conn: &mut SqliteConnection,
    user_ip: &str,
    domain: &str,
) -> Result<Option<Vote>, CrediError> {
    votes::table
        .find((user_ip, domain))
        .select(Vote::as_select())
        .first(conn)
        .optional()
        .map_err(CrediError::from)
}

/// List all votes cast by a user, ordered by domain
pub fn list_votes_for_user(
    conn: &mut SqliteConnection,
    user_ip: &str,
) -> Result<Vec<Vote>, CrediError> {
    votes::table
        .filter(votes::user_ip.eq(user_ip))
        .select(Vote::as_select())
        .order(votes::site_domain.asc())
        .load(conn)
        .map_err(CrediError::from)
}

/// List all votes on a domain
pub fn list_votes_for_site(
    conn: &mut SqliteConnection,
    domain: &str,
) -> Result<Vec<Vote>, CrediError> {
    votes::table
        .filter(votes::site_domain.eq(domain))
        .select(Vote::as_select())
        .order(votes::user_ip.asc())
        .load(conn)
        .map_err(CrediError::from)
}

/// Insert a new vote. Neutral values are rejected: "no vote" has no row.
pub fn insert_vote(
    conn: &mut SqliteConnection,
    user_ip: &str,
    domain: &str,
    value: VoteValue,
) -> Result<(), CrediError> {
    if value.is_neutral() {
        return Err(CrediError::InvalidInput(
            "Neutral votes are withdrawals, not ledger entries".into(),
        ));
    }

    let now = current_timestamp();
    diesel::insert_into(votes::table)
        .values(&NewVote {
            user_ip,
            site_domain: domain,
            value: value.as_i32(),
            updated_at: &now,
        })
        .execute(conn)?;

    Ok(())
}

/// Change the value of an existing vote and refresh its timestamp
pub fn update_vote(
    conn: &mut SqliteConnection,
    user_ip: &str,
    domain: &str,
    value: VoteValue,
) -> Result<(), CrediError> {
    if value.is_neutral() {
        return Err(CrediError::InvalidInput(
            "Neutral votes are withdrawals, not ledger entries".into(),
        ));
    }

    let updated = diesel::update(votes::table.find((user_ip, domain)))
        .set((
            votes::value.eq(value.as_i32()),
            votes::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(CrediError::NotFound(format!(
            "No vote by {} on {}",
            user_ip, domain
        )));
    }

    Ok(())
}

/// Delete a vote. Returns true if a row was removed.
pub fn delete_vote(
    conn: &mut SqliteConnection,
    user_ip: &str,
    domain: &str,
) -> Result<bool, CrediError> {
    let deleted = diesel::delete(votes::table.find((user_ip, domain))).execute(conn)?;
    Ok(deleted > 0)
}

/// Count votes on a domain with the given value
pub fn count_votes(
    conn: &mut SqliteConnection,
    domain: &str,
    value: VoteValue,
) -> Result<i64, CrediError> {
    votes::table
        .filter(votes::site_domain.eq(domain))
        .filter(votes::value.eq(value.as_i32()))
        .count()
        .get_result(conn)
        .map_err(CrediError::from)
}
