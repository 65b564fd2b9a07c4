//! Credibility scores: centrally assigned, write-once per site

use diesel::prelude::*;

use super::diesel_schema::credibility_scores;
use super::models::{current_timestamp, CredibilityScore, NewCredibilityScore};
use super::sites::get_or_create_site;
use crate::error::CrediError;

/// Get the credibility score for a domain
pub fn get_score(
    conn: &mut SqliteConnection,
    domain: &str,
) -> Result<Option<CredibilityScore>, CrediError> {
    credibility_scores::table
        .find(domain)
        .select(CredibilityScore::as_select())
        .first(conn)
        .optional()
        .map_err(CrediError::from)
}

/// Set the credibility score for a domain.
///
/// Scores are write-once: a second write fails with `Conflict` and leaves
/// the first score untouched. Registers the site if it is new. Must run
/// inside a transaction.
pub fn create_score(
    conn: &mut SqliteConnection,
    domain: &str,
    score: f64,
) -> Result<CredibilityScore, CrediError> {
    if !score.is_finite() || score < 0.0 {
        return Err(CrediError::InvalidInput(format!(
            "Score must be a non-negative number, got {}",
            score
        )));
    }

    if get_score(conn, domain)?.is_some() {
        return Err(CrediError::Conflict(format!(
            "Credibility score already exists for domain: {}",
            domain
        )));
    }

    get_or_create_site(conn, domain)?;

    let now = current_timestamp();
    diesel::insert_into(credibility_scores::table)
        .values(&NewCredibilityScore {
            site_domain: domain,
            score,
            created_at: &now,
        })
        .execute(conn)?;

    Ok(CredibilityScore {
        site_domain: domain.to_string(),
        score,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sites::get_site;
    use crate::db::tallies::get_tally;
    use crate::db::test_connection;

    #[test]
    fn test_score_is_write_once() {
        let mut conn = test_connection();

        create_score(&mut conn, "news.example", 7.5).unwrap();
        let err = create_score(&mut conn, "news.example", 3.0).unwrap_err();
        assert!(matches!(err, CrediError::Conflict(_)));

        let score = get_score(&mut conn, "news.example").unwrap().unwrap();
        assert_eq!(score.score, 7.5);
    }

    #[test]
    fn test_score_registers_site_with_tally() {
        let mut conn = test_connection();
        create_score(&mut conn, "fresh.example", 1.0).unwrap();

        assert!(get_site(&mut conn, "fresh.example").unwrap().is_some());
        let tally = get_tally(&mut conn, "fresh.example").unwrap().unwrap();
        assert_eq!((tally.up_votes, tally.down_votes), (0, 0));
    }

    #[test]
    fn test_rejects_negative_and_non_finite() {
        let mut conn = test_connection();
        for bad in [-0.5, f64::NAN, f64::INFINITY] {
            let err = create_score(&mut conn, "bad.example", bad).unwrap_err();
            assert!(matches!(err, CrediError::InvalidInput(_)));
        }
        assert!(get_score(&mut conn, "bad.example").unwrap().is_none());
        assert!(get_site(&mut conn, "bad.example").unwrap().is_none());
    }
}
