//! Domain registry: sites and their paired tallies
//!
//! A site row exists if and only if its tally row exists. Both are created in
//! the same statement sequence, and a half-present pair is reported as
//! `CrediError::Inconsistent` rather than repaired.

use diesel::prelude::*;

use super::diesel_schema::{sites, tallies};
use super::models::{current_timestamp, NewSite, NewTally, Site, Tally};
use super::tallies::get_tally;
use crate::error::CrediError;

/// Result of resolving a domain
#[derive(Debug, Clone)]
pub struct ResolvedSite {
    pub site: Site,
    pub tally: Tally,
    /// True if this call created the site/tally pair
    pub created: bool,
}

/// Get a site by domain
pub fn get_site(conn: &mut SqliteConnection, domain: &str) -> Result<Option<Site>, CrediError> {
    sites::table
        .find(domain)
        .select(Site::as_select())
        .first(conn)
        .optional()
        .map_err(CrediError::from)
}

/// Get a site and its tally, creating both on first reference.
///
/// Must run inside a transaction so the pair is written atomically.
pub fn get_or_create_site(
    conn: &mut SqliteConnection,
    domain: &str,
) -> Result<ResolvedSite, CrediError> {
    let site = get_site(conn, domain)?;
    let tally = get_tally(conn, domain)?;

    match (site, tally) {
        (Some(site), Some(tally)) => Ok(ResolvedSite {
            site,
            tally,
            created: false,
        }),
        (None, None) => {
            let now = current_timestamp();
            diesel::insert_into(sites::table)
                .values(&NewSite {
                    domain,
                    created_at: &now,
                })
                .execute(conn)?;
            diesel::insert_into(tallies::table)
                .values(&NewTally {
                    site_domain: domain,
                    up_votes: 0,
                    down_votes: 0,
                })
                .execute(conn)?;

            Ok(ResolvedSite {
                site: Site {
                    domain: domain.to_string(),
                    created_at: now,
                },
                tally: Tally::empty(domain),
                created: true,
            })
        }
        (Some(_), None) => Err(CrediError::Inconsistent(format!(
            "Site {} exists without a tally",
            domain
        ))),
        (None, Some(_)) => Err(CrediError::Inconsistent(format!(
            "Tally for {} exists without a site",
            domain
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn test_creates_pair_on_first_reference() {
        let mut conn = test_connection();

        let resolved = get_or_create_site(&mut conn, "example.com").unwrap();
        assert!(resolved.created);
        assert_eq!(resolved.site.domain, "example.com");
        assert_eq!(resolved.tally, Tally::empty("example.com"));

        let again = get_or_create_site(&mut conn, "example.com").unwrap();
        assert!(!again.created);
        assert_eq!(again.site.created_at, resolved.site.created_at);
    }

    #[test]
    fn test_site_without_tally_is_fatal() {
        let mut conn = test_connection();
        diesel::insert_into(sites::table)
            .values(&NewSite {
                domain: "orphan.org",
                created_at: "2024-01-01T00:00:00.000Z",
            })
            .execute(&mut conn)
            .unwrap();

        let err = get_or_create_site(&mut conn, "orphan.org").unwrap_err();
        assert!(matches!(err, CrediError::Inconsistent(_)));

        // Not repaired
        assert!(get_tally(&mut conn, "orphan.org").unwrap().is_none());
    }

    #[test]
    fn test_tally_without_site_is_fatal() {
        let mut conn = test_connection();
        // The FK guard has to be off to fabricate this state
        diesel::sql_query("PRAGMA foreign_keys = OFF")
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(tallies::table)
            .values(&NewTally {
                site_domain: "ghost.net",
                up_votes: 0,
                down_votes: 0,
            })
            .execute(&mut conn)
            .unwrap();

        let err = get_or_create_site(&mut conn, "ghost.net").unwrap_err();
        assert!(matches!(err, CrediError::Inconsistent(_)));
        assert!(get_site(&mut conn, "ghost.net").unwrap().is_none());
    }
}
