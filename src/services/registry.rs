//! Domain registry - resolves domains to their site/tally pair
//!
//! Wraps `db::sites` with the demo-seeding hook. A seeder runs only when a
//! domain is registered for the first time, on the same connection and
//! inside the caller's transaction.

use std::sync::Arc;

use diesel::SqliteConnection;
use tracing::debug;

use crate::db::{sites, tallies, ResolvedSite};
use crate::error::CrediError;

/// Hook invoked when a domain is registered for the first time
pub trait SiteSeeder: Send + Sync {
    /// Populate a freshly created site. Runs inside the registering
    /// transaction, so a failure rolls the registration back too.
    fn seed(&self, conn: &mut SqliteConnection, domain: &str) -> Result<(), CrediError>;
}

/// Registry of rated domains
#[derive(Default, Clone)]
pub struct DomainRegistry {
    seeder: Option<Arc<dyn SiteSeeder>>,
}

impl DomainRegistry {
    /// Registry without a seeder
    pub fn new() -> Self {
        Self { seeder: None }
    }

    /// Registry that seeds every newly registered domain
    pub fn with_seeder(seeder: Arc<dyn SiteSeeder>) -> Self {
        Self {
            seeder: Some(seeder),
        }
    }

    pub fn is_seeding(&self) -> bool {
        self.seeder.is_some()
    }

    /// Resolve a domain to its site and tally, creating both if new.
    ///
    /// The returned tally reflects any votes added by the seeder.
    pub fn resolve(
        &self,
        conn: &mut SqliteConnection,
        domain: &str,
    ) -> Result<ResolvedSite, CrediError> {
        let mut resolved = sites::get_or_create_site(conn, domain)?;
        if !resolved.created {
            return Ok(resolved);
        }

        debug!(domain = %domain, "Registered new site");

        if let Some(seeder) = &self.seeder {
            seeder.seed(conn, domain)?;
            resolved.tally = tallies::get_tally(conn, domain)?.ok_or_else(|| {
                CrediError::Inconsistent(format!("Tally vanished while seeding {}", domain))
            })?;
        }

        Ok(resolved)
    }
}

impl std::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("seeding", &self.is_seeding())
            .finish()
    }
}
