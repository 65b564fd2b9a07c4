//! Demo seeding - fills newly registered sites with fake community data
//!
//! Enabled with `demo_mode`. Each new domain gets a random batch of votes
//! from addresses in 192.168.1.0/24 and a random credibility score. Votes go
//! through the same orchestrator as real ones, so the tally matches the
//! ledger afterwards.

use std::sync::Mutex;

use diesel::SqliteConnection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::db::{scores, VoteValue};
use crate::error::CrediError;

use super::registry::{DomainRegistry, SiteSeeder};
use super::vote_service::cast_vote_in;

/// Bounds for generated demo data
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub votes_min: u32,
    pub votes_max: u32,
    pub score_max: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            votes_min: 5,
            votes_max: 20,
            score_max: 10.0,
        }
    }
}

/// Seeder that generates random votes and a score
pub struct DemoSeeder {
    config: DemoConfig,
    rng: Mutex<StdRng>,
}

impl DemoSeeder {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeder with a fixed RNG seed, for reproducible data
    pub fn with_seed(config: DemoConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SiteSeeder for DemoSeeder {
    fn seed(&self, conn: &mut SqliteConnection, domain: &str) -> Result<(), CrediError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| CrediError::Internal(format!("Demo RNG lock poisoned: {}", e)))?;

        let (min, max) = (self.config.votes_min, self.config.votes_min.max(self.config.votes_max));
        let count = rng.gen_range(min..=max);

        // The site already exists, so a plain registry never re-enters the seeder
        let registry = DomainRegistry::new();
        for _ in 0..count {
            let user = format!("192.168.1.{}", rng.gen_range(1..=254));
            let value = if rng.gen_bool(0.5) {
                VoteValue::Up
            } else {
                VoteValue::Down
            };
            cast_vote_in(conn, &registry, &user, domain, value)?;
        }

        let raw: f64 = rng.gen_range(0.0..=self.config.score_max.max(0.0));
        let score = (raw * 10.0).round() / 10.0;
        if scores::get_score(conn, domain)?.is_none() {
            scores::create_score(conn, domain, score)?;
        }

        debug!(domain = %domain, votes = count, score = score, "Seeded demo data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{tallies, test_connection, votes};

    #[test]
    fn test_seeded_site_is_consistent() {
        let mut conn = test_connection();
        let registry = DomainRegistry::with_seeder(std::sync::Arc::new(DemoSeeder::with_seed(
            DemoConfig::default(),
            42,
        )));

        registry.resolve(&mut conn, "demo.example").unwrap();

        let tally = tallies::get_tally(&mut conn, "demo.example").unwrap().unwrap();
        let ups = votes::count_votes(&mut conn, "demo.example", VoteValue::Up).unwrap();
        let downs = votes::count_votes(&mut conn, "demo.example", VoteValue::Down).unwrap();
        assert_eq!((tally.up_votes, tally.down_votes), (ups, downs));

        // Repeated addresses collapse, so there are at most `votes_max` rows
        assert!(ups + downs >= 1 && ups + downs <= 20);

        let score = scores::get_score(&mut conn, "demo.example").unwrap().unwrap();
        assert!((0.0..=10.0).contains(&score.score));
        assert_eq!((score.score * 10.0).round() / 10.0, score.score);
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let mut conn = test_connection();
        let seeder = DemoSeeder::with_seed(
            DemoConfig {
                votes_min: 3,
                votes_max: 1,
                score_max: 5.0,
            },
            7,
        );
        crate::db::sites::get_or_create_site(&mut conn, "x.example").unwrap();
        seeder.seed(&mut conn, "x.example").unwrap();
    }
}
