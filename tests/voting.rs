//! End-to-end voting scenarios against real SQLite databases

use std::sync::Arc;
use std::thread;

use credicheck::db::{self, sites, tallies, votes, CrediDb, DbOptions};
use credicheck::services::{DemoConfig, DemoSeeder, DomainRegistry, Services};
use credicheck::{CrediError, VoteValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn services() -> Services {
    Services::new(Arc::new(CrediDb::open_in_memory().unwrap()))
}

fn tally(services: &Services, domain: &str) -> (i64, i64) {
    let t = services.votes.get_tally(domain).unwrap();
    (t.up_votes, t.down_votes)
}

/// Every tally must equal a recount of the ledger, and never be negative
fn assert_tallies_match_ledger(db: &CrediDb) {
    db.with_conn(|conn| {
        for t in tallies::list_tallies(conn)? {
            let ups = votes::count_votes(conn, &t.site_domain, VoteValue::Up)?;
            let downs = votes::count_votes(conn, &t.site_domain, VoteValue::Down)?;
            assert!(t.up_votes >= 0 && t.down_votes >= 0, "{:?}", t);
            assert_eq!((t.up_votes, t.down_votes), (ups, downs), "{}", t.site_domain);
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn flip_then_withdraw_on_fresh_domain() {
    let services = services();

    assert!(services.votes.cast_vote("A", "example.com", 1).unwrap());
    assert_eq!(tally(&services, "example.com"), (1, 0));

    assert!(services.votes.cast_vote("A", "example.com", -1).unwrap());
    assert_eq!(tally(&services, "example.com"), (0, 1));

    assert!(services.votes.cast_vote("A", "example.com", 0).unwrap());
    assert_eq!(tally(&services, "example.com"), (0, 0));

    let record = services
        .db
        .with_conn(|conn| votes::get_vote(conn, "A", "example.com"))
        .unwrap();
    assert!(record.is_none());
}

#[test]
fn repeated_vote_is_a_no_op() {
    let services = services();

    assert!(services.votes.cast_vote("A", "example.com", 1).unwrap());
    assert!(!services.votes.cast_vote("A", "example.com", 1).unwrap());
    assert_eq!(tally(&services, "example.com"), (1, 0));
}

#[test]
fn removing_a_missing_vote_registers_nothing() {
    let services = services();

    assert!(!services.votes.remove_vote("A", "never-seen.example").unwrap());

    let site = services
        .db
        .with_conn(|conn| sites::get_site(conn, "never-seen.example"))
        .unwrap();
    assert!(site.is_none());
    assert_eq!(services.db.stats().unwrap().users, 0);
}

#[test]
fn score_is_write_once() {
    let services = services();

    services.scores.set_score("news.example", 7.5).unwrap();
    let err = services.scores.set_score("news.example", 3.0).unwrap_err();
    assert!(matches!(err, CrediError::Conflict(_)));
    assert_eq!(services.scores.get_score("news.example").unwrap(), Some(7.5));
}

#[test]
fn scores_and_votes_are_independent() {
    let services = services();

    services.scores.set_score("example.com", 2.0).unwrap();
    assert_eq!(tally(&services, "example.com"), (0, 0));

    services.votes.cast_vote("A", "example.com", -1).unwrap();
    assert_eq!(services.scores.get_score("example.com").unwrap(), Some(2.0));
}

#[test]
fn random_sequences_keep_tallies_consistent() {
    let services = services();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let users = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"];
    let domains = ["a.example", "b.example", "c.example"];

    for _ in 0..500 {
        let user = users[rng.gen_range(0..users.len())];
        let domain = domains[rng.gen_range(0..domains.len())];
        let value = rng.gen_range(-1i64..=1);

        let before = services.votes.get_vote_for_user(user, domain).unwrap();
        let changed = services.votes.cast_vote(user, domain, value).unwrap();
        assert_eq!(changed, before.as_i32() as i64 != value);
    }

    assert_tallies_match_ledger(&services.db);
}

#[test]
fn concurrent_votes_keep_tallies_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(CrediDb::open(dir.path(), &DbOptions::default()).unwrap());
    let services = Arc::new(Services::new(db.clone()));

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let services = services.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(t);
                for _ in 0..60 {
                    // Threads share users so the same (user, domain) races
                    let user = format!("10.0.1.{}", rng.gen_range(1..=4));
                    let domain = if rng.gen_bool(0.5) { "hot.example" } else { "cold.example" };
                    services
                        .votes
                        .cast_vote(&user, domain, rng.gen_range(-1i64..=1))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_tallies_match_ledger(&db);
}

#[test]
fn same_vote_from_many_threads_counts_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(CrediDb::open(dir.path(), &DbOptions::default()).unwrap());
    let services = Arc::new(Services::new(db.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = services.clone();
            thread::spawn(move || services.votes.cast_vote("10.0.2.1", "race.example", 1).unwrap())
        })
        .collect();

    let changed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|c| *c)
        .count();

    assert_eq!(changed, 1);
    let t = services.votes.get_tally("race.example").unwrap();
    assert_eq!((t.up_votes, t.down_votes), (1, 0));
}

#[test]
fn demo_seeding_on_first_vote() {
    let db = Arc::new(CrediDb::open_in_memory().unwrap());
    let seeder = Arc::new(DemoSeeder::with_seed(DemoConfig::default(), 1234));
    let services = Services::with_registry(db.clone(), DomainRegistry::with_seeder(seeder));

    // Real users vote from outside the seeded address range
    services.votes.cast_vote("10.0.0.1", "demo.example", 1).unwrap();

    let t = services.votes.get_tally("demo.example").unwrap();
    assert!(t.up_votes >= 1);
    assert_tallies_match_ledger(&db);

    let score = services.scores.get_score("demo.example").unwrap().unwrap();
    assert!((0.0..=10.0).contains(&score));

    // Only the first registration seeds
    let votes_before = db.stats().unwrap().votes;
    services.votes.cast_vote("10.0.0.2", "demo.example", -1).unwrap();
    assert_eq!(db.stats().unwrap().votes, votes_before + 1);
}

#[test]
fn withdrawal_never_triggers_seeding() {
    let db = Arc::new(CrediDb::open_in_memory().unwrap());
    let services = Services::with_demo(db.clone(), DemoConfig::default());

    assert!(!services.votes.remove_vote("10.0.0.1", "quiet.example").unwrap());
    assert_eq!(db.stats().unwrap().sites, 0);
}

#[test]
fn broken_pairing_is_reported_not_repaired() {
    let db = Arc::new(CrediDb::open_in_memory().unwrap());
    let services = Services::new(db.clone());

    services.votes.cast_vote("10.0.0.1", "example.com", 1).unwrap();
    db.with_conn(|conn| {
        use diesel::connection::SimpleConnection;
        conn.batch_execute(
            "PRAGMA foreign_keys = OFF; DELETE FROM tallies WHERE site_domain = 'example.com'; \
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    })
    .unwrap();

    let err = services.votes.cast_vote("10.0.0.2", "example.com", 1).unwrap_err();
    assert!(matches!(err, CrediError::Inconsistent(_)));

    let missing = db
        .with_conn(|conn| db::tallies::get_tally(conn, "example.com"))
        .unwrap();
    assert!(missing.is_none());
    assert!(!services.votes.user_exists("10.0.0.2").unwrap());
}
