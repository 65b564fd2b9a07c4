//! SQLite database module for ratings storage
//!
//! Every record lives in SQLite; there is no in-process cache. Connections
//! come from an r2d2 pool that is built once at startup and injected into
//! the services.
//!
//! ## Tables
//!
//! - `users` - Callers keyed by network address
//! - `sites` - Rated domains
//! - `tallies` - Up/down counters, exactly one per site
//! - `votes` - Ledger of per-(user, site) votes, values -1 or 1 only
//! - `credibility_scores` - Write-once central scores

pub mod diesel_schema;
pub mod models;
pub mod schema;
pub mod scores;
pub mod sites;
pub mod tallies;
pub mod users;
pub mod votes;

use std::path::Path;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use tracing::{debug, info};

use crate::error::CrediError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database file name inside the storage directory
pub const DB_FILE_NAME: &str = "credicheck.db";

/// Pool tuning
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub pool_size: u32,
    /// How long a writer waits for the SQLite write lock before failing
    pub busy_timeout_ms: u64,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Per-connection pragmas, applied whenever the pool opens a connection
#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout_ms: u64,
    wal: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        apply_pragmas(conn, self.busy_timeout_ms, self.wal).map_err(diesel::r2d2::Error::QueryError)
    }
}

fn apply_pragmas(
    conn: &mut SqliteConnection,
    busy_timeout_ms: u64,
    wal: bool,
) -> Result<(), diesel::result::Error> {
    conn.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
        busy_timeout_ms
    ))?;
    if wal {
        // WAL lets readers proceed while a vote transaction holds the write lock
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    }
    Ok(())
}

/// Pooled SQLite database for users, sites, tallies, votes and scores
pub struct CrediDb {
    pool: DbPool,
}

impl CrediDb {
    /// Open or create the database in `storage_dir`
    pub fn open(storage_dir: &Path, options: &DbOptions) -> Result<Self, CrediError> {
        let db_path = storage_dir.join(DB_FILE_NAME);
        info!("Opening SQLite database at {:?}", db_path);

        let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
        let pool = Pool::builder()
            .max_size(options.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionPragmas {
                busy_timeout_ms: options.busy_timeout_ms,
                wal: true,
            }))
            .build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    ///
    /// Each `:memory:` connection is a separate database, so the pool holds
    /// exactly one connection and never recycles it.
    pub fn open_in_memory() -> Result<Self, CrediError> {
        debug!("Opening in-memory SQLite database");

        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(ConnectionPragmas {
                busy_timeout_ms: DbOptions::default().busy_timeout_ms,
                wal: false,
            }))
            .build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), CrediError> {
        let mut conn = self.conn()?;
        schema::init_schema(&mut conn)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<PooledConn, CrediError> {
        self.pool.get().map_err(CrediError::from)
    }

    /// Run a read (or single-statement write) on a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, CrediError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, CrediError>,
    {
        let mut conn = self.conn()?;
        f(&mut *conn)
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so two transactions can never both
    /// read the same pre-mutation state. Any error rolls back every write.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, CrediError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, CrediError>,
    {
        let mut conn = self.conn()?;
        conn.immediate_transaction(f)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, CrediError> {
        use self::diesel_schema::{credibility_scores, sites, users, votes};

        self.with_conn(|conn| {
            Ok(DbStats {
                users: users::table.count().get_result::<i64>(conn)? as u64,
                sites: sites::table.count().get_result::<i64>(conn)? as u64,
                votes: votes::table.count().get_result::<i64>(conn)? as u64,
                scores: credibility_scores::table.count().get_result::<i64>(conn)? as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub users: u64,
    pub sites: u64,
    pub votes: u64,
    pub scores: u64,
}

/// Standalone in-memory connection with the full schema
#[cfg(test)]
pub(crate) fn test_connection() -> SqliteConnection {
    let mut conn =
        SqliteConnection::establish(":memory:").expect("Failed to create in-memory database");
    apply_pragmas(&mut conn, 1_000, false).expect("Failed to set pragmas");
    schema::init_schema(&mut conn).expect("Failed to create schema");
    conn
}

// Re-exports
pub use models::{CredibilityScore, Site, Tally, User, Vote, VoteValue};
pub use sites::ResolvedSite;
pub use tallies::TallyDelta;
