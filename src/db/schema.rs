//! Database schema definitions

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use tracing::info;

use crate::error::CrediError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

#[derive(QueryableByName)]
struct VersionRow {
    #[diesel(sql_type = Integer)]
    version: i32,
}

/// Initialize the database schema
pub fn init_schema(conn: &mut SqliteConnection) -> Result<(), CrediError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.batch_execute(RATINGS_SCHEMA)
            .map_err(|e| CrediError::Internal(format!("Failed to create rating tables: {}", e)))?;
        conn.batch_execute(INDEXES_SCHEMA)
            .map_err(|e| CrediError::Internal(format!("Failed to create indexes: {}", e)))?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &mut SqliteConnection) -> Result<i32, CrediError> {
    conn.batch_execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .map_err(|e| CrediError::Internal(format!("Failed to create schema_version table: {}", e)))?;

    let row: Option<VersionRow> = diesel::sql_query("SELECT version FROM schema_version LIMIT 1")
        .get_result(conn)
        .optional()?;

    Ok(row.map(|r| r.version).unwrap_or(0))
}

fn set_schema_version(conn: &mut SqliteConnection, version: i32) -> Result<(), CrediError> {
    diesel::sql_query("DELETE FROM schema_version").execute(conn)?;
    diesel::sql_query("INSERT INTO schema_version (version) VALUES (?)")
        .bind::<Integer, _>(version)
        .execute(conn)?;
    Ok(())
}

/// Users, sites, tallies, votes and credibility scores.
///
/// Votes never store 0: withdrawing a vote deletes the row.
pub const RATINGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    ip TEXT PRIMARY KEY NOT NULL CHECK (length(ip) BETWEEN 1 AND 45),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sites (
    domain TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tallies (
    site_domain TEXT PRIMARY KEY NOT NULL REFERENCES sites(domain),
    up_votes INTEGER NOT NULL DEFAULT 0 CHECK (up_votes >= 0),
    down_votes INTEGER NOT NULL DEFAULT 0 CHECK (down_votes >= 0)
);

CREATE TABLE IF NOT EXISTS votes (
    user_ip TEXT NOT NULL REFERENCES users(ip),
    site_domain TEXT NOT NULL REFERENCES sites(domain),
    value INTEGER NOT NULL CHECK (value IN (-1, 1)),
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_ip, site_domain)
);

CREATE TABLE IF NOT EXISTS credibility_scores (
    site_domain TEXT PRIMARY KEY NOT NULL REFERENCES sites(domain),
    score REAL NOT NULL CHECK (score >= 0),
    created_at TEXT NOT NULL
);
"#;

pub const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_votes_site ON votes(site_domain);
CREATE INDEX IF NOT EXISTS idx_votes_user ON votes(user_ip);
"#;
