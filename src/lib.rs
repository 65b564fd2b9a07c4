//! CrediCheck - community credibility ratings for websites
//!
//! Callers (identified by network address) vote up or down on a website's
//! domain. Each domain keeps a running tally of up and down votes, updated
//! by a delta rule in the same transaction as the vote itself, plus an
//! optional centrally assigned credibility score.
//!
//! ## Architecture
//!
//! - **db**: SQLite via Diesel and an r2d2 pool; one repository module per table
//! - **services**: vote orchestration, score write-once, demo seeding, events
//! - **http**: hyper server exposing the JSON API to the browser extension
//! - **client_gen**: renders the extension's JavaScript API client
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/credicheck/
//! ├── credicheck.db        # SQLite database (WAL mode)
//! └── config.toml          # Configuration
//! ```
//!
//! ## Invariants
//!
//! - A site exists if and only if its tally exists
//! - At most one vote per (user, site); a stored vote is never 0
//! - Each tally equals the count of matching votes in the ledger
//! - A credibility score is written at most once per site

pub mod api;
pub mod client_gen;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod services;

pub use config::Config;
pub use db::{CrediDb, DbOptions, Tally, VoteValue};
pub use error::CrediError;
pub use http::HttpServer;
pub use services::{
    CredibilityRating, DemoConfig, DemoSeeder, DomainRegistry, EventBus, ScoreService,
    Services, SiteSeeder, UserVote, VoteEvent, VoteService,
};
