//! Service layer for credicheck
//!
//! Services encapsulate business logic between HTTP handlers and repositories.
//! Each service wraps database operations with:
//! - Input validation
//! - Transaction boundaries
//! - Event emission after commit
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (vote orchestration, score write-once)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod demo;
pub mod events;
pub mod registry;
pub mod response;
pub mod score_service;
pub mod vote_service;

// Re-exports
pub use demo::{DemoConfig, DemoSeeder};
pub use events::{EventBus, EventListener, VoteEvent};
pub use registry::{DomainRegistry, SiteSeeder};
pub use score_service::{CredibilityRating, ScoreService};
pub use vote_service::{cast_vote_in, UserVote, VoteService, VoteTransition};

use crate::db::CrediDb;
use std::sync::Arc;

/// Service container for dependency injection
///
/// Holds all services with a shared database pool.
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub db: Arc<CrediDb>,
    pub votes: Arc<VoteService>,
    pub scores: Arc<ScoreService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with shared database
    pub fn new(db: Arc<CrediDb>) -> Self {
        Self::with_registry(db, DomainRegistry::new())
    }

    /// Create services that seed every new domain with demo data
    pub fn with_demo(db: Arc<CrediDb>, demo: DemoConfig) -> Self {
        let seeder: Arc<dyn SiteSeeder> = Arc::new(DemoSeeder::new(demo));
        Self::with_registry(db, DomainRegistry::with_seeder(seeder))
    }

    /// Create services around a custom registry
    pub fn with_registry(db: Arc<CrediDb>, registry: DomainRegistry) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            votes: Arc::new(VoteService::new(db.clone(), registry, events.clone())),
            scores: Arc::new(ScoreService::new(db.clone(), events.clone())),
            events,
            db,
        }
    }
}
