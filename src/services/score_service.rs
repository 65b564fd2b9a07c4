//! Score service - centrally assigned credibility scores
//!
//! Scores are independent of community voting and write-once per domain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::{scores, CrediDb};
use crate::error::CrediError;

use super::events::{EventBus, VoteEvent};

/// Credibility score of a site; `score` is null when none was assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CredibilityRating {
    pub site: String,
    pub score: Option<f64>,
}

/// Score service for reading and assigning credibility scores
pub struct ScoreService {
    db: Arc<CrediDb>,
    events: Arc<EventBus>,
}

impl ScoreService {
    /// Create a new score service
    pub fn new(db: Arc<CrediDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Score for a domain, if one was assigned
    pub fn get_score(&self, domain: &str) -> Result<Option<f64>, CrediError> {
        let row = self.db.with_conn(|conn| scores::get_score(conn, domain))?;
        Ok(row.map(|s| s.score))
    }

    /// Score wrapped for the wire
    pub fn get_rating(&self, domain: &str) -> Result<CredibilityRating, CrediError> {
        Ok(CredibilityRating {
            site: domain.to_string(),
            score: self.get_score(domain)?,
        })
    }

    /// Assign the score for a domain. Fails with `Conflict` if one exists.
    ///
    /// Registers the domain (with an empty tally) if it is new. Demo
    /// seeding is not triggered here, since a seeded score would collide
    /// with the one being written.
    pub fn set_score(&self, domain: &str, score: f64) -> Result<CredibilityRating, CrediError> {
        if domain.trim().is_empty() {
            return Err(CrediError::InvalidInput("Domain must not be empty".into()));
        }

        let created = self
            .db
            .transaction(|conn| scores::create_score(conn, domain, score))?;

        self.events.emit(VoteEvent::ScoreSet {
            domain: created.site_domain.clone(),
            score: created.score,
        });

        Ok(CredibilityRating {
            site: created.site_domain,
            score: Some(created.score),
        })
    }
}
