//! Event system for vote and score operations
//!
//! Services publish an event after each committed mutation. Events are
//! in-process notifications for audit logging, never persisted history.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::db::VoteValue;

/// Events emitted by services after commit
#[derive(Debug, Clone)]
pub enum VoteEvent {
    /// A user voted on a domain they had not voted on before
    VoteCast {
        user: String,
        domain: String,
        value: VoteValue,
    },
    /// A user flipped an existing vote
    VoteChanged {
        user: String,
        domain: String,
        from: VoteValue,
        to: VoteValue,
    },
    /// A user withdrew a vote (cast 0)
    VoteWithdrawn {
        user: String,
        domain: String,
        previous: VoteValue,
    },
    /// A credibility score was assigned
    ScoreSet {
        domain: String,
        score: f64,
    },
}

impl VoteEvent {
    /// Build the event for a committed vote transition
    pub fn for_transition(user: &str, domain: &str, from: VoteValue, to: VoteValue) -> Self {
        let (user, domain) = (user.to_string(), domain.to_string());
        if from.is_neutral() {
            VoteEvent::VoteCast {
                user,
                domain,
                value: to,
            }
        } else if to.is_neutral() {
            VoteEvent::VoteWithdrawn {
                user,
                domain,
                previous: from,
            }
        } else {
            VoteEvent::VoteChanged {
                user,
                domain,
                from,
                to,
            }
        }
    }
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &VoteEvent);
}

/// Event bus for broadcasting vote events
pub struct EventBus {
    sender: broadcast::Sender<VoteEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: VoteEvent) {
        trace!(event = ?event, "Emitting vote event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<VoteEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &VoteEvent) {
        match event {
            VoteEvent::VoteCast { user, domain, value } => {
                debug!(user = %user, domain = %domain, value = %value, "Vote cast");
            }
            VoteEvent::VoteChanged {
                user,
                domain,
                from,
                to,
            } => {
                debug!(user = %user, domain = %domain, from = %from, to = %to, "Vote changed");
            }
            VoteEvent::VoteWithdrawn {
                user,
                domain,
                previous,
            } => {
                debug!(user = %user, domain = %domain, previous = %previous, "Vote withdrawn");
            }
            VoteEvent::ScoreSet { domain, score } => {
                debug!(domain = %domain, score = score, "Credibility score set");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(VoteEvent::ScoreSet {
            domain: "example.com".into(),
            score: 7.5,
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            VoteEvent::ScoreSet { domain, score } => {
                assert_eq!(domain, "example.com");
                assert_eq!(score, 7.5);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        // Should not panic even with no subscribers
        bus.emit(VoteEvent::for_transition(
            "10.0.0.1",
            "example.com",
            VoteValue::Neutral,
            VoteValue::Up,
        ));
    }

    #[test]
    fn test_transition_event_kinds() {
        use VoteValue::{Down, Neutral, Up};

        assert!(matches!(
            VoteEvent::for_transition("u", "d", Neutral, Down),
            VoteEvent::VoteCast { value: Down, .. }
        ));
        assert!(matches!(
            VoteEvent::for_transition("u", "d", Up, Neutral),
            VoteEvent::VoteWithdrawn { previous: Up, .. }
        ));
        assert!(matches!(
            VoteEvent::for_transition("u", "d", Up, Down),
            VoteEvent::VoteChanged { from: Up, to: Down, .. }
        ));
    }
}
