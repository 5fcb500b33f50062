//! External ticket fetch: the tracker client trait, a canned mock, and the
//! supersession guard that discards stale in-flight fetches.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::entity::Priority;
use crate::error::{CaseforgeError, Result};
use crate::generation::GenerationInput;
use crate::ticket::{Ticket, TicketKey};

/// Read-only client for the external ticket tracker.
#[async_trait]
pub trait IntegrationClient: Send + Sync {
    /// Fails with `NotFound` for an unknown key. Key grammar is enforced by
    /// the `TicketKey` type before any call can be made.
    async fn fetch_ticket(&self, key: &TicketKey) -> Result<Ticket>;
}

/// Build a generation input bundle from a fetched ticket.
pub fn input_from_ticket(ticket: &Ticket) -> GenerationInput {
    GenerationInput {
        feature_description: if ticket.description.trim().is_empty() {
            ticket.summary.clone()
        } else {
            format!("{}\n{}", ticket.summary, ticket.description)
        },
        acceptance_criteria: ticket.acceptance_criteria.join("\n"),
        extra_context: None,
        priority: ticket
            .priority
            .as_deref()
            .and_then(|p| p.parse::<Priority>().ok()),
        tags: Vec::new(),
        ticket_key: Some(ticket.key.clone()),
    }
}

/// In-process stand-in for the tracker, seeded with fixture tickets.
pub struct MockJira {
    tickets: HashMap<TicketKey, Ticket>,
}

impl MockJira {
    pub fn new() -> Self {
        Self {
            tickets: HashMap::new(),
        }
    }

    /// A client pre-loaded with the demo fixtures.
    pub fn with_fixtures() -> Self {
        let mut client = Self::new();
        client.insert(Ticket {
            key: "PROJ-101".parse().expect("fixture key"),
            summary: "User login".to_string(),
            description: "Registered users sign in with email and password".to_string(),
            acceptance_criteria: vec![
                "Valid credentials open the dashboard".to_string(),
                "Invalid credentials show an error".to_string(),
            ],
            status: "In Progress".to_string(),
            priority: Some("high".to_string()),
            assignee: Some("dana".to_string()),
            reporter: Some("sam".to_string()),
        });
        client.insert(Ticket {
            key: "PROJ-202".parse().expect("fixture key"),
            summary: "Checkout flow".to_string(),
            description: "Customers complete a purchase from the cart".to_string(),
            acceptance_criteria: vec![
                "Payment is captured".to_string(),
                "An order confirmation is shown".to_string(),
            ],
            status: "Open".to_string(),
            priority: Some("critical".to_string()),
            assignee: None,
            reporter: Some("sam".to_string()),
        });
        client
    }

    pub fn insert(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket.key.clone(), ticket);
    }
}

impl Default for MockJira {
    fn default() -> Self {
        Self::with_fixtures()
    }
}

#[async_trait]
impl IntegrationClient for MockJira {
    async fn fetch_ticket(&self, key: &TicketKey) -> Result<Ticket> {
        self.tickets
            .get(key)
            .cloned()
            .ok_or_else(|| CaseforgeError::NotFound(key.to_string()))
    }
}

/// Token identifying one fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(u64);

/// Supersession guard for cancellable-by-replacement fetches. Each new
/// request takes a token; only the holder of the latest token may commit
/// its result. No clocks involved.
#[derive(Debug, Default)]
pub struct FetchGuard {
    latest: u64,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, superseding any still in flight.
    pub fn begin(&mut self) -> FetchToken {
        self.latest += 1;
        FetchToken(self.latest)
    }

    pub fn is_current(&self, token: FetchToken) -> bool {
        token.0 == self.latest
    }

    /// Commit a fetch result. Returns `None` (discarding the value) when a
    /// newer fetch has started since `token` was taken.
    pub fn commit<T>(&self, token: FetchToken, value: T) -> Option<T> {
        if self.is_current(token) {
            Some(value)
        } else {
            debug!(token = token.0, latest = self.latest, "discarding stale fetch result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_known_ticket() {
        let client = MockJira::with_fixtures();
        let key: TicketKey = "PROJ-101".parse().unwrap();
        let ticket = client.fetch_ticket(&key).await.unwrap();
        assert_eq!(ticket.summary, "User login");
    }

    #[tokio::test]
    async fn test_fetch_unknown_ticket_not_found() {
        let client = MockJira::with_fixtures();
        let key: TicketKey = "NOPE-1".parse().unwrap();
        assert!(matches!(
            client.fetch_ticket(&key).await,
            Err(CaseforgeError::NotFound(_))
        ));
    }

    #[test]
    fn test_input_from_ticket_joins_criteria() {
        let client = MockJira::with_fixtures();
        let key: TicketKey = "PROJ-101".parse().unwrap();
        let ticket = client.tickets.get(&key).unwrap();

        let input = input_from_ticket(ticket);
        assert!(input.feature_description.starts_with("User login"));
        assert!(input
            .acceptance_criteria
            .contains("Invalid credentials show an error"));
        assert_eq!(input.priority, Some(Priority::High));
        assert_eq!(input.ticket_key.as_ref().unwrap().as_str(), "PROJ-101");
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let mut guard = FetchGuard::new();
        let first = guard.begin();
        let second = guard.begin();

        // The older request finished after being superseded.
        assert_eq!(guard.commit(first, "stale"), None);
        assert_eq!(guard.commit(second, "fresh"), Some("fresh"));
    }

    #[test]
    fn test_latest_token_stays_current_until_superseded() {
        let mut guard = FetchGuard::new();
        let token = guard.begin();
        assert!(guard.is_current(token));
        guard.begin();
        assert!(!guard.is_current(token));
    }
}
