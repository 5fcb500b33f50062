//! External ticket keys and the ticket payload returned by the tracker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CaseforgeError;

/// Key grammar shared by ticket lookups and push targets: one or more
/// uppercase letters, a hyphen, one or more digits (e.g. `ABC-123`).
static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]+-[0-9]+$").unwrap());

/// A validated external ticket key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketKey(String);

impl TicketKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for TicketKey {
    type Err = CaseforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if KEY_RE.is_match(s) {
            Ok(TicketKey(s.to_string()))
        } else {
            Err(CaseforgeError::InvalidKey(s.to_string()))
        }
    }
}

impl TryFrom<String> for TicketKey {
    type Error = CaseforgeError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TicketKey> for String {
    fn from(key: TicketKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for TicketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive fields fetched from the external tracker, used as
/// generation input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub key: TicketKey,
    pub summary: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
}
