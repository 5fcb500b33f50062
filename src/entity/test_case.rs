use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::step::{renumber_steps, TestStep};
use crate::error::{CaseforgeError, Result};
use crate::ticket::TicketKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Active,
    Deprecated,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Draft => write!(f, "draft"),
            Status::Active => write!(f, "active"),
            Status::Deprecated => write!(f, "deprecated"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Status::Draft),
            "active" => Ok(Status::Active),
            "deprecated" => Ok(Status::Deprecated),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// A test case artifact. `id` is `None` for an in-memory candidate and is
/// assigned by the store on first save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub description: String,
    pub feature_description: String,
    pub acceptance_criteria: String,
    #[serde(default)]
    pub preconditions: String,
    #[serde(default)]
    pub expected_result: String,
    pub steps: Vec<TestStep>,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_key: Option<TicketKey>,
    /// Identifier assigned by the external tracking system on push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Id of the artifact this one was cloned from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned_from: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCase {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title,
            description: String::new(),
            feature_description: String::new(),
            acceptance_criteria: String::new(),
            preconditions: String::new(),
            expected_result: String::new(),
            steps: Vec::new(),
            priority: Priority::default(),
            status: Status::default(),
            tags: Vec::new(),
            ticket_key: None,
            external_id: None,
            cloned_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Renumber steps and check the structural invariants required before
    /// persistence: non-empty title and at least one step carrying both an
    /// action and an expected result.
    pub fn validate_for_save(&mut self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CaseforgeError::InvalidInput(
                "title must not be empty".to_string(),
            ));
        }

        renumber_steps(&mut self.steps);

        let has_complete_step = self.steps.iter().any(|s| {
            !s.action.trim().is_empty() && !s.expected_result.trim().is_empty()
        });
        if !has_complete_step {
            return Err(CaseforgeError::InvalidInput(
                "at least one step with action and expected result is required".to_string(),
            ));
        }

        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
