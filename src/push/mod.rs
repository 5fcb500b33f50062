//! One-way push of finalized test cases to an external tracking system.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::entity::TestCase;
use crate::error::Result;
use crate::ticket::TicketKey;

/// Identifier assigned by the external system on a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    pub external_id: String,
}

/// The external system already holds an entry with this display name.
#[derive(Debug, Clone)]
pub struct PushNameConflict {
    pub original_name: String,
    pub colliding_external_id: Option<String>,
    pub suggested_names: Vec<String>,
}

/// Outcome of a push attempt.
#[derive(Debug, Clone)]
pub enum Push {
    Accepted(PushReceipt),
    NameConflict(PushNameConflict),
}

/// External tracker contract. A name collision is a typed outcome, not an
/// error; transport failures surface as `Unreachable`.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn push(&self, case: &TestCase, key: &TicketKey) -> Result<Push>;
}

/// Deterministic replacement names offered when the external system
/// provides none of its own.
pub fn fallback_suggestions(name: &str) -> Vec<String> {
    vec![
        format!("{} - V2", name),
        format!("{} - Updated", name),
        format!("{} - {}", name, Utc::now().year()),
    ]
}

/// Structural preconditions shared with in-place saves: a pushable case has
/// a title and at least one complete step.
pub fn validate_for_push(case: &TestCase) -> Result<()> {
    let mut probe = case.clone();
    probe.validate_for_save()
}

/// In-process stand-in for the external tracker. Keeps a display-name
/// registry so repeated pushes of the same name collide, mirroring the
/// 409-style behavior of the real system.
pub struct MockTracker {
    names: Mutex<HashMap<String, String>>,
    registry_path: Option<PathBuf>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(HashMap::new()),
            registry_path: None,
        }
    }

    /// A tracker whose name registry survives across processes, backed by a
    /// JSON file. Used by the CLI so repeated pushes of the same display
    /// name collide the way they would against the real system.
    pub fn with_registry_file(path: &Path) -> Result<Self> {
        let names: HashMap<String, String> = if path.exists() {
            serde_json::from_slice(&fs::read(path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            names: Mutex::new(names),
            registry_path: Some(path.to_path_buf()),
        })
    }

    /// Pre-register a display name, as if someone else had pushed it.
    pub fn seed_name(&self, name: &str) {
        let external_id = format!("TRK-{}", Uuid::new_v4().simple());
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), external_id);
    }

    fn persist(&self, names: &HashMap<String, String>) -> Result<()> {
        if let Some(path) = &self.registry_path {
            fs::write(path, serde_json::to_vec_pretty(names)?)?;
        }
        Ok(())
    }
}

impl Default for MockTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushGateway for MockTracker {
    async fn push(&self, case: &TestCase, key: &TicketKey) -> Result<Push> {
        validate_for_push(case)?;

        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing_id) = names.get(&case.title) {
            debug!(title = %case.title, "push name collision");
            return Ok(Push::NameConflict(PushNameConflict {
                original_name: case.title.clone(),
                colliding_external_id: Some(existing_id.clone()),
                suggested_names: fallback_suggestions(&case.title),
            }));
        }

        let external_id = format!("TRK-{}", Uuid::new_v4().simple());
        names.insert(case.title.clone(), external_id.clone());
        self.persist(&names)?;
        debug!(title = %case.title, external_id = %external_id, key = %key, "pushed test case");
        Ok(Push::Accepted(PushReceipt { external_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TestStep;
    use crate::error::CaseforgeError;

    fn pushable(title: &str) -> TestCase {
        let mut tc = TestCase::new(title.to_string());
        tc.steps
            .push(TestStep::new("open checkout", "checkout page shown"));
        tc
    }

    fn key() -> TicketKey {
        "PROJ-123".parse().unwrap()
    }

    #[test]
    fn test_fallback_suggestions_shape() {
        let suggestions = fallback_suggestions("Checkout Flow");
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0], "Checkout Flow - V2");
        assert_eq!(suggestions[1], "Checkout Flow - Updated");
        assert!(suggestions[2].starts_with("Checkout Flow - 2"));
    }

    #[tokio::test]
    async fn test_push_returns_receipt() {
        let tracker = MockTracker::new();
        match tracker.push(&pushable("Checkout Flow"), &key()).await.unwrap() {
            Push::Accepted(receipt) => assert!(!receipt.external_id.is_empty()),
            Push::NameConflict(_) => panic!("fresh name must not conflict"),
        }
    }

    #[tokio::test]
    async fn test_push_collision_then_renamed_retry() {
        let tracker = MockTracker::new();
        tracker.seed_name("Checkout Flow");

        let conflict = match tracker.push(&pushable("Checkout Flow"), &key()).await.unwrap() {
            Push::NameConflict(c) => c,
            Push::Accepted(_) => panic!("seeded name must conflict"),
        };
        assert_eq!(conflict.original_name, "Checkout Flow");
        assert!(conflict.colliding_external_id.is_some());
        assert!(conflict
            .suggested_names
            .contains(&"Checkout Flow - V2".to_string()));

        // Retry with the first suggestion succeeds.
        match tracker
            .push(&pushable("Checkout Flow - V2"), &key())
            .await
            .unwrap()
        {
            Push::Accepted(receipt) => assert!(!receipt.external_id.is_empty()),
            Push::NameConflict(_) => panic!("renamed push must succeed"),
        }
    }

    #[tokio::test]
    async fn test_registry_file_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tracker.json");

        let tracker = MockTracker::with_registry_file(&path).unwrap();
        match tracker.push(&pushable("Checkout Flow"), &key()).await.unwrap() {
            Push::Accepted(_) => {}
            Push::NameConflict(_) => panic!("fresh name must not conflict"),
        }

        let reopened = MockTracker::with_registry_file(&path).unwrap();
        match reopened.push(&pushable("Checkout Flow"), &key()).await.unwrap() {
            Push::NameConflict(c) => assert_eq!(c.original_name, "Checkout Flow"),
            Push::Accepted(_) => panic!("persisted name must conflict"),
        }
    }

    #[tokio::test]
    async fn test_push_rejects_structurally_invalid_case() {
        let tracker = MockTracker::new();
        let no_steps = TestCase::new("Stepless".to_string());
        assert!(matches!(
            tracker.push(&no_steps, &key()).await,
            Err(CaseforgeError::InvalidInput(_))
        ));
    }
}
