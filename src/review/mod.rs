//! Edit-vs-clone reconciliation for persisted test cases.
//!
//! The three restricted fields are the semantic identity of a test case.
//! An edit that changes any of them can never overwrite the original
//! record in place; it must fork into a new record that carries the
//! original's id as provenance.

use std::sync::Arc;

use tracing::debug;

use crate::entity::TestCase;
use crate::error::{CaseforgeError, Result};
use crate::store::ArtifactStore;

/// Names of the fields whose change forces `save_as_new`.
pub const RESTRICTED_FIELDS: [&str; 3] = [
    "description",
    "feature_description",
    "acceptance_criteria",
];

/// Restricted fields that differ (after trimming) between the persisted
/// original and the in-progress edit.
pub fn restricted_changes(original: &TestCase, edited: &TestCase) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if original.description.trim() != edited.description.trim() {
        changed.push(RESTRICTED_FIELDS[0]);
    }
    if original.feature_description.trim() != edited.feature_description.trim() {
        changed.push(RESTRICTED_FIELDS[1]);
    }
    if original.acceptance_criteria.trim() != edited.acceptance_criteria.trim() {
        changed.push(RESTRICTED_FIELDS[2]);
    }
    changed
}

/// True if any restricted field differs between `original` and `edited`.
pub fn diff_restricted(original: &TestCase, edited: &TestCase) -> bool {
    !restricted_changes(original, edited).is_empty()
}

pub struct ReviewReconciler {
    store: Arc<dyn ArtifactStore>,
}

impl ReviewReconciler {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Persist an edit in place (same id). Fails with
    /// `RestrictedFieldConflict` when the edit touches restricted fields.
    pub async fn save(&self, original: &TestCase, mut edited: TestCase) -> Result<TestCase> {
        let id = persisted_id(original)?;

        let changed = restricted_changes(original, &edited);
        if !changed.is_empty() {
            return Err(CaseforgeError::RestrictedFieldConflict(changed.join(", ")));
        }

        edited.validate_for_save()?;
        let saved = self.store.update(id, edited).await?;
        debug!(id, "saved edit in place");
        Ok(saved)
    }

    /// Persist the edit as a distinct new record cloned from `original`.
    /// Permitted regardless of which fields changed.
    pub async fn save_as_new(&self, original: &TestCase, mut edited: TestCase) -> Result<TestCase> {
        let id = persisted_id(original)?;

        edited.validate_for_save()?;
        edited.id = None;
        // A fork has not been pushed anywhere yet.
        edited.external_id = None;
        let saved = self.store.clone_as_new(id, edited).await?;
        debug!(original = id, clone = ?saved.id, "saved edit as new case");
        Ok(saved)
    }
}

fn persisted_id(original: &TestCase) -> Result<u64> {
    original.id.ok_or_else(|| {
        CaseforgeError::InvalidInput("the original test case is not persisted".to_string())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Saving,
}

/// Lifecycle of one edit dialog. At most one save may be in flight, and
/// the session cannot be closed while it is.
pub struct EditSession {
    state: SessionState,
    original: Option<TestCase>,
    last_error: Option<String>,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Closed,
            original: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn original(&self) -> Option<&TestCase> {
        self.original.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Load a persisted case into the session.
    pub fn open(&mut self, original: TestCase) -> Result<()> {
        if self.state != SessionState::Closed {
            return Err(CaseforgeError::SessionBusy);
        }
        persisted_id(&original)?;
        self.original = Some(original);
        self.last_error = None;
        self.state = SessionState::Open;
        Ok(())
    }

    /// Run a save through the reconciler. On success the session closes;
    /// on failure it stays open with the error recorded.
    pub async fn save(
        &mut self,
        reconciler: &ReviewReconciler,
        edited: TestCase,
    ) -> Result<TestCase> {
        self.begin_save()?;
        let original = self
            .original
            .clone()
            .expect("Saving state implies a loaded original");
        let outcome = reconciler.save(&original, edited).await;
        self.finish_save(&outcome);
        outcome
    }

    /// Like `save`, but forks into a new record.
    pub async fn save_as_new(
        &mut self,
        reconciler: &ReviewReconciler,
        edited: TestCase,
    ) -> Result<TestCase> {
        self.begin_save()?;
        let original = self
            .original
            .clone()
            .expect("Saving state implies a loaded original");
        let outcome = reconciler.save_as_new(&original, edited).await;
        self.finish_save(&outcome);
        outcome
    }

    /// Explicit cancel / dismiss. Rejected while a save is in flight so an
    /// in-flight result cannot be lost.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Saving {
            return Err(CaseforgeError::SessionBusy);
        }
        self.original = None;
        self.last_error = None;
        self.state = SessionState::Closed;
        Ok(())
    }

    fn begin_save(&mut self) -> Result<()> {
        match self.state {
            SessionState::Open => {
                self.state = SessionState::Saving;
                Ok(())
            }
            SessionState::Saving => Err(CaseforgeError::SessionBusy),
            SessionState::Closed => Err(CaseforgeError::InvalidInput(
                "no edit session is open".to_string(),
            )),
        }
    }

    fn finish_save(&mut self, outcome: &Result<TestCase>) {
        match outcome {
            Ok(_) => {
                self.original = None;
                self.last_error = None;
                self.state = SessionState::Closed;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.state = SessionState::Open;
            }
        }
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TestStep;
    use crate::store::JsonStore;
    use tempfile::TempDir;

    fn sample() -> TestCase {
        let mut tc = TestCase::new("Login works".to_string());
        tc.description = "Verify login".to_string();
        tc.feature_description = "Login feature".to_string();
        tc.acceptance_criteria = "User can log in".to_string();
        tc.steps.push(TestStep::new("enter credentials", "logged in"));
        tc
    }

    async fn persisted(tmp: &TempDir) -> (Arc<JsonStore>, TestCase) {
        let store = Arc::new(JsonStore::init(tmp.path()).unwrap());
        let saved = store.create(sample()).await.unwrap();
        (store, saved)
    }

    #[test]
    fn test_diff_restricted_reflexive() {
        let tc = sample();
        assert!(!diff_restricted(&tc, &tc));
    }

    #[test]
    fn test_diff_restricted_ignores_surrounding_whitespace() {
        let original = sample();
        let mut edited = original.clone();
        edited.description = format!("  {}  ", original.description);
        assert!(!diff_restricted(&original, &edited));
    }

    #[test]
    fn test_diff_restricted_ignores_metadata_fields() {
        let original = sample();
        let mut edited = original.clone();
        edited.title = "Renamed".to_string();
        edited.priority = crate::entity::Priority::Critical;
        edited.tags.push("smoke".to_string());
        assert!(!diff_restricted(&original, &edited));
    }

    #[test]
    fn test_restricted_changes_names_fields() {
        let original = sample();
        let mut edited = original.clone();
        edited.description = "other".to_string();
        edited.acceptance_criteria = "other".to_string();
        assert_eq!(
            restricted_changes(&original, &edited),
            vec!["description", "acceptance_criteria"]
        );
    }

    #[tokio::test]
    async fn test_metadata_edit_saves_in_place() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut edited = saved.clone();
        edited.priority = crate::entity::Priority::High;
        edited.tags.push("regression".to_string());

        let updated = reconciler.save(&saved, edited).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert!(updated.updated_at >= saved.updated_at);
        assert_eq!(updated.priority, crate::entity::Priority::High);
    }

    #[tokio::test]
    async fn test_restricted_edit_blocks_save_routes_to_save_as_new() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut edited = saved.clone();
        edited.description = "A conceptually different test".to_string();

        assert!(matches!(
            reconciler.save(&saved, edited.clone()).await,
            Err(CaseforgeError::RestrictedFieldConflict(_))
        ));

        let forked = reconciler.save_as_new(&saved, edited).await.unwrap();
        assert_ne!(forked.id, saved.id);
        assert_eq!(forked.cloned_from, saved.id);
    }

    #[tokio::test]
    async fn test_save_as_new_strips_external_id() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut edited = saved.clone();
        edited.external_id = Some("TRK-abc".to_string());
        edited.description = "changed".to_string();

        let forked = reconciler.save_as_new(&saved, edited).await.unwrap();
        assert_eq!(forked.external_id, None);
    }

    #[tokio::test]
    async fn test_session_save_closes_on_success() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut session = EditSession::new();
        session.open(saved.clone()).unwrap();
        assert_eq!(session.state(), SessionState::Open);

        let mut edited = saved.clone();
        edited.title = "Login still works".to_string();
        session.save(&reconciler, edited).await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_session_stays_open_with_error_on_failed_save() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut session = EditSession::new();
        session.open(saved.clone()).unwrap();

        let mut edited = saved.clone();
        edited.description = "restricted change".to_string();
        assert!(session.save(&reconciler, edited).await.is_err());
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.last_error().unwrap().contains("description"));

        // Still usable: the same edit goes through save_as_new.
        let mut edited = saved.clone();
        edited.description = "restricted change".to_string();
        session.save_as_new(&reconciler, edited).await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_close_rejected_while_saving() {
        let mut session = EditSession::new();
        let tmp = TempDir::new().unwrap();
        let (_store, saved) = persisted(&tmp).await;
        session.open(saved).unwrap();

        session.begin_save().unwrap();
        assert_eq!(session.state(), SessionState::Saving);
        assert!(matches!(session.close(), Err(CaseforgeError::SessionBusy)));

        // A second save request is also rejected while one is in flight.
        assert!(matches!(
            session.begin_save(),
            Err(CaseforgeError::SessionBusy)
        ));
    }

    #[tokio::test]
    async fn test_save_without_open_session_rejected() {
        let tmp = TempDir::new().unwrap();
        let (store, saved) = persisted(&tmp).await;
        let reconciler = ReviewReconciler::new(store);

        let mut session = EditSession::new();
        assert!(session.save(&reconciler, saved).await.is_err());
    }
}
