use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ArtifactStore;
use crate::entity::TestCase;
use crate::error::{CaseforgeError, Result};

const CASEFORGE_DIR: &str = ".caseforge";
const STORE_FILE: &str = "cases.json";
const STORE_VERSION: u32 = 1;

/// On-disk envelope. The version field is checked on open; there is no
/// shape-sniffing of alternative layouts.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    next_id: u64,
    cases: Vec<TestCase>,
}

impl StoreFile {
    fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            next_id: 1,
            cases: Vec::new(),
        }
    }
}

/// Flat-JSON artifact store rooted at `<project>/.caseforge/cases.json`.
pub struct JsonStore {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl JsonStore {
    /// Initialize a new caseforge project
    pub fn init(root: &Path) -> Result<Self> {
        let dir = root.join(CASEFORGE_DIR);

        if dir.exists() {
            return Err(CaseforgeError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;

        let path = dir.join(STORE_FILE);
        let store = Self {
            path,
            state: Mutex::new(StoreFile::empty()),
        };
        store.flush()?;

        Ok(store)
    }

    /// Open an existing caseforge project
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(CASEFORGE_DIR).join(STORE_FILE);

        if !path.exists() {
            return Err(CaseforgeError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let file: StoreFile = serde_json::from_slice(&bytes)?;
        if file.version != STORE_VERSION {
            return Err(CaseforgeError::UnsupportedStoreVersion(file.version));
        }

        Ok(Self {
            path,
            state: Mutex::new(file),
        })
    }

    /// Write the current state to disk.
    fn flush(&self) -> Result<()> {
        let state = self.lock();
        let bytes = serde_json::to_vec_pretty(&*state)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreFile> {
        // Lock poisoning only happens if a writer panicked; the data is
        // still the last consistent snapshot.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store_path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactStore for JsonStore {
    async fn list(&self) -> Result<Vec<TestCase>> {
        Ok(self.lock().cases.clone())
    }

    async fn get(&self, id: u64) -> Result<TestCase> {
        self.lock()
            .cases
            .iter()
            .find(|c| c.id == Some(id))
            .cloned()
            .ok_or_else(|| CaseforgeError::NotFound(id.to_string()))
    }

    async fn create(&self, mut case: TestCase) -> Result<TestCase> {
        {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;

            let now = Utc::now();
            case.id = Some(id);
            case.created_at = now;
            case.updated_at = now;
            state.cases.push(case.clone());
            debug!(id, title = %case.title, "created test case");
        }
        self.flush()?;
        Ok(case)
    }

    async fn update(&self, id: u64, mut case: TestCase) -> Result<TestCase> {
        {
            let mut state = self.lock();
            let slot = state
                .cases
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| CaseforgeError::NotFound(id.to_string()))?;

            case.id = Some(id);
            case.created_at = slot.created_at;
            case.updated_at = Utc::now();
            *slot = case.clone();
            debug!(id, "updated test case");
        }
        self.flush()?;
        Ok(case)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        {
            let mut state = self.lock();
            let before = state.cases.len();
            state.cases.retain(|c| c.id != Some(id));
            if state.cases.len() == before {
                return Err(CaseforgeError::NotFound(id.to_string()));
            }
            debug!(id, "deleted test case");
        }
        self.flush()
    }

    async fn clone_as_new(&self, from: u64, mut case: TestCase) -> Result<TestCase> {
        {
            let mut state = self.lock();
            if !state.cases.iter().any(|c| c.id == Some(from)) {
                return Err(CaseforgeError::NotFound(from.to_string()));
            }

            let id = state.next_id;
            state.next_id += 1;

            let now = Utc::now();
            case.id = Some(id);
            case.cloned_from = Some(from);
            case.created_at = now;
            case.updated_at = now;
            state.cases.push(case.clone());
            debug!(id, from, "cloned test case");
        }
        self.flush()?;
        Ok(case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TestStep;
    use tempfile::TempDir;

    fn sample(title: &str) -> TestCase {
        let mut tc = TestCase::new(title.to_string());
        tc.steps.push(TestStep::new("do the thing", "it works"));
        tc
    }

    #[tokio::test]
    async fn test_init_then_open() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path()).unwrap();
        assert!(tmp.path().join(".caseforge/cases.json").exists());

        let store = JsonStore::open(tmp.path()).unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        JsonStore::init(tmp.path()).unwrap();
        assert!(matches!(
            JsonStore::init(tmp.path()),
            Err(CaseforgeError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_open_without_init_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            JsonStore::open(tmp.path()),
            Err(CaseforgeError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".caseforge");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("cases.json"),
            r#"{"version": 99, "next_id": 1, "cases": []}"#,
        )
        .unwrap();

        assert!(matches!(
            JsonStore::open(tmp.path()),
            Err(CaseforgeError::UnsupportedStoreVersion(99))
        ));
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();

        let a = store.create(sample("first")).await.unwrap();
        let b = store.create(sample("second")).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));

        // Survives reopen
        let reopened = JsonStore::open(tmp.path()).unwrap();
        let c = reopened.create(sample("third")).await.unwrap();
        assert_eq!(c.id, Some(3));
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();

        let created = store.create(sample("original")).await.unwrap();
        let mut edited = created.clone();
        edited.title = "renamed".to_string();

        let updated = store.update(created.id.unwrap(), edited).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "renamed");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_id_fails() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();
        assert!(matches!(
            store.update(42, sample("ghost")).await,
            Err(CaseforgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();

        let created = store.create(sample("doomed")).await.unwrap();
        store.delete(created.id.unwrap()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(
            store.delete(created.id.unwrap()).await,
            Err(CaseforgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clone_as_new_records_provenance() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();

        let original = store.create(sample("origin")).await.unwrap();
        let clone = store
            .clone_as_new(original.id.unwrap(), sample("fork"))
            .await
            .unwrap();

        assert_ne!(clone.id, original.id);
        assert_eq!(clone.cloned_from, original.id);
    }

    #[tokio::test]
    async fn test_clone_from_missing_original_fails() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::init(tmp.path()).unwrap();
        assert!(matches!(
            store.clone_as_new(7, sample("orphan")).await,
            Err(CaseforgeError::NotFound(_))
        ));
    }
}
