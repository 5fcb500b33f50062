//! Durable storage for test-case artifacts.
//!
//! The store is an external collaborator from the point of view of the
//! generation/review workflow, so it is a trait; [`JsonStore`] is the
//! flat-file implementation used by the CLI.

mod json_store;

pub use json_store::JsonStore;

use async_trait::async_trait;

use crate::entity::TestCase;
use crate::error::Result;

/// CRUD surface for persisted test cases. Identity is a numeric id
/// assigned on `create`/`clone_as_new`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn list(&self) -> Result<Vec<TestCase>>;

    /// Fails with `NotFound` for an unknown id.
    async fn get(&self, id: u64) -> Result<TestCase>;

    /// Assigns an id and timestamps; returns the persisted record.
    async fn create(&self, case: TestCase) -> Result<TestCase>;

    /// In-place update of an existing record. Keeps the id, advances
    /// `updated_at`. Fails with `NotFound` for an unknown id.
    async fn update(&self, id: u64, case: TestCase) -> Result<TestCase>;

    async fn delete(&self, id: u64) -> Result<()>;

    /// Persists `case` as a new record with a fresh id, recording `from`
    /// as its provenance. Fails with `NotFound` if `from` does not exist.
    async fn clone_as_new(&self, from: u64, case: TestCase) -> Result<TestCase>;
}
