//! Candidate synthesis, duplicate fingerprinting and similarity ranking.

mod similarity;

pub use similarity::{Similarity, TokenOverlap};

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::entity::{Priority, TestCase, TestStep};
use crate::error::{CaseforgeError, Result};
use crate::store::ArtifactStore;
use crate::ticket::TicketKey;

/// Maximum number of similar cases returned alongside a fresh candidate.
const MAX_SIMILAR: usize = 5;

/// Description bundle a candidate is synthesized from.
#[derive(Debug, Clone, Default)]
pub struct GenerationInput {
    pub feature_description: String,
    pub acceptance_criteria: String,
    pub extra_context: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub ticket_key: Option<TicketKey>,
}

impl GenerationInput {
    fn validate(&self) -> Result<()> {
        if self.feature_description.trim().is_empty()
            && self.acceptance_criteria.trim().is_empty()
        {
            return Err(CaseforgeError::InvalidInput(
                "either a feature description or acceptance criteria is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// An existing artifact ranked against the generation input.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarCase {
    /// In [0, 1], higher is more similar.
    pub score: f32,
    pub case: TestCase,
}

/// Signal that an equivalent artifact already exists.
#[derive(Debug, Clone)]
pub struct DuplicateConflict {
    pub existing: TestCase,
    pub fingerprint: String,
}

/// A fresh candidate plus its non-binding similarity neighbours.
#[derive(Debug, Clone)]
pub struct Generated {
    pub candidate: TestCase,
    pub similar: Vec<SimilarCase>,
}

/// Outcome of [`GenerationService::generate`].
#[derive(Debug, Clone)]
pub enum Generation {
    Fresh(Generated),
    Duplicate(DuplicateConflict),
}

/// Equivalence key over the descriptive identity of a test case: SHA-256 of
/// the lowercased, whitespace-collapsed feature description and acceptance
/// criteria.
pub fn fingerprint(feature_description: &str, acceptance_criteria: &str) -> String {
    let normalized = format!(
        "{}\n{}",
        normalize(feature_description),
        normalize(acceptance_criteria)
    );
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{:x}", digest)
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct GenerationService {
    store: Arc<dyn ArtifactStore>,
    similarity: Box<dyn Similarity>,
}

impl GenerationService {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            similarity: Box::new(TokenOverlap),
        }
    }

    /// Swap the similarity ranking strategy.
    pub fn with_similarity(mut self, similarity: Box<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Synthesize a candidate, unless an equivalent artifact already exists,
    /// in which case the conflict is returned instead.
    pub async fn generate(&self, input: &GenerationInput) -> Result<Generation> {
        input.validate()?;

        let print = fingerprint(&input.feature_description, &input.acceptance_criteria);
        let existing = self
            .store
            .list()
            .await
            .map_err(|e| CaseforgeError::GenerationFailed(e.to_string()))?;

        if let Some(dup) = existing.iter().find(|c| {
            fingerprint(&c.feature_description, &c.acceptance_criteria) == print
        }) {
            debug!(id = ?dup.id, "duplicate fingerprint, returning conflict");
            return Ok(Generation::Duplicate(DuplicateConflict {
                existing: dup.clone(),
                fingerprint: print,
            }));
        }

        let candidate = synthesize(input);
        let similar = self.rank_similar(&candidate, &existing);
        Ok(Generation::Fresh(Generated { candidate, similar }))
    }

    /// Synthesize a candidate without the fingerprint check. Used after the
    /// caller has been offered the existing match and declined it.
    pub async fn force_generate(&self, input: &GenerationInput) -> Result<Generated> {
        input.validate()?;

        let existing = self
            .store
            .list()
            .await
            .map_err(|e| CaseforgeError::GenerationFailed(e.to_string()))?;

        let candidate = synthesize(input);
        let similar = self.rank_similar(&candidate, &existing);
        Ok(Generated { candidate, similar })
    }

    fn rank_similar(&self, candidate: &TestCase, existing: &[TestCase]) -> Vec<SimilarCase> {
        let needle = similarity_text(candidate);
        let mut ranked: Vec<SimilarCase> = existing
            .iter()
            .map(|c| SimilarCase {
                score: self.similarity.score(&needle, &similarity_text(c)),
                case: c.clone(),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(MAX_SIMILAR);
        ranked
    }
}

fn similarity_text(case: &TestCase) -> String {
    format!(
        "{} {} {}",
        case.title, case.description, case.feature_description
    )
}

/// Deterministic candidate synthesis: a title derived from the feature text
/// and a minimal navigate / exercise / verify step sequence.
fn synthesize(input: &GenerationInput) -> TestCase {
    let title = derive_title(input);
    let mut case = TestCase::new(title);

    case.description = match &input.extra_context {
        Some(ctx) if !ctx.trim().is_empty() => {
            format!("Test case generated from provided criteria ({})", ctx.trim())
        }
        _ => "Test case generated from provided criteria".to_string(),
    };
    case.feature_description = input.feature_description.clone();
    case.acceptance_criteria = input.acceptance_criteria.clone();
    case.preconditions =
        "System is accessible and the user has the necessary permissions".to_string();
    case.expected_result = "System behaves according to the requirements".to_string();
    case.priority = input.priority.unwrap_or_default();
    case.tags = if input.tags.is_empty() {
        vec!["generated".to_string()]
    } else {
        input.tags.clone()
    };
    case.ticket_key = input.ticket_key.clone();

    let criteria_data = if input.acceptance_criteria.trim().is_empty() {
        "Test data based on the requirements".to_string()
    } else {
        truncate(&input.acceptance_criteria, 50)
    };

    case.steps = vec![
        TestStep::new(
            "Navigate to the feature under test",
            "The feature is reachable and its interface is displayed",
        ),
        TestStep::new(
            "Perform the primary action described by the acceptance criteria",
            "The system responds according to the acceptance criteria",
        )
        .with_test_data(criteria_data),
        TestStep::new(
            "Verify the expected outcome",
            "All acceptance criteria are met",
        ),
    ];
    crate::entity::renumber_steps(&mut case.steps);

    case
}

fn derive_title(input: &GenerationInput) -> String {
    let source = input
        .feature_description
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty());
    match source {
        Some(line) => truncate(line, 80),
        None => "Generated Test Case".to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}
