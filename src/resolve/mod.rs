//! Conflict resolution state machines.
//!
//! Two shapes of conflict need user arbitration: a duplicate detected at
//! generation time (binary choice: adopt the existing case or force a new
//! one) and a name collision at push time (requires a user-supplied
//! rename). Both enforce a single resolution per conflict instance.

use tracing::debug;

use crate::entity::TestCase;
use crate::error::{CaseforgeError, Result};
use crate::generation::{DuplicateConflict, GenerationInput, GenerationService};
use crate::push::PushNameConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    AwaitingChoice,
    Resolved,
    Cancelled,
}

/// The two resolutions offered for a duplicate conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Adopt the existing artifact as the working result.
    UseExisting,
    /// Force-generate a fresh candidate from the same input.
    GenerateNew,
}

/// Arbitrates one duplicate conflict. Created idle; armed with a conflict
/// and the input that produced it; settles exactly once.
pub struct ConflictResolver {
    state: ResolverState,
    conflict: Option<DuplicateConflict>,
    input: Option<GenerationInput>,
    in_flight: bool,
    forced_attempts: u32,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self {
            state: ResolverState::Idle,
            conflict: None,
            input: None,
            in_flight: false,
            forced_attempts: 0,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Receive a conflict and move to `AwaitingChoice`.
    pub fn offer(&mut self, conflict: DuplicateConflict, input: GenerationInput) -> Result<()> {
        if self.state != ResolverState::Idle {
            return Err(CaseforgeError::InvalidInput(
                "resolver already holds a conflict".to_string(),
            ));
        }
        self.conflict = Some(conflict);
        self.input = Some(input);
        self.state = ResolverState::AwaitingChoice;
        Ok(())
    }

    /// Apply the user's choice. Rejected while a resolution is in flight or
    /// once the conflict has settled.
    pub async fn resolve(
        &mut self,
        choice: Resolution,
        generation: &GenerationService,
    ) -> Result<TestCase> {
        if self.in_flight {
            return Err(CaseforgeError::ResolutionPending);
        }
        if self.state != ResolverState::AwaitingChoice {
            return Err(CaseforgeError::InvalidInput(
                "no conflict awaiting resolution".to_string(),
            ));
        }

        match choice {
            Resolution::UseExisting => {
                // No network calls; the existing record is the result.
                let existing = self
                    .conflict
                    .take()
                    .map(|c| c.existing)
                    .expect("AwaitingChoice implies a held conflict");
                self.input = None;
                self.state = ResolverState::Resolved;
                debug!(id = ?existing.id, "conflict resolved with existing case");
                Ok(existing)
            }
            Resolution::GenerateNew => {
                self.in_flight = true;
                self.forced_attempts += 1;

                let input = self.disambiguated_input();
                let outcome = generation.force_generate(&input).await;
                self.in_flight = false;

                match outcome {
                    Ok(generated) => {
                        self.conflict = None;
                        self.input = None;
                        self.state = ResolverState::Resolved;
                        debug!("conflict resolved with forced candidate");
                        Ok(generated.candidate)
                    }
                    // Stay in AwaitingChoice so the user can retry or cancel.
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Dismiss the conflict without choosing; pending input is discarded.
    pub fn cancel(&mut self) {
        if self.state == ResolverState::AwaitingChoice && !self.in_flight {
            self.conflict = None;
            self.input = None;
            self.state = ResolverState::Cancelled;
        }
    }

    /// The original input with a marker distinguishing repeated forced
    /// generation attempts.
    fn disambiguated_input(&self) -> GenerationInput {
        let mut input = self
            .input
            .clone()
            .expect("AwaitingChoice implies held input");
        let marker = format!("variant {}", self.forced_attempts);
        input.extra_context = Some(match input.extra_context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{} ({})", ctx, marker),
            _ => marker,
        });
        input
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Rename prompt for a push-time name collision. Unlike the duplicate
/// resolver there is no binary choice: the only way forward is a new name,
/// and every retry needs fresh user input.
#[derive(Debug, Clone)]
pub struct RenamePrompt {
    conflict: PushNameConflict,
    attempts: u32,
}

impl RenamePrompt {
    pub fn new(conflict: PushNameConflict) -> Self {
        Self {
            conflict,
            attempts: 0,
        }
    }

    pub fn original_name(&self) -> &str {
        &self.conflict.original_name
    }

    pub fn suggestions(&self) -> &[String] {
        &self.conflict.suggested_names
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Validate a user-supplied replacement name. Must be non-empty and
    /// differ from the colliding one.
    pub fn accept(&mut self, new_name: &str) -> Result<String> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(CaseforgeError::InvalidInput(
                "a replacement name is required".to_string(),
            ));
        }
        if trimmed == self.conflict.original_name {
            return Err(CaseforgeError::InvalidInput(
                "the replacement name must differ from the colliding one".to_string(),
            ));
        }
        self.attempts += 1;
        Ok(trimmed.to_string())
    }
}
