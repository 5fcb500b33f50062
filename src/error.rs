use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaseforgeError {
    #[error("Not in a caseforge project. Run 'caseforge init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .caseforge/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Test case not found: {0}")]
    NotFound(String),

    #[error("Invalid ticket key '{0}' (expected format: ABC-123)")]
    InvalidKey(String),

    #[error("Restricted fields changed ({0}); save as a new test case instead")]
    RestrictedFieldConflict(String),

    #[error("A resolution for this conflict is already in flight")]
    ResolutionPending,

    #[error("A save for this edit session is already in flight")]
    SessionBusy,

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("External system unreachable: {0}")]
    Unreachable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported store file version: {0}")]
    UnsupportedStoreVersion(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CaseforgeError>;
