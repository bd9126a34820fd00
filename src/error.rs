//! Error types for recovery commands.
//!
//! Errors are classified by where they stop a command:
//! - Validation: rejected before any write, nothing mutated
//! - Remote: a collaboration source / blob store call failed
//! - RequiresConfirmation: destructive command sent without confirmation

use thiserror::Error;

/// Input rejected before anything reaches the remote layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A reason is required when the recovered amount differs from the receivable")]
    MissingReason,

    #[error("At least one evidence screenshot is required when recording a discrepancy")]
    MissingEvidence,
}

impl ValidationError {
    /// Stable code surfaced to the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidInput(_) => "INVALID_INPUT",
            ValidationError::MissingReason => "MISSING_REASON",
            ValidationError::MissingEvidence => "MISSING_EVIDENCE",
        }
    }
}

/// Failures talking to the collaboration source, project lookup or blob store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote returned {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

impl From<crate::db::DbError> for RemoteError {
    fn from(err: crate::db::DbError) -> Self {
        RemoteError::Storage(err.to_string())
    }
}

/// Error returned by every recovery command.
#[derive(Debug, Error)]
pub enum RebateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Rebate task not found: {0}")]
    TaskNotFound(String),

    #[error("This action is destructive and must be confirmed")]
    ConfirmationRequired,

    #[error("Preference store error: {0}")]
    Preference(String),
}

impl RebateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RebateError::Remote(e) if e.is_retryable())
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RebateError::Validation(ValidationError::InvalidInput(_)) => {
                "Check the entered values and try again."
            }
            RebateError::Validation(ValidationError::MissingReason) => {
                "Explain why the recovered amount differs from the receivable."
            }
            RebateError::Validation(ValidationError::MissingEvidence) => {
                "Attach a payment screenshot before saving a discrepancy."
            }
            RebateError::Remote(e) if e.is_retryable() => "Check your connection and try again.",
            RebateError::Remote(_) => "Reload the task list and try again.",
            RebateError::TaskNotFound(_) => "The task list is stale. Reload and try again.",
            RebateError::ConfirmationRequired => "Confirm the action to continue.",
            RebateError::Preference(_) => {
                "Check that ~/.rebatedesk/preferences.json is writable."
            }
        }
    }
}

pub type RebateResult<T> = Result<T, RebateError>;

/// Serializable error representation for the presentation layer
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub message: String,
    pub error_type: ErrorType,
    pub code: Option<String>,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    Validation,
    Remote,
    RequiresConfirmation,
    NotFound,
    Internal,
}

impl From<&RebateError> for CommandError {
    fn from(err: &RebateError) -> Self {
        let (error_type, code) = match err {
            RebateError::Validation(v) => (ErrorType::Validation, Some(v.code().to_string())),
            RebateError::Remote(_) => (ErrorType::Remote, None),
            RebateError::TaskNotFound(_) => (ErrorType::NotFound, None),
            RebateError::ConfirmationRequired => (ErrorType::RequiresConfirmation, None),
            RebateError::Preference(_) => (ErrorType::Internal, None),
        };

        CommandError {
            message: err.to_string(),
            error_type,
            code,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
