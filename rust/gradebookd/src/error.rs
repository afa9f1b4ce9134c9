//! Error taxonomy of the gradebook core.
//!
//! Every variant maps to a stable wire code so the presentation layer can branch
//! on the kind of failure without matching on messages.

use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradebookError {
    /// Input rejected before any mutation.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A snapshot breaks one of the data model invariants.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("select a workspace first")]
    NoWorkspace,

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("backup error: {0:#}")]
    Backup(anyhow::Error),
}

pub type Result<T, E = GradebookError> = std::result::Result<T, E>;

impl From<anyhow::Error> for GradebookError {
    fn from(e: anyhow::Error) -> Self {
        // Keep the original kind when a core error travelled through anyhow.
        match e.downcast::<GradebookError>() {
            Ok(inner) => inner,
            Err(e) => GradebookError::Backup(e),
        }
    }
}

impl GradebookError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        GradebookError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        GradebookError::NotFound { entity, id }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::Validation { .. } => "bad_params",
            GradebookError::NotFound { .. } => "not_found",
            GradebookError::Integrity(_) => "integrity_violation",
            GradebookError::NoWorkspace => "no_workspace",
            GradebookError::Storage(_) => "db_failed",
            GradebookError::Io(_) => "io_failed",
            GradebookError::Snapshot(_) => "bad_snapshot",
            GradebookError::Backup(_) => "backup_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GradebookError::Validation { field, .. } => Some(json!({ "field": field })),
            GradebookError::NotFound { entity, id } => {
                Some(json!({ "entity": entity, "id": id }))
            }
            _ => None,
        }
    }
}
