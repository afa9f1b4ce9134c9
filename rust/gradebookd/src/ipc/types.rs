use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{GradebookError, Result};
use crate::selection::Selection;
use crate::store::{Backend, GradeStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything one session owns. Handlers receive it explicitly.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn GradeStore>>,
    pub selection: Selection,
    /// Backend used by `workspace.select` when the request does not name one.
    pub default_backend: Backend,
}

impl AppState {
    pub fn new(default_backend: Backend) -> Self {
        AppState {
            workspace: None,
            store: None,
            selection: Selection::default(),
            default_backend,
        }
    }

    pub fn store(&self) -> Result<&(dyn GradeStore + 'static)> {
        self.store.as_deref().ok_or(GradebookError::NoWorkspace)
    }

    pub fn store_mut(&mut self) -> Result<&mut (dyn GradeStore + 'static)> {
        self.store.as_deref_mut().ok_or(GradebookError::NoWorkspace)
    }
}
