use crate::error::Result;
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::selection::Selection;
use crate::store::{open_store, Backend};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

fn handle_health(state: &mut AppState, _params: &Value) -> Result<Value> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "backend": state.store.as_ref().map(|s| s.backend()),
    }))
}

fn handle_workspace_select(state: &mut AppState, params: &Value) -> Result<Value> {
    let path = PathBuf::from(required_str(params, "path")?);
    let backend = match optional_str(params, "backend")? {
        Some(raw) => raw.parse()?,
        None => state.default_backend,
    };
    let seeded = open_workspace(state, &path, backend)?;
    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "backend": backend,
        "seededSubjects": seeded,
    }))
}

/// Opens (creating if needed) a workspace and makes it the session's store.
/// The previous store stays active if opening fails. Returns how many default
/// subjects were seeded.
pub fn open_workspace(state: &mut AppState, path: &Path, backend: Backend) -> Result<usize> {
    let mut store = open_store(path, backend)?;
    let seeded = store.seed_default_subjects()?;
    info!(
        workspace = %path.display(),
        %backend,
        seeded,
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    state.selection = Selection::default();
    Ok(seeded)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, &req.params),
        "workspace.select" => handle_workspace_select(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
