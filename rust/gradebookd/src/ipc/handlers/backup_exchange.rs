use crate::backup;
use crate::error::{GradebookError, Result};
use crate::integrity;
use crate::ipc::error::respond;
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::model::Snapshot;
use serde_json::{json, Value};
use std::io;
use std::path::PathBuf;
use tracing::info;

fn handle_snapshot_export(state: &mut AppState, _params: &Value) -> Result<Value> {
    let snapshot = state.store()?.snapshot()?;
    Ok(json!({ "snapshot": snapshot }))
}

fn handle_snapshot_import(state: &mut AppState, params: &Value) -> Result<Value> {
    let Some(raw) = params.get("snapshot").filter(|v| v.is_object()) else {
        return Err(GradebookError::validation("snapshot", "missing snapshot"));
    };
    let snapshot: Snapshot = serde_json::from_value(raw.clone())?;
    integrity::validate_snapshot(&snapshot)?;
    state.store_mut()?.replace_all(&snapshot)?;
    let counts = snapshot.counts();
    info!(?counts, "snapshot imported");
    Ok(json!({ "counts": counts }))
}

fn handle_backup_export_bundle(state: &mut AppState, params: &Value) -> Result<Value> {
    let out_path = required_str(params, "outPath")?.trim();
    if out_path.is_empty() {
        return Err(GradebookError::validation("outPath", "missing outPath"));
    }
    let snapshot = state.store()?.snapshot()?;
    let export = backup::export_snapshot_bundle(&snapshot, &PathBuf::from(out_path))?;
    info!(path = out_path, bundle_id = %export.bundle_id, "bundle exported");
    Ok(json!({
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "bundleId": export.bundle_id,
        "entryCount": export.entry_count,
    }))
}

fn handle_backup_import_bundle(state: &mut AppState, params: &Value) -> Result<Value> {
    let in_path = required_str(params, "inPath")?.trim();
    if in_path.is_empty() {
        return Err(GradebookError::validation("inPath", "missing inPath"));
    }
    // no_workspace takes precedence over bundle errors.
    state.store()?;
    let src = PathBuf::from(in_path);
    if !src.is_file() {
        return Err(GradebookError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("bundle not found: {in_path}"),
        )));
    }

    let imported = backup::read_snapshot_bundle(&src)?;
    state.store_mut()?.replace_all(&imported.snapshot)?;
    let counts = imported.snapshot.counts();
    info!(path = in_path, format = %imported.bundle_format_detected, "bundle imported");
    Ok(json!({
        "bundleFormatDetected": imported.bundle_format_detected,
        "counts": counts,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "snapshot.export" => handle_snapshot_export(state, &req.params),
        "snapshot.import" => handle_snapshot_import(state, &req.params),
        "backup.exportBundle" => handle_backup_export_bundle(state, &req.params),
        "backup.importBundle" => handle_backup_import_bundle(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
