use crate::error::Result;
use crate::ipc::error::respond;
use crate::ipc::helpers::{required_id, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use tracing::info;

fn handle_subjects_list(state: &mut AppState, _params: &Value) -> Result<Value> {
    let subjects = state.store()?.list_subjects()?;
    Ok(json!({ "subjects": subjects }))
}

fn handle_subjects_create(state: &mut AppState, params: &Value) -> Result<Value> {
    let name = required_str(params, "name")?;
    let subject = state.store_mut()?.create_subject(name)?;
    info!(subject_id = subject.id, "subject created");
    Ok(json!({ "subject": subject }))
}

fn handle_subjects_update(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "subjectId")?;
    let name = required_str(params, "name")?;
    let subject = state.store_mut()?.update_subject(id, name)?;
    Ok(json!({ "subject": subject }))
}

fn handle_subjects_delete(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "subjectId")?;
    let outcome = state.store_mut()?.delete_subject(id)?;
    if state.selection.subject_id == Some(id) {
        state.selection.subject_id = None;
    }
    Ok(serde_json::to_value(outcome)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "subjects.list" => handle_subjects_list(state, &req.params),
        "subjects.create" => handle_subjects_create(state, &req.params),
        "subjects.update" => handle_subjects_update(state, &req.params),
        "subjects.delete" => handle_subjects_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
