use crate::error::{GradebookError, Result};
use crate::ipc::error::respond;
use crate::ipc::helpers::{object_param, required_id, score_value};
use crate::ipc::types::{AppState, Request};
use crate::model::GradeFilter;
use serde_json::{json, Value};
use tracing::{debug, info};

fn handle_grades_get(state: &mut AppState, params: &Value) -> Result<Value> {
    let student_id = required_id(params, "studentId")?;
    let evaluation_id = required_id(params, "evaluationId")?;
    let score = state.store()?.get_grade(student_id, evaluation_id)?;
    Ok(json!({ "score": score }))
}

fn handle_grades_set(state: &mut AppState, params: &Value) -> Result<Value> {
    let student_id = required_id(params, "studentId")?;
    let evaluation_id = required_id(params, "evaluationId")?;
    let score = score_value(params.get("score"))?;
    let entry = state
        .store_mut()?
        .set_grade(student_id, evaluation_id, score)?;
    debug!(entry_id = entry.id, student_id, evaluation_id, "grade set");
    Ok(json!({ "entry": entry }))
}

fn handle_grades_save_bulk(state: &mut AppState, params: &Value) -> Result<Value> {
    let evaluation_id = required_id(params, "evaluationId")?;
    let Some(items) = params.get("scores").and_then(|v| v.as_array()) else {
        return Err(GradebookError::validation("scores", "scores must be an array"));
    };

    // Parse everything up front so a bad cell rejects the whole save.
    let mut scores = Vec::with_capacity(items.len());
    for item in items {
        scores.push((required_id(item, "studentId")?, score_value(item.get("score"))?));
    }

    let entries = state.store_mut()?.set_grades(evaluation_id, &scores)?;
    info!(evaluation_id, saved = entries.len(), "grades saved");
    Ok(json!({ "entries": entries }))
}

fn handle_grades_list(state: &mut AppState, params: &Value) -> Result<Value> {
    let filter: GradeFilter = object_param(params, "filter")?;
    let entries = state.store()?.list_grade_entries(&filter)?;
    Ok(json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grades.get" => handle_grades_get(state, &req.params),
        "grades.set" => handle_grades_set(state, &req.params),
        "grades.saveBulk" => handle_grades_save_bulk(state, &req.params),
        "grades.list" => handle_grades_list(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
