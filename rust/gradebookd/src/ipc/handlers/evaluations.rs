use crate::error::Result;
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    object_param, optional_date, optional_str, required_f64, required_grade, required_id,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{EvaluationPatch, NewEvaluation};
use serde_json::{json, Value};
use tracing::info;

fn handle_evaluations_list(state: &mut AppState, params: &Value) -> Result<Value> {
    let grade = required_grade(params, "grade")?;
    let subject_id = required_id(params, "subjectId")?;
    let evaluations = state.store()?.list_evaluations(grade, subject_id)?;
    Ok(json!({ "evaluations": evaluations }))
}

fn handle_evaluations_create(state: &mut AppState, params: &Value) -> Result<Value> {
    let new = NewEvaluation {
        title: required_str(params, "title")?.to_string(),
        grade: required_grade(params, "grade")?,
        subject_id: required_id(params, "subjectId")?,
        max_score: required_f64(params, "maxScore")?,
        weight: required_f64(params, "weight")?,
        date: optional_date(params, "date")?,
        notes: optional_str(params, "notes")?.map(str::to_string),
    };
    let evaluation = state.store_mut()?.create_evaluation(&new)?;
    info!(
        evaluation_id = evaluation.id,
        grade = %evaluation.grade,
        subject_id = evaluation.subject_id,
        "evaluation created"
    );
    Ok(json!({ "evaluation": evaluation }))
}

fn handle_evaluations_update(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "evaluationId")?;
    let patch: EvaluationPatch = object_param(params, "patch")?;
    let evaluation = state.store_mut()?.update_evaluation(id, &patch)?;
    Ok(json!({ "evaluation": evaluation }))
}

fn handle_evaluations_delete(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "evaluationId")?;
    let outcome = state.store_mut()?.delete_evaluation(id)?;
    if outcome.deleted {
        info!(
            evaluation_id = id,
            removed = outcome.removed_grade_entries.unwrap_or(0),
            "evaluation deleted"
        );
    }
    Ok(serde_json::to_value(outcome)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "evaluations.list" => handle_evaluations_list(state, &req.params),
        "evaluations.create" => handle_evaluations_create(state, &req.params),
        "evaluations.update" => handle_evaluations_update(state, &req.params),
        "evaluations.delete" => handle_evaluations_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
