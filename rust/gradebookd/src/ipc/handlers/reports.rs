use crate::calc;
use crate::error::{GradebookError, Result};
use crate::ipc::error::respond;
use crate::ipc::helpers::{required_grade, required_id};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn handle_averages_student(state: &mut AppState, params: &Value) -> Result<Value> {
    let student_id = required_id(params, "studentId")?;
    let grade = required_grade(params, "grade")?;
    let subject_id = required_id(params, "subjectId")?;
    let snapshot = state.store()?.snapshot()?;
    if snapshot.student(student_id).is_none() {
        return Err(GradebookError::not_found("student", student_id));
    }
    let average = calc::student_subject_average(&snapshot, student_id, grade, subject_id)?;
    Ok(json!({ "average": average }))
}

fn handle_averages_class(state: &mut AppState, params: &Value) -> Result<Value> {
    let grade = required_grade(params, "grade")?;
    let subject_id = required_id(params, "subjectId")?;
    let snapshot = state.store()?.snapshot()?;
    let average = calc::class_subject_average(&snapshot, grade, subject_id)?;
    Ok(json!({ "average": average }))
}

fn handle_averages_evaluation(state: &mut AppState, params: &Value) -> Result<Value> {
    let evaluation_id = required_id(params, "evaluationId")?;
    let snapshot = state.store()?.snapshot()?;
    let average = calc::evaluation_average(&snapshot, evaluation_id)?;
    Ok(json!({ "average": average }))
}

fn handle_summary_open(state: &mut AppState, params: &Value) -> Result<Value> {
    let grade = required_grade(params, "grade")?;
    let subject_id = required_id(params, "subjectId")?;
    let snapshot = state.store()?.snapshot()?;
    Ok(serde_json::to_value(calc::summary(&snapshot, grade, subject_id)?)?)
}

fn handle_reports_student(state: &mut AppState, params: &Value) -> Result<Value> {
    let student_id = required_id(params, "studentId")?;
    let subject_id = required_id(params, "subjectId")?;
    let snapshot = state.store()?.snapshot()?;
    Ok(serde_json::to_value(calc::student_report(
        &snapshot, student_id, subject_id,
    )?)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "averages.student" => handle_averages_student(state, &req.params),
        "averages.class" => handle_averages_class(state, &req.params),
        "averages.evaluation" => handle_averages_evaluation(state, &req.params),
        "summary.open" => handle_summary_open(state, &req.params),
        "reports.student" => handle_reports_student(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
