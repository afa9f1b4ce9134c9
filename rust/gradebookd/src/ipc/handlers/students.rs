use crate::error::Result;
use crate::ipc::error::respond;
use crate::ipc::helpers::{object_param, optional_grade, optional_str, required_grade, required_id, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{NewStudent, StudentPatch};
use serde_json::{json, Value};
use tracing::info;

fn handle_students_list(state: &mut AppState, params: &Value) -> Result<Value> {
    let grade = optional_grade(params, "grade")?;
    let students = state.store()?.list_students(grade)?;
    Ok(json!({ "students": students }))
}

fn handle_students_create(state: &mut AppState, params: &Value) -> Result<Value> {
    let new = NewStudent {
        name: required_str(params, "name")?.to_string(),
        grade: required_grade(params, "grade")?,
        roll_number: optional_str(params, "rollNumber")?
            .unwrap_or_default()
            .to_string(),
    };
    let student = state.store_mut()?.create_student(&new)?;
    info!(student_id = student.id, grade = %student.grade, "student created");
    Ok(json!({ "student": student }))
}

fn handle_students_update(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "studentId")?;
    let patch: StudentPatch = object_param(params, "patch")?;
    let student = state.store_mut()?.update_student(id, &patch)?;
    Ok(json!({ "student": student }))
}

fn handle_students_delete(state: &mut AppState, params: &Value) -> Result<Value> {
    let id = required_id(params, "studentId")?;
    let outcome = state.store_mut()?.delete_student(id)?;
    if outcome.deleted {
        info!(
            student_id = id,
            removed = outcome.removed_grade_entries.unwrap_or(0),
            "student deleted"
        );
    }
    Ok(serde_json::to_value(outcome)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, &req.params),
        "students.create" => handle_students_create(state, &req.params),
        "students.update" => handle_students_update(state, &req.params),
        "students.delete" => handle_students_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
