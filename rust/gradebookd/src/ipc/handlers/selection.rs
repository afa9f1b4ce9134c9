use crate::calc;
use crate::error::Result;
use crate::ipc::error::respond;
use crate::ipc::helpers::optional_str;
use crate::ipc::types::{AppState, Request};
use crate::selection::{Action, Selection};
use serde_json::{json, Value};

/// Accepts the selector value as a string or a bare number.
fn selector(params: &Value, key: &'static str) -> Result<Option<String>> {
    if let Some(n) = params.get(key).and_then(|v| v.as_i64()) {
        return Ok(Some(n.to_string()));
    }
    Ok(optional_str(params, key)?.map(str::to_string))
}

fn describe(selection: &Selection) -> Value {
    json!({
        "grade": selection.grade,
        "subjectId": selection.subject_id,
        "state": selection.state(),
        "enabledActions": selection.enabled_actions(),
        "navigate": selection.auto_navigate(),
    })
}

fn handle_selection_set(state: &mut AppState, params: &Value) -> Result<Value> {
    let grade = selector(params, "grade")?;
    let subject = selector(params, "subject")?;
    let selection = Selection::parse(grade.as_deref(), subject.as_deref())?;
    state.selection = selection;

    let mut out = describe(&selection);
    if !selection.permits(Action::Summary) {
        return Ok(out);
    }
    if let (Some((grade, subject_id)), Some(store)) = (selection.pair(), state.store.as_deref()) {
        let snapshot = store.snapshot()?;
        out["summary"] = serde_json::to_value(calc::summary(&snapshot, grade, subject_id)?)?;
    }
    Ok(out)
}

fn handle_selection_get(state: &mut AppState, _params: &Value) -> Result<Value> {
    Ok(describe(&state.selection))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "selection.set" => handle_selection_set(state, &req.params),
        "selection.get" => handle_selection_get(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
