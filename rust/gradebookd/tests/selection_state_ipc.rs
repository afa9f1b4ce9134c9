mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn selection_drives_enabled_actions() {
    let workspace = temp_dir("gradebook-selection");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let initial = request_ok(&mut stdin, &mut reader, "1", "selection.get", json!({}));
    assert_eq!(initial["state"], "NoGrade");
    assert_eq!(initial["enabledActions"], json!([]));

    // Both selectors set, but no workspace open yet: no summary attached.
    let no_store = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "selection.set",
        json!({ "grade": "6", "subject": "2" }),
    );
    assert_eq!(no_store["state"], "GradeAndSubject");
    assert!(no_store.get("summary").is_none());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let grade_only = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "selection.set",
        json!({ "grade": "6", "subject": "" }),
    );
    assert_eq!(grade_only["state"], "GradeOnly");
    assert_eq!(grade_only["enabledActions"], json!(["manageStudents"]));
    assert!(grade_only["navigate"].is_null());
    assert!(grade_only.get("summary").is_none());

    let both = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "selection.set",
        json!({ "grade": "6", "subject": "2" }),
    );
    assert_eq!(both["state"], "GradeAndSubject");
    assert_eq!(
        both["enabledActions"],
        json!(["manageStudents", "manageEvaluations", "enterGrades", "summary"])
    );
    assert_eq!(both["navigate"], "summary");
    assert_eq!(both["summary"]["subject"]["name"], "Science");
    assert_eq!(both["summary"]["grade"], 6);

    let current = request_ok(&mut stdin, &mut reader, "6", "selection.get", json!({}));
    assert_eq!(current["state"], "GradeAndSubject");
    assert_eq!(current["grade"], 6);
    assert_eq!(current["subjectId"], 2);

    // Subject without a grade is still NoGrade.
    let subject_only = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "selection.set",
        json!({ "grade": "", "subject": "2" }),
    );
    assert_eq!(subject_only["state"], "NoGrade");
    assert_eq!(subject_only["enabledActions"], json!([]));
}

#[test]
fn invalid_selector_values_are_rejected_without_changing_state() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "selection.set",
        json!({ "grade": "7", "subject": "" }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "selection.set",
        json!({ "grade": "13", "subject": "" }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "selection.set",
        json!({ "grade": "7", "subject": "math" }),
    );
    assert_eq!(code, "bad_params");

    let current = request_ok(&mut stdin, &mut reader, "4", "selection.get", json!({}));
    assert_eq!(current["state"], "GradeOnly");
    assert_eq!(current["grade"], 7);
}
