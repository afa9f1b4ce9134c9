mod test_support;

use serde_json::json;
use test_support::{id_of, request_ok, spawn_sidecar, temp_dir};

#[test]
fn ungraded_evaluations_are_skipped_not_zero_filled() {
    let workspace = temp_dir("gradebook-averages-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let x = request_ok(&mut stdin, &mut reader, "2", "students.create", json!({ "name": "X", "grade": 6 }));
    let x = id_of(&x, "student");

    // No evaluations yet: every aggregate is null.
    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "averages.student",
        json!({ "studentId": x, "grade": 6, "subjectId": 1 }),
    );
    assert!(avg["average"].is_null());
    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "averages.class",
        json!({ "grade": 6, "subjectId": 1 }),
    );
    assert!(avg["average"].is_null());

    let e1 = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "evaluations.create",
        json!({ "title": "E1", "grade": 6, "subjectId": 1, "maxScore": 100, "weight": 20, "date": "2024-03-01" }),
    );
    let e2 = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "evaluations.create",
        json!({ "title": "E2", "grade": 6, "subjectId": 1, "maxScore": 50, "weight": 10, "date": "2024-03-08" }),
    );
    let (e1, e2) = (id_of(&e1, "evaluation"), id_of(&e2, "evaluation"));

    // Evaluations exist but nothing is graded.
    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "averages.evaluation",
        json!({ "evaluationId": e2 }),
    );
    assert!(avg["average"].is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.set",
        json!({ "studentId": x, "evaluationId": e1, "score": 80 }),
    );
    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "averages.student",
        json!({ "studentId": x, "grade": 6, "subjectId": 1 }),
    );
    assert_eq!(avg["average"].as_f64(), Some(80.0));

    // A cleared cell counts as missing too.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "grades.set",
        json!({ "studentId": x, "evaluationId": e2, "score": null }),
    );
    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "averages.student",
        json!({ "studentId": x, "grade": 6, "subjectId": 1 }),
    );
    assert_eq!(avg["average"].as_f64(), Some(80.0));
}

#[test]
fn class_and_evaluation_averages_match() {
    let workspace = temp_dir("gradebook-averages-class");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy(), "backend": "json" }),
    );
    let a = request_ok(&mut stdin, &mut reader, "2", "students.create", json!({ "name": "A", "grade": 11 }));
    let b = request_ok(&mut stdin, &mut reader, "3", "students.create", json!({ "name": "B", "grade": 11 }));
    let e1 = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "evaluations.create",
        json!({ "title": "E1", "grade": 11, "subjectId": 2, "maxScore": 100, "weight": 1 }),
    );
    let (a, b, e1) = (id_of(&a, "student"), id_of(&b, "student"), id_of(&e1, "evaluation"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.saveBulk",
        json!({ "evaluationId": e1, "scores": [
            { "studentId": a, "score": 92 },
            { "studentId": b, "score": 78 }
        ] }),
    );

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "averages.class",
        json!({ "grade": 11, "subjectId": 2 }),
    );
    assert_eq!(class["average"].as_f64(), Some(85.0));
    let eval = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "averages.evaluation",
        json!({ "evaluationId": e1 }),
    );
    assert_eq!(eval["average"].as_f64(), Some(85.0));

    // Other subjects of the same grade have no data.
    let other = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "averages.class",
        json!({ "grade": 11, "subjectId": 3 }),
    );
    assert!(other["average"].is_null());
}
