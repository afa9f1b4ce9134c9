//! Identity assignment, input validation and the referential-integrity rules
//! between students, evaluations and grade entries.
//!
//! The in-memory operations here act on a [`Snapshot`] and are what the `json`
//! backend runs inside its mutation critical section. The SQLite backend runs the
//! same validators and expresses the same rules in SQL.

use crate::error::{GradebookError, Result};
use crate::model::{
    DeleteOutcome, Evaluation, EvaluationPatch, Grade, GradeEntry, NewEvaluation, NewStudent, Record,
    Snapshot, Student, StudentPatch, Subject,
};
use std::collections::HashSet;
use tracing::warn;

/// `1` for an empty collection, otherwise one past the largest id.
pub fn next_id<T: Record>(collection: &[T]) -> i64 {
    collection.iter().map(Record::id).max().map_or(1, |m| m + 1)
}

/// Subject ids also step past every `subjectId` still held by an evaluation, so
/// the orphans of a deleted subject never attach to a new one.
pub fn next_subject_id(snapshot: &Snapshot) -> i64 {
    let held = snapshot.subjects.iter().map(|s| s.id);
    let referenced = snapshot.evaluations.iter().map(|e| e.subject_id);
    held.chain(referenced).max().map_or(1, |m| m.max(0) + 1)
}

/// Scores are only recorded for students of the evaluation's grade.
pub fn check_same_grade(
    student_id: i64,
    student_grade: Grade,
    evaluation_id: i64,
    evaluation_grade: Grade,
) -> Result<()> {
    if student_grade != evaluation_grade {
        return Err(GradebookError::validation(
            "studentId",
            format!(
                "student {student_id} is in grade {student_grade}, evaluation {evaluation_id} is for grade {evaluation_grade}"
            ),
        ));
    }
    Ok(())
}

pub fn clean_name(field: &'static str, raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GradebookError::validation(
            field,
            format!("{field} must not be empty"),
        ));
    }
    Ok(name.to_string())
}

fn check_positive(field: &'static str, v: f64) -> Result<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(GradebookError::validation(
            field,
            format!("{field} must be > 0, got {v}"),
        ));
    }
    Ok(())
}

/// Scores must be finite and nonnegative. Values above `maxScore` are allowed
/// (extra credit).
pub fn check_score(score: Option<f64>) -> Result<Option<f64>> {
    match score {
        Some(v) if !v.is_finite() => Err(GradebookError::validation(
            "score",
            "score must be a finite number",
        )),
        Some(v) if v < 0.0 => Err(GradebookError::validation(
            "score",
            format!("negative scores are not allowed, got {v}"),
        )),
        other => Ok(other),
    }
}

pub fn validate_new_student(new: &NewStudent) -> Result<NewStudent> {
    Ok(NewStudent {
        name: clean_name("name", &new.name)?,
        grade: new.grade,
        roll_number: new.roll_number.trim().to_string(),
    })
}

pub fn apply_student_patch(student: &Student, patch: &StudentPatch) -> Result<Student> {
    let mut out = student.clone();
    if let Some(name) = &patch.name {
        out.name = clean_name("name", name)?;
    }
    if let Some(grade) = patch.grade {
        out.grade = grade;
    }
    if let Some(roll) = &patch.roll_number {
        out.roll_number = roll.trim().to_string();
    }
    Ok(out)
}

/// Validates and fills defaults; the subject reference is checked by the store.
pub fn validate_new_evaluation(new: &NewEvaluation) -> Result<NewEvaluation> {
    check_positive("maxScore", new.max_score)?;
    check_positive("weight", new.weight)?;
    Ok(NewEvaluation {
        title: clean_name("title", &new.title)?,
        grade: new.grade,
        subject_id: new.subject_id,
        max_score: new.max_score,
        weight: new.weight,
        date: Some(new.date.unwrap_or_else(|| chrono::Local::now().date_naive())),
        notes: clean_notes(new.notes.as_deref()),
    })
}

fn clean_notes(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

pub fn apply_evaluation_patch(
    evaluation: &Evaluation,
    patch: &EvaluationPatch,
) -> Result<Evaluation> {
    let mut out = evaluation.clone();
    if let Some(title) = &patch.title {
        out.title = clean_name("title", title)?;
    }
    if let Some(max_score) = patch.max_score {
        check_positive("maxScore", max_score)?;
        out.max_score = max_score;
    }
    if let Some(weight) = patch.weight {
        check_positive("weight", weight)?;
        out.weight = weight;
    }
    if let Some(date) = patch.date {
        out.date = date;
    }
    if let Some(notes) = &patch.notes {
        out.notes = clean_notes(Some(notes));
    }
    Ok(out)
}

pub fn create_subject(snapshot: &mut Snapshot, name: &str) -> Result<Subject> {
    let subject = Subject {
        id: next_subject_id(snapshot),
        name: clean_name("name", name)?,
    };
    snapshot.subjects.push(subject.clone());
    Ok(subject)
}

pub fn update_subject(snapshot: &mut Snapshot, id: i64, name: &str) -> Result<Subject> {
    let name = clean_name("name", name)?;
    let subject = snapshot
        .subjects
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| GradebookError::not_found("subject", id))?;
    subject.name = name;
    Ok(subject.clone())
}

/// Removes the subject without cascading. Evaluations that referenced it stay
/// in place as orphans and are counted in the outcome.
pub fn delete_subject(snapshot: &mut Snapshot, id: i64) -> Result<DeleteOutcome> {
    let before = snapshot.subjects.len();
    snapshot.subjects.retain(|s| s.id != id);
    if snapshot.subjects.len() == before {
        return Err(GradebookError::not_found("subject", id));
    }
    let orphaned = snapshot
        .evaluations
        .iter()
        .filter(|e| e.subject_id == id)
        .count();
    if orphaned > 0 {
        warn!(subject_id = id, orphaned, "subject deleted with evaluations still referencing it");
    }
    Ok(DeleteOutcome {
        deleted: true,
        removed_grade_entries: None,
        orphaned_evaluations: Some(orphaned),
    })
}

pub fn create_student(snapshot: &mut Snapshot, new: &NewStudent) -> Result<Student> {
    let new = validate_new_student(new)?;
    let student = Student {
        id: next_id(&snapshot.students),
        name: new.name,
        grade: new.grade,
        roll_number: new.roll_number,
    };
    snapshot.students.push(student.clone());
    Ok(student)
}

pub fn update_student(snapshot: &mut Snapshot, id: i64, patch: &StudentPatch) -> Result<Student> {
    let slot = snapshot
        .students
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| GradebookError::not_found("student", id))?;
    *slot = apply_student_patch(slot, patch)?;
    Ok(slot.clone())
}

/// Deletes the student together with every grade entry that references it.
pub fn delete_student_cascade(snapshot: &mut Snapshot, id: i64) -> Result<DeleteOutcome> {
    if snapshot.student(id).is_none() {
        return Err(GradebookError::not_found("student", id));
    }
    let before = snapshot.grade_entries.len();
    snapshot.grade_entries.retain(|g| g.student_id != id);
    snapshot.students.retain(|s| s.id != id);
    Ok(DeleteOutcome {
        deleted: true,
        removed_grade_entries: Some(before - snapshot.grade_entries.len()),
        orphaned_evaluations: None,
    })
}

pub fn create_evaluation(snapshot: &mut Snapshot, new: &NewEvaluation) -> Result<Evaluation> {
    let new = validate_new_evaluation(new)?;
    if snapshot.subject(new.subject_id).is_none() {
        return Err(GradebookError::not_found("subject", new.subject_id));
    }
    let evaluation = Evaluation {
        id: next_id(&snapshot.evaluations),
        title: new.title,
        grade: new.grade,
        subject_id: new.subject_id,
        max_score: new.max_score,
        weight: new.weight,
        date: new.date.unwrap_or_default(),
        notes: new.notes,
    };
    snapshot.evaluations.push(evaluation.clone());
    Ok(evaluation)
}

pub fn update_evaluation(
    snapshot: &mut Snapshot,
    id: i64,
    patch: &EvaluationPatch,
) -> Result<Evaluation> {
    let slot = snapshot
        .evaluations
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| GradebookError::not_found("evaluation", id))?;
    *slot = apply_evaluation_patch(slot, patch)?;
    Ok(slot.clone())
}

/// Deletes the evaluation together with every grade entry recorded for it.
pub fn delete_evaluation_cascade(snapshot: &mut Snapshot, id: i64) -> Result<DeleteOutcome> {
    if snapshot.evaluation(id).is_none() {
        return Err(GradebookError::not_found("evaluation", id));
    }
    let before = snapshot.grade_entries.len();
    snapshot.grade_entries.retain(|g| g.evaluation_id != id);
    snapshot.evaluations.retain(|e| e.id != id);
    Ok(DeleteOutcome {
        deleted: true,
        removed_grade_entries: Some(before - snapshot.grade_entries.len()),
        orphaned_evaluations: None,
    })
}

/// Sets the score of a (student, evaluation) pair: overwrites an existing entry
/// or creates one. Never produces a second entry for the same pair.
pub fn upsert_grade(
    snapshot: &mut Snapshot,
    student_id: i64,
    evaluation_id: i64,
    score: Option<f64>,
) -> Result<GradeEntry> {
    let score = check_score(score)?;
    let student_grade = snapshot
        .student(student_id)
        .map(|s| s.grade)
        .ok_or_else(|| GradebookError::not_found("student", student_id))?;
    let evaluation_grade = snapshot
        .evaluation(evaluation_id)
        .map(|e| e.grade)
        .ok_or_else(|| GradebookError::not_found("evaluation", evaluation_id))?;
    check_same_grade(student_id, student_grade, evaluation_id, evaluation_grade)?;
    if let Some(existing) = snapshot
        .grade_entries
        .iter_mut()
        .find(|g| g.student_id == student_id && g.evaluation_id == evaluation_id)
    {
        existing.score = score;
        return Ok(existing.clone());
    }
    let entry = GradeEntry {
        id: next_id(&snapshot.grade_entries),
        student_id,
        evaluation_id,
        score,
    };
    snapshot.grade_entries.push(entry.clone());
    Ok(entry)
}

/// Upserts a batch of scores for one evaluation. Stops at the first invalid
/// item; callers run this on a scratch copy so a failure publishes nothing.
pub fn upsert_grades(
    snapshot: &mut Snapshot,
    evaluation_id: i64,
    scores: &[(i64, Option<f64>)],
) -> Result<Vec<GradeEntry>> {
    if snapshot.evaluation(evaluation_id).is_none() {
        return Err(GradebookError::not_found("evaluation", evaluation_id));
    }
    scores
        .iter()
        .map(|&(student_id, score)| upsert_grade(snapshot, student_id, evaluation_id, score))
        .collect()
}

/// Checks every data model invariant before a snapshot replaces stored data.
/// Evaluations pointing at a missing subject are tolerated (orphans).
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<()> {
    unique_ids("subject", &snapshot.subjects)?;
    unique_ids("student", &snapshot.students)?;
    unique_ids("evaluation", &snapshot.evaluations)?;
    unique_ids("grade entry", &snapshot.grade_entries)?;

    for s in &snapshot.subjects {
        clean_name("name", &s.name).map_err(|e| GradebookError::Integrity(e.to_string()))?;
    }
    for s in &snapshot.students {
        clean_name("name", &s.name).map_err(|e| GradebookError::Integrity(e.to_string()))?;
    }
    for e in &snapshot.evaluations {
        check_positive("maxScore", e.max_score)
            .and_then(|_| check_positive("weight", e.weight))
            .map_err(|err| {
                GradebookError::Integrity(format!("evaluation {}: {}", e.id, err))
            })?;
    }

    let mut pairs = HashSet::new();
    for g in &snapshot.grade_entries {
        if snapshot.student(g.student_id).is_none() {
            return Err(GradebookError::Integrity(format!(
                "grade entry {} references missing student {}",
                g.id, g.student_id
            )));
        }
        if snapshot.evaluation(g.evaluation_id).is_none() {
            return Err(GradebookError::Integrity(format!(
                "grade entry {} references missing evaluation {}",
                g.id, g.evaluation_id
            )));
        }
        if !pairs.insert((g.student_id, g.evaluation_id)) {
            return Err(GradebookError::Integrity(format!(
                "duplicate grade entry for student {} and evaluation {}",
                g.student_id, g.evaluation_id
            )));
        }
        check_score(g.score).map_err(|e| {
            GradebookError::Integrity(format!("grade entry {}: {}", g.id, e))
        })?;
    }
    Ok(())
}

fn unique_ids<T: Record>(entity: &str, items: &[T]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if item.id() <= 0 {
            return Err(GradebookError::Integrity(format!(
                "{entity} id must be positive, got {}",
                item.id()
            )));
        }
        if !seen.insert(item.id()) {
            return Err(GradebookError::Integrity(format!(
                "duplicate {entity} id {}",
                item.id()
            )));
        }
    }
    Ok(())
}
