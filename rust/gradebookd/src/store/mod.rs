//! Persistence providers. Both backends expose the same CRUD surface over the
//! four record collections and keep the integrity rules: one grade entry per
//! (student, evaluation), cascading student/evaluation deletes, and every
//! mutation applied as one unit.

mod json;
mod sqlite;

use crate::error::{GradebookError, Result};
use crate::model::{
    DeleteOutcome, Evaluation, EvaluationPatch, Grade, GradeEntry, GradeFilter, NewEvaluation,
    NewStudent, Snapshot, Student, StudentPatch, Subject, DEFAULT_SUBJECTS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Json,
}

impl FromStr for Backend {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "json" => Ok(Backend::Json),
            other => Err(GradebookError::validation(
                "backend",
                format!("backend must be one of: sqlite, json (got {other})"),
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Sqlite => "sqlite",
            Backend::Json => "json",
        })
    }
}

pub trait GradeStore {
    fn backend(&self) -> Backend;

    /// Full consistent read of all four collections.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Replaces all data with an already validated snapshot, as one unit.
    fn replace_all(&mut self, snapshot: &Snapshot) -> Result<()>;

    fn list_subjects(&self) -> Result<Vec<Subject>>;
    fn create_subject(&mut self, name: &str) -> Result<Subject>;
    fn update_subject(&mut self, id: i64, name: &str) -> Result<Subject>;
    fn delete_subject(&mut self, id: i64) -> Result<DeleteOutcome>;

    fn list_students(&self, grade: Option<Grade>) -> Result<Vec<Student>>;
    fn create_student(&mut self, new: &NewStudent) -> Result<Student>;
    fn update_student(&mut self, id: i64, patch: &StudentPatch) -> Result<Student>;
    fn delete_student(&mut self, id: i64) -> Result<DeleteOutcome>;

    fn list_evaluations(&self, grade: Grade, subject_id: i64) -> Result<Vec<Evaluation>>;
    fn create_evaluation(&mut self, new: &NewEvaluation) -> Result<Evaluation>;
    fn update_evaluation(&mut self, id: i64, patch: &EvaluationPatch) -> Result<Evaluation>;
    fn delete_evaluation(&mut self, id: i64) -> Result<DeleteOutcome>;

    fn get_grade(&self, student_id: i64, evaluation_id: i64) -> Result<Option<f64>>;
    fn set_grade(
        &mut self,
        student_id: i64,
        evaluation_id: i64,
        score: Option<f64>,
    ) -> Result<GradeEntry>;
    fn set_grades(
        &mut self,
        evaluation_id: i64,
        scores: &[(i64, Option<f64>)],
    ) -> Result<Vec<GradeEntry>>;
    fn list_grade_entries(&self, filter: &GradeFilter) -> Result<Vec<GradeEntry>>;

    /// Seeds the default subjects into an empty subject collection. Returns how
    /// many were added.
    fn seed_default_subjects(&mut self) -> Result<usize> {
        if !self.list_subjects()?.is_empty() {
            return Ok(0);
        }
        for name in DEFAULT_SUBJECTS {
            self.create_subject(name)?;
        }
        Ok(DEFAULT_SUBJECTS.len())
    }
}

pub fn open_store(workspace: &Path, backend: Backend) -> Result<Box<dyn GradeStore>> {
    std::fs::create_dir_all(workspace)?;
    Ok(match backend {
        Backend::Sqlite => Box::new(SqliteStore::open(workspace)?),
        Backend::Json => Box::new(JsonStore::open(workspace)?),
    })
}

/// List order used by both backends: students by name, evaluations newest first.
fn sort_students(students: &mut [Student]) {
    students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

fn sort_evaluations_newest_first(evaluations: &mut [Evaluation]) {
    evaluations.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}
