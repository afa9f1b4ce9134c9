use super::{sort_evaluations_newest_first, sort_students, Backend, GradeStore};
use crate::error::Result;
use crate::integrity;
use crate::model::{
    DeleteOutcome, Evaluation, EvaluationPatch, Grade, GradeEntry, GradeFilter, NewEvaluation,
    NewStudent, Snapshot, Student, StudentPatch, Subject,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BLOB_FILE: &str = "gradebook.json";

/// Single JSON blob holding the whole snapshot. Mutations run on a scratch copy,
/// the copy is written to a temp file and renamed over the blob, and only then
/// does it become the live snapshot.
pub struct JsonStore {
    path: PathBuf,
    data: Snapshot,
}

impl JsonStore {
    pub fn open(workspace: &Path) -> Result<Self> {
        let path = workspace.join(BLOB_FILE);
        let data = if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&text)?;
            integrity::validate_snapshot(&snapshot)?;
            snapshot
        } else {
            Snapshot::default()
        };
        let store = JsonStore { path, data };
        if !store.path.is_file() {
            store.persist(&store.data)?;
        }
        Ok(store)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let tmp = self.path.with_extension("json.saving");
        {
            let mut f = File::create(&tmp)?;
            f.write_all(serde_json::to_string_pretty(snapshot)?.as_bytes())?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "snapshot persisted");
        Ok(())
    }

    fn mutate<T>(&mut self, op: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut scratch = self.data.clone();
        let out = op(&mut scratch)?;
        self.persist(&scratch)?;
        self.data = scratch;
        Ok(out)
    }
}

impl GradeStore for JsonStore {
    fn backend(&self) -> Backend {
        Backend::Json
    }

    fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.data.clone())
    }

    fn replace_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.mutate(|data| {
            *data = snapshot.clone();
            Ok(())
        })
    }

    fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut out = self.data.subjects.clone();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    fn create_subject(&mut self, name: &str) -> Result<Subject> {
        self.mutate(|d| integrity::create_subject(d, name))
    }

    fn update_subject(&mut self, id: i64, name: &str) -> Result<Subject> {
        self.mutate(|d| integrity::update_subject(d, id, name))
    }

    fn delete_subject(&mut self, id: i64) -> Result<DeleteOutcome> {
        self.mutate(|d| integrity::delete_subject(d, id))
    }

    fn list_students(&self, grade: Option<Grade>) -> Result<Vec<Student>> {
        let mut out: Vec<Student> = self
            .data
            .students
            .iter()
            .filter(|s| grade.map_or(true, |g| s.grade == g))
            .cloned()
            .collect();
        sort_students(&mut out);
        Ok(out)
    }

    fn create_student(&mut self, new: &NewStudent) -> Result<Student> {
        self.mutate(|d| integrity::create_student(d, new))
    }

    fn update_student(&mut self, id: i64, patch: &StudentPatch) -> Result<Student> {
        self.mutate(|d| integrity::update_student(d, id, patch))
    }

    fn delete_student(&mut self, id: i64) -> Result<DeleteOutcome> {
        self.mutate(|d| integrity::delete_student_cascade(d, id))
    }

    fn list_evaluations(&self, grade: Grade, subject_id: i64) -> Result<Vec<Evaluation>> {
        let mut out: Vec<Evaluation> = self
            .data
            .evaluations
            .iter()
            .filter(|e| e.grade == grade && e.subject_id == subject_id)
            .cloned()
            .collect();
        sort_evaluations_newest_first(&mut out);
        Ok(out)
    }

    fn create_evaluation(&mut self, new: &NewEvaluation) -> Result<Evaluation> {
        self.mutate(|d| integrity::create_evaluation(d, new))
    }

    fn update_evaluation(&mut self, id: i64, patch: &EvaluationPatch) -> Result<Evaluation> {
        self.mutate(|d| integrity::update_evaluation(d, id, patch))
    }

    fn delete_evaluation(&mut self, id: i64) -> Result<DeleteOutcome> {
        self.mutate(|d| integrity::delete_evaluation_cascade(d, id))
    }

    fn get_grade(&self, student_id: i64, evaluation_id: i64) -> Result<Option<f64>> {
        Ok(self.data.score(student_id, evaluation_id))
    }

    fn set_grade(
        &mut self,
        student_id: i64,
        evaluation_id: i64,
        score: Option<f64>,
    ) -> Result<GradeEntry> {
        self.mutate(|d| integrity::upsert_grade(d, student_id, evaluation_id, score))
    }

    fn set_grades(
        &mut self,
        evaluation_id: i64,
        scores: &[(i64, Option<f64>)],
    ) -> Result<Vec<GradeEntry>> {
        self.mutate(|d| integrity::upsert_grades(d, evaluation_id, scores))
    }

    fn list_grade_entries(&self, filter: &GradeFilter) -> Result<Vec<GradeEntry>> {
        let mut out: Vec<GradeEntry> = self
            .data
            .grade_entries
            .iter()
            .filter(|g| filter.matches(g, self.data.evaluation(g.evaluation_id)))
            .cloned()
            .collect();
        out.sort_by_key(|g| g.id);
        Ok(out)
    }
}
