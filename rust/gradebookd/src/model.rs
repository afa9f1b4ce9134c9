use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GRADES: std::ops::RangeInclusive<i64> = 6..=12;

pub const DEFAULT_SUBJECTS: [&str; 5] = [
    "Math",
    "Science",
    "English",
    "Social Studies",
    "Physical Education",
];

/// A school year / cohort level (6 through 12). Not a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Grade(u8);

impl Grade {
    pub fn get(self) -> i64 {
        self.0 as i64
    }
}

impl TryFrom<i64> for Grade {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        if GRADES.contains(&v) {
            Ok(Grade(v as u8))
        } else {
            Err(format!(
                "grade must be between {} and {}, got {}",
                GRADES.start(),
                GRADES.end(),
                v
            ))
        }
    }
}

impl From<Grade> for i64 {
    fn from(g: Grade) -> i64 {
        g.get()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Records that carry a collection-unique integer id.
pub trait Record {
    fn id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub grade: Grade,
    #[serde(default)]
    pub roll_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: i64,
    pub title: String,
    pub grade: Grade,
    pub subject_id: i64,
    pub max_score: f64,
    pub weight: f64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    pub id: i64,
    pub student_id: i64,
    #[serde(alias = "assignmentId")]
    pub evaluation_id: i64,
    pub score: Option<f64>,
}

macro_rules! impl_record {
    ($($t:ty),*) => {
        $(impl Record for $t {
            fn id(&self) -> i64 {
                self.id
            }
        })*
    };
}

impl_record!(Subject, Student, Evaluation, GradeEntry);

/// The whole persisted data set. Also the JSON blob format of the `json` backend
/// and of backup bundles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default, alias = "assignments")]
    pub evaluations: Vec<Evaluation>,
    #[serde(default)]
    pub grade_entries: Vec<GradeEntry>,
}

impl Snapshot {
    pub fn subject(&self, id: i64) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn student(&self, id: i64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn evaluation(&self, id: i64) -> Option<&Evaluation> {
        self.evaluations.iter().find(|e| e.id == id)
    }

    pub fn entry(&self, student_id: i64, evaluation_id: i64) -> Option<&GradeEntry> {
        self.grade_entries
            .iter()
            .find(|g| g.student_id == student_id && g.evaluation_id == evaluation_id)
    }

    /// Recorded score, `None` both for "no entry" and for a cleared entry.
    pub fn score(&self, student_id: i64, evaluation_id: i64) -> Option<f64> {
        self.entry(student_id, evaluation_id).and_then(|g| g.score)
    }

    /// Students of a grade, sorted by name.
    pub fn students_in(&self, grade: Grade) -> Vec<&Student> {
        let mut out: Vec<&Student> = self.students.iter().filter(|s| s.grade == grade).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    /// Evaluations of a (grade, subject) pair, oldest first.
    pub fn evaluations_for(&self, grade: Grade, subject_id: i64) -> Vec<&Evaluation> {
        let mut out: Vec<&Evaluation> = self
            .evaluations
            .iter()
            .filter(|e| e.grade == grade && e.subject_id == subject_id)
            .collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        out
    }

    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            subjects: self.subjects.len(),
            students: self.students.len(),
            evaluations: self.evaluations.len(),
            grade_entries: self.grade_entries.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCounts {
    pub subjects: usize,
    pub students: usize,
    pub evaluations: usize,
    pub grade_entries: usize,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub grade: Grade,
    pub roll_number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub grade: Option<Grade>,
    pub roll_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub title: String,
    pub grade: Grade,
    pub subject_id: i64,
    pub max_score: f64,
    pub weight: f64,
    /// Today when absent.
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Editable evaluation fields. Grade and subject are fixed once created.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EvaluationPatch {
    pub title: Option<String>,
    pub max_score: Option<f64>,
    pub weight: Option<f64>,
    pub date: Option<NaiveDate>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
}

/// Equality/range filter for grade entries. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradeFilter {
    pub student_id: Option<i64>,
    pub evaluation_id: Option<i64>,
    pub grade: Option<Grade>,
    pub subject_id: Option<i64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

impl GradeFilter {
    pub fn matches(&self, entry: &GradeEntry, evaluation: Option<&Evaluation>) -> bool {
        if self.student_id.is_some_and(|id| id != entry.student_id) {
            return false;
        }
        if self.evaluation_id.is_some_and(|id| id != entry.evaluation_id) {
            return false;
        }
        if let Some(grade) = self.grade {
            if evaluation.map(|e| e.grade) != Some(grade) {
                return false;
            }
        }
        if let Some(subject_id) = self.subject_id {
            if evaluation.map(|e| e.subject_id) != Some(subject_id) {
                return false;
            }
        }
        if self.min_score.is_some() || self.max_score.is_some() {
            let Some(score) = entry.score else {
                return false;
            };
            if self.min_score.is_some_and(|min| score < min) {
                return false;
            }
            if self.max_score.is_some_and(|max| score > max) {
                return false;
            }
        }
        true
    }
}

/// Outcome of a delete: whether the target existed and what went with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_grade_entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_evaluations: Option<usize>,
}
