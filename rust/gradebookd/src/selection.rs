//! Which management actions the current (grade, subject) selection permits.
//!
//! The state is a pure function of the two selector values; there is no
//! transition history.

use crate::error::{GradebookError, Result};
use crate::model::Grade;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionState {
    NoGrade,
    GradeOnly,
    GradeAndSubject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    ManageStudents,
    ManageEvaluations,
    EnterGrades,
    Summary,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::ManageStudents,
        Action::ManageEvaluations,
        Action::EnterGrades,
        Action::Summary,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub grade: Option<Grade>,
    pub subject_id: Option<i64>,
}

impl Selection {
    /// Parses raw selector values; an empty or missing string means unset.
    pub fn parse(grade: Option<&str>, subject: Option<&str>) -> Result<Self> {
        let grade = match grade.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => {
                let v: i64 = raw.parse().map_err(|_| {
                    GradebookError::validation("grade", format!("invalid grade: {raw}"))
                })?;
                Some(Grade::try_from(v).map_err(|m| GradebookError::validation("grade", m))?)
            }
        };
        let subject_id = match subject.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(v) if v > 0 => Some(v),
                _ => {
                    return Err(GradebookError::validation(
                        "subject",
                        format!("invalid subject id: {raw}"),
                    ))
                }
            },
        };
        Ok(Selection { grade, subject_id })
    }

    pub fn state(&self) -> SelectionState {
        match (self.grade, self.subject_id) {
            (None, _) => SelectionState::NoGrade,
            (Some(_), None) => SelectionState::GradeOnly,
            (Some(_), Some(_)) => SelectionState::GradeAndSubject,
        }
    }

    pub fn enabled_actions(&self) -> Vec<Action> {
        match self.state() {
            SelectionState::NoGrade => Vec::new(),
            SelectionState::GradeOnly => vec![Action::ManageStudents],
            SelectionState::GradeAndSubject => Action::ALL.to_vec(),
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        self.enabled_actions().contains(&action)
    }

    /// The view to open automatically once both selectors are set.
    pub fn auto_navigate(&self) -> Option<Action> {
        match self.state() {
            SelectionState::GradeAndSubject => Some(Action::Summary),
            _ => None,
        }
    }

    /// Both values, once the state is `GradeAndSubject`.
    pub fn pair(&self) -> Option<(Grade, i64)> {
        self.grade.zip(self.subject_id)
    }
}
