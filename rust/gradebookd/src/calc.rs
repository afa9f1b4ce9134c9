use crate::error::{GradebookError, Result};
use crate::model::{Evaluation, Grade, Snapshot, Student};
use chrono::NaiveDate;
use serde::Serialize;

/// Two-decimal rounding used for every displayed average.
pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Score as a percent of `max_score`. `max_score` must be positive; evaluations
/// are validated on write so this only fails on corrupt data.
pub fn normalize(score: f64, max_score: f64) -> Result<f64> {
    if max_score.is_nan() || max_score <= 0.0 {
        return Err(GradebookError::validation(
            "maxScore",
            format!("maxScore must be > 0, got {}", max_score),
        ));
    }
    Ok(score / max_score * 100.0)
}

/// `sum(p * w) / sum(w)` over `(percent, weight)` pairs, rounded to two decimals.
/// `None` means nothing was recorded, which is not the same as an average of zero.
pub fn weighted_average<I>(entries: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut total = 0.0;
    let mut total_weight = 0.0;
    for (percent, weight) in entries {
        total += percent * weight;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        return None;
    }
    Some(round_2(total / total_weight))
}

/// Plain mean rounded to two decimals; `None` on empty input.
fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(round_2(sum / n as f64))
}

/// Contribution of one score to a weighted total: `normalize * weight / 100`.
pub fn weighted_mark(score: f64, max_score: f64, weight: f64) -> Result<f64> {
    Ok(round_2(normalize(score, max_score)? * weight / 100.0))
}

/// Weighted average of one student over the evaluations of (grade, subject).
/// Evaluations the student has no score for are skipped, not zero-filled.
pub fn student_subject_average(
    snapshot: &Snapshot,
    student_id: i64,
    grade: Grade,
    subject_id: i64,
) -> Result<Option<f64>> {
    let evaluations = snapshot.evaluations_for(grade, subject_id);
    if evaluations.is_empty() {
        return Ok(None);
    }
    let mut pairs = Vec::with_capacity(evaluations.len());
    for e in evaluations {
        if let Some(score) = snapshot.score(student_id, e.id) {
            pairs.push((normalize(score, e.max_score)?, e.weight));
        }
    }
    Ok(weighted_average(pairs))
}

/// Equal-weight mean of the non-null student averages of a grade.
pub fn class_subject_average(
    snapshot: &Snapshot,
    grade: Grade,
    subject_id: i64,
) -> Result<Option<f64>> {
    let mut averages = Vec::new();
    for s in snapshot.students_in(grade) {
        if let Some(avg) = student_subject_average(snapshot, s.id, grade, subject_id)? {
            averages.push(avg);
        }
    }
    Ok(mean(averages))
}

/// Mean percent over the non-null entries recorded for one evaluation.
pub fn evaluation_average(snapshot: &Snapshot, evaluation_id: i64) -> Result<Option<f64>> {
    let evaluation = snapshot
        .evaluation(evaluation_id)
        .ok_or_else(|| GradebookError::not_found("evaluation", evaluation_id))?;
    evaluation_average_of(snapshot, evaluation)
}

fn evaluation_average_of(snapshot: &Snapshot, evaluation: &Evaluation) -> Result<Option<f64>> {
    let mut percents = Vec::new();
    for g in snapshot
        .grade_entries
        .iter()
        .filter(|g| g.evaluation_id == evaluation.id)
    {
        if let Some(score) = g.score {
            percents.push(normalize(score, evaluation.max_score)?);
        }
    }
    Ok(mean(percents))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: i64,
    /// `None` when the subject was deleted and its evaluations are orphans.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStats {
    pub evaluation_id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub max_score: f64,
    pub weight: f64,
    pub average_percent: Option<f64>,
    pub graded_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCell {
    pub evaluation_id: i64,
    pub score: Option<f64>,
    pub percent: Option<f64>,
    pub weighted_mark: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub student_id: i64,
    pub name: String,
    pub roll_number: String,
    pub cells: Vec<SummaryCell>,
    pub total_marks: Option<f64>,
    pub total_weighted: Option<f64>,
    pub average: Option<f64>,
}

/// Printable class summary for one (grade, subject) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryModel {
    pub grade: Grade,
    pub subject: SubjectRef,
    pub student_count: usize,
    pub evaluation_count: usize,
    pub total_max_marks: f64,
    pub evaluations: Vec<EvaluationStats>,
    pub rows: Vec<SummaryRow>,
    pub class_average: Option<f64>,
}

pub fn summary(snapshot: &Snapshot, grade: Grade, subject_id: i64) -> Result<SummaryModel> {
    let evaluations = snapshot.evaluations_for(grade, subject_id);
    let students = snapshot.students_in(grade);

    let mut stats = Vec::with_capacity(evaluations.len());
    for e in &evaluations {
        let graded_count = snapshot
            .grade_entries
            .iter()
            .filter(|g| g.evaluation_id == e.id && g.score.is_some())
            .count();
        stats.push(EvaluationStats {
            evaluation_id: e.id,
            title: e.title.clone(),
            date: e.date,
            max_score: e.max_score,
            weight: e.weight,
            average_percent: evaluation_average_of(snapshot, e)?,
            graded_count,
        });
    }

    let mut rows = Vec::with_capacity(students.len());
    for s in &students {
        rows.push(summary_row(snapshot, s, &evaluations, grade, subject_id)?);
    }

    Ok(SummaryModel {
        grade,
        subject: subject_ref(snapshot, subject_id),
        student_count: students.len(),
        evaluation_count: evaluations.len(),
        total_max_marks: evaluations.iter().map(|e| e.max_score).sum(),
        evaluations: stats,
        rows,
        class_average: class_subject_average(snapshot, grade, subject_id)?,
    })
}

fn summary_row(
    snapshot: &Snapshot,
    student: &Student,
    evaluations: &[&Evaluation],
    grade: Grade,
    subject_id: i64,
) -> Result<SummaryRow> {
    let mut cells = Vec::with_capacity(evaluations.len());
    let mut total_marks: Option<f64> = None;
    let mut total_weighted: Option<f64> = None;
    for e in evaluations {
        let score = snapshot.score(student.id, e.id);
        let (percent, weighted) = match score {
            Some(s) => {
                let w = weighted_mark(s, e.max_score, e.weight)?;
                *total_marks.get_or_insert(0.0) += s;
                *total_weighted.get_or_insert(0.0) += w;
                (Some(round_2(normalize(s, e.max_score)?)), Some(w))
            }
            None => (None, None),
        };
        cells.push(SummaryCell {
            evaluation_id: e.id,
            score,
            percent,
            weighted_mark: weighted,
        });
    }
    Ok(SummaryRow {
        student_id: student.id,
        name: student.name.clone(),
        roll_number: student.roll_number.clone(),
        cells,
        total_marks: total_marks.map(round_2),
        total_weighted: total_weighted.map(round_2),
        average: student_subject_average(snapshot, student.id, grade, subject_id)?,
    })
}

fn subject_ref(snapshot: &Snapshot, subject_id: i64) -> SubjectRef {
    SubjectRef {
        id: subject_id,
        name: snapshot.subject(subject_id).map(|s| s.name.clone()),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub evaluation_id: i64,
    pub title: String,
    pub score: Option<f64>,
    pub max_score: f64,
    pub percent: Option<f64>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: i64,
    pub name: String,
    pub average: f64,
}

/// One student's printable report for a subject, plus their averages in every
/// subject that has at least one recorded score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: i64,
    pub name: String,
    pub roll_number: String,
    pub grade: Grade,
    pub subject: SubjectRef,
    pub subject_average: Option<f64>,
    pub lines: Vec<ReportLine>,
    pub all_subject_averages: Vec<SubjectAverage>,
}

pub fn student_report(
    snapshot: &Snapshot,
    student_id: i64,
    subject_id: i64,
) -> Result<StudentReport> {
    let student = snapshot
        .student(student_id)
        .ok_or_else(|| GradebookError::not_found("student", student_id))?;
    let grade = student.grade;

    let mut lines = Vec::new();
    for e in snapshot.evaluations_for(grade, subject_id) {
        let score = snapshot.score(student.id, e.id);
        let percent = match score {
            Some(s) => Some(round_2(normalize(s, e.max_score)?)),
            None => None,
        };
        lines.push(ReportLine {
            evaluation_id: e.id,
            title: e.title.clone(),
            score,
            max_score: e.max_score,
            percent,
            date: e.date,
        });
    }

    let mut all_subject_averages = Vec::new();
    for subject in &snapshot.subjects {
        if let Some(average) = student_subject_average(snapshot, student.id, grade, subject.id)? {
            all_subject_averages.push(SubjectAverage {
                subject_id: subject.id,
                name: subject.name.clone(),
                average,
            });
        }
    }

    Ok(StudentReport {
        student_id: student.id,
        name: student.name.clone(),
        roll_number: student.roll_number.clone(),
        grade,
        subject: subject_ref(snapshot, subject_id),
        subject_average: student_subject_average(snapshot, student.id, grade, subject_id)?,
        lines,
        all_subject_averages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GradeEntry, Subject};

    fn grade(v: i64) -> Grade {
        Grade::try_from(v).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn evaluation(id: i64, subject_id: i64, max_score: f64, weight: f64) -> Evaluation {
        Evaluation {
            id,
            title: format!("E{id}"),
            grade: grade(6),
            subject_id,
            max_score,
            weight,
            date: date("2025-01-10"),
            notes: None,
        }
    }

    fn student(id: i64, name: &str) -> Student {
        Student {
            id,
            name: name.to_string(),
            grade: grade(6),
            roll_number: String::new(),
        }
    }

    fn entry(id: i64, student_id: i64, evaluation_id: i64, score: Option<f64>) -> GradeEntry {
        GradeEntry {
            id,
            student_id,
            evaluation_id,
            score,
        }
    }

    #[test]
    fn normalize_scales_to_percent() {
        assert_eq!(normalize(45.0, 50.0).unwrap(), 90.0);
        assert_eq!(normalize(0.0, 20.0).unwrap(), 0.0);
    }

    #[test]
    fn normalize_rejects_non_positive_max() {
        assert!(normalize(10.0, 0.0).is_err());
        assert!(normalize(10.0, -5.0).is_err());
        assert!(normalize(10.0, f64::NAN).is_err());
    }

    #[test]
    fn weighted_average_distinguishes_empty_from_zero() {
        assert_eq!(weighted_average(Vec::new()), None);
        assert_eq!(weighted_average(vec![(0.0, 10.0)]), Some(0.0));
        assert_eq!(weighted_average(vec![(100.0, 0.5)]), Some(100.0));
        assert_eq!(weighted_average(vec![(100.0, 37.0)]), Some(100.0));
    }

    #[test]
    fn weighted_average_rounds_to_two_decimals() {
        // (92*20 + 88*30 + 90*10) / 60 = 89.666..
        assert_eq!(
            weighted_average(vec![(92.0, 20.0), (88.0, 30.0), (90.0, 10.0)]),
            Some(89.67)
        );
    }

    #[test]
    fn missing_scores_are_excluded_not_zero_filled() {
        let snapshot = Snapshot {
            subjects: vec![Subject {
                id: 1,
                name: "Math".into(),
            }],
            students: vec![student(1, "X")],
            evaluations: vec![evaluation(1, 1, 100.0, 20.0), evaluation(2, 1, 50.0, 10.0)],
            grade_entries: vec![entry(1, 1, 1, Some(80.0))],
        };
        assert_eq!(
            student_subject_average(&snapshot, 1, grade(6), 1).unwrap(),
            Some(80.0)
        );
    }

    #[test]
    fn cleared_entries_do_not_count() {
        let snapshot = Snapshot {
            students: vec![student(1, "X")],
            evaluations: vec![evaluation(1, 1, 100.0, 20.0)],
            grade_entries: vec![entry(1, 1, 1, None)],
            ..Snapshot::default()
        };
        assert_eq!(student_subject_average(&snapshot, 1, grade(6), 1).unwrap(), None);
        assert_eq!(evaluation_average(&snapshot, 1).unwrap(), None);
        assert_eq!(class_subject_average(&snapshot, grade(6), 1).unwrap(), None);
    }

    #[test]
    fn no_evaluations_means_no_average() {
        let snapshot = Snapshot {
            students: vec![student(1, "X")],
            ..Snapshot::default()
        };
        assert_eq!(student_subject_average(&snapshot, 1, grade(6), 1).unwrap(), None);
    }

    #[test]
    fn class_and_evaluation_average_end_to_end() {
        let snapshot = Snapshot {
            students: vec![student(1, "A"), student(2, "B"), student(3, "C")],
            evaluations: vec![evaluation(1, 1, 100.0, 20.0)],
            grade_entries: vec![entry(1, 1, 1, Some(92.0)), entry(2, 2, 1, Some(78.0))],
            ..Snapshot::default()
        };
        assert_eq!(
            class_subject_average(&snapshot, grade(6), 1).unwrap(),
            Some(85.0)
        );
        assert_eq!(evaluation_average(&snapshot, 1).unwrap(), Some(85.0));
    }

    #[test]
    fn evaluation_average_normalizes_by_max_score() {
        let snapshot = Snapshot {
            students: vec![student(1, "A"), student(2, "B")],
            evaluations: vec![evaluation(3, 1, 50.0, 10.0)],
            grade_entries: vec![entry(1, 1, 3, Some(45.0)), entry(2, 2, 3, Some(40.0))],
            ..Snapshot::default()
        };
        assert_eq!(evaluation_average(&snapshot, 3).unwrap(), Some(85.0));
        assert!(evaluation_average(&snapshot, 99).is_err());
    }

    #[test]
    fn summary_totals_skip_missing_cells() {
        let snapshot = Snapshot {
            subjects: vec![Subject {
                id: 1,
                name: "Math".into(),
            }],
            students: vec![student(1, "Bob"), student(2, "Alice")],
            evaluations: vec![evaluation(1, 1, 100.0, 20.0), evaluation(2, 1, 50.0, 10.0)],
            grade_entries: vec![entry(1, 1, 1, Some(80.0)), entry(2, 1, 2, Some(25.0))],
        };
        let model = summary(&snapshot, grade(6), 1).unwrap();
        assert_eq!(model.subject.name.as_deref(), Some("Math"));
        assert_eq!(model.total_max_marks, 150.0);
        assert_eq!(model.rows[0].name, "Alice");
        assert_eq!(model.rows[0].total_marks, None);
        assert_eq!(model.rows[0].average, None);

        let bob = &model.rows[1];
        assert_eq!(bob.total_marks, Some(105.0));
        // 80% * 20/100 + 50% * 10/100
        assert_eq!(bob.total_weighted, Some(21.0));
        assert_eq!(bob.cells[1].percent, Some(50.0));
        // (80*20 + 50*10) / 30
        assert_eq!(bob.average, Some(70.0));
        assert_eq!(model.class_average, Some(70.0));
    }
}
