use super::{Backend, GradeStore};
use crate::error::{GradebookError, Result};
use crate::integrity;
use crate::model::{
    DeleteOutcome, Evaluation, EvaluationPatch, Grade, GradeEntry, GradeFilter, NewEvaluation,
    NewStudent, Snapshot, Student, StudentPatch, Subject,
};
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use tracing::{debug, warn};

pub const DB_FILE: &str = "gradebook.sqlite3";

const STUDENT_COLS: &str = "id, name, grade, roll_number";
const EVALUATION_COLS: &str = "id, title, grade, subject_id, max_score, weight, date, notes";
const ENTRY_COLS: &str = "id, student_id, evaluation_id, score";

/// Relational backend. Ids are `INTEGER PRIMARY KEY` rowids: SQLite hands out
/// `max(id) + 1` (or 1 on an empty table) inside the write transaction, which is
/// the same rule as `integrity::next_id` but atomic. Subject ids are assigned
/// explicitly so they also skip ids still referenced by evaluations.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> Result<Self> {
        let conn = Connection::open(workspace.join(DB_FILE))?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            grade INTEGER NOT NULL CHECK(grade BETWEEN 6 AND 12),
            roll_number TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_grade ON students(grade)",
        [],
    )?;

    // No foreign key on subject_id: deleting a subject leaves its evaluations
    // in place.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS evaluations(
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            grade INTEGER NOT NULL CHECK(grade BETWEEN 6 AND 12),
            subject_id INTEGER NOT NULL,
            max_score REAL NOT NULL CHECK(max_score > 0),
            weight REAL NOT NULL CHECK(weight > 0),
            date TEXT NOT NULL,
            notes TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evaluations_grade_subject ON evaluations(grade, subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_entries(
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            evaluation_id INTEGER NOT NULL,
            score REAL CHECK(score IS NULL OR score >= 0),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(evaluation_id) REFERENCES evaluations(id),
            UNIQUE(student_id, evaluation_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_entries_evaluation ON grade_entries(evaluation_id)",
        [],
    )?;

    // Workspaces created before roll numbers and evaluation notes existed.
    if !table_has_column(conn, "students", "roll_number")? {
        conn.execute(
            "ALTER TABLE students ADD COLUMN roll_number TEXT NOT NULL DEFAULT ''",
            [],
        )?;
        debug!("migrated students: added roll_number");
    }
    if !table_has_column(conn, "evaluations", "notes")? {
        conn.execute("ALTER TABLE evaluations ADD COLUMN notes TEXT", [])?;
        debug!("migrated evaluations: added notes");
    }

    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn conversion_err(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

fn grade_at(row: &Row, idx: usize) -> rusqlite::Result<Grade> {
    let raw: i64 = row.get(idx)?;
    Grade::try_from(raw).map_err(|m| conversion_err(idx, Type::Integer, m))
}

fn date_at(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| conversion_err(idx, Type::Text, format!("bad date {raw:?}: {e}")))
}

fn subject_row(row: &Row) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn student_row(row: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        grade: grade_at(row, 2)?,
        roll_number: row.get(3)?,
    })
}

fn evaluation_row(row: &Row) -> rusqlite::Result<Evaluation> {
    Ok(Evaluation {
        id: row.get(0)?,
        title: row.get(1)?,
        grade: grade_at(row, 2)?,
        subject_id: row.get(3)?,
        max_score: row.get(4)?,
        weight: row.get(5)?,
        date: date_at(row, 6)?,
        notes: row.get(7)?,
    })
}

fn entry_row(row: &Row) -> rusqlite::Result<GradeEntry> {
    Ok(GradeEntry {
        id: row.get(0)?,
        student_id: row.get(1)?,
        evaluation_id: row.get(2)?,
        score: row.get(3)?,
    })
}

fn date_text(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn find_student(conn: &Connection, id: i64) -> Result<Student> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLS} FROM students WHERE id = ?"),
        [id],
        student_row,
    )
    .optional()?
    .ok_or_else(|| GradebookError::not_found("student", id))
}

fn find_evaluation(conn: &Connection, id: i64) -> Result<Evaluation> {
    conn.query_row(
        &format!("SELECT {EVALUATION_COLS} FROM evaluations WHERE id = ?"),
        [id],
        evaluation_row,
    )
    .optional()?
    .ok_or_else(|| GradebookError::not_found("evaluation", id))
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?"), [id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn grade_of(conn: &Connection, table: &'static str, entity: &'static str, id: i64) -> Result<Grade> {
    conn.query_row(
        &format!("SELECT grade FROM {table} WHERE id = ?"),
        [id],
        |r| grade_at(r, 0),
    )
    .optional()?
    .ok_or_else(|| GradebookError::not_found(entity, id))
}

fn upsert_entry(
    tx: &Transaction,
    student_id: i64,
    evaluation_id: i64,
    evaluation_grade: Grade,
    score: Option<f64>,
) -> Result<GradeEntry> {
    let score = integrity::check_score(score)?;
    let student_grade = grade_of(tx, "students", "student", student_id)?;
    integrity::check_same_grade(student_id, student_grade, evaluation_id, evaluation_grade)?;
    let entry = tx.query_row(
        "INSERT INTO grade_entries(student_id, evaluation_id, score)
         VALUES(?, ?, ?)
         ON CONFLICT(student_id, evaluation_id) DO UPDATE SET
           score = excluded.score
         RETURNING id, student_id, evaluation_id, score",
        (student_id, evaluation_id, score),
        entry_row,
    )?;
    Ok(entry)
}

impl GradeStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let subjects = {
            let mut stmt = tx.prepare("SELECT id, name FROM subjects ORDER BY id")?;
            let rows = stmt.query_map([], subject_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let students = {
            let mut stmt = tx.prepare(&format!("SELECT {STUDENT_COLS} FROM students ORDER BY id"))?;
            let rows = stmt.query_map([], student_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let evaluations = {
            let mut stmt =
                tx.prepare(&format!("SELECT {EVALUATION_COLS} FROM evaluations ORDER BY id"))?;
            let rows = stmt.query_map([], evaluation_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let grade_entries = {
            let mut stmt =
                tx.prepare(&format!("SELECT {ENTRY_COLS} FROM grade_entries ORDER BY id"))?;
            let rows = stmt.query_map([], entry_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;
        Ok(Snapshot {
            subjects,
            students,
            evaluations,
            grade_entries,
        })
    }

    fn replace_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.transaction()?;
        // Dependency order (no ON DELETE CASCADE).
        tx.execute("DELETE FROM grade_entries", [])?;
        tx.execute("DELETE FROM evaluations", [])?;
        tx.execute("DELETE FROM students", [])?;
        tx.execute("DELETE FROM subjects", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO subjects(id, name) VALUES(?, ?)")?;
            for s in &snapshot.subjects {
                stmt.execute((s.id, &s.name))?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO students(id, name, grade, roll_number) VALUES(?, ?, ?, ?)",
            )?;
            for s in &snapshot.students {
                stmt.execute((s.id, &s.name, s.grade.get(), &s.roll_number))?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO evaluations(id, title, grade, subject_id, max_score, weight, date, notes)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for e in &snapshot.evaluations {
                stmt.execute((
                    e.id,
                    &e.title,
                    e.grade.get(),
                    e.subject_id,
                    e.max_score,
                    e.weight,
                    date_text(e.date),
                    &e.notes,
                ))?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO grade_entries(id, student_id, evaluation_id, score) VALUES(?, ?, ?, ?)",
            )?;
            for g in &snapshot.grade_entries {
                stmt.execute((g.id, g.student_id, g.evaluation_id, g.score))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM subjects ORDER BY id")?;
        let rows = stmt.query_map([], subject_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn create_subject(&mut self, name: &str) -> Result<Subject> {
        let name = integrity::clean_name("name", name)?;
        let tx = self.conn.transaction()?;
        let id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM (
                SELECT id FROM subjects
                UNION ALL
                SELECT subject_id FROM evaluations
             )",
            [],
            |r| r.get(0),
        )?;
        tx.execute("INSERT INTO subjects(id, name) VALUES(?, ?)", (id, &name))?;
        tx.commit()?;
        debug!(subject_id = id, "subject created");
        Ok(Subject { id, name })
    }

    fn update_subject(&mut self, id: i64, name: &str) -> Result<Subject> {
        let name = integrity::clean_name("name", name)?;
        let changed = self
            .conn
            .execute("UPDATE subjects SET name = ? WHERE id = ?", (&name, id))?;
        if changed == 0 {
            return Err(GradebookError::not_found("subject", id));
        }
        Ok(Subject { id, name })
    }

    fn delete_subject(&mut self, id: i64) -> Result<DeleteOutcome> {
        let tx = self.conn.transaction()?;
        if !exists(&tx, "subjects", id)? {
            return Err(GradebookError::not_found("subject", id));
        }
        let orphaned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM evaluations WHERE subject_id = ?",
            [id],
            |r| r.get(0),
        )?;
        tx.execute("DELETE FROM subjects WHERE id = ?", [id])?;
        tx.commit()?;
        if orphaned > 0 {
            warn!(subject_id = id, orphaned, "subject deleted with evaluations still referencing it");
        }
        Ok(DeleteOutcome {
            deleted: true,
            removed_grade_entries: None,
            orphaned_evaluations: Some(orphaned as usize),
        })
    }

    fn list_students(&self, grade: Option<Grade>) -> Result<Vec<Student>> {
        let mut sql = format!("SELECT {STUDENT_COLS} FROM students");
        let mut binds: Vec<Value> = Vec::new();
        if let Some(g) = grade {
            sql.push_str(" WHERE grade = ?");
            binds.push(Value::Integer(g.get()));
        }
        sql.push_str(" ORDER BY name, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), student_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn create_student(&mut self, new: &NewStudent) -> Result<Student> {
        let new = integrity::validate_new_student(new)?;
        self.conn.execute(
            "INSERT INTO students(name, grade, roll_number) VALUES(?, ?, ?)",
            (&new.name, new.grade.get(), &new.roll_number),
        )?;
        Ok(Student {
            id: self.conn.last_insert_rowid(),
            name: new.name,
            grade: new.grade,
            roll_number: new.roll_number,
        })
    }

    fn update_student(&mut self, id: i64, patch: &StudentPatch) -> Result<Student> {
        let tx = self.conn.transaction()?;
        let updated = integrity::apply_student_patch(&find_student(&tx, id)?, patch)?;
        tx.execute(
            "UPDATE students SET name = ?, grade = ?, roll_number = ? WHERE id = ?",
            (&updated.name, updated.grade.get(), &updated.roll_number, id),
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_student(&mut self, id: i64) -> Result<DeleteOutcome> {
        let tx = self.conn.transaction()?;
        if !exists(&tx, "students", id)? {
            return Err(GradebookError::not_found("student", id));
        }
        let removed = tx.execute("DELETE FROM grade_entries WHERE student_id = ?", [id])?;
        tx.execute("DELETE FROM students WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(DeleteOutcome {
            deleted: true,
            removed_grade_entries: Some(removed),
            orphaned_evaluations: None,
        })
    }

    fn list_evaluations(&self, grade: Grade, subject_id: i64) -> Result<Vec<Evaluation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVALUATION_COLS} FROM evaluations
             WHERE grade = ? AND subject_id = ?
             ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt.query_map((grade.get(), subject_id), evaluation_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn create_evaluation(&mut self, new: &NewEvaluation) -> Result<Evaluation> {
        let new = integrity::validate_new_evaluation(new)?;
        let date = new.date.unwrap_or_default();
        let tx = self.conn.transaction()?;
        if !exists(&tx, "subjects", new.subject_id)? {
            return Err(GradebookError::not_found("subject", new.subject_id));
        }
        tx.execute(
            "INSERT INTO evaluations(title, grade, subject_id, max_score, weight, date, notes)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &new.title,
                new.grade.get(),
                new.subject_id,
                new.max_score,
                new.weight,
                date_text(date),
                &new.notes,
            ),
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Evaluation {
            id,
            title: new.title,
            grade: new.grade,
            subject_id: new.subject_id,
            max_score: new.max_score,
            weight: new.weight,
            date,
            notes: new.notes,
        })
    }

    fn update_evaluation(&mut self, id: i64, patch: &EvaluationPatch) -> Result<Evaluation> {
        let tx = self.conn.transaction()?;
        let updated = integrity::apply_evaluation_patch(&find_evaluation(&tx, id)?, patch)?;
        tx.execute(
            "UPDATE evaluations
             SET title = ?, max_score = ?, weight = ?, date = ?, notes = ?
             WHERE id = ?",
            (
                &updated.title,
                updated.max_score,
                updated.weight,
                date_text(updated.date),
                &updated.notes,
                id,
            ),
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_evaluation(&mut self, id: i64) -> Result<DeleteOutcome> {
        let tx = self.conn.transaction()?;
        if !exists(&tx, "evaluations", id)? {
            return Err(GradebookError::not_found("evaluation", id));
        }
        let removed = tx.execute("DELETE FROM grade_entries WHERE evaluation_id = ?", [id])?;
        tx.execute("DELETE FROM evaluations WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(DeleteOutcome {
            deleted: true,
            removed_grade_entries: Some(removed),
            orphaned_evaluations: None,
        })
    }

    fn get_grade(&self, student_id: i64, evaluation_id: i64) -> Result<Option<f64>> {
        let score: Option<Option<f64>> = self
            .conn
            .query_row(
                "SELECT score FROM grade_entries WHERE student_id = ? AND evaluation_id = ?",
                (student_id, evaluation_id),
                |r| r.get(0),
            )
            .optional()?;
        Ok(score.flatten())
    }

    fn set_grade(
        &mut self,
        student_id: i64,
        evaluation_id: i64,
        score: Option<f64>,
    ) -> Result<GradeEntry> {
        let tx = self.conn.transaction()?;
        let evaluation_grade = grade_of(&tx, "evaluations", "evaluation", evaluation_id)?;
        let entry = upsert_entry(&tx, student_id, evaluation_id, evaluation_grade, score)?;
        tx.commit()?;
        Ok(entry)
    }

    fn set_grades(
        &mut self,
        evaluation_id: i64,
        scores: &[(i64, Option<f64>)],
    ) -> Result<Vec<GradeEntry>> {
        let tx = self.conn.transaction()?;
        let evaluation_grade = grade_of(&tx, "evaluations", "evaluation", evaluation_id)?;
        let mut out = Vec::with_capacity(scores.len());
        for &(student_id, score) in scores {
            out.push(upsert_entry(&tx, student_id, evaluation_id, evaluation_grade, score)?);
        }
        tx.commit()?;
        Ok(out)
    }

    fn list_grade_entries(&self, filter: &GradeFilter) -> Result<Vec<GradeEntry>> {
        let mut sql = String::from(
            "SELECT g.id, g.student_id, g.evaluation_id, g.score
             FROM grade_entries g
             JOIN evaluations e ON e.id = g.evaluation_id
             WHERE 1 = 1",
        );
        let mut binds: Vec<Value> = Vec::new();
        if let Some(v) = filter.student_id {
            sql.push_str(" AND g.student_id = ?");
            binds.push(Value::Integer(v));
        }
        if let Some(v) = filter.evaluation_id {
            sql.push_str(" AND g.evaluation_id = ?");
            binds.push(Value::Integer(v));
        }
        if let Some(g) = filter.grade {
            sql.push_str(" AND e.grade = ?");
            binds.push(Value::Integer(g.get()));
        }
        if let Some(v) = filter.subject_id {
            sql.push_str(" AND e.subject_id = ?");
            binds.push(Value::Integer(v));
        }
        if let Some(v) = filter.min_score {
            sql.push_str(" AND g.score IS NOT NULL AND g.score >= ?");
            binds.push(Value::Real(v));
        }
        if let Some(v) = filter.max_score {
            sql.push_str(" AND g.score IS NOT NULL AND g.score <= ?");
            binds.push(Value::Real(v));
        }
        sql.push_str(" ORDER BY g.id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), entry_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_class() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_subjects().unwrap();
        for name in ["Alice", "Bob"] {
            store
                .create_student(&NewStudent {
                    name: name.into(),
                    grade: Grade::try_from(6).unwrap(),
                    roll_number: String::new(),
                })
                .unwrap();
        }
        store
            .create_evaluation(&NewEvaluation {
                title: "Quiz".into(),
                grade: Grade::try_from(6).unwrap(),
                subject_id: 1,
                max_score: 100.0,
                weight: 20.0,
                date: NaiveDate::from_ymd_opt(2025, 1, 10),
                notes: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn seeds_defaults_once_with_sequential_ids() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.seed_default_subjects().unwrap(), 5);
        assert_eq!(store.seed_default_subjects().unwrap(), 0);
        let snap = store.snapshot().unwrap();
        let ids: Vec<i64> = snap.subjects.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(store.create_subject("Art").unwrap().id, 6);
    }

    #[test]
    fn ids_follow_max_plus_one_after_deletes() {
        let mut store = store_with_class();
        store.delete_student(1).unwrap();
        let next = store
            .create_student(&NewStudent {
                name: "Cara".into(),
                grade: Grade::try_from(6).unwrap(),
                roll_number: "7".into(),
            })
            .unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn upsert_is_idempotent_per_pair() {
        let mut store = store_with_class();
        let first = store.set_grade(1, 1, Some(90.0)).unwrap();
        let second = store.set_grade(1, 1, Some(90.0)).unwrap();
        assert_eq!(first.id, second.id);
        let entries = store
            .list_grade_entries(&GradeFilter {
                student_id: Some(1),
                ..GradeFilter::default()
            })
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, Some(90.0));
        assert_eq!(store.get_grade(1, 1).unwrap(), Some(90.0));
    }

    #[test]
    fn failed_bulk_save_leaves_nothing_behind() {
        let mut store = store_with_class();
        let res = store.set_grades(1, &[(1, Some(70.0)), (42, Some(80.0))]);
        assert!(matches!(res, Err(GradebookError::NotFound { .. })));
        assert!(store
            .list_grade_entries(&GradeFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn cascade_and_orphan_rules() {
        let mut store = store_with_class();
        store.set_grade(1, 1, Some(80.0)).unwrap();
        store.set_grade(2, 1, Some(60.0)).unwrap();

        let outcome = store.delete_subject(1).unwrap();
        assert_eq!(outcome.orphaned_evaluations, Some(1));
        assert_eq!(store.list_evaluations(Grade::try_from(6).unwrap(), 1).unwrap().len(), 1);

        let outcome = store.delete_evaluation(1).unwrap();
        assert_eq!(outcome.removed_grade_entries, Some(2));
        assert!(store
            .list_grade_entries(&GradeFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn replace_all_round_trips_snapshot() {
        let mut store = store_with_class();
        store.set_grade(2, 1, None).unwrap();
        let snap = store.snapshot().unwrap();

        let mut other = SqliteStore::open_in_memory().unwrap();
        other.replace_all(&snap).unwrap();
        assert_eq!(other.snapshot().unwrap(), snap);
    }

    #[test]
    fn old_workspace_gains_missing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE students(id INTEGER PRIMARY KEY, name TEXT NOT NULL, grade INTEGER NOT NULL);
             CREATE TABLE evaluations(id INTEGER PRIMARY KEY, title TEXT NOT NULL,
                 grade INTEGER NOT NULL, subject_id INTEGER NOT NULL, max_score REAL NOT NULL,
                 weight REAL NOT NULL, date TEXT NOT NULL);
             INSERT INTO students(id, name, grade) VALUES (1, 'Ana', 7);",
        )
        .unwrap();

        init_schema(&conn).unwrap();
        assert!(table_has_column(&conn, "students", "roll_number").unwrap());
        assert!(table_has_column(&conn, "evaluations", "notes").unwrap());

        let store = SqliteStore { conn };
        let students = store.list_students(None).unwrap();
        assert_eq!(students[0].roll_number, "");
    }

    #[test]
    fn deleted_subject_id_is_not_reused_while_evaluations_hold_it() {
        let mut store = store_with_class();
        let grade = Grade::try_from(6).unwrap();
        store
            .create_evaluation(&NewEvaluation {
                title: "Laps".into(),
                grade,
                subject_id: 5,
                max_score: 10.0,
                weight: 5.0,
                date: NaiveDate::from_ymd_opt(2025, 2, 1),
                notes: None,
            })
            .unwrap();
        store.delete_subject(5).unwrap();

        let next = store.create_subject("Drama").unwrap();
        assert_eq!(next.id, 6);
        assert!(store.list_evaluations(grade, next.id).unwrap().is_empty());
        assert_eq!(store.list_evaluations(grade, 5).unwrap().len(), 1);
    }

    #[test]
    fn subjects_list_in_id_order() {
        let store = store_with_class();
        let names: Vec<String> = store
            .list_subjects()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec!["Math", "Science", "English", "Social Studies", "Physical Education"]
        );
    }

    #[test]
    fn cross_grade_score_is_rejected() {
        let mut store = store_with_class();
        let other = store
            .create_student(&NewStudent {
                name: "Dan".into(),
                grade: Grade::try_from(7).unwrap(),
                roll_number: String::new(),
            })
            .unwrap();
        let res = store.set_grade(other.id, 1, Some(50.0));
        assert!(matches!(res, Err(GradebookError::Validation { field: "studentId", .. })));
        let res = store.set_grades(1, &[(1, Some(70.0)), (other.id, Some(80.0))]);
        assert!(matches!(res, Err(GradebookError::Validation { .. })));
        assert!(store
            .list_grade_entries(&GradeFilter::default())
            .unwrap()
            .is_empty());
    }
}
