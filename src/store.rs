// 📚 Record Store - the only component allowed to touch student rows
//
// One handle wraps one SQLite connection behind a mutex. Every operation
// locks, runs inside a single transaction, and releases before returning.

use chrono::Utc;
use log::{error, info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::{
    self, format_timestamp, student_from_row, ADMITTED_PREDICATE, STUDENT_COLUMNS,
};
use crate::demo::demo_students;
use crate::error::{StoreError, StoreResult};
use crate::student::{validate_identity_format, Grades, NewStudent, RemovedStudent, Student};

/// Totals reported by `stats()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub admitted: i64,
}

/// Outcome of loading the demo data set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemoLoadReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open (or create) a file-backed store
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = db::open_database(path).map_err(|e| {
            error!("event=store_open status=error path={} error={}", path.display(), e);
            StoreError::from(e)
        })?;
        info!("event=store_open status=ok path={}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// In-memory store, gone when the handle is dropped
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        RecordStore {
            conn: Mutex::new(conn),
        }
    }

    // A panic while holding the lock cannot leave a half-applied transaction
    // behind (it rolls back on drop), so the connection is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Format check, then uniqueness check against the stored rows
    pub fn validate_identity(&self, identity: &str) -> StoreResult<()> {
        validate_identity_format(identity)?;
        let conn = self.lock();
        if identity_exists(&conn, identity)? {
            return Err(StoreError::DuplicateIdentity(identity.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    pub fn add_student(&self, new: &NewStudent) -> StoreResult<Student> {
        let result = self.try_add_student(new);
        log_outcome("student_add", &new.identity, &result);
        result
    }

    fn try_add_student(&self, new: &NewStudent) -> StoreResult<Student> {
        validate_identity_format(&new.identity)?;

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Identity errors win over field errors
        if identity_exists(&tx, &new.identity)? {
            return Err(StoreError::DuplicateIdentity(new.identity.clone()));
        }
        new.validate_fields()?;

        let student = Student {
            identity: new.identity.clone(),
            last_name: new.last_name.clone(),
            first_name: new.first_name.clone(),
            age: new.age,
            track: new.track.clone(),
            grade_math: new.grades.math,
            grade_physics: new.grades.physics,
            grade_info: new.grades.info,
            average: new.grades.average(),
            registered_at: Utc::now(),
        };

        insert_student(&tx, &student)?;
        tx.commit()?;

        Ok(student)
    }

    /// Replace all three grades and recompute the average
    pub fn update_grades(&self, identity: &str, grades: Grades) -> StoreResult<Student> {
        let result = self.try_update_grades(identity, grades);
        log_outcome("grades_update", identity, &result);
        result
    }

    fn try_update_grades(&self, identity: &str, grades: Grades) -> StoreResult<Student> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !identity_exists(&tx, identity)? {
            return Err(StoreError::NotFound(identity.to_string()));
        }
        grades.validate()?;

        tx.execute(
            "UPDATE students
             SET grade_math = ?1, grade_physics = ?2, grade_info = ?3, average = ?4
             WHERE identity = ?5",
            params![grades.math, grades.physics, grades.info, grades.average(), identity],
        )?;

        let student = select_student(&tx, identity)?
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
        tx.commit()?;

        Ok(student)
    }

    pub fn remove_student(&self, identity: &str) -> StoreResult<RemovedStudent> {
        let result = self.try_remove_student(identity);
        log_outcome("student_remove", identity, &result);
        result
    }

    fn try_remove_student(&self, identity: &str) -> StoreResult<RemovedStudent> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx
            .query_row(
                "SELECT last_name, first_name FROM students WHERE identity = ?1",
                [identity],
                |row| {
                    Ok(RemovedStudent {
                        last_name: row.get(0)?,
                        first_name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;

        tx.execute("DELETE FROM students WHERE identity = ?1", [identity])?;
        tx.commit()?;

        Ok(removed)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn find_student(&self, identity: &str) -> StoreResult<Option<Student>> {
        let conn = self.lock();
        Ok(select_student(&conn, identity)?)
    }

    /// Every student, by last name then first name
    pub fn list_all(&self) -> StoreResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students ORDER BY last_name, first_name, identity",
            STUDENT_COLUMNS
        );
        self.query_students(&sql)
    }

    /// Admitted students, best average first
    pub fn list_admitted(&self) -> StoreResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students WHERE {}
             ORDER BY average DESC, last_name, first_name, identity",
            STUDENT_COLUMNS, ADMITTED_PREDICATE
        );
        self.query_students(&sql)
    }

    pub fn count_all(&self) -> StoreResult<i64> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?)
    }

    pub fn count_admitted(&self) -> StoreResult<i64> {
        let conn = self.lock();
        let sql = format!("SELECT COUNT(*) FROM students WHERE {}", ADMITTED_PREDICATE);
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            total: self.count_all()?,
            admitted: self.count_admitted()?,
        })
    }

    fn query_students(&self, sql: &str) -> StoreResult<Vec<Student>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;

        let students = stmt
            .query_map([], student_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(students)
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Drop and recreate the schema. The handle stays valid.
    pub fn reset(&self) -> StoreResult<()> {
        let mut conn = self.lock();
        db::reset_database(&mut conn)?;
        warn!("event=store_reset status=ok");
        Ok(())
    }

    /// Insert the fixed sample students, skipping identities already present
    pub fn load_demo_data(&self) -> StoreResult<DemoLoadReport> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut report = DemoLoadReport::default();

        for new in demo_students() {
            let student = Student {
                identity: new.identity.clone(),
                last_name: new.last_name,
                first_name: new.first_name,
                age: new.age,
                track: new.track,
                grade_math: new.grades.math,
                grade_physics: new.grades.physics,
                grade_info: new.grades.info,
                average: new.grades.average(),
                registered_at: Utc::now(),
            };

            match insert_student(&tx, &student) {
                Ok(()) => report.inserted.push(new.identity),
                Err(StoreError::DuplicateIdentity(_)) => {
                    warn!("event=demo_load status=skipped identity={}", new.identity);
                    report.skipped.push(new.identity);
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        info!(
            "event=demo_load status=ok inserted={} skipped={}",
            report.inserted.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

// ============================================================================
// SQL HELPERS
// ============================================================================

fn identity_exists(conn: &Connection, identity: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE identity = ?1)",
        [identity],
        |row| row.get(0),
    )
}

fn select_student(conn: &Connection, identity: &str) -> rusqlite::Result<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE identity = ?1", STUDENT_COLUMNS);
    conn.query_row(&sql, [identity], student_from_row).optional()
}

/// Insert a row. A primary key violation means another writer got there first.
fn insert_student(conn: &Connection, student: &Student) -> StoreResult<()> {
    let result = conn.execute(
        "INSERT INTO students (
            identity, last_name, first_name, age, track,
            grade_math, grade_physics, grade_info, average, registered_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            student.identity,
            student.last_name,
            student.first_name,
            student.age,
            student.track,
            student.grade_math,
            student.grade_physics,
            student.grade_info,
            student.average,
            format_timestamp(&student.registered_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Err(StoreError::DuplicateIdentity(student.identity.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

fn log_outcome<T>(event: &str, identity: &str, result: &StoreResult<T>) {
    match result {
        Ok(_) => info!("event={} status=ok identity={}", event, identity),
        Err(StoreError::Storage(e)) => {
            error!("event={} status=error identity={} error={}", event, identity, e)
        }
        Err(e) => warn!(
            "event={} status=rejected identity={} kind={}",
            event,
            identity,
            e.kind()
        ),
    }
}
