// 🗄️ Storage layer - schema, connection setup and typed row decoding

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;
use std::time::Duration;

use crate::student::Student;

/// How long a writer waits on a locked database file before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Column list shared by every student query, in `student_from_row` order
pub const STUDENT_COLUMNS: &str = "identity, last_name, first_name, age, track,
    grade_math, grade_physics, grade_info, average, registered_at";

/// Predicate shared by `list_admitted` and `count_admitted`
pub const ADMITTED_PREDICATE: &str = "average >= 10";

const CREATE_STUDENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS students (
    identity TEXT PRIMARY KEY CHECK (length(identity) = 8),
    last_name TEXT NOT NULL,
    first_name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age > 0),
    track TEXT NOT NULL,
    grade_math REAL CHECK (grade_math >= 0 AND grade_math <= 20),
    grade_physics REAL CHECK (grade_physics >= 0 AND grade_physics <= 20),
    grade_info REAL CHECK (grade_info >= 0 AND grade_info <= 20),
    average REAL,
    registered_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Open a database file and prepare it for use
pub fn open_database(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    // WAL keeps readers off the writer's back and survives crashes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(CREATE_STUDENTS_TABLE, [])?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_name ON students(last_name, first_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_average ON students(average)",
        [],
    )?;

    Ok(())
}

/// Drop and recreate the students table in one transaction
pub fn reset_database(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DROP TABLE IF EXISTS students", [])?;
    setup_database(&tx)?;
    tx.commit()
}

/// Decode one row selected with `STUDENT_COLUMNS`
pub fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let registered_at: String = row.get(9)?;

    Ok(Student {
        identity: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        age: row.get(3)?,
        track: row.get(4)?,
        grade_math: row.get(5)?,
        grade_physics: row.get(6)?,
        grade_info: row.get(7)?,
        average: row.get(8)?,
        registered_at: parse_timestamp(&registered_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
    })
}

/// Accept RFC 3339 (written by the store) and SQLite's `CURRENT_TIMESTAMP` format
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()),
    }
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        assert_eq!(table_count(&conn), 0);
    }

    #[test]
    fn test_reset_drops_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        conn.execute(
            "INSERT INTO students (identity, last_name, first_name, age, track)
             VALUES ('12345678', 'Dupont', 'Jean', 20, 'Informatique')",
            [],
        )
        .unwrap();
        assert_eq!(table_count(&conn), 1);

        reset_database(&mut conn).unwrap();
        assert_eq!(table_count(&conn), 0);
    }

    #[test]
    fn test_check_constraints_reject_bad_rows() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let out_of_range = conn.execute(
            "INSERT INTO students (identity, last_name, first_name, age, track, grade_math)
             VALUES ('12345678', 'Dupont', 'Jean', 20, 'Informatique', 21.0)",
            [],
        );
        assert!(out_of_range.is_err());

        let short_identity = conn.execute(
            "INSERT INTO students (identity, last_name, first_name, age, track)
             VALUES ('1234567', 'Dupont', 'Jean', 20, 'Informatique')",
            [],
        );
        assert!(short_identity.is_err());
        assert_eq!(table_count(&conn), 0);
    }

    #[test]
    fn test_decode_default_timestamp_and_nulls() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        conn.execute(
            "INSERT INTO students (identity, last_name, first_name, age, track)
             VALUES ('12345678', 'Dupont', 'Jean', 20, 'Informatique')",
            [],
        )
        .unwrap();

        let sql = format!("SELECT {} FROM students", STUDENT_COLUMNS);
        let student = conn.query_row(&sql, [], student_from_row).unwrap();

        assert_eq!(student.identity, "12345678");
        assert_eq!(student.age, 20);
        assert_eq!(student.grade_math, None);
        assert_eq!(student.average, None);
        assert!(student.registered_at <= Utc::now());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let sqlite = parse_timestamp("2024-09-01 08:30:00").unwrap();
        assert_eq!((sqlite.year(), sqlite.month(), sqlite.hour()), (2024, 9, 8));

        let rfc = parse_timestamp("2024-09-01T08:30:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 6);

        assert!(parse_timestamp("yesterday").is_err());
    }
}
