use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const IN_MEMORY: &str = ":memory:";

pub fn open_db(path: &str) -> anyhow::Result<Connection> {
    let conn = if path == IN_MEMORY {
        Connection::open_in_memory()?
    } else {
        let db_path = Path::new(path);
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        Connection::open(db_path)
            .with_context(|| format!("failed to open database {}", path))?
    };
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'student',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            enrollment TEXT NOT NULL UNIQUE,
            semester TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    // Databases created before edits were tracked lack updated_at.
    ensure_students_updated_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_semester ON students(semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_name TEXT NOT NULL,
            course_code TEXT NOT NULL UNIQUE,
            semester TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            course_code TEXT NOT NULL,
            date TEXT NOT NULL,
            present INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(student_id, course_code, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_course_date ON attendance(course_code, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_marks(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL CHECK(length(student_id) > 0),
            course_code TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            marks TEXT NOT NULL CHECK(json_valid(marks) AND json_type(marks) = 'array'),
            created_at TEXT NOT NULL,
            FOREIGN KEY(course_code) REFERENCES courses(course_code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_marks_student ON student_marks(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_marks_course_exam ON student_marks(course_code, exam_type)",
        [],
    )?;

    Ok(())
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn ensure_students_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_schema_has_tracked_columns() {
        let conn = open_db(IN_MEMORY).expect("open");
        assert!(table_has_column(&conn, "students", "updated_at").expect("pragma"));
        assert!(table_has_column(&conn, "attendance", "present").expect("pragma"));
        assert!(!table_has_column(&conn, "courses", "enrollment").expect("pragma"));
    }

    #[test]
    fn older_students_table_gains_updated_at() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE students(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                enrollment TEXT NOT NULL UNIQUE,
                semester TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .expect("create legacy table");
        conn.execute(
            "INSERT INTO students(first_name, last_name, enrollment, semester, created_at)
             VALUES('Ada', 'Lovelace', 'S1', '3', '2024-01-01')",
            [],
        )
        .expect("seed");

        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "students", "updated_at").expect("pragma"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);

        // Running the schema twice is a no-op.
        init_schema(&conn).expect("re-run");
    }

    #[test]
    fn marks_reject_empty_student_and_non_array() {
        let conn = open_db(IN_MEMORY).expect("open");
        conn.execute(
            "INSERT INTO courses(course_name, course_code, semester, created_at)
             VALUES('Intro', 'CS101', '1', '2024-01-01')",
            [],
        )
        .expect("course");
        let insert = "INSERT INTO student_marks(student_id, course_code, exam_type, marks, created_at)
                      VALUES(?, 'CS101', 'mst1', ?, '2024-01-01')";
        assert!(conn.execute(insert, ("S1", "[1, \"2\"]")).is_ok());
        assert!(conn.execute(insert, ("", "[1]")).is_err());
        assert!(conn.execute(insert, ("S1", "{\"q\": 1}")).is_err());
    }
}
