use chrono::NaiveDate;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub const COLUMNS: &'static str = "id, email, password_hash, role";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        let role: String = r.get(3)?;
        Ok(Self {
            id: r.get(0)?,
            email: r.get(1)?,
            password_hash: r.get(2)?,
            // Rows written by this crate always carry a known role.
            role: role.parse().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub enrollment: String,
    pub semester: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Student {
    pub const COLUMNS: &'static str =
        "id, first_name, last_name, enrollment, semester, created_at, updated_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            first_name: r.get(1)?,
            last_name: r.get(2)?,
            enrollment: r.get(3)?,
            semester: r.get(4)?,
            created_at: r.get(5)?,
            updated_at: r.get(6)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub course_name: String,
    pub course_code: String,
    pub semester: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Course {
    pub const COLUMNS: &'static str =
        "id, course_name, course_code, semester, created_at, updated_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            course_name: r.get(1)?,
            course_code: r.get(2)?,
            semester: r.get(3)?,
            created_at: r.get(4)?,
            updated_at: r.get(5)?,
        })
    }
}

/// One attendance mark. `student_id` is the student's enrollment string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: String,
    pub course_code: String,
    pub date: NaiveDate,
    pub present: bool,
}

impl AttendanceRecord {
    pub const COLUMNS: &'static str = "id, student_id, course_code, date, present";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            student_id: r.get(1)?,
            course_code: r.get(2)?,
            date: r.get(3)?,
            present: r.get::<_, i64>(4)? != 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksEntry {
    pub id: i64,
    pub student_id: String,
    pub course_code: String,
    pub exam_type: String,
    pub marks: Vec<serde_json::Value>,
    pub created_at: String,
}

impl MarksEntry {
    pub const COLUMNS: &'static str = "id, student_id, course_code, exam_type, marks, created_at";

    pub fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: String = r.get(4)?;
        let marks = serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: r.get(0)?,
            student_id: r.get(1)?,
            course_code: r.get(2)?,
            exam_type: r.get(3)?,
            marks,
            created_at: r.get(5)?,
        })
    }
}
