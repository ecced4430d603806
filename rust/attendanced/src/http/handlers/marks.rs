use anyhow::Context;
use axum::extract::State;
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::students::list_students;
use crate::db::now_stamp;
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::{optional, required, ApiJson, ApiPath, ApiQuery};
use crate::http::types::AppState;
use crate::models::{MarksEntry, Student};
use crate::views::{self, MarksSheet};

const DEFAULT_QUESTIONS: usize = 3;
const MAX_QUESTIONS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarks {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub marks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMarksParams {
    pub marks_data: Option<Vec<StudentMarks>>,
    pub course_id: Option<String>,
    pub exam_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksQuery {
    pub semester: Option<String>,
    pub course_code: Option<String>,
    pub exam_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSheetQuery {
    pub semester: Option<String>,
    pub course_code: Option<String>,
    pub exam_type: Option<String>,
    pub num_questions: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithMarks {
    #[serde(flatten)]
    pub student: Student,
    pub student_marks: Vec<MarksEntry>,
}

fn insert_all(
    conn: &Connection,
    course_code: &str,
    exam_type: &str,
    batch: &[StudentMarks],
) -> ApiResult<usize> {
    let now = now_stamp();
    let mut stmt = conn.prepare(
        "INSERT INTO student_marks(student_id, course_code, exam_type, marks, created_at)
         VALUES(?, ?, ?, ?, ?)",
    )?;
    for entry in batch {
        let marks = serde_json::to_string(&entry.marks).context("failed to encode marks")?;
        stmt.execute((&entry.student_id, course_code, exam_type, &marks, &now))?;
    }
    Ok(batch.len())
}

/// Saves one entry per student; either every entry commits or none does.
pub fn save_marks(
    conn: &Connection,
    course_code: &str,
    exam_type: &str,
    batch: &[StudentMarks],
) -> ApiResult<usize> {
    let tx = conn.unchecked_transaction()?;
    match insert_all(&tx, course_code, exam_type, batch) {
        Ok(saved) => {
            tx.commit()?;
            Ok(saved)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

pub fn list_marks(
    conn: &Connection,
    student_id: Option<&str>,
    course_code: Option<&str>,
    exam_type: Option<&str>,
) -> ApiResult<Vec<MarksEntry>> {
    let sql = format!(
        "SELECT {} FROM student_marks
         WHERE (?1 IS NULL OR student_id = ?1)
           AND (?2 IS NULL OR course_code = ?2)
           AND (?3 IS NULL OR exam_type = ?3)
         ORDER BY id",
        MarksEntry::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((student_id, course_code, exam_type), MarksEntry::from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub async fn handle_save_marks(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<SaveMarksParams>,
) -> ApiResult<Json<Value>> {
    let (Some(batch), Some(course_code), Some(exam_type)) = (
        params.marks_data,
        optional(params.course_id),
        optional(params.exam_type),
    ) else {
        return Err(ApiError::bad_params("Invalid data"));
    };

    let conn = state.db()?;
    let saved = save_marks(&conn, &course_code, &exam_type, &batch).map_err(|e| {
        warn!(course_code = %course_code, exam_type = %exam_type, "marks batch rolled back");
        e
    })?;
    info!(course_code = %course_code, exam_type = %exam_type, saved, "marks saved");
    Ok(Json(json!({ "message": "Marks saved successfully", "saved": saved })))
}

pub async fn handle_student_marks(
    State(state): State<AppState>,
    ApiPath(enrollment): ApiPath<String>,
) -> ApiResult<Json<Vec<MarksEntry>>> {
    let conn = state.db()?;
    Ok(Json(list_marks(&conn, Some(enrollment.trim()), None, None)?))
}

pub async fn handle_semester_marks(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<MarksQuery>,
) -> ApiResult<Json<Vec<StudentWithMarks>>> {
    let semester = required(params.semester, "semester")?;
    let exam_type = required(params.exam_type, "examType")?;
    let course_code = optional(params.course_code);

    let conn = state.db()?;
    let students = list_students(&conn, Some(&semester))?;
    let entries = list_marks(&conn, None, course_code.as_deref(), Some(&exam_type))?;
    let rows = students
        .into_iter()
        .map(|student| {
            let student_marks = entries
                .iter()
                .filter(|e| e.student_id == student.enrollment)
                .cloned()
                .collect();
            StudentWithMarks {
                student,
                student_marks,
            }
        })
        .collect();
    Ok(Json(rows))
}

pub async fn handle_marks_sheet(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<MarksSheetQuery>,
) -> ApiResult<Json<MarksSheet>> {
    let semester = required(params.semester, "semester")?;
    let course_code = required(params.course_code, "courseCode")?;
    let exam_type = required(params.exam_type, "examType")?;
    let num_questions = params.num_questions.unwrap_or(DEFAULT_QUESTIONS);
    if num_questions > MAX_QUESTIONS {
        return Err(ApiError::bad_params(format!(
            "numQuestions must be at most {}",
            MAX_QUESTIONS
        )));
    }

    let conn = state.db()?;
    let students = list_students(&conn, Some(&semester))?;
    let saved = list_marks(&conn, None, Some(&course_code), Some(&exam_type))?;
    Ok(Json(views::marks_sheet(
        &semester,
        &course_code,
        &exam_type,
        num_questions,
        &students,
        &saved,
    )))
}
