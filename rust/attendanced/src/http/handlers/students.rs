use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

use super::read_upload_form;
use crate::db::now_stamp;
use crate::http::error::{message, ApiError, ApiResult};
use crate::http::extract::{optional, required, ApiJson, ApiQuery};
use crate::http::types::AppState;
use crate::models::Student;
use crate::upload::{self, StudentRow};

const DUPLICATE_ENROLLMENT: &str = "Enrollment number already exists";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudentParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enrollment: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteStudentParams {
    pub enrollment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStudentParams {
    pub enrollment_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentParams {
    pub enrollment_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListStudentsParams {
    pub semester: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub enrollment: String,
    pub semester: String,
}

pub fn insert_student(conn: &Connection, s: &NewStudent) -> ApiResult<i64> {
    conn.execute(
        "INSERT INTO students(first_name, last_name, enrollment, semester, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (&s.first_name, &s.last_name, &s.enrollment, &s.semester, now_stamp()),
    )
    .map_err(|e| ApiError::storage_or_conflict(e, DUPLICATE_ENROLLMENT))?;
    Ok(conn.last_insert_rowid())
}

pub fn find_student(conn: &Connection, enrollment: &str) -> ApiResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE enrollment = ?", Student::COLUMNS);
    Ok(conn.query_row(&sql, [enrollment], Student::from_row).optional()?)
}

pub fn list_students(conn: &Connection, semester: Option<&str>) -> ApiResult<Vec<Student>> {
    let sql = format!(
        "SELECT {} FROM students
         WHERE (?1 IS NULL OR semester = ?1)
         ORDER BY id",
        Student::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([semester], Student::from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

/// Returns the number of rows removed (0 or 1).
pub fn delete_student(conn: &Connection, enrollment: &str) -> ApiResult<usize> {
    Ok(conn.execute("DELETE FROM students WHERE enrollment = ?", [enrollment])?)
}

/// Absent fields keep their stored value; returns the number of rows touched.
pub fn update_student(
    conn: &Connection,
    enrollment: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    semester: Option<&str>,
) -> ApiResult<usize> {
    Ok(conn.execute(
        "UPDATE students SET
           first_name = COALESCE(?, first_name),
           last_name = COALESCE(?, last_name),
           semester = COALESCE(?, semester),
           updated_at = ?
         WHERE enrollment = ?",
        (first_name, last_name, semester, now_stamp(), enrollment),
    )?)
}

fn import_students_file(state: &AppState, path: &Path, semester: &str) -> ApiResult<usize> {
    let rows: Vec<StudentRow> =
        upload::parse_rows(path).map_err(|e| ApiError::bad_params(format!("{:#}", e)))?;
    let conn = state.db()?;
    let mut inserted = 0;
    for row in rows {
        insert_student(
            &conn,
            &NewStudent {
                first_name: row.first_name,
                last_name: row.last_name,
                enrollment: row.enrollment,
                semester: semester.to_string(),
            },
        )?;
        inserted += 1;
    }
    Ok(inserted)
}

pub async fn handle_manual_entry(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<NewStudentParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let student = NewStudent {
        first_name: required(params.first_name, "firstName")?,
        last_name: required(params.last_name, "lastName")?,
        enrollment: required(params.enrollment, "enrollment")?,
        semester: required(params.semester, "semester")?,
    };
    let conn = state.db()?;
    insert_student(&conn, &student)?;
    info!(enrollment = %student.enrollment, "student added");
    Ok((StatusCode::CREATED, message("Student added successfully")))
}

pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = read_upload_form(multipart).await?;
    let path = upload::store(&state.config.upload_dir, &form.file_name, &form.bytes).await?;
    let result = import_students_file(&state, &path, &form.semester);
    upload::discard(&path);
    let inserted = result?;
    info!(inserted, semester = %form.semester, "students uploaded");
    Ok(Json(json!({ "message": "File uploaded", "inserted": inserted })))
}

pub async fn handle_delete_student(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<DeleteStudentParams>,
) -> ApiResult<Json<Value>> {
    let enrollment = required(params.enrollment, "enrollment")?;
    let conn = state.db()?;
    if delete_student(&conn, &enrollment)? == 0 {
        return Err(ApiError::not_found("Student not found"));
    }
    info!(enrollment = %enrollment, "student deleted");
    Ok(message("Student deleted successfully"))
}

pub async fn handle_get_student(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<GetStudentParams>,
) -> ApiResult<Json<Student>> {
    let enrollment = required(params.enrollment_number, "enrollmentNumber")?;
    let conn = state.db()?;
    find_student(&conn, &enrollment)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

pub async fn handle_update_student(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<UpdateStudentParams>,
) -> ApiResult<Json<Value>> {
    let enrollment = required(params.enrollment_number, "enrollmentNumber")?;
    let first_name = optional(params.first_name);
    let last_name = optional(params.last_name);
    let semester = optional(params.semester);
    let conn = state.db()?;
    let updated = update_student(
        &conn,
        &enrollment,
        first_name.as_deref(),
        last_name.as_deref(),
        semester.as_deref(),
    )?;
    if updated == 0 {
        return Err(ApiError::not_found("Student not found"));
    }
    info!(enrollment = %enrollment, "student updated");
    Ok(message("Student updated successfully"))
}

pub async fn handle_list_students(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListStudentsParams>,
) -> ApiResult<Json<Vec<Student>>> {
    let semester = optional(params.semester);
    let conn = state.db()?;
    Ok(Json(list_students(&conn, semester.as_deref())?))
}
