use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

use super::read_upload_form;
use crate::db::now_stamp;
use crate::http::error::{message, ApiError, ApiResult};
use crate::http::extract::{optional, required, ApiJson, ApiPath};
use crate::http::types::AppState;
use crate::models::Course;
use crate::upload::{self, CourseRow};

const DUPLICATE_COURSE: &str = "Course code already exists";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseParams {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseParams {
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub semester: Option<String>,
}

/// Row of the course picker list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOption {
    pub course_code: String,
    pub course_name: String,
    pub semester: String,
}

pub fn insert_course(conn: &Connection, name: &str, code: &str, semester: &str) -> ApiResult<i64> {
    conn.execute(
        "INSERT INTO courses(course_name, course_code, semester, created_at) VALUES(?, ?, ?, ?)",
        (name, code, semester, now_stamp()),
    )
    .map_err(|e| ApiError::storage_or_conflict(e, DUPLICATE_COURSE))?;
    Ok(conn.last_insert_rowid())
}

pub fn find_course(conn: &Connection, code: &str) -> ApiResult<Option<Course>> {
    let sql = format!("SELECT {} FROM courses WHERE course_code = ?", Course::COLUMNS);
    Ok(conn.query_row(&sql, [code], Course::from_row).optional()?)
}

pub fn update_course(
    conn: &Connection,
    code: &str,
    name: Option<&str>,
    semester: Option<&str>,
) -> ApiResult<usize> {
    Ok(conn.execute(
        "UPDATE courses SET
           course_name = COALESCE(?, course_name),
           semester = COALESCE(?, semester),
           updated_at = ?
         WHERE course_code = ?",
        (name, semester, now_stamp(), code),
    )?)
}

pub fn list_course_options(conn: &Connection) -> ApiResult<Vec<CourseOption>> {
    let mut stmt = conn.prepare(
        "SELECT course_code, course_name, semester FROM courses ORDER BY course_code",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(CourseOption {
                course_code: r.get(0)?,
                course_name: r.get(1)?,
                semester: r.get(2)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

fn import_courses_file(state: &AppState, path: &Path, semester: &str) -> ApiResult<usize> {
    let rows: Vec<CourseRow> =
        upload::parse_rows(path).map_err(|e| ApiError::bad_params(format!("{:#}", e)))?;
    let conn = state.db()?;
    let mut inserted = 0;
    for row in rows {
        insert_course(&conn, &row.course_name, &row.course_code, semester)?;
        inserted += 1;
    }
    Ok(inserted)
}

pub async fn handle_manual_course(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<NewCourseParams>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (Some(name), Some(code), Some(semester)) = (
        optional(params.course_name),
        optional(params.course_code),
        optional(params.semester),
    ) else {
        return Err(ApiError::bad_params("All fields are required"));
    };
    let conn = state.db()?;
    insert_course(&conn, &name, &code, &semester)?;
    info!(course_code = %code, "course added");
    Ok((StatusCode::CREATED, message("Course added successfully")))
}

pub async fn handle_upload_courses(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = read_upload_form(multipart).await?;
    let path = upload::store(&state.config.upload_dir, &form.file_name, &form.bytes).await?;
    let result = import_courses_file(&state, &path, &form.semester);
    upload::discard(&path);
    let inserted = result?;
    info!(inserted, semester = %form.semester, "courses uploaded");
    Ok(Json(json!({ "message": "Courses uploaded successfully", "inserted": inserted })))
}

pub async fn handle_update_course(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<UpdateCourseParams>,
) -> ApiResult<Json<Value>> {
    let code = required(params.course_code, "courseCode")?;
    let name = optional(params.course_name);
    let semester = optional(params.semester);
    let conn = state.db()?;
    if update_course(&conn, &code, name.as_deref(), semester.as_deref())? == 0 {
        return Err(ApiError::not_found("Course not found"));
    }
    info!(course_code = %code, "course updated");
    Ok(message("Course updated successfully"))
}

pub async fn handle_get_course(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<Json<Course>> {
    let conn = state.db()?;
    find_course(&conn, code.trim())?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Course not found"))
}

pub async fn handle_course_info(State(state): State<AppState>) -> ApiResult<Json<Vec<CourseOption>>> {
    let conn = state.db()?;
    Ok(Json(list_course_options(&conn)?))
}
