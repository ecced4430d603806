use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use super::attendance::{list_for_student, parse_date};
use super::marks::list_marks;
use super::students::find_student;
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::{optional, required, ApiPath, ApiQuery};
use crate::http::types::AppState;
use crate::models::AttendanceRecord;
use crate::summary::{summarize_by_course, summarize_by_month};
use crate::views::{self, StudentReport, SummaryTable};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub semester: Option<String>,
    pub course_code: Option<String>,
}

/// Selection made on the attendance records screen, passed explicitly per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub semester: String,
    /// `None` means all courses.
    pub course_code: Option<String>,
}

impl TryFrom<RecordQuery> for RecordFilter {
    type Error = ApiError;

    fn try_from(q: RecordQuery) -> Result<Self, Self::Error> {
        let from = parse_date(&required(q.from_date, "fromDate")?, "fromDate")?;
        let to = parse_date(&required(q.to_date, "toDate")?, "toDate")?;
        if from > to {
            return Err(ApiError::bad_params("fromDate must not be after toDate"));
        }
        Ok(Self {
            from,
            to,
            semester: required(q.semester, "semester")?,
            course_code: optional(q.course_code),
        })
    }
}

/// Attendance rows in `[from, to]` for students of the filter's semester.
pub fn query_records(conn: &Connection, filter: &RecordFilter) -> ApiResult<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.student_id, a.course_code, a.date, a.present
         FROM attendance a
         JOIN students s ON s.enrollment = a.student_id
         WHERE s.semester = ?1
           AND a.date BETWEEN ?2 AND ?3
           AND (?4 IS NULL OR a.course_code = ?4)
         ORDER BY a.date, a.student_id, a.course_code",
    )?;
    let rows = stmt
        .query_map(
            (
                &filter.semester,
                filter.from,
                filter.to,
                filter.course_code.as_deref(),
            ),
            AttendanceRecord::from_row,
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub fn student_report(conn: &Connection, enrollment: &str) -> ApiResult<StudentReport> {
    if find_student(conn, enrollment)?.is_none() {
        return Err(ApiError::not_found("Student not found"));
    }
    let attendance = list_for_student(conn, enrollment)?;
    let marks = list_marks(conn, Some(enrollment), None, None)?;
    Ok(StudentReport {
        enrollment: enrollment.to_string(),
        monthly: views::monthly_lines(&summarize_by_month(&attendance)),
        marks: views::marks_lines(&marks),
    })
}

pub async fn handle_records(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RecordQuery>,
) -> ApiResult<Json<Vec<AttendanceRecord>>> {
    let filter = RecordFilter::try_from(params)?;
    let conn = state.db()?;
    Ok(Json(query_records(&conn, &filter)?))
}

pub async fn handle_records_summary(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RecordQuery>,
) -> ApiResult<Json<SummaryTable>> {
    let filter = RecordFilter::try_from(params)?;
    let conn = state.db()?;
    let records = query_records(&conn, &filter)?;
    Ok(Json(views::summary_table(&summarize_by_course(&records))))
}

pub async fn handle_student_report(
    State(state): State<AppState>,
    ApiPath(enrollment): ApiPath<String>,
) -> ApiResult<Json<StudentReport>> {
    let conn = state.db()?;
    Ok(Json(student_report(&conn, enrollment.trim())?))
}
