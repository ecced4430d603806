use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::db::now_stamp;
use crate::http::error::{message, ApiError, ApiResult};
use crate::http::extract::{required, ApiJson, ApiPath, ApiQuery};
use crate::http::types::AppState;
use crate::models::AttendanceRecord;

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceParams {
    pub student_id: Option<String>,
    pub course_code: Option<String>,
    pub date: Option<String>,
    pub present: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub student_id: Option<String>,
    pub course_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresenceCount {
    pub present: i64,
    pub absent: i64,
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its calendar date is kept).
pub fn parse_date(raw: &str, field: &str) -> ApiResult<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(t)
        .map(|dt| dt.date_naive())
        .map_err(|_| ApiError::bad_params(format!("invalid {}: {}", field, t)))
}

/// Insert-or-overwrite keyed by (student, course, date).
pub fn upsert_attendance(
    conn: &Connection,
    student_id: &str,
    course_code: &str,
    date: NaiveDate,
    present: bool,
) -> ApiResult<()> {
    let now = now_stamp();
    conn.execute(
        "INSERT INTO attendance(student_id, course_code, date, present, created_at, updated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(student_id, course_code, date) DO UPDATE SET
           present = excluded.present,
           updated_at = excluded.updated_at",
        (student_id, course_code, date, present, &now),
    )?;
    Ok(())
}

pub fn count_presence(conn: &Connection, student_id: &str, course_code: &str) -> ApiResult<PresenceCount> {
    let count = conn.query_row(
        "SELECT
           COALESCE(SUM(CASE WHEN present <> 0 THEN 1 ELSE 0 END), 0),
           COALESCE(SUM(CASE WHEN present = 0 THEN 1 ELSE 0 END), 0)
         FROM attendance
         WHERE student_id = ? AND course_code = ?",
        (student_id, course_code),
        |r| {
            Ok(PresenceCount {
                present: r.get(0)?,
                absent: r.get(1)?,
            })
        },
    )?;
    Ok(count)
}

pub fn list_for_student(conn: &Connection, student_id: &str) -> ApiResult<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE student_id = ? ORDER BY date, course_code",
        AttendanceRecord::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([student_id], AttendanceRecord::from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub async fn handle_mark_attendance(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<MarkAttendanceParams>,
) -> ApiResult<Json<Value>> {
    let student_id = required(params.student_id, "student_id")?;
    let course_code = required(params.course_code, "course_code")?;
    let raw_date = required(params.date, "date")?;
    let present = params
        .present
        .ok_or_else(|| ApiError::bad_params("missing present"))?;
    let date = parse_date(&raw_date, "date")?;

    let conn = state.db()?;
    upsert_attendance(&conn, &student_id, &course_code, date, present)?;
    info!(student_id = %student_id, course_code = %course_code, %date, present, "attendance saved");
    Ok(message("Attendance record saved."))
}

pub async fn handle_attendance_count(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CountParams>,
) -> ApiResult<Json<PresenceCount>> {
    let student_id = required(params.student_id, "student_id")?;
    let course_code = required(params.course_code, "course_code")?;
    let conn = state.db()?;
    Ok(Json(count_presence(&conn, &student_id, &course_code)?))
}

pub async fn handle_student_attendance(
    State(state): State<AppState>,
    ApiPath(enrollment): ApiPath<String>,
) -> ApiResult<Json<Vec<AttendanceRecord>>> {
    let conn = state.db()?;
    Ok(Json(list_for_student(&conn, enrollment.trim())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_db, IN_MEMORY};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn parse_date_accepts_plain_and_rfc3339() {
        assert_eq!(parse_date("2024-01-10", "date").expect("plain"), day("2024-01-10"));
        assert_eq!(
            parse_date("2024-01-10T09:30:00+05:30", "date").expect("rfc3339"),
            day("2024-01-10")
        );
        assert!(parse_date("2024-02-30", "date").is_err());
        assert!(parse_date("yesterday", "date").is_err());
    }

    #[test]
    fn latest_write_wins_without_duplicates() {
        let conn = open_db(IN_MEMORY).expect("open");
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-10"), true).expect("first");
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-10"), false).expect("second");
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-11"), true).expect("other day");

        let rows = list_for_student(&conn, "S1").expect("list");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day("2024-01-10"));
        assert!(!rows[0].present);
    }

    #[test]
    fn count_defaults_to_zero() {
        let conn = open_db(IN_MEMORY).expect("open");
        assert_eq!(
            count_presence(&conn, "S1", "CS101").expect("count"),
            PresenceCount { present: 0, absent: 0 }
        );
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-10"), true).expect("a");
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-11"), false).expect("b");
        upsert_attendance(&conn, "S1", "CS101", day("2024-01-12"), true).expect("c");
        upsert_attendance(&conn, "S1", "MA201", day("2024-01-12"), false).expect("d");
        assert_eq!(
            count_presence(&conn, "S1", "CS101").expect("count"),
            PresenceCount { present: 2, absent: 1 }
        );
    }
}
