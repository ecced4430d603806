use std::time::Duration;

use axum::http::{header, Method, Uri};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::handlers::{attendance, core, courses, marks, records, students, users};
use super::types::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/health", get(core::handle_health))
        // accounts
        .route("/api/signup", post(users::handle_signup))
        .route("/api/login", post(users::handle_login))
        // students
        .route("/api/manual-entry", post(students::handle_manual_entry))
        .route("/api/upload", post(students::handle_upload))
        .route("/api/delete-student", delete(students::handle_delete_student))
        .route("/api/get-student", get(students::handle_get_student))
        .route("/api/update-student", put(students::handle_update_student))
        .route("/api/students", get(students::handle_list_students))
        .route(
            "/api/students/:enrollment/report",
            get(records::handle_student_report),
        )
        // courses
        .route("/api/manual-course", post(courses::handle_manual_course))
        .route("/api/upload-courses", post(courses::handle_upload_courses))
        .route("/api/update-course", put(courses::handle_update_course))
        .route("/api/course/:course_code", get(courses::handle_get_course))
        .route("/api/course-info", get(courses::handle_course_info))
        // attendance
        .route("/api/attendance", post(attendance::handle_mark_attendance))
        .route("/api/attendance/count", get(attendance::handle_attendance_count))
        .route(
            "/api/attendance/:enrollment",
            get(attendance::handle_student_attendance),
        )
        .route("/api/record", get(records::handle_records))
        .route("/api/record/summary", get(records::handle_records_summary))
        // marks
        .route("/api/save-marks", post(marks::handle_save_marks))
        .route("/api/marks/:enrollment", get(marks::handle_student_marks))
        .route("/api/marks-sheet", get(marks::handle_marks_sheet))
        .route("/marks", get(marks::handle_semester_marks))
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn unknown_route(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("unknown route: {} {}", method, uri.path()))
}
