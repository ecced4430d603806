use attendanced::config::Config;
use attendanced::db::{open_db, IN_MEMORY};
use attendanced::http::{router, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let config = Config {
        db_url: IN_MEMORY.to_string(),
        jwt_secret: "test-secret".to_string(),
        bcrypt_cost: 4,
        ..Config::default()
    };
    let conn = open_db(IN_MEMORY).expect("open db");
    router(AppState::new(conn, config))
}

async fn request(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("read body").to_bytes();
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

async fn request_ok(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Value {
    let (status, value) = request(app, method.clone(), uri, body).await;
    assert!(status.is_success(), "{} {} -> {} {}", method, uri, status, value);
    value
}

async fn add_student(app: &Router, enrollment: &str, semester: &str) {
    request_ok(
        app,
        Method::POST,
        "/api/manual-entry",
        Some(json!({
            "firstName": "F",
            "lastName": "L",
            "enrollment": enrollment,
            "semester": semester,
        })),
    )
    .await;
}

async fn mark(app: &Router, student: &str, course: &str, date: &str, present: bool) {
    let body = request_ok(
        app,
        Method::POST,
        "/api/attendance",
        Some(json!({
            "student_id": student,
            "course_code": course,
            "date": date,
            "present": present,
        })),
    )
    .await;
    assert_eq!(body["message"], json!("Attendance record saved."));
}

#[tokio::test]
async fn remarking_a_day_overwrites_the_single_record() {
    let app = test_app();
    add_student(&app, "S1", "3").await;
    mark(&app, "S1", "CS101", "2024-01-10", true).await;
    mark(&app, "S1", "CS101", "2024-01-10", false).await;

    let rows = request_ok(
        &app,
        Method::GET,
        "/api/record?fromDate=2024-01-10&toDate=2024-01-10&semester=3&courseCode=CS101",
        None,
    )
    .await;
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_id"], json!("S1"));
    assert_eq!(rows[0]["date"], json!("2024-01-10"));
    assert_eq!(rows[0]["present"], json!(false));

    let count = request_ok(
        &app,
        Method::GET,
        "/api/attendance/count?student_id=S1&course_code=CS101",
        None,
    )
    .await;
    assert_eq!(count, json!({ "present": 0, "absent": 1 }));
}

#[tokio::test]
async fn timestamp_dates_are_kept_as_calendar_days() {
    let app = test_app();
    mark(&app, "S1", "CS101", "2024-01-10T09:00:00Z", true).await;
    mark(&app, "S1", "CS101", "2024-01-10", false).await;
    let rows = request_ok(&app, Method::GET, "/api/attendance/S1", None).await;
    assert_eq!(rows.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn attendance_validation() {
    let app = test_app();
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/attendance",
        Some(json!({ "student_id": "S1", "course_code": "CS101", "date": "2024-01-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], json!("missing present"));

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/attendance",
        Some(json!({
            "student_id": "S1",
            "course_code": "CS101",
            "date": "10/01/2024",
            "present": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_params"));

    let (status, _) = request(&app, Method::GET, "/api/attendance/count?student_id=S1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summary_reports_two_decimal_percentages() {
    let app = test_app();
    add_student(&app, "S1", "3").await;
    add_student(&app, "S2", "3").await;
    add_student(&app, "S3", "5").await;
    for (day, present) in [
        ("2024-01-08", true),
        ("2024-01-09", true),
        ("2024-01-10", false),
        ("2024-01-11", true),
    ] {
        mark(&app, "S1", "CS101", day, present).await;
    }
    mark(&app, "S2", "MA201", "2024-01-09", true).await;
    mark(&app, "S3", "CS101", "2024-01-09", true).await;

    let table = request_ok(
        &app,
        Method::GET,
        "/api/record/summary?fromDate=2024-01-01&toDate=2024-01-31&semester=3",
        None,
    )
    .await;
    assert_eq!(table["courses"], json!(["CS101", "MA201"]));
    let rows = table["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["studentId"], json!("S1"));
    assert_eq!(
        rows[0]["cells"],
        json!([
            { "courseCode": "CS101", "present": 3, "total": 4, "percentage": "75.00" },
            { "courseCode": "MA201", "present": 0, "total": 0, "percentage": "0.00" },
        ])
    );
    assert_eq!(rows[1]["studentId"], json!("S2"));
    assert_eq!(rows[1]["cells"][1]["percentage"], json!("100.00"));
}

#[tokio::test]
async fn record_query_requires_a_valid_selection() {
    let app = test_app();
    let (status, body) = request(
        &app,
        Method::GET,
        "/api/record?fromDate=2024-01-01&toDate=2024-01-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], json!("missing semester"));

    let (status, _) = request(
        &app,
        Method::GET,
        "/api/record?fromDate=2024-02-01&toDate=2024-01-01&semester=3",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn student_report_lists_months_and_marks() {
    let app = test_app();
    add_student(&app, "S1", "3").await;
    request_ok(
        &app,
        Method::POST,
        "/api/manual-course",
        Some(json!({ "courseName": "Intro", "courseCode": "CS101", "semester": "3" })),
    )
    .await;
    mark(&app, "S1", "CS101", "2024-01-10", true).await;
    mark(&app, "S1", "CS101", "2024-01-11", false).await;
    mark(&app, "S1", "CS101", "2024-02-01", true).await;
    request_ok(
        &app,
        Method::POST,
        "/api/save-marks",
        Some(json!({
            "marksData": [{ "studentId": "S1", "marks": [0, null, "7"] }],
            "courseId": "CS101",
            "examType": "mst1",
        })),
    )
    .await;

    let report = request_ok(&app, Method::GET, "/api/students/S1/report", None).await;
    assert_eq!(
        report["monthly"],
        json!([
            { "label": "January 2024", "present": 1, "absent": 1 },
            { "label": "February 2024", "present": 1, "absent": 0 },
        ])
    );
    assert_eq!(
        report["marks"][0]["questions"],
        json!([
            { "label": "Ques 1", "value": "0" },
            { "label": "Ques 2", "value": "N/A" },
            { "label": "Ques 3", "value": "7" },
        ])
    );

    let (status, _) = request(&app, Method::GET, "/api/students/S9/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
