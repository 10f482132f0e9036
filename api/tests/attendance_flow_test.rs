mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::util::ServiceExt;

use api::auth::generate_jwt;
use common::state::AppState;
use db::models::{
    course::Model as CourseModel,
    user::Model as UserModel,
    user_course_role::{Model as UserCourseRoleModel, Role},
};

use crate::helpers::make_test_app;

struct TestCtx {
    faculty: UserModel,
    students: Vec<UserModel>,
    course: CourseModel,
}

async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
    let course = CourseModel::create(db, "CS301", "Software Engineering", "Computer Science", 2026)
        .await
        .expect("create course");

    let faculty = UserModel::create(
        db,
        "STAFF/001",
        "mensah@uni.test",
        "password",
        false,
        "Dr. Mensah",
        Some("Computer Science"),
    )
    .await
    .unwrap();
    UserCourseRoleModel::assign_user_to_course(db, faculty.id, course.id, Role::Faculty)
        .await
        .unwrap();

    let mut students = Vec::new();
    for (number, name) in [
        ("CS/2024/001", "John Doe"),
        ("CS/2024/002", "Jane Smith"),
        ("CS/2024/003", "Mike Johnson"),
    ] {
        let email = format!("{}@uni.test", number.replace('/', "."));
        let user = UserModel::create(db, number, &email, "password", false, name, None)
            .await
            .unwrap();
        UserCourseRoleModel::assign_user_to_course(db, user.id, course.id, Role::Student)
            .await
            .unwrap();
        students.push(user);
    }

    TestCtx {
        faculty,
        students,
        course,
    }
}

fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_req(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Creates a session starting now and activates it; returns its id.
async fn seed_active_session(app: &axum::Router, ctx: &TestCtx) -> i64 {
    let (token, _) = generate_jwt(ctx.faculty.id, ctx.faculty.admin);
    let now = Utc::now();

    let body = serde_json::json!({
        "title": "Lecture 5",
        "starts_at": now.to_rfc3339(),
        "ends_at": (now + Duration::hours(2)).to_rfc3339(),
        "location_name": "Lab 2",
        "channels": ["qr", "manual", "kiosk"],
    });
    let uri = format!("/api/courses/{}/attendance/sessions", ctx.course.id);
    let resp = app.clone().oneshot(post_json(&uri, &token, &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    let session_id = json["data"]["id"].as_i64().expect("session id");

    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/activate",
        ctx.course.id, session_id
    );
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &token, &serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    session_id
}

/// Fetches the current QR payload string as faculty.
async fn current_qr_payload(app: &axum::Router, ctx: &TestCtx, session_id: i64) -> String {
    let (token, _) = generate_jwt(ctx.faculty.id, ctx.faculty.admin);
    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/qr",
        ctx.course.id, session_id
    );
    let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    json["data"]["payload"].as_str().expect("payload").to_string()
}

// ---------------------------
// create_session
// ---------------------------

#[tokio::test]
async fn test_create_session_forbidden_for_student() {
    let (app, app_state): (_, AppState) = make_test_app().await;
    let ctx = setup(app_state.db()).await;

    let (token, _) = generate_jwt(ctx.students[0].id, false);
    let now = Utc::now();
    let body = serde_json::json!({
        "title": "Student Should Not Create",
        "starts_at": now.to_rfc3339(),
        "ends_at": (now + Duration::hours(1)).to_rfc3339(),
        "location_name": "Lab 2",
        "channels": ["qr"],
    });
    let uri = format!("/api/courses/{}/attendance/sessions", ctx.course.id);

    let resp = app.oneshot(post_json(&uri, &token, &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_session_rejects_bad_times_and_empty_channels() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;

    let (token, _) = generate_jwt(ctx.faculty.id, false);
    let now = Utc::now();
    let uri = format!("/api/courses/{}/attendance/sessions", ctx.course.id);

    let inverted = serde_json::json!({
        "title": "Backwards",
        "starts_at": now.to_rfc3339(),
        "ends_at": (now - Duration::hours(1)).to_rfc3339(),
        "location_name": "Lab 2",
        "channels": ["qr"],
    });
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &token, &inverted))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let no_channels = serde_json::json!({
        "title": "No Channels",
        "starts_at": now.to_rfc3339(),
        "ends_at": (now + Duration::hours(1)).to_rfc3339(),
        "location_name": "Lab 2",
        "channels": [],
    });
    let resp = app.oneshot(post_json(&uri, &token, &no_channels)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------
// QR check-in flow
// ---------------------------

#[tokio::test]
async fn test_qr_check_in_duplicate_and_reissue() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;

    let payload = current_qr_payload(&app, &ctx, session_id).await;
    let (student_token, _) = generate_jwt(ctx.students[0].id, false);
    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/check-in",
        ctx.course.id, session_id
    );

    // First scan is accepted and classified present (we are inside grace).
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &student_token, &serde_json::json!({ "payload": payload })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "present");

    // Same student scanning the same still-valid payload again → conflict.
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &student_token, &serde_json::json!({ "payload": payload })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);

    // Reissue the token; a different student replaying the old payload fails.
    let (faculty_token, _) = generate_jwt(ctx.faculty.id, false);
    let reissue_uri = format!(
        "/api/courses/{}/attendance/sessions/{}/token",
        ctx.course.id, session_id
    );
    let resp = app
        .clone()
        .oneshot(post_json(&reissue_uri, &faculty_token, &serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (other_token, _) = generate_jwt(ctx.students[1].id, false);
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &other_token, &serde_json::json!({ "payload": payload })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // A fresh payload works for that student.
    let fresh = current_qr_payload(&app, &ctx, session_id).await;
    let resp = app
        .oneshot(post_json(&uri, &other_token, &serde_json::json!({ "payload": fresh })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_in_forbidden_for_non_students() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;

    let payload = current_qr_payload(&app, &ctx, session_id).await;
    let (faculty_token, _) = generate_jwt(ctx.faculty.id, false);
    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/check-in",
        ctx.course.id, session_id
    );

    let resp = app
        .oneshot(post_json(&uri, &faculty_token, &serde_json::json!({ "payload": payload })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_check_in_refused_after_close() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;
    let payload = current_qr_payload(&app, &ctx, session_id).await;

    let (faculty_token, _) = generate_jwt(ctx.faculty.id, false);
    let close_uri = format!(
        "/api/courses/{}/attendance/sessions/{}/close",
        ctx.course.id, session_id
    );
    let resp = app
        .clone()
        .oneshot(post_json(&close_uri, &faculty_token, &serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (student_token, _) = generate_jwt(ctx.students[0].id, false);
    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/check-in",
        ctx.course.id, session_id
    );
    let resp = app
        .oneshot(post_json(&uri, &student_token, &serde_json::json!({ "payload": payload })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ---------------------------
// roll-call
// ---------------------------

#[tokio::test]
async fn test_roll_call_partial_outcomes() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;

    // B checks in first via kiosk.
    let kiosk_uri = format!(
        "/api/courses/{}/attendance/sessions/{}/kiosk",
        ctx.course.id, session_id
    );
    let (faculty_token, _) = generate_jwt(ctx.faculty.id, false);
    let resp = app
        .clone()
        .oneshot(post_json(
            &kiosk_uri,
            &faculty_token,
            &serde_json::json!({ "query": "CS/2024/002" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/roll-call",
        ctx.course.id, session_id
    );
    let ids = serde_json::json!({
        "student_ids": [ctx.students[0].id, ctx.students[1].id, ctx.students[2].id]
    });
    let resp = app
        .oneshot(post_json(&uri, &faculty_token, &ids))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    let entries = json["data"].as_array().expect("outcome list");
    assert_eq!(entries.len(), 3);
    assert!(entries[0]["outcome"]["accepted"].is_object());
    assert_eq!(entries[1]["outcome"], "duplicate");
    assert!(entries[2]["outcome"]["accepted"].is_object());
}

// ---------------------------
// kiosk
// ---------------------------

#[tokio::test]
async fn test_kiosk_ambiguous_query_returns_pick_list() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;

    let (token, _) = generate_jwt(ctx.faculty.id, false);
    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/kiosk",
        ctx.course.id, session_id
    );

    // "Jo" matches John Doe and Mike Johnson.
    let resp = app
        .clone()
        .oneshot(post_json(&uri, &token, &serde_json::json!({ "query": "jo" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["candidates"].as_array().unwrap().len(), 2);

    // Disambiguating by student number succeeds.
    let resp = app
        .oneshot(post_json(&uri, &token, &serde_json::json!({ "query": "CS/2024/003" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["student"]["name"], "Mike Johnson");
}

// ---------------------------
// summary + export
// ---------------------------

#[tokio::test]
async fn test_summary_and_export_after_check_ins() {
    let (app, app_state) = make_test_app().await;
    let ctx = setup(app_state.db()).await;
    let session_id = seed_active_session(&app, &ctx).await;

    let (faculty_token, _) = generate_jwt(ctx.faculty.id, false);
    let kiosk_uri = format!(
        "/api/courses/{}/attendance/sessions/{}/kiosk",
        ctx.course.id, session_id
    );
    for number in ["CS/2024/001", "CS/2024/002"] {
        let resp = app
            .clone()
            .oneshot(post_json(
                &kiosk_uri,
                &faculty_token,
                &serde_json::json!({ "query": number }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/summary",
        ctx.course.id, session_id
    );
    let resp = app.clone().oneshot(get_req(&uri, &faculty_token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["enrolled"], 3);
    assert_eq!(json["data"]["checked_in"], 2);
    assert_eq!(json["data"]["absent"], 1);
    assert_eq!(json["data"]["by_channel"]["kiosk"], 2);

    let uri = format!(
        "/api/courses/{}/attendance/sessions/{}/records/export",
        ctx.course.id, session_id
    );
    let resp = app.oneshot(get_req(&uri, &faculty_token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["student_name"], "John Doe");
    assert_eq!(rows[0]["channel"], "kiosk");
    assert_eq!(rows[0]["status"], "present");
}
