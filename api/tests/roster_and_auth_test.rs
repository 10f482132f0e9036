mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use api::auth::generate_jwt;
use db::models::{
    course::Model as CourseModel,
    user::Model as UserModel,
    user_course_role::{Model as UserCourseRoleModel, Role},
};

use crate::helpers::make_test_app;

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
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

#[tokio::test]
async fn test_health_is_public() {
    let (app, _state) = make_test_app().await;

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_round_trip() {
    let (app, state) = make_test_app().await;

    UserModel::create(
        state.db(),
        "CS/2024/001",
        "jdoe@uni.test",
        "correct horse",
        false,
        "John Doe",
        None,
    )
    .await
    .unwrap();

    // Wrong password is refused.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "CS/2024/001", "password": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Correct credentials produce a token that /auth/me accepts.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": "CS/2024/001", "password": "correct horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let token = json["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["user"]["name"], "John Doe");

    let resp = app.oneshot(get_req("/api/auth/me", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["username"], "CS/2024/001");
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let (app, state) = make_test_app().await;

    let plain = UserModel::create(state.db(), "u1", "u1@uni.test", "pw123456", false, "U One", None)
        .await
        .unwrap();
    let admin = UserModel::create(state.db(), "root", "root@uni.test", "pw123456", true, "Root", None)
        .await
        .unwrap();

    let body = serde_json::json!({
        "username": "CS/2024/009",
        "email": "nine@uni.test",
        "password": "password9",
        "name": "Niner Nine",
    });

    let (plain_token, _) = generate_jwt(plain.id, false);
    let resp = app
        .clone()
        .oneshot(post_json("/api/users", Some(&plain_token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (admin_token, _) = generate_jwt(admin.id, true);
    let resp = app
        .clone()
        .oneshot(post_json("/api/users", Some(&admin_token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(get_req("/api/users?q=Niner", &admin_token))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_roster_add_list_remove() {
    let (app, state) = make_test_app().await;
    let db = state.db();

    let course = CourseModel::create(db, "CS301", "Software Engineering", "Computer Science", 2026)
        .await
        .unwrap();
    let faculty = UserModel::create(db, "STAFF/001", "m@uni.test", "pw123456", false, "Dr. Mensah", None)
        .await
        .unwrap();
    UserCourseRoleModel::assign_user_to_course(db, faculty.id, course.id, Role::Faculty)
        .await
        .unwrap();
    let student = UserModel::create(db, "CS/2024/001", "j@uni.test", "pw123456", false, "John Doe", None)
        .await
        .unwrap();

    let (token, _) = generate_jwt(faculty.id, false);
    let uri = format!("/api/courses/{}/students", course.id);

    let resp = app
        .clone()
        .oneshot(post_json(&uri, Some(&token), &serde_json::json!({ "user_id": student.id })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Enrolling twice conflicts instead of duplicating the role row.
    let resp = app
        .clone()
        .oneshot(post_json(&uri, Some(&token), &serde_json::json!({ "user_id": student.id })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["name"], "John Doe");

    let remove_uri = format!("/api/courses/{}/students/{}", course.id, student.id);
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&remove_uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get_req(&uri, &token)).await.unwrap();
    let json = body_json(resp).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_me_attendance_defaults_to_empty_range() {
    let (app, state) = make_test_app().await;

    let student = UserModel::create(
        state.db(),
        "CS/2024/001",
        "j@uni.test",
        "pw123456",
        false,
        "John Doe",
        None,
    )
    .await
    .unwrap();

    let (token, _) = generate_jwt(student.id, false);
    let resp = app
        .oneshot(get_req("/api/me/attendance", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["total_sessions"], 0);
    assert_eq!(json["data"]["absent"], 0);
    assert_eq!(json["data"]["attendance_rate"], 0.0);
}
