//! Router-level tests: auth extraction, status mapping, upload validation

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;
use uuid::Uuid;

async fn create_test_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    mixcut::db::init_tables(&pool).await.expect("schema");

    let dir = std::env::temp_dir().join(format!("mixcut-api-test-{}", Uuid::new_v4()));
    let config = mixcut::Config {
        temp_dir: dir,
        ffmpeg_path: "/bin/false".into(),
        ..mixcut::Config::default()
    };

    let state = mixcut::AppState::from_config(&config, pool);
    mixcut::build_router(state)
}

#[tokio::test]
async fn health_needs_no_identity() {
    let app = create_test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn clip_routes_reject_missing_identity() {
    let app = create_test_app().await;

    let response = app
        .oneshot(Request::get("/api/mp3s").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_is_empty_for_fresh_user() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::get("/api/mp3s")
                .header("x-identity", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn trim_unknown_clip_is_404() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::post(format!("/api/trim/{}", Uuid::new_v4()))
                .header("x-identity", Uuid::new_v4().to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"start": 0.0, "end": 3.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn trim_with_bad_range_is_400() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::post(format!("/api/trim/{}", Uuid::new_v4()))
                .header("x-identity", Uuid::new_v4().to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"start": 5.0, "end": 2.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tts_with_empty_text_is_400() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::post("/api/tts")
                .header("x-identity", Uuid::new_v4().to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text": "", "language": "en-US"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_without_mp3_field_is_400() {
    let app = create_test_app().await;

    let boundary = "X-MIXCUT-TEST-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhi\r\n--{b}--\r\n",
        b = boundary
    );

    let response = app
        .oneshot(
            Request::post("/api/upload")
                .header("x-identity", Uuid::new_v4().to_string())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_wrong_content_type_is_400() {
    let app = create_test_app().await;

    let boundary = "X-MIXCUT-TEST-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"mp3\"; filename=\"a.wav\"\r\n\
         Content-Type: audio/wav\r\n\r\nRIFFfake\r\n--{b}--\r\n",
        b = boundary
    );

    let response = app
        .oneshot(
            Request::post("/api/upload")
                .header("x-identity", Uuid::new_v4().to_string())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn clone_health_without_collaborator_is_502() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::get("/api/clone/health")
                .header("x-identity", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
