//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use pebo::Mood;
use tower::ServiceExt;

mod common;
use common::{TEST_API_KEY, build_router, spawn_arms, spawn_eyes, wait_until};

fn post_json(uri: &str, body: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["eyes"], "ok");
    assert_eq!(json["arms"], "unavailable");

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_status_reports_mood() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let response = app.oneshot(get("/api/eyes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["mood"], "default");
    assert_eq!(json["position"], "center");
    assert_eq!(json["curious"], false);
    assert!(json.get("left").is_none());

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_set_mood_is_applied() {
    let (eyes, _, _) = spawn_eyes();
    let handle = eyes.handle();
    let app = build_router(&eyes, None, Some(TEST_API_KEY));

    let response = app
        .oneshot(post_json(
            "/api/eyes/mood",
            r#"{"mood":"happy"}"#,
            Some(TEST_API_KEY),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = json_body(response).await;
    assert_eq!(json["accepted"], "mood");
    assert_eq!(json["value"], "happy");

    assert!(wait_until(|| handle.status().mood == Mood::Happy).await);
    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_unknown_mood_is_rejected() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let response = app
        .oneshot(post_json("/api/eyes/mood", r#"{"mood":"grumpy"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
    assert!(json["error"]["message"].as_str().unwrap().contains("grumpy"));

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_control_requires_auth() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, Some(TEST_API_KEY));

    let missing = app
        .clone()
        .oneshot(post_json("/api/eyes/mood", r#"{"mood":"love"}"#, None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .clone()
        .oneshot(post_json(
            "/api/eyes/mood",
            r#"{"mood":"love"}"#,
            Some("wrong-key"),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // reads stay open
    let status = app.oneshot(get("/api/eyes")).await.unwrap();
    assert_eq!(status.status(), StatusCode::OK);

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_look_and_curious() {
    let (eyes, _, _) = spawn_eyes();
    let handle = eyes.handle();
    let app = build_router(&eyes, None, None);

    let response = app
        .clone()
        .oneshot(post_json("/api/eyes/look", r#"{"position":"ne"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .clone()
        .oneshot(post_json("/api/eyes/curious", r#"{"enabled":true}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    assert!(
        wait_until(|| {
            let status = handle.status();
            status.position == pebo::Position::NE && status.curious
        })
        .await
    );

    let response = app
        .oneshot(post_json("/api/eyes/look", r#"{"position":"sideways"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_blink_and_animate() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    // body is optional
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/eyes/blink")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["value"], "both");

    let response = app
        .clone()
        .oneshot(post_json("/api/eyes/blink", r#"{"eye":"left"}"#, None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["value"], "left");

    let response = app
        .clone()
        .oneshot(post_json("/api/eyes/animate", r#"{"animation":"Laugh"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["value"], "laugh");

    let response = app
        .oneshot(post_json("/api/eyes/animate", r#"{"animation":"dance"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_frame_png() {
    let (eyes, left, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    assert!(wait_until(|| left.flushes() > 5).await);

    let response = app.oneshot(get("/api/eyes/frame.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!(img.width(), 128 * 2 + 8);
    assert_eq!(img.height(), 64);

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_express_plays_gesture() {
    let (eyes, _, _) = spawn_eyes();
    let (arms, servos) = spawn_arms();
    let app = build_router(&eyes, Some(&arms), None);

    let response = app
        .oneshot(post_json("/api/express", r#"{"mood":"happy"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["mood"], "happy");
    assert_eq!(json["gesture"], "wave");

    // right arm is mirrored: raised means a short pulse
    assert!(
        wait_until(|| servos
            .pulses()
            .iter()
            .any(|(channel, pulse)| *channel == 1 && *pulse < 2000))
        .await
    );

    arms.shutdown().unwrap();
    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_express_without_arms() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let response = app
        .oneshot(post_json("/api/express", r#"{"mood":"love"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["mood"], "love");
    assert!(json.get("gesture").is_none());

    eyes.shutdown().unwrap();
}

#[tokio::test]
async fn test_stopped_eyes_are_unavailable() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);
    eyes.shutdown().unwrap();

    let response = app.clone().oneshot(get("/api/eyes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.clone().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["eyes"], "stopped");

    let response = app.clone().oneshot(get("/api/eyes/frame.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"]["code"], "unavailable");

    let response = app
        .oneshot(post_json("/api/eyes/mood", r#"{"mood":"happy"}"#, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (eyes, _, _) = spawn_eyes();
    let app = build_router(&eyes, None, None);

    let cases = [
        ("/api/eyes/blink", r#"{"eye":"middle"}"#),
        ("/api/eyes/mood", r#"{"feeling":"happy"}"#),
        ("/api/eyes/curious", r#"{"enabled":"yes"}"#),
        ("/api/express", "not json"),
    ];
    for (uri, body) in cases {
        let response = app.clone().oneshot(post_json(uri, body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri} {body}");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json",
            "{uri}"
        );

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(!json["error"]["message"].as_str().unwrap().is_empty());
    }

    eyes.shutdown().unwrap();
}
