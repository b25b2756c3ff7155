//! Integration tests for exam data directory resolution
//!
//! Covers the precedence order over real directories, including the
//! `EXAM_DATA_DIR` environment override and the relative repo-root and
//! bundled candidates. Tests that change the process environment or
//! working directory live in this binary so they cannot race the flow
//! tests.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::json;
use spi_exam_server::{
    create_router, AnswerResponse, AppState, Catalog, Config, NextAction, SelectModeResponse,
};
use tower::util::ServiceExt;

/// Creates a fresh directory tree containing one valid `math` set with
/// three questions (correct answers 0, 1, 2) and returns its root.
fn write_math_tree(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("exam_locator_it_{name}"));
    std::fs::remove_dir_all(&root).ok();
    let dir = root.join("practice").join("quant");
    std::fs::create_dir_all(&dir).expect("Failed to create fixture tree");
    std::fs::write(
        dir.join("math.json"),
        r#"{
            "version": 1,
            "mode": "practice",
            "category": "quant",
            "slug": "math",
            "title": "Math",
            "description": "",
            "time_per_question_sec": 60,
            "questions": [
                {"prompt_html": "<p>1+1?</p>", "options": ["2", "3", "4"], "answer_index": 0},
                {"prompt_html": "<p>2+1?</p>", "options": ["2", "3", "4"], "answer_index": 1},
                {"prompt_html": "<p>2+2?</p>", "options": ["2", "3", "4"], "answer_index": 2}
            ]
        }"#,
    )
    .expect("Failed to write math.json");
    root
}

/// Sends a GET request and returns the response.
async fn get_response(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed")
}

/// Sends a POST request with a JSON body and returns the response.
async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed")
}

/// Decodes a response body as JSON.
async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to decode body")
}

/// Tests the documented scenario end to end: `EXAM_DATA_DIR` points at a
/// directory with a valid three-question `math` set, and a session runs
/// from selection to a 3/3 score.
#[tokio::test]
async fn test_env_override_full_scenario() {
    let root = write_math_tree("env_override");
    std::env::set_var("EXAM_DATA_DIR", &root);

    let resolved =
        spi_exam_server::resolve_from_env(None).expect("Override directory should resolve");
    assert_eq!(resolved, root);

    let load = Catalog::load(&resolved).expect("Failed to load catalog");
    assert_eq!(load.catalog.len(), 1);
    let router = create_router(AppState::with_catalog(Config::default(), load.catalog));

    // Session starts at question index 0
    let select: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    let session_id = select.session_id;
    let response = post_json(
        &router,
        "/exam/start",
        json!({"sessionId": session_id, "questionSetId": "math"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Three correct submissions advance one at a time and finish 3/3
    for (i, answer) in [0, 1, 2].into_iter().enumerate() {
        let answer_response: AnswerResponse = body_json(
            post_json(
                &router,
                "/exam/answer",
                json!({"sessionId": session_id, "answerIndex": answer}),
            )
            .await,
        )
        .await;

        if i < 2 {
            assert_eq!(answer_response.next_index, Some(i + 1));
        } else {
            assert_eq!(answer_response.next_action, NextAction::Finished);
            let score = answer_response.score.expect("Finished answer carries a score");
            assert_eq!(score.correct, 3);
            assert_eq!(score.total, 3);
        }
    }

    std::env::remove_var("EXAM_DATA_DIR");
    std::fs::remove_dir_all(&root).ok();
}

/// Tests candidate precedence over real directories by steering the
/// process working directory. All cases run in one test because the
/// working directory is process-wide and the relative candidates resolve
/// against it.
#[test]
fn test_relative_candidate_precedence() {
    let original_cwd = std::env::current_dir().expect("Failed to read cwd");

    let base = std::env::temp_dir().join("exam_locator_it_bundled");
    std::fs::remove_dir_all(&base).ok();
    std::fs::create_dir_all(&base).expect("Failed to create base dir");
    std::env::set_current_dir(&base).expect("Failed to change cwd");

    // Nothing exists yet: resolution fails and names every candidate
    let missing = PathBuf::from("/nonexistent/exam_locator_it");
    let err = spi_exam_server::resolve(Some(&missing)).expect_err("Resolution should fail");
    let msg = err.to_string();
    assert!(msg.contains("No exam data directory found"));
    assert!(msg.contains("/nonexistent/exam_locator_it"));

    // Only the bundled directory exists: it is chosen
    std::fs::create_dir_all(base.join("data/exams")).expect("Failed to create bundled dir");
    let resolved = spi_exam_server::resolve(None).expect("Bundled directory should resolve");
    assert_eq!(resolved, PathBuf::from("data/exams"));

    // Repo-root exams/ appears: it takes precedence over bundled
    std::fs::create_dir_all(base.join("exams")).expect("Failed to create exams dir");
    let resolved = spi_exam_server::resolve(None).expect("Repo-root directory should resolve");
    assert_eq!(resolved, PathBuf::from("exams"));

    // An existing override beats both
    let override_dir = base.join("custom");
    std::fs::create_dir_all(&override_dir).expect("Failed to create override dir");
    let resolved =
        spi_exam_server::resolve(Some(&override_dir)).expect("Override directory should resolve");
    assert_eq!(resolved, override_dir);

    std::env::set_current_dir(&original_cwd).expect("Failed to restore cwd");
    std::fs::remove_dir_all(&base).ok();
}
