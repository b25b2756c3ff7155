//! End-to-end integration tests for the exam flow
//!
//! These tests load real fixture directories through the catalog loader and
//! drive the HTTP surface the way a client would: mode selection, start,
//! answers, and result.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::json;
use spi_exam_server::{
    create_router, AnswerResponse, AppState, Catalog, Config, NextAction, QuestionView,
    ReloadResponse, ResultResponse, SelectCategoryResponse, SelectModeResponse, SetsResponse,
    StartResponse, StatusResponse,
};
use tower::util::ServiceExt;

/// Path to a fixture directory under this crate.
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(format!("fixtures/{name}"))
}

/// Builds a router over the `exams` fixture directory.
fn fixture_router() -> Router {
    let load = Catalog::load(&fixture_path("exams")).expect("Failed to load exam fixtures");
    assert!(
        load.skipped.is_empty(),
        "exam fixtures should all be valid: {:?}",
        load.skipped
    );
    create_router(AppState::with_catalog(Config::default(), load.catalog))
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

/// Tests that the fixture tree loads with one entry per file.
#[test]
fn test_catalog_loads_fixture_tree() {
    let load = Catalog::load(&fixture_path("exams")).expect("Failed to load exam fixtures");

    assert_eq!(load.catalog.len(), 2);
    assert!(load.skipped.is_empty());
    assert!(load.catalog.contains("antonym_demo"));
    assert!(load.catalog.contains("sums_demo"));
}

/// Tests that one malformed file does not take down its siblings.
#[test]
fn test_malformed_file_reported_not_fatal() {
    let load = Catalog::load(&fixture_path("mixed")).expect("Failed to load mixed fixtures");

    assert_eq!(load.catalog.len(), 1);
    assert!(load.catalog.contains("good_set"));
    assert_eq!(load.skipped.len(), 1);
    assert!(load.skipped[0].path.ends_with("bad_set.json"));
}

/// Tests the full flow: select-mode, browse, start, answer, result.
#[tokio::test]
async fn test_full_exam_flow() {
    let router = fixture_router();

    // Begin the flow
    let select: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    assert_eq!(select.modes, vec!["practice"]);
    let session_id = select.session_id;

    // Browse categories and sets
    let categories: SelectCategoryResponse =
        body_json(get_response(&router, "/exam/select-category/practice").await).await;
    assert_eq!(categories.categories, vec!["quant", "verbal"]);

    let sets: SetsResponse =
        body_json(get_response(&router, "/exam/sets/practice/verbal").await).await;
    assert_eq!(sets.sets.len(), 1);
    assert_eq!(sets.sets[0].slug, "antonym_demo");

    // Start the antonym set
    let response = post_json(
        &router,
        "/exam/start",
        json!({"sessionId": session_id, "questionSetId": "antonym_demo"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let start: StartResponse = body_json(response).await;
    assert_eq!(start.total, 3);
    assert_eq!(start.time_per_question_sec, 60);

    // First question is presented at index 0
    let question: QuestionView =
        body_json(get_response(&router, &format!("/exam/question/{session_id}")).await).await;
    assert_eq!(question.index, 0);
    assert_eq!(question.total, 3);
    assert!(question.prompt_html.contains("rapid"));

    // Answer all three correctly (0, 1, 2)
    for (i, answer) in [0, 1, 2].into_iter().enumerate() {
        let response = post_json(
            &router,
            "/exam/answer",
            json!({"sessionId": session_id, "answerIndex": answer}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let answer_response: AnswerResponse = body_json(response).await;
        if i < 2 {
            assert_eq!(answer_response.next_action, NextAction::Continue);
            assert_eq!(answer_response.next_index, Some(i + 1));
        } else {
            assert_eq!(answer_response.next_action, NextAction::Finished);
        }
    }

    // Result: 3/3 with a full breakdown
    let result: ResultResponse =
        body_json(get_response(&router, &format!("/exam/result/{session_id}")).await).await;
    assert_eq!(result.slug, "antonym_demo");
    assert_eq!(result.score.correct, 3);
    assert_eq!(result.score.total, 3);
    assert_eq!(result.breakdown.len(), 3);
    assert!(result.breakdown.iter().all(|r| r.correct));
}

/// Tests that wrong and skipped answers score correctly.
#[tokio::test]
async fn test_partial_score() {
    let router = fixture_router();

    let select: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    let session_id = select.session_id;

    post_json(
        &router,
        "/exam/start",
        json!({"sessionId": session_id, "questionSetId": "sums_demo"}),
    )
    .await;

    // Correct answers are 1 then 0; answer the first wrong, skip nothing
    post_json(
        &router,
        "/exam/answer",
        json!({"sessionId": session_id, "answerIndex": 2}),
    )
    .await;
    let response = post_json(
        &router,
        "/exam/answer",
        json!({"sessionId": session_id, "answerIndex": 0}),
    )
    .await;

    let answer: AnswerResponse = body_json(response).await;
    assert_eq!(answer.next_action, NextAction::Finished);

    let result: ResultResponse =
        body_json(get_response(&router, &format!("/exam/result/{session_id}")).await).await;
    assert_eq!(result.score.correct, 1);
    assert_eq!(result.score.total, 2);
    assert!(!result.breakdown[0].correct);
    assert!(result.breakdown[1].correct);
}

/// Tests that two sessions progress independently.
#[tokio::test]
async fn test_sessions_are_isolated() {
    let router = fixture_router();

    let first: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    let second: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    assert_ne!(first.session_id, second.session_id);

    for id in [&first.session_id, &second.session_id] {
        post_json(
            &router,
            "/exam/start",
            json!({"sessionId": id, "questionSetId": "antonym_demo"}),
        )
        .await;
    }

    // Advance only the first session
    post_json(
        &router,
        "/exam/answer",
        json!({"sessionId": first.session_id, "answerIndex": 0}),
    )
    .await;

    let q1: QuestionView =
        body_json(get_response(&router, &format!("/exam/question/{}", first.session_id)).await)
            .await;
    let q2: QuestionView =
        body_json(get_response(&router, &format!("/exam/question/{}", second.session_id)).await)
            .await;
    assert_eq!(q1.index, 1);
    assert_eq!(q2.index, 0);
}

/// Tests liveness and readiness stay independent when no data loads.
#[tokio::test]
async fn test_health_independent_of_data_readiness() {
    let router = create_router(AppState::new(Config::default()));

    let response = get_response(&router, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let status: StatusResponse = body_json(get_response(&router, "/api/status").await).await;
    assert!(!status.ready);

    let response = get_response(&router, "/exam/select-mode").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Tests that a reload brings a cold server to ready.
#[tokio::test]
async fn test_reload_brings_server_ready() {
    let config = Config {
        data_dir: Some(fixture_path("exams").to_string_lossy().into_owned()),
        ..Default::default()
    };
    let router = create_router(AppState::new(config));

    // Cold: exam routes unavailable
    let response = get_response(&router, "/exam/select-mode").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Reload resolves the configured directory and swaps the catalog in
    let response = post_json(&router, "/api/reload", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let reload: ReloadResponse = body_json(response).await;
    assert_eq!(reload.loaded, 2);

    // Warm: the flow works
    let select: SelectModeResponse = body_json(get_response(&router, "/exam/select-mode").await).await;
    assert_eq!(select.modes, vec!["practice"]);
}
