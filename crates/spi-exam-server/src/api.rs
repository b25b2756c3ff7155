//! HTTP API endpoints for the SPI exam server.
//!
//! This module provides the JSON API that drives the exam flow, plus the
//! operational endpoints (health, readiness, catalog reload, translation).
//!
//! # Endpoints
//!
//! - `GET /healthz` - Liveness check, independent of data readiness
//! - `GET /api/status` - Readiness and catalog summary
//! - `POST /api/reload` - Re-resolve the data directory and swap the catalog
//! - `POST /api/translate` - Proxy to the translation collaborator
//! - `GET /exam/select-mode` - Begin the exam flow
//! - `GET /exam/select-category/{mode}` - List categories for a mode
//! - `GET /exam/sets/{mode}/{category}` - List question sets
//! - `POST /exam/start` - Select a question set and start answering
//! - `GET /exam/question/{session_id}` - Current question
//! - `POST /exam/answer` - Submit an answer
//! - `GET /exam/result/{session_id}` - Final score and breakdown
//!
//! # Example
//!
//! ```no_run
//! use spi_exam_server::{AppState, Config, create_router};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default());
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    catalog::{Catalog, SetSummary, SkippedFile},
    config::Config,
    error::ExamError,
    locator,
    session::{AnswerRecord, Score, SessionStore, SubmitOutcome},
    translate::TranslateClient,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// The next action the client should take after submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    /// More questions remain; fetch the next one.
    Continue,
    /// The set is finished; fetch the result.
    Finished,
}

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is alive.
    pub status: String,
}

/// Response body for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether a catalog is loaded and exam routes can serve.
    pub ready: bool,
    /// Number of loaded question sets.
    pub sets: usize,
    /// Number of live sessions.
    pub sessions: usize,
}

/// Response body for the reload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    /// Number of question sets in the new catalog.
    pub loaded: usize,
    /// Files that failed validation and were skipped.
    pub skipped: Vec<SkippedFile>,
}

/// Response body for the select-mode endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectModeResponse {
    /// Fresh session id for the rest of the flow.
    pub session_id: String,
    /// Available exam modes.
    pub modes: Vec<String>,
}

/// Response body for the select-category endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectCategoryResponse {
    /// The requested mode.
    pub mode: String,
    /// Categories available in that mode.
    pub categories: Vec<String>,
}

/// Response body for the set listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetsResponse {
    /// Summaries of the matching question sets, sorted by slug.
    pub sets: Vec<SetSummary>,
}

/// Request body for the start endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Session id from `select-mode`.
    pub session_id: String,
    /// Slug of the question set to take.
    pub question_set_id: String,
}

/// Response body for the start endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Slug of the selected set.
    pub slug: String,
    /// Title of the selected set.
    pub title: String,
    /// Number of questions.
    pub total: usize,
    /// Time limit per question in seconds.
    pub time_per_question_sec: u32,
}

/// The current question as presented to the client.
///
/// Deliberately excludes the correct answer index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Zero-based index of this question.
    pub index: usize,
    /// Number of questions in the set.
    pub total: usize,
    /// Question prompt as an HTML fragment.
    pub prompt_html: String,
    /// Answer choices, in display order.
    pub options: Vec<String>,
    /// Time limit for this question in seconds.
    pub time_limit_sec: u32,
}

/// Request body for the answer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    /// Session id from `select-mode`.
    pub session_id: String,
    /// Selected option index; `null` records a skipped question.
    pub answer_index: Option<usize>,
}

/// Response body for the answer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    /// Whether the answer was recorded.
    pub acknowledged: bool,
    /// What the client should do next.
    pub next_action: NextAction,
    /// Index of the next question (present while `next_action` is `continue`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_index: Option<usize>,
    /// Final score (present once `next_action` is `finished`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

/// Response body for the result endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    /// Slug of the completed set.
    pub slug: String,
    /// Title of the completed set.
    pub title: String,
    /// Final score.
    pub score: Score,
    /// Per-question correctness breakdown.
    pub breakdown: Vec<AnswerRecord>,
}

/// Request body for the translate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequestBody {
    /// Text to translate.
    pub text: String,
    /// BCP 47 language tag of the target language.
    pub target_language: String,
}

/// Response body for the translate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponseBody {
    /// The translated text.
    pub translated_text: String,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// The catalog is immutable once loaded; reload swaps in a whole new
/// catalog under the write lock so concurrent readers never observe a
/// partially updated set. Sessions live behind their own lock.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The loaded exam catalog; `None` until a data directory resolves.
    pub catalog: Arc<RwLock<Option<Catalog>>>,
    /// Live exam sessions.
    pub sessions: Arc<Mutex<SessionStore>>,
    /// Translation collaborator; `None` when no API key is configured.
    pub translator: Option<Arc<TranslateClient>>,
}

impl AppState {
    /// Creates an `AppState` with no catalog loaded.
    ///
    /// Exam routes answer 503 until a catalog is swapped in.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: Arc::new(RwLock::new(None)),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            translator: None,
        }
    }

    /// Creates an `AppState` with an already-loaded catalog.
    #[must_use]
    pub fn with_catalog(config: Config, catalog: Catalog) -> Self {
        Self {
            config,
            catalog: Arc::new(RwLock::new(Some(catalog))),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            translator: None,
        }
    }

    /// Attaches a translation client.
    #[must_use]
    pub fn with_translator(mut self, translator: TranslateClient) -> Self {
        self.translator = Some(Arc::new(translator));
        self
    }

    /// Replaces the catalog atomically.
    pub async fn swap_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = Some(catalog);
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type mapping domain errors onto HTTP status codes.
#[derive(Debug)]
struct ApiError(ExamError);

impl From<ExamError> for ApiError {
    fn from(error: ExamError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ExamError::SetNotFound { .. } | ExamError::SessionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ExamError::InvalidSlug { .. } | ExamError::AnswerOutOfRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            ExamError::InvalidStateTransition { .. } | ExamError::SessionCompleted { .. } => {
                StatusCode::CONFLICT
            }
            ExamError::CatalogUnavailable
            | ExamError::TranslatorUnavailable
            | ExamError::DataDirNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ExamError::TranslateFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all endpoints.
///
/// # Arguments
///
/// * `state` - The shared application state
///
/// # Returns
///
/// An axum `Router` configured with:
/// - The health check at the root
/// - Operational routes under `/api`
/// - The exam flow under `/exam`
/// - CORS middleware for development
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS for development (allow all origins)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handle_status))
        .route("/reload", post(handle_reload))
        .route("/translate", post(handle_translate));

    let exam_routes = Router::new()
        .route("/select-mode", get(handle_select_mode))
        .route("/select-category/:mode", get(handle_select_category))
        .route("/sets/:mode/:category", get(handle_sets))
        .route("/start", post(handle_start))
        .route("/question/:session_id", get(handle_question))
        .route("/answer", post(handle_answer))
        .route("/result/:session_id", get(handle_result));

    Router::new()
        .route("/healthz", get(handle_health))
        .nest("/api", api_routes)
        .nest("/exam", exam_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /healthz`.
///
/// Pure liveness: succeeds with no side effects whether or not exam data
/// ever loaded.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Handler for `GET /api/status`.
async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let catalog = state.catalog.read().await;
    let sessions = state.sessions.lock().await;

    Json(StatusResponse {
        ready: catalog.is_some(),
        sets: catalog.as_ref().map_or(0, Catalog::len),
        sessions: sessions.len(),
    })
}

/// Handler for `POST /api/reload`.
///
/// Re-runs directory resolution and rebuilds the catalog, then swaps it in
/// whole. On resolution failure the current catalog stays in place.
async fn handle_reload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let config_dir = state.config.data_dir.as_deref().map(FsPath::new);
    let root = locator::resolve_from_env(config_dir)?;

    let load = Catalog::load(&root)?;
    let loaded = load.catalog.len();
    let skipped = load.skipped;

    info!(
        root = %root.display(),
        loaded,
        skipped = skipped.len(),
        "Catalog reloaded"
    );

    state.swap_catalog(load.catalog).await;

    Ok(Json(ReloadResponse { loaded, skipped }))
}

/// Handler for `GET /exam/select-mode`.
///
/// Begins the exam flow: creates a session and lists the available modes.
async fn handle_select_mode(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SelectModeResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    let mut sessions = state.sessions.lock().await;
    sessions.purge_expired(state.config.session_ttl_secs);
    let session_id = sessions.create();

    info!(%session_id, "Exam session created");

    Ok(Json(SelectModeResponse {
        session_id,
        modes: catalog.modes(),
    }))
}

/// Handler for `GET /exam/select-category/{mode}`.
async fn handle_select_category(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
) -> Result<Json<SelectCategoryResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    Ok(Json(SelectCategoryResponse {
        categories: catalog.categories(&mode),
        mode,
    }))
}

/// Handler for `GET /exam/sets/{mode}/{category}`.
async fn handle_sets(
    State(state): State<Arc<AppState>>,
    Path((mode, category)): Path<(String, String)>,
) -> Result<Json<SetsResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    Ok(Json(SetsResponse {
        sets: catalog.sets_in(&mode, &category),
    }))
}

/// Handler for `POST /exam/start`.
///
/// Selects a question set for the session: `ModeSelection -> InProgress`.
async fn handle_start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;
    let set = catalog.get(&request.question_set_id)?;

    let mut sessions = state.sessions.lock().await;
    sessions.purge_expired(state.config.session_ttl_secs);
    let session = sessions.get_mut(&request.session_id)?;
    session.select_set(set)?;

    info!(
        session_id = %request.session_id,
        slug = %set.slug,
        questions = set.questions.len(),
        "Exam started"
    );

    Ok(Json(StartResponse {
        slug: set.slug.clone(),
        title: set.title.clone(),
        total: set.questions.len(),
        time_per_question_sec: set.time_per_question_sec,
    }))
}

/// Handler for `GET /exam/question/{session_id}`.
///
/// Returns the current question without the correct answer index.
async fn handle_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<QuestionView>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    let sessions = state.sessions.lock().await;
    let session = sessions.get(&session_id)?;

    let slug = session.slug.as_deref().ok_or_else(|| {
        ExamError::invalid_transition(session.status, crate::session::SessionStatus::InProgress)
    })?;
    let set = catalog.get(slug)?;
    let question = session.current_question(set)?;

    Ok(Json(QuestionView {
        index: session.current_index,
        total: set.questions.len(),
        prompt_html: question.prompt_html.clone(),
        options: question.options.clone(),
        time_limit_sec: set.time_per_question_sec,
    }))
}

/// Handler for `POST /exam/answer`.
///
/// Records the answer for the current question and advances the session.
async fn handle_answer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&request.session_id)?;

    let slug = session.slug.clone().ok_or_else(|| {
        ExamError::invalid_transition(session.status, crate::session::SessionStatus::InProgress)
    })?;
    let set = catalog.get(&slug)?;

    let outcome = match session.submit_answer(set, request.answer_index) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                session_id = %request.session_id,
                error = %e,
                "Answer rejected"
            );
            return Err(e.into());
        }
    };

    let response = match outcome {
        SubmitOutcome::Advanced { next_index } => AnswerResponse {
            acknowledged: true,
            next_action: NextAction::Continue,
            next_index: Some(next_index),
            score: None,
        },
        SubmitOutcome::Finished { score } => {
            info!(
                session_id = %request.session_id,
                correct = score.correct,
                total = score.total,
                "Exam completed"
            );
            AnswerResponse {
                acknowledged: true,
                next_action: NextAction::Finished,
                next_index: None,
                score: Some(score),
            }
        }
    };

    Ok(Json(response))
}

/// Handler for `GET /exam/result/{session_id}`.
///
/// Readable any number of times once the session completed.
async fn handle_result(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let catalog = state.catalog.read().await;
    let catalog = catalog.as_ref().ok_or(ExamError::CatalogUnavailable)?;

    let sessions = state.sessions.lock().await;
    let session = sessions.get(&session_id)?;
    let (score, breakdown) = session.result()?;

    let slug = session.slug.as_deref().unwrap_or_default();
    let title = catalog
        .get(slug)
        .map(|set| set.title.clone())
        .unwrap_or_default();

    Ok(Json(ResultResponse {
        slug: slug.to_string(),
        title,
        score,
        breakdown: breakdown.to_vec(),
    }))
}

/// Handler for `POST /api/translate`.
async fn handle_translate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequestBody>,
) -> Result<Json<TranslateResponseBody>, ApiError> {
    let translator = state
        .translator
        .as_ref()
        .ok_or(ExamError::TranslatorUnavailable)?;

    let translated_text = translator
        .translate(&request.text, &request.target_language)
        .await?;

    Ok(Json(TranslateResponseBody { translated_text }))
}

// ============================================================================
// Tests
// ============================================================================
