//! SPI Exam Server
//!
//! Exam catalog loading, session flow, and the HTTP API.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod locator;
pub mod session;
pub mod translate;

pub use api::{
    create_router, AnswerRequest, AnswerResponse, AppState, ErrorResponse, HealthResponse,
    NextAction, QuestionView, ReloadResponse, ResultResponse, SelectCategoryResponse,
    SelectModeResponse, SetsResponse, StartRequest, StartResponse, StatusResponse,
    TranslateRequestBody, TranslateResponseBody,
};
pub use catalog::{Catalog, CatalogLoad, Question, QuestionSet, SetSummary, SkippedFile};
pub use config::{Config, TranslatorConfig};
pub use error::{ExamError, Result};
pub use locator::{candidates, resolve, resolve_from_env, DATA_DIR_ENV};
pub use session::{
    AnswerRecord, ExamSession, Score, SessionStatus, SessionStore, SubmitOutcome,
};
pub use translate::TranslateClient;
