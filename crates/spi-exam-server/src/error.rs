//! Error types for the SPI exam server.
//!
//! This module defines the error hierarchy for all server operations,
//! including data directory resolution, exam file loading, session flow
//! transitions, and the translation collaborator.

use std::path::PathBuf;

/// A specialized `Result` type for exam server operations.
pub type Result<T> = std::result::Result<T, ExamError>;

/// Errors that can occur while serving the exam flow.
///
/// Error variants are organized by subsystem and include actionable
/// suggestions where possible to help operators resolve issues.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the server configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your exam-server.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// No candidate exam data directory exists.
    #[error("No exam data directory found (tried: {})\n\nSuggestion: Set EXAM_DATA_DIR or create one of the candidate directories", format_candidates(.candidates))]
    DataDirNotFound {
        /// The candidate paths that were checked, in priority order.
        candidates: Vec<PathBuf>,
    },

    // ========================================================================
    // Exam Data Errors
    // ========================================================================
    /// A question set file is malformed or violates the exam schema.
    ///
    /// Reported per file; other files in the same directory still load.
    #[error("Invalid exam file '{path}': {message}\n\nSuggestion: Fix or remove the file; well-formed sets are unaffected")]
    InvalidExamFile {
        /// Path to the offending file.
        path: PathBuf,
        /// Description of the schema violation.
        message: String,
    },

    /// The exam catalog has not been loaded.
    #[error("Exam catalog is not available\n\nSuggestion: Check the startup logs for data directory errors, then POST /api/reload")]
    CatalogUnavailable,

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The requested question set does not exist in the catalog.
    #[error("Question set not found: '{slug}'")]
    SetNotFound {
        /// The requested slug.
        slug: String,
    },

    /// The requested session does not exist or has expired.
    #[error("Session not found: '{session_id}'")]
    SessionNotFound {
        /// The requested session id.
        session_id: String,
    },

    /// A slug did not match the allowed pattern.
    #[error("Invalid slug '{slug}': only lowercase letters, digits, '_' and '-' are allowed")]
    InvalidSlug {
        /// The rejected slug.
        slug: String,
    },

    // ========================================================================
    // Session Flow Errors
    // ========================================================================
    /// A submitted answer index is outside the question's option range.
    #[error("Answer index {answer_index} is out of range (question has {num_options} options)")]
    AnswerOutOfRange {
        /// The submitted index.
        answer_index: usize,
        /// Number of options on the current question.
        num_options: usize,
    },

    /// Invalid session state transition attempted.
    #[error("Invalid session transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// Mutation attempted on a session that already completed.
    #[error("Session '{session_id}' is already completed; results are read-only")]
    SessionCompleted {
        /// The terminal session id.
        session_id: String,
    },

    // ========================================================================
    // Translation Collaborator Errors
    // ========================================================================
    /// The translation collaborator is not configured.
    #[error("Translation is not configured\n\nSuggestion: Set the TRANSLATOR_API_KEY environment variable")]
    TranslatorUnavailable,

    /// The translation collaborator returned an error.
    #[error("Translation request failed ({status}): {message}")]
    TranslateFailed {
        /// HTTP status or transport description from the upstream call.
        status: String,
        /// Detailed error message.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Formats candidate paths for the `DataDirNotFound` message.
fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExamError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `DataDirNotFound` error from the checked candidates.
    #[must_use]
    pub fn data_dir_not_found(candidates: Vec<PathBuf>) -> Self {
        Self::DataDirNotFound { candidates }
    }

    /// Creates a new `InvalidExamFile` error.
    #[must_use]
    pub fn invalid_exam_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidExamFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `SetNotFound` error.
    #[must_use]
    pub fn set_not_found(slug: impl Into<String>) -> Self {
        Self::SetNotFound { slug: slug.into() }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Creates a new `InvalidSlug` error.
    #[must_use]
    pub fn invalid_slug(slug: impl Into<String>) -> Self {
        Self::InvalidSlug { slug: slug.into() }
    }

    /// Creates a new `AnswerOutOfRange` error.
    #[must_use]
    pub const fn answer_out_of_range(answer_index: usize, num_options: usize) -> Self {
        Self::AnswerOutOfRange {
            answer_index,
            num_options,
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a new `SessionCompleted` error.
    #[must_use]
    pub fn session_completed(session_id: impl Into<String>) -> Self {
        Self::SessionCompleted {
            session_id: session_id.into(),
        }
    }

    /// Creates a new `TranslateFailed` error.
    #[must_use]
    pub fn translate_failed(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TranslateFailed {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error should halt startup.
    ///
    /// Per-file and per-request errors are not fatal; they are isolated to
    /// the offending file or session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. }
        )
    }

    /// Returns `true` if this error is caused by the caller's request
    /// rather than by server state.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::SetNotFound { .. }
                | Self::SessionNotFound { .. }
                | Self::InvalidSlug { .. }
                | Self::AnswerOutOfRange { .. }
                | Self::InvalidStateTransition { .. }
                | Self::SessionCompleted { .. }
        )
    }
}
