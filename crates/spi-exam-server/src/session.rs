//! Exam session flow state machine.
//!
//! An [`ExamSession`] tracks one user's pass through a question set:
//! `ModeSelection -> InProgress -> Completed`. Sessions are owned by the
//! per-process [`SessionStore`] and expire after a configurable idle
//! lifetime; there is no cross-session sharing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Question, QuestionSet};
use crate::error::{ExamError, Result};

/// Process-wide sequence for session id uniqueness within one second.
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// SessionStatus
// ============================================================================

/// Current step of the exam flow.
///
/// The status transitions `ModeSelection -> InProgress -> Completed`.
/// `Completed` is terminal: the score is fixed and no further mutation is
/// permitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session created; no question set selected yet.
    #[default]
    ModeSelection,
    /// Answering questions.
    InProgress,
    /// All questions answered; score available.
    Completed,
}

impl SessionStatus {
    /// Returns `true` if this status represents the terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModeSelection => write!(f, "mode_selection"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ============================================================================
// Score and AnswerRecord
// ============================================================================

/// Final score: correct answers over total questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Number of correctly answered questions.
    pub correct: usize,
    /// Total number of questions in the set.
    pub total: usize,
}

/// Per-question outcome in the result breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// Zero-based question index.
    pub question_index: usize,

    /// The submitted option index; `None` when the question was skipped
    /// (e.g. the per-question timer ran out without a selection).
    pub selected: Option<usize>,

    /// The correct option index.
    pub correct_index: usize,

    /// Whether the submitted answer was correct.
    pub correct: bool,
}

/// Outcome of an answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// More questions remain; `next_index` is the question to present.
    Advanced {
        /// Index of the next question.
        next_index: usize,
    },
    /// That was the last question; the session is now `Completed`.
    Finished {
        /// The final score.
        score: Score,
    },
}

// ============================================================================
// ExamSession
// ============================================================================

/// Per-user transient state tracking progress through a question set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    /// Opaque session identifier handed to the client.
    pub id: String,

    /// Current flow step.
    pub status: SessionStatus,

    /// Slug of the selected question set (`None` until selection).
    pub slug: Option<String>,

    /// Index of the question currently presented.
    pub current_index: usize,

    /// Accumulated per-question outcomes.
    pub answers: Vec<AnswerRecord>,

    /// Final score, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,

    /// When the session was created.
    pub started_at: DateTime<Utc>,

    /// When the session last changed; drives TTL expiry.
    pub updated_at: DateTime<Utc>,
}

impl ExamSession {
    /// Creates a session in `ModeSelection` with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: SessionStatus::ModeSelection,
            slug: None,
            current_index: 0,
            answers: Vec::new(),
            score: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the session reached its terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Updates the `updated_at` timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Returns `true` if the session has been idle longer than `ttl_secs`.
    #[must_use]
    pub fn is_expired(&self, ttl_secs: u64, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX));
        now - self.updated_at > ttl
    }

    /// Selects a question set: `ModeSelection -> InProgress`.
    ///
    /// The caller is responsible for having resolved `set` from the
    /// catalog, so an unknown slug surfaces as a not-found error before
    /// this transition is attempted.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::SessionCompleted` when the session already
    /// finished and `ExamError::InvalidStateTransition` when a set was
    /// already selected.
    pub fn select_set(&mut self, set: &QuestionSet) -> Result<()> {
        match self.status {
            SessionStatus::ModeSelection => {
                self.slug = Some(set.slug.clone());
                self.current_index = 0;
                self.status = SessionStatus::InProgress;
                self.touch();
                Ok(())
            }
            SessionStatus::Completed => Err(ExamError::session_completed(self.id.clone())),
            SessionStatus::InProgress => Err(ExamError::invalid_transition(
                self.status,
                SessionStatus::InProgress,
            )),
        }
    }

    /// Returns the question currently presented.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidStateTransition` before selection and
    /// `ExamError::SessionCompleted` once finished.
    pub fn current_question<'a>(&self, set: &'a QuestionSet) -> Result<&'a Question> {
        self.require_in_progress()?;
        set.questions
            .get(self.current_index)
            .ok_or_else(|| ExamError::session_completed(self.id.clone()))
    }

    /// Records an answer for the current question and advances the index
    /// by exactly one.
    ///
    /// `selected` is `None` for a skipped question (timer expiry), which is
    /// recorded as incorrect. Submitting the last answer transitions to
    /// `Completed` and fixes the score as the count of correct answers.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::AnswerOutOfRange` (state unchanged) if the
    /// selected index is not one of the question's options,
    /// `ExamError::InvalidStateTransition` before selection, and
    /// `ExamError::SessionCompleted` after completion.
    pub fn submit_answer(
        &mut self,
        set: &QuestionSet,
        selected: Option<usize>,
    ) -> Result<SubmitOutcome> {
        let question = self.current_question(set)?;

        if let Some(index) = selected {
            if index >= question.options.len() {
                return Err(ExamError::answer_out_of_range(index, question.options.len()));
            }
        }

        let correct = selected == Some(question.answer_index);
        self.answers.push(AnswerRecord {
            question_index: self.current_index,
            selected,
            correct_index: question.answer_index,
            correct,
        });
        self.current_index += 1;
        self.touch();

        if self.current_index == set.questions.len() {
            let score = Score {
                correct: self.answers.iter().filter(|a| a.correct).count(),
                total: set.questions.len(),
            };
            self.status = SessionStatus::Completed;
            self.score = Some(score);
            Ok(SubmitOutcome::Finished { score })
        } else {
            Ok(SubmitOutcome::Advanced {
                next_index: self.current_index,
            })
        }
    }

    /// Returns the final score and breakdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidStateTransition` while the session has
    /// not reached `Completed`.
    pub fn result(&self) -> Result<(Score, &[AnswerRecord])> {
        match (self.status, self.score) {
            (SessionStatus::Completed, Some(score)) => Ok((score, &self.answers)),
            _ => Err(ExamError::invalid_transition(
                self.status,
                SessionStatus::Completed,
            )),
        }
    }

    /// Ensures the session is answering questions.
    fn require_in_progress(&self) -> Result<()> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Completed => Err(ExamError::session_completed(self.id.clone())),
            SessionStatus::ModeSelection => Err(ExamError::invalid_transition(
                self.status,
                SessionStatus::InProgress,
            )),
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// In-memory store owning all live exam sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, ExamSession>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new session and returns its id.
    pub fn create(&mut self) -> String {
        let id = generate_session_id();
        self.sessions.insert(id.clone(), ExamSession::new(id.clone()));
        id
    }

    /// Looks up a session by id.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::SessionNotFound` for an unknown or expired id.
    pub fn get(&self, id: &str) -> Result<&ExamSession> {
        self.sessions
            .get(id)
            .ok_or_else(|| ExamError::session_not_found(id))
    }

    /// Looks up a session by id for mutation.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::SessionNotFound` for an unknown or expired id.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut ExamSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| ExamError::session_not_found(id))
    }

    /// Removes sessions idle longer than `ttl_secs`; returns the count.
    pub fn purge_expired(&mut self, ttl_secs: u64) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(ttl_secs, now));
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates an opaque session id.
///
/// Timestamp plus a process-wide sequence number, so ids minted within the
/// same second stay unique.
fn generate_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);

    format!("{timestamp:x}-{seq:x}")
}
