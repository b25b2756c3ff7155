//! Exam data directory resolution.
//!
//! Question sets live in a directory chosen by fixed precedence: an
//! explicit override (usually the `EXAM_DATA_DIR` environment variable),
//! then a repo-root `exams/` directory, then the bundled `data/exams`
//! directory. The first candidate that is an existing readable directory
//! wins; if none qualifies, resolution fails rather than silently serving
//! an empty catalog.

use std::path::{Path, PathBuf};

use crate::error::{ExamError, Result};

/// Environment variable overriding the exam data directory.
pub const DATA_DIR_ENV: &str = "EXAM_DATA_DIR";

/// Repo-root candidate directory.
const REPO_EXAMS_DIR: &str = "exams";

/// Bundled fallback directory.
const BUNDLED_EXAMS_DIR: &str = "data/exams";

/// Returns the candidate directories in priority order.
///
/// The override (when present) always comes first, followed by the fixed
/// repo-root and bundled candidates.
#[must_use]
pub fn candidates(override_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(dir) = override_dir {
        paths.push(dir.to_path_buf());
    }
    paths.push(PathBuf::from(REPO_EXAMS_DIR));
    paths.push(PathBuf::from(BUNDLED_EXAMS_DIR));
    paths
}

/// Resolves the exam data directory from an optional override path.
///
/// Returns the first candidate that exists and is a readable directory.
///
/// # Errors
///
/// Returns `ExamError::DataDirNotFound` carrying the full candidate list
/// if no candidate qualifies.
pub fn resolve(override_dir: Option<&Path>) -> Result<PathBuf> {
    let paths = candidates(override_dir);
    for path in &paths {
        if is_readable_dir(path) {
            tracing::debug!(path = %path.display(), "Resolved exam data directory");
            return Ok(path.clone());
        }
        tracing::debug!(path = %path.display(), "Skipping exam data candidate");
    }
    Err(ExamError::data_dir_not_found(paths))
}

/// Resolves the exam data directory using the `EXAM_DATA_DIR` environment
/// variable as the override, falling back to a configured override path.
///
/// # Errors
///
/// Returns `ExamError::DataDirNotFound` if no candidate qualifies.
pub fn resolve_from_env(config_dir: Option<&Path>) -> Result<PathBuf> {
    let env_override = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    let override_dir = env_override.as_deref().or(config_dir);
    resolve(override_dir)
}

/// Returns `true` if `path` is a directory we can actually enumerate.
///
/// A directory that exists but cannot be read (permissions) is treated the
/// same as a missing one: resolution moves on to the next candidate.
fn is_readable_dir(path: &Path) -> bool {
    path.is_dir() && std::fs::read_dir(path).is_ok()
}
