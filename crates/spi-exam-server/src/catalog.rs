//! Exam catalog: typed question sets loaded from disk.
//!
//! Question sets are JSON files laid out `<root>/<mode>/<category>/<slug>.json`.
//! [`Catalog::load`] walks that tree, validates every file against the exam
//! schema, and indexes the well-formed sets by slug. A malformed file is
//! skipped and reported without affecting its siblings; only an unreadable
//! root directory aborts the load.
//!
//! The catalog is immutable once built. Reloading builds a fresh catalog and
//! swaps it in whole, so readers never observe a partially updated index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};

/// Lowest and highest accepted per-question time limits in seconds.
const TIME_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=600;

/// Schema version this server understands.
const SCHEMA_VERSION: u32 = 1;

/// Allowed slug characters: lowercase letters, digits, underscore, hyphen.
static SLUG_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z0-9_\-]+$").ok());

/// Returns `true` if `slug` matches the allowed slug pattern.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.as_ref().is_some_and(|re| re.is_match(slug))
}

// ============================================================================
// Question and QuestionSet
// ============================================================================

/// A single multiple-choice question.
///
/// Field names match the on-disk JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Question prompt as an HTML fragment.
    pub prompt_html: String,

    /// Answer choices, in display order. At least two.
    pub options: Vec<String>,

    /// Index of the correct choice within `options`.
    pub answer_index: usize,

    /// Optional explanation shown with the result breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_html: Option<String>,
}

/// A named collection of questions loaded from exactly one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    /// Schema version; must be `1`.
    pub version: u32,

    /// Exam mode, matching the first-level directory name.
    pub mode: String,

    /// Exam category, matching the second-level directory name.
    pub category: String,

    /// Unique set identifier, matching the file stem.
    pub slug: String,

    /// Human-readable title.
    pub title: String,

    /// Short description shown before starting the set.
    pub description: String,

    /// Time limit per question in seconds (1..=600).
    pub time_per_question_sec: u32,

    /// The questions, in presentation order. Never empty.
    pub questions: Vec<Question>,
}

impl QuestionSet {
    /// Loads and validates a question set file.
    ///
    /// `mode` and `category` are the directory names the file was found
    /// under; the file contents must agree with them and with its own stem.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidExamFile` if the file is not valid JSON
    /// or violates the exam schema, and `ExamError::Io` if it cannot be read.
    pub fn load_file(path: &Path, mode: &str, category: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let set: Self = serde_json::from_str(&contents)
            .map_err(|e| ExamError::invalid_exam_file(path, format!("not a valid exam file: {e}")))?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if let Err(message) = set.validate(mode, category, stem) {
            return Err(ExamError::invalid_exam_file(path, message));
        }
        Ok(set)
    }

    /// Checks this set against the exam schema and its location in the tree.
    ///
    /// Returns a description of the first violation found.
    fn validate(&self, mode: &str, category: &str, stem: &str) -> std::result::Result<(), String> {
        if self.version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported version {} (expected {SCHEMA_VERSION})",
                self.version
            ));
        }
        if !is_valid_slug(&self.slug) {
            return Err(format!("slug '{}' contains disallowed characters", self.slug));
        }
        if self.slug != stem {
            return Err(format!(
                "slug '{}' does not match file name '{stem}'",
                self.slug
            ));
        }
        if self.mode != mode {
            return Err(format!(
                "mode '{}' does not match directory '{mode}'",
                self.mode
            ));
        }
        if self.category != category {
            return Err(format!(
                "category '{}' does not match directory '{category}'",
                self.category
            ));
        }
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if !TIME_LIMIT_RANGE.contains(&self.time_per_question_sec) {
            return Err(format!(
                "time_per_question_sec {} outside 1..=600",
                self.time_per_question_sec
            ));
        }
        if self.questions.is_empty() {
            return Err("questions must not be empty".to_string());
        }
        for (i, question) in self.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(format!("question {i} has fewer than 2 options"));
            }
            if question.answer_index >= question.options.len() {
                return Err(format!(
                    "question {i} answer_index {} out of range ({} options)",
                    question.answer_index,
                    question.options.len()
                ));
            }
        }
        Ok(())
    }

    /// Returns the catalog listing entry for this set.
    #[must_use]
    pub fn summary(&self) -> SetSummary {
        SetSummary {
            mode: self.mode.clone(),
            category: self.category.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            num_questions: self.questions.len(),
            time_per_question_sec: self.time_per_question_sec,
        }
    }
}

/// Catalog listing entry for a question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    /// Exam mode.
    pub mode: String,
    /// Exam category.
    pub category: String,
    /// Unique set identifier.
    pub slug: String,
    /// Human-readable title.
    pub title: String,
    /// Number of questions in the set.
    pub num_questions: usize,
    /// Time limit per question in seconds.
    pub time_per_question_sec: u32,
}

// ============================================================================
// Catalog
// ============================================================================

/// A file that failed to load, with the reason it was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of a catalog load: the usable catalog plus the skipped files.
#[derive(Debug)]
pub struct CatalogLoad {
    /// The catalog built from the well-formed files.
    pub catalog: Catalog,
    /// Files that were skipped, in walk order.
    pub skipped: Vec<SkippedFile>,
}

/// Immutable index of question sets keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sets: HashMap<String, QuestionSet>,
}

impl Catalog {
    /// Loads all question sets under `root`.
    ///
    /// Walks `<mode>/<category>/*.json`, sorted by name at every level so
    /// precedence between conflicting files is deterministic. Each
    /// malformed file is recorded in the returned `skipped` list and logged
    /// as a warning; the rest of the directory still loads. A slug seen
    /// twice keeps the first file.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Io` only if `root` itself cannot be enumerated.
    pub fn load(root: &Path) -> Result<CatalogLoad> {
        let mut sets: HashMap<String, QuestionSet> = HashMap::new();
        let mut skipped = Vec::new();

        for mode_dir in sorted_entries(root)? {
            if !mode_dir.is_dir() {
                continue;
            }
            let mode = dir_name(&mode_dir);

            let Ok(category_dirs) = sorted_entries(&mode_dir) else {
                continue;
            };
            for category_dir in category_dirs {
                if !category_dir.is_dir() {
                    continue;
                }
                let category = dir_name(&category_dir);

                let Ok(files) = sorted_entries(&category_dir) else {
                    continue;
                };
                for file in files {
                    if file.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    match QuestionSet::load_file(&file, &mode, &category) {
                        Ok(set) => {
                            if let Some(existing) = sets.get(&set.slug) {
                                let reason = format!(
                                    "duplicate slug '{}' (already loaded from {}/{})",
                                    set.slug, existing.mode, existing.category
                                );
                                tracing::warn!(path = %file.display(), %reason, "Skipping exam file");
                                skipped.push(SkippedFile { path: file, reason });
                            } else {
                                tracing::debug!(
                                    slug = %set.slug,
                                    questions = set.questions.len(),
                                    "Loaded question set"
                                );
                                sets.insert(set.slug.clone(), set);
                            }
                        }
                        Err(e) => {
                            let reason = skip_reason(&e);
                            tracing::warn!(path = %file.display(), %reason, "Skipping exam file");
                            skipped.push(SkippedFile { path: file, reason });
                        }
                    }
                }
            }
        }

        Ok(CatalogLoad {
            catalog: Self { sets },
            skipped,
        })
    }

    /// Builds a catalog directly from in-memory sets.
    ///
    /// Duplicate slugs keep the first set, matching [`Catalog::load`].
    #[must_use]
    pub fn from_sets(sets: impl IntoIterator<Item = QuestionSet>) -> Self {
        let mut map = HashMap::new();
        for set in sets {
            map.entry(set.slug.clone()).or_insert(set);
        }
        Self { sets: map }
    }

    /// Looks up a question set by slug.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidSlug` for a slug outside the allowed
    /// pattern and `ExamError::SetNotFound` for a well-formed but unknown
    /// slug.
    pub fn get(&self, slug: &str) -> Result<&QuestionSet> {
        if !is_valid_slug(slug) {
            return Err(ExamError::invalid_slug(slug));
        }
        self.sets
            .get(slug)
            .ok_or_else(|| ExamError::set_not_found(slug))
    }

    /// Returns `true` if the catalog contains `slug`.
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.sets.contains_key(slug)
    }

    /// Number of loaded question sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no question sets are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns all modes present in the catalog, sorted and deduplicated.
    #[must_use]
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = self.sets.values().map(|s| s.mode.clone()).collect();
        modes.sort();
        modes.dedup();
        modes
    }

    /// Returns the categories available for `mode`, sorted and deduplicated.
    #[must_use]
    pub fn categories(&self, mode: &str) -> Vec<String> {
        let mut categories: Vec<String> = self
            .sets
            .values()
            .filter(|s| s.mode == mode)
            .map(|s| s.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Returns summaries of the sets in `mode`/`category`, sorted by slug.
    #[must_use]
    pub fn sets_in(&self, mode: &str, category: &str) -> Vec<SetSummary> {
        let mut summaries: Vec<SetSummary> = self
            .sets
            .values()
            .filter(|s| s.mode == mode && s.category == category)
            .map(QuestionSet::summary)
            .collect();
        summaries.sort_by(|a, b| a.slug.cmp(&b.slug));
        summaries
    }
}

/// Returns the entries of `dir` sorted by file name.
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

/// Returns the last path component as an owned string.
fn dir_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Extracts a short skip reason from a load error.
fn skip_reason(error: &ExamError) -> String {
    match error {
        ExamError::InvalidExamFile { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
