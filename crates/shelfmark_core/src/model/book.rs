//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical catalog record for a physical title.
//! - Enforce the copy-count invariant and the ISBN shape.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another book.
//! - `0 <= available_copies <= total_copies` and `total_copies >= 1`.
//! - `tags` is free text, comma separated, no structure beyond that.

use crate::model::{now_epoch_ms, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a catalog book.
pub type BookId = Uuid;

/// Digits with optional separators, ISBN-10 or ISBN-13, optional check `X`.
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:97[89][- ]?)?\d{1,5}[- ]?\d{1,7}[- ]?\d{1,7}[- ]?[\dXx]$")
        .expect("valid isbn regex"));

/// Canonical catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Stable global ID used for loans, reviews and auditing.
    pub uuid: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    /// Copies the library owns. At least 1.
    pub total_copies: i64,
    /// Copies not currently on loan. `0..=total_copies`.
    pub available_copies: i64,
    /// Free-text comma-separated keywords used by search.
    pub tags: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Book {
    /// Creates a single-copy book with a generated stable ID.
    ///
    /// Optional bibliographic fields start as `None`; `available_copies`
    /// starts equal to `total_copies`.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            author: author.into(),
            isbn: None,
            publisher: None,
            published_year: None,
            category: None,
            description: None,
            cover_image: None,
            total_copies: 1,
            available_copies: 1,
            tags: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the owned copy count, keeping every copy available.
    ///
    /// Intended for catalog intake, before any loan exists.
    pub fn with_copies(mut self, total: i64) -> Self {
        self.total_copies = total;
        self.available_copies = total;
        self
    }

    /// Returns whether at least one copy can be borrowed right now.
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Checks record-level invariants.
    ///
    /// # Errors
    /// - `EmptyTitle` / `EmptyAuthor` for blank required fields.
    /// - `CopyCountOutOfRange` when the copy counters are inconsistent.
    /// - `InvalidIsbn` when a present ISBN does not match the ISBN shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        if self.total_copies < 1
            || self.available_copies < 0
            || self.available_copies > self.total_copies
        {
            return Err(ValidationError::CopyCountOutOfRange {
                total: self.total_copies,
                available: self.available_copies,
            });
        }
        if let Some(isbn) = self.isbn.as_deref() {
            if !ISBN_RE.is_match(isbn.trim()) {
                return Err(ValidationError::InvalidIsbn(isbn.to_string()));
            }
        }
        Ok(())
    }
}
