//! Domain model for the library catalog.
//!
//! # Responsibility
//! - Define canonical records for books, users, loans and reviews.
//! - Enforce record-level invariants via `validate()` before persistence.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `0 <= available_copies <= total_copies` for every book.
//! - Ratings are integers in `1..=5`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod book;
pub mod loan;
pub mod review;
pub mod user;

/// Current UTC instant as unix epoch milliseconds.
///
/// A clock before the unix epoch collapses to 0.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Record-level invariant violation, shared by all catalog entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Book/classifier title must not be blank.
    EmptyTitle,
    /// Book author must not be blank.
    EmptyAuthor,
    /// User display name must not be blank.
    EmptyName,
    /// User email must not be blank and must contain `@`.
    InvalidEmail(String),
    /// ISBN does not look like an ISBN-10/13.
    InvalidIsbn(String),
    /// Copy counters out of range (`1 <= total`, `0 <= available <= total`).
    CopyCountOutOfRange { total: i64, available: i64 },
    /// Rating outside `1..=5`.
    RatingOutOfRange(i64),
    /// Loan due date earlier than borrow instant.
    LoanTimeOrder { borrowed_at: i64, due_date: i64 },
    /// `returned_at` must be present exactly when status is `returned`.
    ReturnTimestampMismatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::EmptyAuthor => write!(f, "author must not be blank"),
            Self::EmptyName => write!(f, "name must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::InvalidIsbn(value) => write!(f, "invalid isbn: `{value}`"),
            Self::CopyCountOutOfRange { total, available } => write!(
                f,
                "copy counters out of range: total={total} available={available}"
            ),
            Self::RatingOutOfRange(value) => {
                write!(f, "rating must be between 1 and 5, got {value}")
            }
            Self::LoanTimeOrder {
                borrowed_at,
                due_date,
            } => write!(
                f,
                "loan due date {due_date} is earlier than borrow instant {borrowed_at}"
            ),
            Self::ReturnTimestampMismatch => {
                write!(f, "returned_at must be set exactly for returned loans")
            }
        }
    }
}

impl Error for ValidationError {}
