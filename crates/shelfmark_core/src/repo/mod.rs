//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.
//! - Multi-row mutations (borrow/return pairs) are transactional.

use crate::db::DbError;
use crate::model::book::BookId;
use crate::model::loan::LoanId;
use crate::model::review::ReviewId;
use crate::model::user::UserId;
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod book_repo;
pub mod loan_repo;
pub mod review_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Identifies which entity a semantic repository error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Book(BookId),
    User(UserId),
    Loan(LoanId),
    Review(ReviewId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Book(id) => write!(f, "book {id}"),
            Self::User(id) => write!(f, "user {id}"),
            Self::Loan(id) => write!(f, "loan {id}"),
            Self::Review(id) => write!(f, "review {id}"),
        }
    }
}

/// State invariant that a rejected mutation would have violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// No copy left to borrow.
    NoCopiesAvailable(BookId),
    /// The pair already holds an active loan.
    DuplicateActiveLoan { book: BookId, user: UserId },
    /// The loan was already returned.
    LoanAlreadyReturned(LoanId),
    /// A book with active loans cannot be deleted.
    ActiveLoansExist(BookId),
    /// The email is already registered to another user.
    EmailAlreadyRegistered(String),
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCopiesAvailable(book) => write!(f, "book {book} has no available copies"),
            Self::DuplicateActiveLoan { book, user } => {
                write!(f, "user {user} already holds an active loan for book {book}")
            }
            Self::LoanAlreadyReturned(loan) => write!(f, "loan {loan} was already returned"),
            Self::ActiveLoansExist(book) => {
                write!(f, "book {book} still has active loans")
            }
            Self::EmailAlreadyRegistered(email) => {
                write!(f, "email `{email}` is already registered")
            }
        }
    }
}

/// Generic repository error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(EntityRef),
    Conflict(ConflictKind),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(kind) => write!(f, "{kind}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
