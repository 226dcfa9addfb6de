//! Loan lifecycle use-case service.
//!
//! # Responsibility
//! - Provide the borrow/return/list entry points over the loan repository.
//! - Enforce ownership/role rules before mutations.
//!
//! # Invariants
//! - Borrowing and returning never bypass the repository's transactional
//!   copy-count bookkeeping.
//! - Listing is a read with a declared side effect: past-due active loans
//!   are promoted to overdue and the promotion is persisted.

use crate::model::book::BookId;
use crate::model::loan::{Loan, LoanId};
use crate::model::now_epoch_ms;
use crate::model::user::{Role, UserId};
use crate::repo::loan_repo::{LoanListQuery, LoanRecord, LoanRepository};
use crate::repo::{ConflictKind, EntityRef, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for loan use-cases.
#[derive(Debug)]
pub enum LoanServiceError {
    /// Referenced book does not exist.
    BookNotFound(BookId),
    /// Referenced loan does not exist.
    LoanNotFound(LoanId),
    /// No copy left to borrow.
    NoCopiesAvailable(BookId),
    /// The user already holds an active loan for this book.
    DuplicateActiveLoan { book: BookId, user: UserId },
    /// The loan was already returned.
    AlreadyReturned(LoanId),
    /// Requester is neither the borrower nor staff.
    NotPermitted { loan: LoanId, user: UserId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for LoanServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookNotFound(book) => write!(f, "book not found: {book}"),
            Self::LoanNotFound(loan) => write!(f, "loan not found: {loan}"),
            Self::NoCopiesAvailable(book) => {
                write!(f, "book {book} has no available copies")
            }
            Self::DuplicateActiveLoan { book, user } => {
                write!(f, "user {user} already holds an active loan for book {book}")
            }
            Self::AlreadyReturned(loan) => write!(f, "loan {loan} was already returned"),
            Self::NotPermitted { loan, user } => {
                write!(f, "user {user} may not modify loan {loan}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoanServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LoanServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(EntityRef::Book(book)) => Self::BookNotFound(book),
            RepoError::NotFound(EntityRef::Loan(loan)) => Self::LoanNotFound(loan),
            RepoError::Conflict(ConflictKind::NoCopiesAvailable(book)) => {
                Self::NoCopiesAvailable(book)
            }
            RepoError::Conflict(ConflictKind::DuplicateActiveLoan { book, user }) => {
                Self::DuplicateActiveLoan { book, user }
            }
            RepoError::Conflict(ConflictKind::LoanAlreadyReturned(loan)) => {
                Self::AlreadyReturned(loan)
            }
            other => Self::Repo(other),
        }
    }
}

/// Use-case service wrapper for the loan lifecycle.
pub struct LoanService<R: LoanRepository> {
    repo: R,
}

impl<R: LoanRepository> LoanService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows one copy of `book` for `user`.
    ///
    /// # Contract
    /// - Creates an active loan due 14 days from now.
    /// - Decrements the book's available copies in the same transaction.
    pub fn borrow(&mut self, user: UserId, book: BookId) -> Result<Loan, LoanServiceError> {
        let loan = Loan::new(book, user, now_epoch_ms());

        match self.repo.borrow_book(&loan) {
            Ok(()) => {
                info!(
                    "event=loan_borrow module=service status=ok loan_id={} book_id={book} user_id={user}",
                    loan.uuid
                );
                Ok(loan)
            }
            Err(err) => {
                warn!(
                    "event=loan_borrow module=service status=rejected book_id={book} user_id={user} reason={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Returns a borrowed copy on behalf of `requester`.
    ///
    /// # Contract
    /// - Only the borrower, or a staff role, may return a loan.
    /// - Increments the book's available copies in the same transaction.
    /// - Returning twice fails without touching the copy counter again.
    pub fn return_loan(
        &mut self,
        loan_id: LoanId,
        requester: UserId,
        requester_role: Role,
    ) -> Result<Loan, LoanServiceError> {
        let now = now_epoch_ms();

        let loan = self
            .repo
            .get_loan(loan_id, now)?
            .ok_or(LoanServiceError::LoanNotFound(loan_id))?;

        if loan.user_uuid != requester && !requester_role.is_staff() {
            warn!(
                "event=loan_return module=service status=forbidden loan_id={loan_id} user_id={requester}"
            );
            return Err(LoanServiceError::NotPermitted {
                loan: loan_id,
                user: requester,
            });
        }

        match self.repo.return_book(loan_id, now) {
            Ok(returned) => {
                info!(
                    "event=loan_return module=service status=ok loan_id={loan_id} book_id={} user_id={requester}",
                    returned.book_uuid
                );
                Ok(returned)
            }
            Err(err) => {
                warn!(
                    "event=loan_return module=service status=rejected loan_id={loan_id} reason={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Lists loans matching `query`, newest borrow first.
    ///
    /// Past-due active loans in the result are promoted to overdue and the
    /// promotion is persisted before the records are returned.
    pub fn list_loans(&self, query: &LoanListQuery) -> Result<Vec<LoanRecord>, LoanServiceError> {
        Ok(self.repo.list_loans(query, now_epoch_ms())?)
    }

    /// Gets one loan, promoting it to overdue first when past due.
    pub fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>, LoanServiceError> {
        Ok(self.repo.get_loan(loan_id, now_epoch_ms())?)
    }

    /// Promotes every past-due active loan in one pass.
    ///
    /// Idempotent; suited for scheduled invocation. Returns the number of
    /// loans promoted.
    pub fn reconcile_overdue(&self) -> Result<usize, LoanServiceError> {
        let promoted = self.repo.promote_overdue(now_epoch_ms())?;
        if promoted > 0 {
            info!("event=loan_reconcile module=service status=ok promoted={promoted}");
        }
        Ok(promoted)
    }
}
