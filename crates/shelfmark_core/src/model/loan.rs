//! Loan domain model.
//!
//! # Responsibility
//! - Define the lifecycle record tying one borrowed copy to one user.
//! - Provide the due-date arithmetic and past-due predicate.
//!
//! # Invariants
//! - At most one `active` loan per `(book, user)` pair at any time.
//! - `due_date` = `borrowed_at` + exactly 14 days of UTC epoch-ms arithmetic.
//! - `returned_at` is set exactly when the status is `returned`.

use crate::model::book::BookId;
use crate::model::user::UserId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a loan.
pub type LoanId = Uuid;

/// Borrowing period granted on every loan.
pub const LOAN_PERIOD_DAYS: i64 = 14;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Loan lifecycle state.
///
/// `overdue` is not timer-driven: an `active` loan past its due date is
/// promoted when it is next read, and the promotion is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

/// One borrowed copy held by one user for a bounded period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub uuid: LoanId,
    pub book_uuid: BookId,
    pub user_uuid: UserId,
    /// Unix epoch milliseconds.
    pub borrowed_at: i64,
    /// Unix epoch milliseconds; `borrowed_at` + 14 days.
    pub due_date: i64,
    /// Unix epoch milliseconds; set on return only.
    pub returned_at: Option<i64>,
    pub status: LoanStatus,
}

impl Loan {
    /// Creates an active loan starting at `borrowed_at`.
    pub fn new(book_uuid: BookId, user_uuid: UserId, borrowed_at: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            book_uuid,
            user_uuid,
            borrowed_at,
            due_date: borrowed_at + LOAN_PERIOD_DAYS * MS_PER_DAY,
            returned_at: None,
            status: LoanStatus::Active,
        }
    }

    /// An active loan strictly past its due date awaits overdue promotion.
    pub fn is_past_due(&self, now: i64) -> bool {
        self.status == LoanStatus::Active && now > self.due_date
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.due_date < self.borrowed_at {
            return Err(ValidationError::LoanTimeOrder {
                borrowed_at: self.borrowed_at,
                due_date: self.due_date,
            });
        }
        if (self.status == LoanStatus::Returned) != self.returned_at.is_some() {
            return Err(ValidationError::ReturnTimestampMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Loan, LoanStatus, MS_PER_DAY};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn due_date_is_fourteen_days_after_borrow() {
        let loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), 1_000);
        assert_eq!(loan.due_date, 1_000 + 14 * MS_PER_DAY);
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.returned_at, None);
        loan.validate().expect("fresh loan should validate");
    }

    #[test]
    fn past_due_is_strict_and_active_only() {
        let mut loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), 0);
        assert!(!loan.is_past_due(loan.due_date));
        assert!(loan.is_past_due(loan.due_date + 1));

        loan.status = LoanStatus::Overdue;
        assert!(!loan.is_past_due(loan.due_date + 1));
    }

    #[test]
    fn returned_status_requires_timestamp() {
        let mut loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), 0);
        loan.status = LoanStatus::Returned;
        assert_eq!(
            loan.validate(),
            Err(ValidationError::ReturnTimestampMismatch)
        );

        loan.returned_at = Some(5_000);
        loan.validate().expect("returned loan with timestamp");

        loan.status = LoanStatus::Active;
        assert_eq!(
            loan.validate(),
            Err(ValidationError::ReturnTimestampMismatch)
        );
    }
}
