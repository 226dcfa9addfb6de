//! Loan repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the borrow/return mutation pairs and keep them atomic.
//! - Provide loan reads with lazy overdue promotion.
//!
//! # Invariants
//! - Borrow and return each run inside one immediate transaction: the loan
//!   row write and the copy-counter write land together or not at all.
//! - The copy decrement is guarded by `available_copies > 0` so concurrent
//!   borrowers cannot overdraw a book below zero.
//! - Reads promote `active` loans past their due date to `overdue` and
//!   persist the promotion before returning the row.

use crate::model::loan::{Loan, LoanId, LoanStatus};
use crate::model::user::UserId;
use crate::repo::{ConflictKind, EntityRef, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const LOAN_SELECT_SQL: &str = "SELECT
    uuid,
    book_uuid,
    user_uuid,
    borrowed_at,
    due_date,
    returned_at,
    status
FROM loans";

/// Query options for listing loans.
#[derive(Debug, Clone, Default)]
pub struct LoanListQuery {
    /// Restrict to one borrower.
    pub user: Option<UserId>,
    /// Restrict to one lifecycle state. A loan selected as `active` but
    /// already past due is still promoted and returned as `overdue`.
    pub status: Option<LoanStatus>,
}

/// Loan joined with the book and borrower fields list views need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    pub loan: Loan,
    pub book_title: String,
    pub book_author: String,
    pub book_cover_image: Option<String>,
    pub user_name: String,
    pub user_email: String,
}

/// Repository interface for the loan lifecycle.
///
/// `get_loan` and `list_loans` are reads with a declared side effect: they
/// persist the overdue promotion for any matching active loan whose due date
/// lies strictly before `now`.
pub trait LoanRepository {
    /// Creates `loan` and decrements the book's available copies, atomically.
    fn borrow_book(&mut self, loan: &Loan) -> RepoResult<()>;
    /// Marks a loan returned and increments available copies, atomically.
    /// Returns the updated loan.
    fn return_book(&mut self, loan_id: LoanId, returned_at: i64) -> RepoResult<Loan>;
    /// Gets one loan, promoting it to overdue first when past due at `now`.
    fn get_loan(&self, loan_id: LoanId, now: i64) -> RepoResult<Option<Loan>>;
    /// Lists loans with book/borrower context, newest borrow first,
    /// promoting past-due rows along the way.
    fn list_loans(&self, query: &LoanListQuery, now: i64) -> RepoResult<Vec<LoanRecord>>;
    /// Bulk-promotes every past-due active loan. Idempotent; returns the
    /// number of rows promoted.
    fn promote_overdue(&self, now: i64) -> RepoResult<usize>;
}

/// SQLite-backed loan repository.
pub struct SqliteLoanRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteLoanRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl LoanRepository for SqliteLoanRepository<'_> {
    fn borrow_book(&mut self, loan: &Loan) -> RepoResult<()> {
        loan.validate()?;

        let book_text = loan.book_uuid.to_string();
        let user_text = loan.user_uuid.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !book_exists_in_tx(&tx, book_text.as_str())? {
            return Err(RepoError::NotFound(EntityRef::Book(loan.book_uuid)));
        }

        let duplicate: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM loans
                WHERE book_uuid = ?1 AND user_uuid = ?2 AND status = 'active'
            );",
            params![book_text.as_str(), user_text.as_str()],
            |row| row.get(0),
        )?;
        if duplicate == 1 {
            return Err(RepoError::Conflict(ConflictKind::DuplicateActiveLoan {
                book: loan.book_uuid,
                user: loan.user_uuid,
            }));
        }

        // Guarded decrement: zero rows changed means no copy was left.
        let decremented = tx.execute(
            "UPDATE books
             SET available_copies = available_copies - 1
             WHERE uuid = ?1 AND available_copies > 0;",
            [book_text.as_str()],
        )?;
        if decremented == 0 {
            return Err(RepoError::Conflict(ConflictKind::NoCopiesAvailable(
                loan.book_uuid,
            )));
        }

        tx.execute(
            "INSERT INTO loans (
                uuid,
                book_uuid,
                user_uuid,
                borrowed_at,
                due_date,
                returned_at,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                loan.uuid.to_string(),
                book_text.as_str(),
                user_text.as_str(),
                loan.borrowed_at,
                loan.due_date,
                loan.returned_at,
                status_to_db(loan.status),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn return_book(&mut self, loan_id: LoanId, returned_at: i64) -> RepoResult<Loan> {
        let loan_text = loan_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut loan = {
            let mut stmt = tx.prepare(&format!("{LOAN_SELECT_SQL} WHERE uuid = ?1;"))?;
            let mut rows = stmt.query([loan_text.as_str()])?;
            match rows.next()? {
                Some(row) => parse_loan_row(row)?,
                None => return Err(RepoError::NotFound(EntityRef::Loan(loan_id))),
            }
        };

        if loan.status == LoanStatus::Returned {
            return Err(RepoError::Conflict(ConflictKind::LoanAlreadyReturned(
                loan_id,
            )));
        }

        tx.execute(
            "UPDATE loans
             SET status = 'returned', returned_at = ?1
             WHERE uuid = ?2;",
            params![returned_at, loan_text.as_str()],
        )?;

        // The symmetric guard: an increment past total_copies would mean the
        // counters were already corrupt, so refuse rather than mask it.
        let incremented = tx.execute(
            "UPDATE books
             SET available_copies = available_copies + 1
             WHERE uuid = ?1 AND available_copies < total_copies;",
            [loan.book_uuid.to_string()],
        )?;
        if incremented == 0 {
            return Err(RepoError::InvalidData(format!(
                "available_copies already at total_copies for book {}",
                loan.book_uuid
            )));
        }

        tx.commit()?;

        loan.status = LoanStatus::Returned;
        loan.returned_at = Some(returned_at);
        Ok(loan)
    }

    fn get_loan(&self, loan_id: LoanId, now: i64) -> RepoResult<Option<Loan>> {
        let mut loan = {
            let mut stmt = self
                .conn
                .prepare(&format!("{LOAN_SELECT_SQL} WHERE uuid = ?1;"))?;
            let mut rows = stmt.query([loan_id.to_string()])?;
            match rows.next()? {
                Some(row) => parse_loan_row(row)?,
                None => return Ok(None),
            }
        };

        if loan.is_past_due(now) {
            self.mark_overdue(&mut loan)?;
        }

        Ok(Some(loan))
    }

    fn list_loans(&self, query: &LoanListQuery, now: i64) -> RepoResult<Vec<LoanRecord>> {
        let mut sql = format!(
            "SELECT
                l.uuid AS uuid,
                l.book_uuid AS book_uuid,
                l.user_uuid AS user_uuid,
                l.borrowed_at AS borrowed_at,
                l.due_date AS due_date,
                l.returned_at AS returned_at,
                l.status AS status,
                b.title AS book_title,
                b.author AS book_author,
                b.cover_image AS book_cover_image,
                u.name AS user_name,
                u.email AS user_email
             FROM loans l
             JOIN books b ON b.uuid = l.book_uuid
             JOIN users u ON u.uuid = l.user_uuid
             WHERE 1 = 1"
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(user) = query.user {
            sql.push_str(" AND l.user_uuid = ?");
            bind_values.push(Value::Text(user.to_string()));
        }

        if let Some(status) = query.status {
            sql.push_str(" AND l.status = ?");
            bind_values.push(Value::Text(status_to_db(status).to_string()));
        }

        sql.push_str(" ORDER BY l.borrowed_at DESC, l.uuid ASC");

        let mut records = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut records = Vec::new();

            while let Some(row) = rows.next()? {
                records.push(LoanRecord {
                    loan: parse_loan_row(row)?,
                    book_title: row.get("book_title")?,
                    book_author: row.get("book_author")?,
                    book_cover_image: row.get("book_cover_image")?,
                    user_name: row.get("user_name")?,
                    user_email: row.get("user_email")?,
                });
            }
            records
        };

        for record in &mut records {
            if record.loan.is_past_due(now) {
                self.mark_overdue(&mut record.loan)?;
            }
        }

        Ok(records)
    }

    fn promote_overdue(&self, now: i64) -> RepoResult<usize> {
        let promoted = self.conn.execute(
            "UPDATE loans
             SET status = 'overdue'
             WHERE status = 'active' AND due_date < ?1;",
            [now],
        )?;
        Ok(promoted)
    }
}

impl SqliteLoanRepository<'_> {
    /// Persists the overdue promotion for one past-due active loan.
    fn mark_overdue(&self, loan: &mut Loan) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE loans
             SET status = 'overdue'
             WHERE uuid = ?1 AND status = 'active';",
            [loan.uuid.to_string()],
        )?;
        loan.status = LoanStatus::Overdue;
        Ok(())
    }
}

fn book_exists_in_tx(tx: &Transaction<'_>, book_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM books WHERE uuid = ?1);",
        [book_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_loan_row(row: &Row<'_>) -> RepoResult<Loan> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in loans.uuid"))
    })?;

    let book_text: String = row.get("book_uuid")?;
    let book_uuid = Uuid::parse_str(&book_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{book_text}` in loans.book_uuid"
        ))
    })?;

    let user_text: String = row.get("user_uuid")?;
    let user_uuid = Uuid::parse_str(&user_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{user_text}` in loans.user_uuid"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in loans.status"))
    })?;

    let loan = Loan {
        uuid,
        book_uuid,
        user_uuid,
        borrowed_at: row.get("borrowed_at")?,
        due_date: row.get("due_date")?,
        returned_at: row.get("returned_at")?,
        status,
    };
    loan.validate()?;
    Ok(loan)
}

pub(crate) fn status_to_db(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Active => "active",
        LoanStatus::Returned => "returned",
        LoanStatus::Overdue => "overdue",
    }
}

pub(crate) fn parse_status(value: &str) -> Option<LoanStatus> {
    match value {
        "active" => Some(LoanStatus::Active),
        "returned" => Some(LoanStatus::Returned),
        "overdue" => Some(LoanStatus::Overdue),
        _ => None,
    }
}
