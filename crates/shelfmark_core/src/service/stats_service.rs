//! Dashboard statistics over the catalog.
//!
//! # Responsibility
//! - Produce the aggregate snapshot shown on the staff dashboard.
//!
//! # Invariants
//! - Pure reads; no row is mutated (overdue promotion happens in the loan
//!   paths, not here).
//! - Popularity counts historical loans of any status.

use crate::db::DbError;
use crate::model::book::BookId;
use rusqlite::{Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// How many top borrowed books the snapshot carries.
const POPULAR_BOOK_LIMIT: u32 = 5;

/// Result type for statistics APIs.
pub type StatsResult<T> = Result<T, StatsError>;

/// Statistics-layer error for DB interaction and result decoding.
#[derive(Debug)]
pub enum StatsError {
    Db(DbError),
    InvalidData(String),
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid statistics row: {message}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StatsError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StatsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Headline counters for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardCounters {
    pub total_books: i64,
    /// Sum of `available_copies` across the catalog.
    pub available_copies: i64,
    pub total_users: i64,
    /// Loans currently out: `active` plus `overdue`.
    pub open_loans: i64,
    pub overdue_loans: i64,
}

/// One entry of the most-borrowed ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularBook {
    pub book_uuid: BookId,
    pub title: String,
    pub author: String,
    pub cover_image: Option<String>,
    pub loan_count: i64,
}

/// Book count per category label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Full dashboard snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub counters: DashboardCounters,
    /// Top five most-borrowed books, ties in insertion order.
    pub popular_books: Vec<PopularBook>,
    /// Categories by descending book count.
    pub books_by_category: Vec<CategoryCount>,
}

/// Computes the dashboard snapshot in one pass of aggregate queries.
pub fn dashboard_snapshot(conn: &Connection) -> StatsResult<DashboardSnapshot> {
    let counters = DashboardCounters {
        total_books: scalar(conn, "SELECT COUNT(*) FROM books;")?,
        available_copies: scalar(
            conn,
            "SELECT COALESCE(SUM(available_copies), 0) FROM books;",
        )?,
        total_users: scalar(conn, "SELECT COUNT(*) FROM users;")?,
        open_loans: scalar(
            conn,
            "SELECT COUNT(*) FROM loans WHERE status IN ('active', 'overdue');",
        )?,
        overdue_loans: scalar(conn, "SELECT COUNT(*) FROM loans WHERE status = 'overdue';")?,
    };

    let popular_books = {
        let mut stmt = conn.prepare(
            "SELECT
                b.uuid AS uuid,
                b.title AS title,
                b.author AS author,
                b.cover_image AS cover_image,
                COUNT(l.uuid) AS loan_count
             FROM books b
             LEFT JOIN loans l ON l.book_uuid = b.uuid
             GROUP BY b.uuid
             ORDER BY loan_count DESC, b.rowid ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([POPULAR_BOOK_LIMIT])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_popular_row(row)?);
        }
        books
    };

    let books_by_category = {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS count
             FROM books
             WHERE category IS NOT NULL
             GROUP BY category
             ORDER BY count DESC, category ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            counts.push(CategoryCount {
                category: row.get("category")?,
                count: row.get("count")?,
            });
        }
        counts
    };

    Ok(DashboardSnapshot {
        counters,
        popular_books,
        books_by_category,
    })
}

fn scalar(conn: &Connection, sql: &str) -> StatsResult<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

fn parse_popular_row(row: &Row<'_>) -> StatsResult<PopularBook> {
    let uuid_text: String = row.get("uuid")?;
    let book_uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        StatsError::InvalidData(format!("invalid uuid value `{uuid_text}` in books.uuid"))
    })?;

    Ok(PopularBook {
        book_uuid,
        title: row.get("title")?,
        author: row.get("author")?,
        cover_image: row.get("cover_image")?,
        loan_count: row.get("loan_count")?,
    })
}
