//! Reading recommendations derived from borrow and rating history.
//!
//! # Responsibility
//! - Select candidate books from a user's taste signals.
//! - Backfill from popularity ranking when signals run short.
//!
//! # Invariants
//! - Taste-based candidates always precede popularity backfill; the two
//!   phases are never re-sorted against each other.
//! - Books the user ever borrowed are excluded from both phases.
//! - At most 10 books are returned.

use crate::db::DbError;
use crate::model::book::Book;
use crate::model::user::UserId;
use crate::repo::book_repo::{parse_book_row, RatedBook, BOOK_SELECT_SQL};
use crate::repo::review_repo::rating_summary;
use crate::repo::RepoError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result cap across both phases.
const MAX_RECOMMENDATIONS: usize = 10;
/// Popularity backfill kicks in below this taste-phase yield.
const BACKFILL_THRESHOLD: usize = 5;
/// A rating at or above this marks a favorite.
const FAVORITE_RATING: i64 = 4;

/// Result type for recommendation APIs.
pub type RecommendResult<T> = Result<T, RecommendError>;

/// Recommendation-layer error for DB interaction and result decoding.
#[derive(Debug)]
pub enum RecommendError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RecommendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid recommendation row: {message}"),
        }
    }
}

impl Error for RecommendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RecommendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RecommendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for RecommendError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Taste signals extracted from a user's history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TasteProfile {
    favorite_categories: BTreeSet<String>,
    favorite_authors: BTreeSet<String>,
    borrowed_books: Vec<String>,
}

impl TasteProfile {
    fn has_favorites(&self) -> bool {
        !self.favorite_categories.is_empty() || !self.favorite_authors.is_empty()
    }
}

/// Builds up to 10 recommendations for `user`.
///
/// Phase 1 picks available books matching the user's favorite categories or
/// authors (ratings of 4 and up), excluding anything already borrowed.
/// Phase 2 appends popularity-ranked books (loan count, then average rating)
/// whenever phase 1 yields fewer than 5.
pub fn recommend_for_user(conn: &Connection, user: UserId) -> RecommendResult<Vec<RatedBook>> {
    let profile = load_taste_profile(conn, user)?;

    let mut picks: Vec<Book> = Vec::new();
    if profile.has_favorites() {
        picks = taste_candidates(conn, &profile)?;
    }

    if picks.len() < BACKFILL_THRESHOLD {
        let backfill = popular_candidates(
            conn,
            &profile.borrowed_books,
            MAX_RECOMMENDATIONS - picks.len(),
        )?;
        picks.extend(backfill);
    }

    let mut rated = Vec::with_capacity(picks.len());
    for book in picks {
        let summary = rating_summary(conn, book.uuid)?;
        rated.push(RatedBook {
            book,
            average_rating: summary.average_rating,
            review_count: summary.review_count,
        });
    }

    Ok(rated)
}

fn load_taste_profile(conn: &Connection, user: UserId) -> RecommendResult<TasteProfile> {
    let user_text = user.to_string();
    let mut profile = TasteProfile::default();

    let mut stmt = conn.prepare(
        "SELECT DISTINCT b.category, b.author
         FROM reviews r
         JOIN books b ON b.uuid = r.book_uuid
         WHERE r.user_uuid = ?1 AND r.rating >= ?2;",
    )?;
    let mut rows = stmt.query(rusqlite::params![user_text.as_str(), FAVORITE_RATING])?;
    while let Some(row) = rows.next()? {
        if let Some(category) = row.get::<_, Option<String>>(0)? {
            profile.favorite_categories.insert(category);
        }
        profile.favorite_authors.insert(row.get(1)?);
    }

    let mut stmt = conn.prepare(
        "SELECT DISTINCT book_uuid FROM loans WHERE user_uuid = ?1;",
    )?;
    let mut rows = stmt.query([user_text.as_str()])?;
    while let Some(row) = rows.next()? {
        profile.borrowed_books.push(row.get(0)?);
    }

    Ok(profile)
}

fn taste_candidates(conn: &Connection, profile: &TasteProfile) -> RecommendResult<Vec<Book>> {
    let mut sql = format!("{BOOK_SELECT_SQL} WHERE available_copies > 0");
    let mut bind_values: Vec<Value> = Vec::new();

    let category_list = placeholder_list(profile.favorite_categories.len());
    let author_list = placeholder_list(profile.favorite_authors.len());

    match (
        profile.favorite_categories.is_empty(),
        profile.favorite_authors.is_empty(),
    ) {
        (false, false) => {
            sql.push_str(&format!(
                " AND (category IN ({category_list}) OR author IN ({author_list}))"
            ));
            bind_text_values(&mut bind_values, profile.favorite_categories.iter());
            bind_text_values(&mut bind_values, profile.favorite_authors.iter());
        }
        (false, true) => {
            sql.push_str(&format!(" AND category IN ({category_list})"));
            bind_text_values(&mut bind_values, profile.favorite_categories.iter());
        }
        (true, false) => {
            sql.push_str(&format!(" AND author IN ({author_list})"));
            bind_text_values(&mut bind_values, profile.favorite_authors.iter());
        }
        (true, true) => return Ok(Vec::new()),
    }

    if !profile.borrowed_books.is_empty() {
        let borrowed_list = placeholder_list(profile.borrowed_books.len());
        sql.push_str(&format!(" AND uuid NOT IN ({borrowed_list})"));
        bind_text_values(&mut bind_values, profile.borrowed_books.iter());
    }

    sql.push_str(&format!(" LIMIT {MAX_RECOMMENDATIONS}"));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut books = Vec::new();
    while let Some(row) = rows.next()? {
        books.push(parse_book_row(row)?);
    }

    Ok(books)
}

fn popular_candidates(
    conn: &Connection,
    borrowed_books: &[String],
    limit: usize,
) -> RecommendResult<Vec<Book>> {
    let mut sql = format!("{BOOK_SELECT_SQL} WHERE available_copies > 0");
    let mut bind_values: Vec<Value> = Vec::new();

    if !borrowed_books.is_empty() {
        let borrowed_list = placeholder_list(borrowed_books.len());
        sql.push_str(&format!(" AND uuid NOT IN ({borrowed_list})"));
        bind_text_values(&mut bind_values, borrowed_books.iter());
    }

    // Correlated subqueries keep loan counts honest; a plain double LEFT
    // JOIN would multiply loan rows by review rows before counting.
    sql.push_str(
        " ORDER BY
            (SELECT COUNT(*) FROM loans l WHERE l.book_uuid = books.uuid) DESC,
            (SELECT COALESCE(AVG(r.rating), 0) FROM reviews r WHERE r.book_uuid = books.uuid) DESC,
            books.rowid ASC",
    );
    sql.push_str(&format!(" LIMIT {limit}"));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut books = Vec::new();
    while let Some(row) = rows.next()? {
        books.push(parse_book_row(row)?);
    }

    Ok(books)
}

fn placeholder_list(len: usize) -> String {
    vec!["?"; len].join(", ")
}

fn bind_text_values<'a>(
    bind_values: &mut Vec<Value>,
    items: impl Iterator<Item = &'a String>,
) {
    for item in items {
        bind_values.push(Value::Text(item.clone()));
    }
}
