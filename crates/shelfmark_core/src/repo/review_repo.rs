//! Review repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist reviews with overwrite-on-resubmit semantics.
//! - Provide the `(avg_rating, review_count)` aggregate consumed by search,
//!   recommendations and catalog views.
//!
//! # Invariants
//! - One review per `(book, user)`: the upsert replaces rating/comment and
//!   keeps the original row id and creation time.
//! - Write paths call `Review::validate()` before SQL mutations.

use crate::model::book::BookId;
use crate::model::review::{Review, ReviewId};
use crate::repo::{EntityRef, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const REVIEW_SELECT_SQL: &str = "SELECT
    uuid,
    book_uuid,
    user_uuid,
    rating,
    comment,
    created_at
FROM reviews";

/// Review joined with the reviewer's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub review: Review,
    pub user_name: String,
}

/// Aggregate rating data for one book.
///
/// `average_rating` is `None` when the book has no reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Repository interface for reviews.
pub trait ReviewRepository {
    /// Inserts the review, or overwrites rating/comment when the pair
    /// already reviewed the book. Returns the stored row.
    fn upsert_review(&self, review: &Review) -> RepoResult<Review>;
    /// Gets one review by id.
    fn get_review(&self, id: ReviewId) -> RepoResult<Option<Review>>;
    /// Lists a book's reviews with reviewer names, newest first.
    fn list_for_book(&self, book_uuid: BookId) -> RepoResult<Vec<ReviewRecord>>;
    /// Hard-deletes one review.
    fn delete_review(&self, id: ReviewId) -> RepoResult<()>;
    /// Returns the aggregate rating data for one book.
    fn rating_summary(&self, book_uuid: BookId) -> RepoResult<RatingSummary>;
}

/// SQLite-backed review repository.
pub struct SqliteReviewRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReviewRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReviewRepository for SqliteReviewRepository<'_> {
    fn upsert_review(&self, review: &Review) -> RepoResult<Review> {
        review.validate()?;

        let book_text = review.book_uuid.to_string();
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE uuid = ?1);",
            [book_text.as_str()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::NotFound(EntityRef::Book(review.book_uuid)));
        }

        self.conn.execute(
            "INSERT INTO reviews (uuid, book_uuid, user_uuid, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (book_uuid, user_uuid)
             DO UPDATE SET rating = excluded.rating, comment = excluded.comment;",
            params![
                review.uuid.to_string(),
                book_text.as_str(),
                review.user_uuid.to_string(),
                review.rating,
                review.comment.as_deref(),
                review.created_at,
            ],
        )?;

        // Read back: on overwrite the stored row keeps its original id and
        // creation time, not the ones from this submission.
        let mut stmt = self.conn.prepare(&format!(
            "{REVIEW_SELECT_SQL} WHERE book_uuid = ?1 AND user_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![
            book_text.as_str(),
            review.user_uuid.to_string()
        ])?;
        match rows.next()? {
            Some(row) => parse_review_row(row),
            None => Err(RepoError::InvalidData(
                "review row missing immediately after upsert".to_string(),
            )),
        }
    }

    fn get_review(&self, id: ReviewId) -> RepoResult<Option<Review>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEW_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_review_row(row)?));
        }

        Ok(None)
    }

    fn list_for_book(&self, book_uuid: BookId) -> RepoResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                r.uuid AS uuid,
                r.book_uuid AS book_uuid,
                r.user_uuid AS user_uuid,
                r.rating AS rating,
                r.comment AS comment,
                r.created_at AS created_at,
                u.name AS user_name
             FROM reviews r
             JOIN users u ON u.uuid = r.user_uuid
             WHERE r.book_uuid = ?1
             ORDER BY r.created_at DESC, r.uuid ASC;",
        )?;

        let mut rows = stmt.query([book_uuid.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(ReviewRecord {
                review: parse_review_row(row)?,
                user_name: row.get("user_name")?,
            });
        }

        Ok(records)
    }

    fn delete_review(&self, id: ReviewId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reviews WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Review(id)));
        }

        Ok(())
    }

    fn rating_summary(&self, book_uuid: BookId) -> RepoResult<RatingSummary> {
        Ok(rating_summary(self.conn, book_uuid)?)
    }
}

/// Aggregate rating lookup shared with the search and recommendation paths,
/// which operate on a bare connection.
pub(crate) fn rating_summary(
    conn: &Connection,
    book_uuid: BookId,
) -> rusqlite::Result<RatingSummary> {
    conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE book_uuid = ?1;",
        [book_uuid.to_string()],
        |row| {
            Ok(RatingSummary {
                average_rating: row.get(0)?,
                review_count: row.get(1)?,
            })
        },
    )
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<Review> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in reviews.uuid"))
    })?;

    let book_text: String = row.get("book_uuid")?;
    let book_uuid = Uuid::parse_str(&book_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{book_text}` in reviews.book_uuid"
        ))
    })?;

    let user_text: String = row.get("user_uuid")?;
    let user_uuid = Uuid::parse_str(&user_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{user_text}` in reviews.user_uuid"
        ))
    })?;

    let review = Review {
        uuid,
        book_uuid,
        user_uuid,
        rating: row.get("rating")?,
        comment: row.get("comment")?,
        created_at: row.get("created_at")?,
    };
    review.validate()?;
    Ok(review)
}
