//! Book repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `books` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Book::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Deleting a book with active loans is refused.

use crate::model::book::{Book, BookId};
use crate::repo::review_repo::{rating_summary, RatingSummary};
use crate::repo::{ConflictKind, EntityRef, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use uuid::Uuid;

pub(crate) const BOOK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    author,
    isbn,
    publisher,
    published_year,
    category,
    description,
    cover_image,
    total_copies,
    available_copies,
    tags,
    created_at,
    updated_at
FROM books";

/// Book annotated with review aggregates for list/detail views.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedBook {
    pub book: Book,
    /// `None` when the book has no reviews.
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Query options for listing books.
#[derive(Debug, Clone, Default)]
pub struct BookListQuery {
    /// Free-text LIKE filter over title, author and description.
    pub search: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// LIKE filter over the author.
    pub author: Option<String>,
    /// Only books with at least one available copy.
    pub available_only: bool,
}

/// Repository interface for book catalog operations.
pub trait BookRepository {
    /// Creates one book and returns its stable id.
    fn create_book(&self, book: &Book) -> RepoResult<BookId>;
    /// Replaces all mutable fields of an existing book.
    fn update_book(&mut self, book: &Book) -> RepoResult<()>;
    /// Gets one book by id.
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    /// Lists books matching the filter, newest first.
    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>>;
    /// Hard-deletes a book; refused while active loans exist.
    fn delete_book(&mut self, id: BookId) -> RepoResult<()>;
    /// Returns all distinct non-null categories, sorted by name.
    fn list_categories(&self) -> RepoResult<Vec<String>>;
    /// Returns the aggregate rating data for one book.
    fn rating_summary(&self, id: BookId) -> RepoResult<RatingSummary>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_book(&self, book: &Book) -> RepoResult<BookId> {
        book.validate()?;

        self.conn.execute(
            "INSERT INTO books (
                uuid,
                title,
                author,
                isbn,
                publisher,
                published_year,
                category,
                description,
                cover_image,
                total_copies,
                available_copies,
                tags,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                book.uuid.to_string(),
                book.title.as_str(),
                book.author.as_str(),
                book.isbn.as_deref(),
                book.publisher.as_deref(),
                book.published_year,
                book.category.as_deref(),
                book.description.as_deref(),
                book.cover_image.as_deref(),
                book.total_copies,
                book.available_copies,
                book.tags.as_deref(),
                book.created_at,
                book.updated_at,
            ],
        )?;

        Ok(book.uuid)
    }

    fn update_book(&mut self, book: &Book) -> RepoResult<()> {
        book.validate()?;

        let changed = self.conn.execute(
            "UPDATE books
             SET
                title = ?1,
                author = ?2,
                isbn = ?3,
                publisher = ?4,
                published_year = ?5,
                category = ?6,
                description = ?7,
                cover_image = ?8,
                total_copies = ?9,
                available_copies = ?10,
                tags = ?11,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?12;",
            params![
                book.title.as_str(),
                book.author.as_str(),
                book.isbn.as_deref(),
                book.publisher.as_deref(),
                book.published_year,
                book.category.as_deref(),
                book.description.as_deref(),
                book.cover_image.as_deref(),
                book.total_copies,
                book.available_copies,
                book.tags.as_deref(),
                book.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Book(book.uuid)));
        }

        Ok(())
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }

        Ok(None)
    }

    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>> {
        let mut sql = format!("{BOOK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref() {
            sql.push_str(" AND (title LIKE ? OR author LIKE ? OR description LIKE ?)");
            let pattern = format!("%{search}%");
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }

        if let Some(category) = query.category.as_deref() {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.to_string()));
        }

        if let Some(author) = query.author.as_deref() {
            sql.push_str(" AND author LIKE ?");
            bind_values.push(Value::Text(format!("%{author}%")));
        }

        if query.available_only {
            sql.push_str(" AND available_copies > 0");
        }

        sql.push_str(" ORDER BY created_at DESC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut books = Vec::new();

        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }

        Ok(books)
    }

    fn delete_book(&mut self, id: BookId) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let active_loans: i64 = tx.query_row(
            "SELECT COUNT(*) FROM loans WHERE book_uuid = ?1 AND status = 'active';",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        if active_loans > 0 {
            return Err(RepoError::Conflict(ConflictKind::ActiveLoansExist(id)));
        }

        let changed = tx.execute("DELETE FROM books WHERE uuid = ?1;", [id_text.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Book(id)));
        }

        tx.commit()?;
        Ok(())
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM books
             WHERE category IS NOT NULL
             ORDER BY category;",
        )?;

        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(row.get("category")?);
        }

        Ok(categories)
    }

    fn rating_summary(&self, id: BookId) -> RepoResult<RatingSummary> {
        Ok(rating_summary(self.conn, id)?)
    }
}

pub(crate) fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in books.uuid"))
    })?;

    let book = Book {
        uuid,
        title: row.get("title")?,
        author: row.get("author")?,
        isbn: row.get("isbn")?,
        publisher: row.get("publisher")?,
        published_year: row.get("published_year")?,
        category: row.get("category")?,
        description: row.get("description")?,
        cover_image: row.get("cover_image")?,
        total_copies: row.get("total_copies")?,
        available_copies: row.get("available_copies")?,
        tags: row.get("tags")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    book.validate()?;
    Ok(book)
}
