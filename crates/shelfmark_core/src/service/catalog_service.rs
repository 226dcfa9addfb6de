//! Catalog administration use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/delete entry points for books.
//! - Keep copy-count bookkeeping consistent when the owned total changes.
//!
//! # Invariants
//! - `available_copies` starts equal to `total_copies` on intake.
//! - Changing `total_copies` shifts `available_copies` by the same delta;
//!   a shift that would leave the counters out of range is rejected.
//! - Deletion is refused while active loans exist.

use crate::model::book::{Book, BookId};
use crate::model::ValidationError;
use crate::repo::book_repo::{BookListQuery, BookRepository, RatedBook};
use crate::repo::{ConflictKind, EntityRef, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Request model for catalog intake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    /// Defaults to 1 when absent.
    pub total_copies: Option<i64>,
    pub tags: Option<String>,
}

/// Partial update for an existing book. `None` keeps the stored value;
/// optional text fields cannot be cleared through this model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_copies: Option<i64>,
    pub tags: Option<String>,
}

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum CatalogServiceError {
    /// Referenced book does not exist.
    BookNotFound(BookId),
    /// Record-level invariant violation (blank title, copy range, ISBN).
    Invalid(ValidationError),
    /// Deletion refused while active loans exist.
    ActiveLoansExist(BookId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookNotFound(book) => write!(f, "book not found: {book}"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::ActiveLoansExist(book) => {
                write!(f, "book {book} cannot be deleted while loans are active")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(EntityRef::Book(book)) => Self::BookNotFound(book),
            RepoError::Conflict(ConflictKind::ActiveLoansExist(book)) => {
                Self::ActiveLoansExist(book)
            }
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service wrapper for catalog administration.
pub struct CatalogService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> CatalogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a book to the catalog with every copy available.
    pub fn create_book(&self, draft: BookDraft) -> Result<Book, CatalogServiceError> {
        let mut book = Book::new(draft.title, draft.author);
        if let Some(total) = draft.total_copies {
            book = book.with_copies(total);
        }
        book.isbn = draft.isbn;
        book.publisher = draft.publisher;
        book.published_year = draft.published_year;
        book.category = draft.category;
        book.description = draft.description;
        book.cover_image = draft.cover_image;
        book.tags = draft.tags;

        self.repo.create_book(&book)?;
        info!(
            "event=book_create module=service status=ok book_id={} copies={}",
            book.uuid, book.total_copies
        );
        Ok(book)
    }

    /// Gets one book with its rating aggregates.
    pub fn get_book(&self, id: BookId) -> Result<Option<RatedBook>, CatalogServiceError> {
        let Some(book) = self.repo.get_book(id)? else {
            return Ok(None);
        };
        let summary = self.repo.rating_summary(id)?;
        Ok(Some(RatedBook {
            book,
            average_rating: summary.average_rating,
            review_count: summary.review_count,
        }))
    }

    /// Lists books matching `query`, newest first, with rating aggregates.
    pub fn list_books(&self, query: &BookListQuery) -> Result<Vec<RatedBook>, CatalogServiceError> {
        let books = self.repo.list_books(query)?;
        let mut rated = Vec::with_capacity(books.len());
        for book in books {
            let summary = self.repo.rating_summary(book.uuid)?;
            rated.push(RatedBook {
                book,
                average_rating: summary.average_rating,
                review_count: summary.review_count,
            });
        }
        Ok(rated)
    }

    /// Applies a partial update to an existing book.
    ///
    /// A `total_copies` change shifts `available_copies` by the same delta,
    /// so copies currently on loan stay accounted for.
    pub fn update_book(&mut self, id: BookId, patch: BookPatch) -> Result<Book, CatalogServiceError> {
        let mut book = self
            .repo
            .get_book(id)?
            .ok_or(CatalogServiceError::BookNotFound(id))?;

        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author) = patch.author {
            book.author = author;
        }
        if let Some(isbn) = patch.isbn {
            book.isbn = Some(isbn);
        }
        if let Some(publisher) = patch.publisher {
            book.publisher = Some(publisher);
        }
        if let Some(published_year) = patch.published_year {
            book.published_year = Some(published_year);
        }
        if let Some(category) = patch.category {
            book.category = Some(category);
        }
        if let Some(description) = patch.description {
            book.description = Some(description);
        }
        if let Some(cover_image) = patch.cover_image {
            book.cover_image = Some(cover_image);
        }
        if let Some(tags) = patch.tags {
            book.tags = Some(tags);
        }
        if let Some(total) = patch.total_copies {
            let delta = total - book.total_copies;
            book.total_copies = total;
            book.available_copies += delta;
        }

        // Validate before touching storage so an out-of-range copy shift is
        // reported as invalid input, not a constraint failure.
        book.validate().map_err(CatalogServiceError::Invalid)?;

        self.repo.update_book(&book)?;
        info!("event=book_update module=service status=ok book_id={id}");
        Ok(book)
    }

    /// Removes a book; refused while copies are out on active loans.
    pub fn delete_book(&mut self, id: BookId) -> Result<(), CatalogServiceError> {
        self.repo.delete_book(id)?;
        info!("event=book_delete module=service status=ok book_id={id}");
        Ok(())
    }

    /// Returns all distinct categories present in the catalog.
    pub fn list_categories(&self) -> Result<Vec<String>, CatalogServiceError> {
        Ok(self.repo.list_categories()?)
    }
}
