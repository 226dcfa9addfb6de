//! Review use-case service.
//!
//! # Responsibility
//! - Provide submit/list/delete entry points for reviews.
//! - Enforce the one-review-per-pair overwrite rule and deletion rights.
//!
//! # Invariants
//! - Ratings outside `1..=5` never reach storage.
//! - Only the review author or an admin may delete a review.

use crate::model::book::BookId;
use crate::model::review::{Review, ReviewId};
use crate::model::user::{Role, UserId};
use crate::model::ValidationError;
use crate::repo::review_repo::{RatingSummary, ReviewRecord, ReviewRepository};
use crate::repo::{EntityRef, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for review use-cases.
#[derive(Debug)]
pub enum ReviewServiceError {
    /// Referenced book does not exist.
    BookNotFound(BookId),
    /// Referenced review does not exist.
    ReviewNotFound(ReviewId),
    /// Rating outside `1..=5`.
    InvalidRating(i64),
    /// Requester is neither the author nor an admin.
    NotPermitted { review: ReviewId, user: UserId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ReviewServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookNotFound(book) => write!(f, "book not found: {book}"),
            Self::ReviewNotFound(review) => write!(f, "review not found: {review}"),
            Self::InvalidRating(value) => {
                write!(f, "rating must be between 1 and 5, got {value}")
            }
            Self::NotPermitted { review, user } => {
                write!(f, "user {user} may not delete review {review}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReviewServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ReviewServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(EntityRef::Book(book)) => Self::BookNotFound(book),
            RepoError::NotFound(EntityRef::Review(review)) => Self::ReviewNotFound(review),
            RepoError::Validation(ValidationError::RatingOutOfRange(rating)) => {
                Self::InvalidRating(rating)
            }
            other => Self::Repo(other),
        }
    }
}

/// Use-case service wrapper for reviews.
pub struct ReviewService<R: ReviewRepository> {
    repo: R,
}

impl<R: ReviewRepository> ReviewService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Submits a rating, overwriting the user's previous review of the
    /// same book when one exists.
    ///
    /// Returns the stored review: on overwrite it keeps the original row's
    /// id and creation time.
    pub fn submit_review(
        &self,
        user: UserId,
        book: BookId,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review, ReviewServiceError> {
        let mut review = Review::new(book, user, rating);
        review.comment = comment;

        let stored = self.repo.upsert_review(&review)?;
        info!(
            "event=review_submit module=service status=ok review_id={} book_id={book} user_id={user} rating={rating}",
            stored.uuid
        );
        Ok(stored)
    }

    /// Lists a book's reviews with reviewer names, newest first.
    pub fn list_for_book(&self, book: BookId) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        Ok(self.repo.list_for_book(book)?)
    }

    /// Deletes a review on behalf of `requester`.
    pub fn delete_review(
        &self,
        review_id: ReviewId,
        requester: UserId,
        requester_role: Role,
    ) -> Result<(), ReviewServiceError> {
        let review = self
            .repo
            .get_review(review_id)?
            .ok_or(ReviewServiceError::ReviewNotFound(review_id))?;

        if review.user_uuid != requester && requester_role != Role::Admin {
            return Err(ReviewServiceError::NotPermitted {
                review: review_id,
                user: requester,
            });
        }

        self.repo.delete_review(review_id)?;
        info!("event=review_delete module=service status=ok review_id={review_id}");
        Ok(())
    }

    /// Returns the aggregate rating data for one book.
    pub fn rating_summary(&self, book: BookId) -> Result<RatingSummary, ReviewServiceError> {
        Ok(self.repo.rating_summary(book)?)
    }
}
