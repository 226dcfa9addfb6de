//! Review domain model.
//!
//! # Responsibility
//! - Define the rating record feeding search/recommendation aggregates.
//!
//! # Invariants
//! - `rating` is an integer in `1..=5`.
//! - At most one review per `(book, user)`; re-submission overwrites the
//!   existing rating and comment instead of adding a row.

use crate::model::book::BookId;
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a review.
pub type ReviewId = Uuid;

/// One user's rating of one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub uuid: ReviewId,
    pub book_uuid: BookId,
    pub user_uuid: UserId,
    /// Integer stars, `1..=5`.
    pub rating: i64,
    pub comment: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Review {
    /// Creates a review with a generated stable ID.
    pub fn new(book_uuid: BookId, user_uuid: UserId, rating: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            book_uuid,
            user_uuid,
            rating,
            comment: None,
            created_at: now_epoch_ms(),
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Review;
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn rating_bounds_are_inclusive() {
        for rating in 1..=5 {
            Review::new(Uuid::new_v4(), Uuid::new_v4(), rating)
                .validate()
                .expect("in-range rating");
        }
        for rating in [0, 6, -3] {
            assert_eq!(
                Review::new(Uuid::new_v4(), Uuid::new_v4(), rating).validate(),
                Err(ValidationError::RatingOutOfRange(rating))
            );
        }
    }
}
