//! User domain model.
//!
//! # Responsibility
//! - Define the borrower/staff record referenced by loans and reviews.
//! - Provide the role ladder used for mutation permission checks.
//!
//! # Invariants
//! - `email` is unique catalog-wide (enforced by the store).
//! - The core receives `(user_id, role)` as already-verified claims; no
//!   credentials are stored or checked here.

use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a library user.
pub type UserId = Uuid;

/// Permission ladder for catalog mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    /// Staff roles may act on loans they do not own.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Librarian)
    }
}

/// Library user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uuid: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl User {
    /// Creates a user with a generated stable ID.
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role,
            created_at: now_epoch_ms(),
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, User};
    use crate::model::ValidationError;

    #[test]
    fn staff_ladder_matches_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Librarian.is_staff());
        assert!(!Role::Member.is_staff());
    }

    #[test]
    fn email_must_look_like_an_address() {
        let user = User::new("reader.example.com", "Reader", Role::Member);
        assert!(matches!(
            user.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));

        let user = User::new("reader@example.com", "Reader", Role::Member);
        user.validate().expect("plain address should validate");
    }
}
