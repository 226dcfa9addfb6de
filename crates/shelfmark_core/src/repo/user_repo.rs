//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the user records referenced by loans and reviews.
//!
//! # Invariants
//! - `email` uniqueness violations surface as a semantic `Conflict`, not a
//!   raw driver error.
//! - No credential material is stored; authentication happens elsewhere.

use crate::model::user::{Role, User, UserId};
use crate::repo::{ConflictKind, RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    email,
    name,
    role,
    created_at
FROM users";

/// Repository interface for user records.
pub trait UserRepository {
    /// Creates one user and returns its stable id.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Gets one user by id.
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Lists all users ordered by creation time.
    fn list_users(&self) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO users (uuid, email, name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.uuid.to_string(),
                user.email.as_str(),
                user.name.as_str(),
                role_to_db(user.role),
                user.created_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(user.uuid),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::Conflict(ConflictKind::EmailAlreadyRegistered(
                    user.email.clone(),
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in users.uuid"))
    })?;

    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        uuid,
        email: row.get("email")?,
        name: row.get("name")?,
        role,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Librarian => "librarian",
        Role::Member => "member",
    }
}

pub(crate) fn parse_role(value: &str) -> Option<Role> {
    match value {
        "admin" => Some(Role::Admin),
        "librarian" => Some(Role::Librarian),
        "member" => Some(Role::Member),
        _ => None,
    }
}
