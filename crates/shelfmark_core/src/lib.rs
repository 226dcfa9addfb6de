//! Core domain logic for the Shelfmark library manager.
//! This crate is the single source of truth for catalog business invariants.

pub mod classify;
pub mod db;
pub mod logging;
pub mod model;
pub mod recommend;
pub mod repo;
pub mod search;
pub mod service;

pub use classify::{suggest_categories, CategorySuggestion, FALLBACK_CATEGORY};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{Book, BookId};
pub use model::loan::{Loan, LoanId, LoanStatus, LOAN_PERIOD_DAYS};
pub use model::review::{Review, ReviewId};
pub use model::user::{Role, User, UserId};
pub use model::ValidationError;
pub use recommend::{recommend_for_user, RecommendError};
pub use repo::book_repo::{BookListQuery, BookRepository, RatedBook, SqliteBookRepository};
pub use repo::loan_repo::{LoanListQuery, LoanRecord, LoanRepository, SqliteLoanRepository};
pub use repo::review_repo::{
    RatingSummary, ReviewRecord, ReviewRepository, SqliteReviewRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{ConflictKind, EntityRef, RepoError, RepoResult};
pub use search::relevance::{smart_search, ScoredBook, SearchError};
pub use service::catalog_service::{BookDraft, BookPatch, CatalogService, CatalogServiceError};
pub use service::loan_service::{LoanService, LoanServiceError};
pub use service::review_service::{ReviewService, ReviewServiceError};
pub use service::stats_service::{dashboard_snapshot, DashboardSnapshot, StatsError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
