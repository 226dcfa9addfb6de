//! Keyword-weighted relevance search over the catalog.
//!
//! # Responsibility
//! - Score every book against free-text query terms.
//! - Return ranked hits annotated with rating aggregates.
//!
//! # Invariants
//! - Terms shorter than 3 characters are discarded; an empty term set
//!   yields an empty result, not an error.
//! - Ordering is score-descending and stable: equal scores keep store
//!   iteration (insertion) order.
//! - At most 20 hits are returned.

use crate::db::DbError;
use crate::model::book::Book;
use crate::repo::book_repo::{parse_book_row, BOOK_SELECT_SQL};
use crate::repo::review_repo::rating_summary;
use crate::repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Weight for a term found in the title.
const TITLE_WEIGHT: i64 = 10;
/// Weight for a term found in the author.
const AUTHOR_WEIGHT: i64 = 8;
/// Fallback weight for a term found only in the combined book text
/// (title, author, description, tags).
const TEXT_WEIGHT: i64 = 3;
/// Flat boost, applied once per book, when a copy is available.
const AVAILABILITY_BOOST: i64 = 2;
/// Terms below this length carry too little signal and are dropped.
const MIN_TERM_CHARS: usize = 3;
/// Result cap.
const MAX_HITS: usize = 20;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Single ranked hit returned by [`smart_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBook {
    pub book: Book,
    /// Heuristic relevance score; higher is more relevant.
    pub score: i64,
    /// `None` when the book has no reviews.
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Searches the catalog and returns ranked, rating-annotated hits.
///
/// Returns an empty list when no query term survives normalization.
pub fn smart_search(conn: &Connection, query: &str) -> SearchResult<Vec<ScoredBook>> {
    let terms = normalize_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    // Full scan in insertion order; the catalog is small and the scoring
    // needs every text field anyway.
    let books = {
        let mut stmt = conn.prepare(&format!("{BOOK_SELECT_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        books
    };

    let mut scored: Vec<(Book, i64)> = books
        .into_iter()
        .filter_map(|book| {
            let score = score_book(&book, &terms);
            (score > 0).then_some((book, score))
        })
        .collect();

    // Stable: ties keep insertion order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(MAX_HITS);

    let mut hits = Vec::with_capacity(scored.len());
    for (book, score) in scored {
        let summary = rating_summary(conn, book.uuid)?;
        hits.push(ScoredBook {
            book,
            score,
            average_rating: summary.average_rating,
            review_count: summary.review_count,
        });
    }

    Ok(hits)
}

/// Lowercases, splits on whitespace and drops terms under 3 characters.
fn normalize_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_string)
        .collect()
}

fn score_book(book: &Book, terms: &[String]) -> i64 {
    let title = book.title.to_lowercase();
    let author = book.author.to_lowercase();
    let combined = format!(
        "{} {} {} {}",
        title,
        author,
        book.description.as_deref().unwrap_or("").to_lowercase(),
        book.tags.as_deref().unwrap_or("").to_lowercase(),
    );

    let mut score = 0;
    for term in terms {
        let in_title = title.contains(term.as_str());
        let in_author = author.contains(term.as_str());
        if in_title {
            score += TITLE_WEIGHT;
        }
        if in_author {
            score += AUTHOR_WEIGHT;
        }
        // Fallback tier only: a title/author hit already covers the term.
        if !in_title && !in_author && combined.contains(term.as_str()) {
            score += TEXT_WEIGHT;
        }
    }

    if book.is_available() {
        score += AVAILABILITY_BOOST;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::{normalize_terms, score_book};
    use crate::model::book::Book;

    #[test]
    fn normalize_drops_short_terms_and_lowercases() {
        assert_eq!(normalize_terms("The Art of SQL"), vec!["the", "art", "sql"]);
        assert!(normalize_terms("a an of").is_empty());
        assert!(normalize_terms("   ").is_empty());
    }

    #[test]
    fn title_and_author_hits_do_not_stack_with_combined_text() {
        let mut book = Book::new("Robot Wars", "Al Space");
        book.available_copies = 0;

        let terms = normalize_terms("space robot");
        assert_eq!(score_book(&book, &terms), 18);
    }

    #[test]
    fn description_hit_scores_fallback_weight() {
        let mut book = Book::new("Quiet Evenings", "P. Author");
        book.description = Some("A robot learns to garden".to_string());
        book.available_copies = 0;

        let terms = normalize_terms("robot");
        assert_eq!(score_book(&book, &terms), 3);
    }

    #[test]
    fn availability_boost_applies_once() {
        let book = Book::new("Robot Wars", "Al Space");
        let terms = normalize_terms("space robot");
        assert_eq!(score_book(&book, &terms), 20);
    }
}
