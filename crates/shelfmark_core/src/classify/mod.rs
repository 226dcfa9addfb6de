//! Keyword-based category classification.
//!
//! # Responsibility
//! - Map free text (title, author, description) to ranked category labels.
//!
//! # Invariants
//! - The keyword table is fixed; ties between equal scores keep table
//!   declaration order.
//! - Confidence is the raw keyword-hit count, not a probability.
//! - A text matching nothing yields exactly one `General` suggestion with
//!   confidence 1.

use crate::model::ValidationError;
use serde::Serialize;

/// Suggested categories per classification, at most.
const MAX_SUGGESTIONS: usize = 3;

/// Label returned when no keyword matches.
pub const FALLBACK_CATEGORY: &str = "General";

/// Category labels with their trigger keywords, in tie-break order.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Fiction", &["novel", "story", "fiction", "tale"]),
    (
        "Science Fiction",
        &["sci-fi", "space", "future", "alien", "robot", "cyberpunk"],
    ),
    (
        "Fantasy",
        &["fantasy", "magic", "wizard", "dragon", "elf", "kingdom"],
    ),
    (
        "Mystery",
        &["mystery", "detective", "crime", "murder", "investigation"],
    ),
    ("Thriller", &["thriller", "suspense", "danger", "conspiracy"]),
    ("Romance", &["romance", "love", "relationship", "passion"]),
    (
        "Biography",
        &["biography", "autobiography", "memoir", "life story"],
    ),
    (
        "History",
        &["history", "historical", "war", "ancient", "medieval"],
    ),
    (
        "Science",
        &["science", "physics", "biology", "chemistry", "research"],
    ),
    (
        "Technology",
        &["technology", "computer", "programming", "software", "digital"],
    ),
    (
        "Business",
        &["business", "management", "entrepreneur", "marketing", "finance"],
    ),
    (
        "Self-Help",
        &["self-help", "motivation", "productivity", "success", "habit"],
    ),
    ("Philosophy", &["philosophy", "philosophical", "ethics", "moral"]),
    (
        "Psychology",
        &["psychology", "mind", "behavior", "mental", "cognitive"],
    ),
    ("Children", &["children", "kids", "young", "juvenile"]),
    ("Horror", &["horror", "scary", "ghost", "haunted", "terror"]),
];

/// One ranked category suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySuggestion {
    pub category: String,
    /// Raw keyword-hit count (1 for the fallback).
    pub confidence: u32,
}

/// Suggests up to three categories for the given book text.
///
/// # Errors
/// - `EmptyTitle` when the title is blank; author and description are
///   optional.
pub fn suggest_categories(
    title: &str,
    author: Option<&str>,
    description: Option<&str>,
) -> Result<Vec<CategorySuggestion>, ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let text = format!(
        "{} {} {}",
        title,
        author.unwrap_or(""),
        description.unwrap_or("")
    )
    .to_lowercase();

    let mut suggestions: Vec<CategorySuggestion> = CATEGORY_KEYWORDS
        .iter()
        .filter_map(|(category, keywords)| {
            let hits = keywords
                .iter()
                .filter(|keyword| text.contains(**keyword))
                .count() as u32;
            (hits > 0).then(|| CategorySuggestion {
                category: (*category).to_string(),
                confidence: hits,
            })
        })
        .collect();

    // Stable: equal confidences keep table declaration order.
    suggestions.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    suggestions.truncate(MAX_SUGGESTIONS);

    if suggestions.is_empty() {
        suggestions.push(CategorySuggestion {
            category: FALLBACK_CATEGORY.to_string(),
            confidence: 1,
        });
    }

    Ok(suggestions)
}
