//! The receipt categorization matcher.
//!
//! Maps the free-text category guess extracted from a receipt onto an
//! existing category, or signals that the caller should create a new one.
//! Stateless and deterministic; invoked by the receipt pipeline, which lives
//! outside this crate.

use crate::category::Category;

/// The minimum similarity score at which a fuzzy match is accepted.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// The outcome of matching a category name guess against the existing
/// categories.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryMatch {
    /// The guess matched a category name exactly, ignoring case.
    Exact(Category),
    /// The guess was similar enough to a category name to reuse it.
    Fuzzy {
        /// The best-scoring category.
        category: Category,
        /// The similarity score, between 0 and 1.
        score: f64,
    },
    /// No category was similar enough; the caller should create a new one.
    NoMatch,
}

/// Match a free-text category name `guess` against `categories`.
///
/// Tries an exact case-insensitive name match first. Failing that, scores
/// every category name against the guess with Jaro string similarity and
/// picks the maximum, accepting it only above [SIMILARITY_THRESHOLD].
pub fn match_category(guess: &str, categories: &[Category]) -> CategoryMatch {
    let guess = guess.trim().to_lowercase();

    if guess.is_empty() {
        return CategoryMatch::NoMatch;
    }

    if let Some(category) = categories
        .iter()
        .find(|category| category.name.to_lowercase() == guess)
    {
        return CategoryMatch::Exact(category.clone());
    }

    let best = categories
        .iter()
        .map(|category| (category, jaro_similarity(&guess, &category.name.to_lowercase())))
        .max_by(|(_, left), (_, right)| left.total_cmp(right));

    match best {
        Some((category, score)) if score > SIMILARITY_THRESHOLD => CategoryMatch::Fuzzy {
            category: category.clone(),
            score,
        },
        _ => CategoryMatch::NoMatch,
    }
}

/// Jaro similarity between two strings, from 0 (no similarity) to 1
/// (identical).
fn jaro_similarity(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }

    // Characters match if they are equal and no further apart than half the
    // longer string's length.
    let window = (left.len().max(right.len()) / 2).saturating_sub(1);
    let mut left_matched = vec![false; left.len()];
    let mut right_matched = vec![false; right.len()];
    let mut matches = 0usize;

    for (i, character) in left.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(right.len());

        for j in start..end {
            if !right_matched[j] && right[j] == *character {
                left_matched[i] = true;
                right_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut j = 0;
    for i in 0..left.len() {
        if left_matched[i] {
            while !right_matched[j] {
                j += 1;
            }
            if left[i] != right[j] {
                transpositions += 1;
            }
            j += 1;
        }
    }

    let matches = matches as f64;
    (matches / left.len() as f64
        + matches / right.len() as f64
        + (matches - (transpositions / 2) as f64) / matches)
        / 3.0
}

// ============================================================================
// TESTS
// ============================================================================
