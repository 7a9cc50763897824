//! Salience scoring, category suggestion, and tag extraction for new input.
//!
//! All three are pure functions of the text plus optional user hints, so the
//! same input always classifies the same way.

use super::similarity::key_phrases;
use super::types::Category;

/// User-supplied importance hint. Overrides the heuristic score by setting a
/// floor (high/medium) or ceiling (low).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown importance: {s}")),
        }
    }
}

const EXPLICIT_PHRASES: &[&str] = &[
    "remember this",
    "remember that",
    "don't forget",
    "important",
    "make sure",
];

const ARCHITECTURE_KEYWORDS: &[&str] = &[
    "architecture", "decided", "decision", "design", "chose", "we will use", "agreed on",
    "migrate to", "switch to",
];

const ERROR_KEYWORDS: &[&str] =
    &["error", "bug", "crash", "exception", "failure", "fails", "broken", "regression"];

/// Score a new memory's base importance in `[0.0, 1.0]`.
pub fn score_salience(title: &str, content: &str, importance: Option<Importance>) -> f64 {
    let text = format!("{title} {content}").to_lowercase();
    let mut score: f64 = 0.25;

    if EXPLICIT_PHRASES.iter().any(|p| text.contains(p)) {
        score += 0.3;
        score = score.max(0.7);
    }
    if ARCHITECTURE_KEYWORDS.iter().any(|p| text.contains(p)) {
        score += 0.15;
    }
    if ERROR_KEYWORDS.iter().any(|p| text.contains(p)) {
        score += 0.15;
    }

    // Backticked terms and code identifiers, +0.05 each up to +0.15
    let code_terms = count_code_terms(content);
    score += 0.05 * (code_terms.min(3) as f64);

    match importance {
        Some(Importance::High) => score = score.max(0.8),
        Some(Importance::Medium) => score = score.max(0.5),
        Some(Importance::Low) => score = score.min(0.3),
        None => {}
    }

    score.clamp(0.0, 1.0)
}

/// Count backticked spans plus snake_case / :: / CamelCase identifiers.
fn count_code_terms(content: &str) -> usize {
    let backticks = content.matches('`').count() / 2;
    let identifiers = content
        .split_whitespace()
        .filter(|word| {
            let w = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != ':');
            w.len() > 3
                && (w.contains('_')
                    || w.contains("::")
                    || (w.chars().next().is_some_and(|c| c.is_lowercase())
                        && w.chars().skip(1).any(|c| c.is_uppercase())))
        })
        .count();
    backticks + identifiers
}

/// Suggest a category from deterministic keyword matches. Order matters: the
/// first matching bucket wins, falling back to `note`.
pub fn suggest_category(title: &str, content: &str) -> Category {
    let text = format!("{title} {content}").to_lowercase();

    let any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if any(&["todo", "fixme", "need to", "should add", "remaining"]) {
        Category::Todo
    } else if any(ERROR_KEYWORDS) {
        Category::Error
    } else if any(ARCHITECTURE_KEYWORDS) {
        Category::Architecture
    } else if any(&["pattern", "convention", "always", "never", "approach", "idiom"]) {
        Category::Pattern
    } else if any(&["prefer", "preference", "favorite", "style", "likes"]) {
        Category::Preference
    } else if any(&["learned", "learning", "discovered", "turns out", "til "]) {
        Category::Learning
    } else if any(&["depends on", "relates to", "linked to", "works with"]) {
        Category::Relationship
    } else if any(&["currently", "working on", "in progress", "context"]) {
        Category::Context
    } else {
        Category::Note
    }
}

/// Extract tags from title and content: key phrases plus caller-supplied
/// extras, lowercased, deduplicated, capped at `max` in first-seen order.
pub fn extract_tags(title: &str, content: &str, extra: &[String], max: usize) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    for tag in extra {
        push(tag);
    }
    for phrase in key_phrases(&format!("{title} {content}")) {
        // multi-word phrases become hyphenated tags
        push(&phrase.replace(' ', "-"));
    }

    tags.truncate(max);
    tags
}
