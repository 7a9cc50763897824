//! Keyword tokenization, Jaccard similarity, and key-phrase extraction.
//!
//! Everything here is pure and allocation-light; the consolidation merge loop
//! calls [`jaccard_from_sets`] O(n²) times per group, so callers pre-tokenize
//! once and reuse the sets.

use std::collections::HashSet;

/// Fixed lexicon of technology terms recognized by [`key_phrases`].
const TECH_LEXICON: &[&str] = &[
    "api", "async", "auth", "cache", "cli", "database", "docker", "graphql", "grpc", "http",
    "json", "jwt", "kafka", "kubernetes", "linux", "migration", "oauth", "postgres",
    "postgresql", "python", "react", "redis", "rest", "rust", "sql", "sqlite", "tls",
    "typescript", "wasm", "websocket",
];

/// Lowercase, strip punctuation, split on whitespace, drop tokens of length ≤ 2.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|token| token.len() > 2)
        .collect()
}

/// Jaccard similarity of the token sets of two texts.
pub fn jaccard(a: &str, b: &str) -> f64 {
    jaccard_from_sets(&tokenize(a), &tokenize(b))
}

/// Jaccard similarity of two pre-tokenized sets.
///
/// Two empty sets are identical (1.0); one empty set shares nothing (0.0).
pub fn jaccard_from_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Extract key phrases: double-quoted phrases, backticked terms, capitalized
/// identifiers, and known technology terms. Results are lowercased and
/// deduplicated, preserving first-seen order.
pub fn key_phrases(text: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |phrase: &str| {
        let phrase = phrase.trim().to_lowercase();
        if phrase.len() > 1 && seen.insert(phrase.clone()) {
            phrases.push(phrase);
        }
    };

    for span in delimited_spans(text, '"') {
        push(&span);
    }
    for span in delimited_spans(text, '`') {
        push(&span);
    }

    for word in text.split_whitespace() {
        let trimmed: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        // CamelCase or Capitalized identifiers of some substance
        let starts_upper = trimmed.chars().next().is_some_and(|c| c.is_uppercase());
        let has_inner_upper = trimmed.chars().skip(1).any(|c| c.is_uppercase());
        if trimmed.len() > 3 && (has_inner_upper || (starts_upper && trimmed.len() > 5)) {
            push(&lower);
        }
        if TECH_LEXICON.contains(&lower.as_str()) {
            push(&lower);
        }
    }

    phrases
}

/// Collect the interior of balanced delimiter pairs (`"…"` or `` `…` ``),
/// capped at 80 chars each to keep junk out of tag sets.
fn delimited_spans(text: &str, delim: char) -> Vec<String> {
    let mut spans = Vec::new();
    let mut current: Option<String> = None;
    for c in text.chars() {
        if c == delim {
            match current.take() {
                Some(span) => {
                    if !span.is_empty() && span.len() <= 80 {
                        spans.push(span);
                    }
                }
                None => current = Some(String::new()),
            }
        } else if let Some(span) = current.as_mut() {
            span.push(c);
        }
    }
    spans
}
