//! String similarity between path tokens, parameter names and schema names.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Minimum score for two names to be considered related.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

static WORDS: OnceLock<Result<Regex, regex_lite::Error>> = OnceLock::new();

/// Lowercase and drop everything but letters and digits.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Crude English singular of an already normalized word.
pub fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if stem.len() > 1 => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Split an identifier on separators and camelCase boundaries.
pub fn tokenize(name: &str) -> Vec<String> {
    match WORDS.get_or_init(|| Regex::new(r"[A-Z]+[a-z]*|[a-z]+|[0-9]+")) {
        Ok(words) => words
            .find_iter(name)
            .map(|m| m.as_str().to_ascii_lowercase())
            .collect(),
        Err(_) => vec![normalize(name)],
    }
}

/// Similarity in [0,1]; plural and case differences are ignored.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = singular(&normalize(a));
    let b = singular(&normalize(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Candidates sharing the best score, if that score reaches `threshold`.
pub fn best_matches<'a, I>(input: &str, candidates: I, threshold: f64) -> (f64, Vec<&'a str>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best = 0.0;
    let mut found: Vec<&'a str> = Vec::new();
    for candidate in candidates {
        let score = string_similarity(input, candidate);
        if score < threshold {
            continue;
        }
        if score > best {
            best = score;
            found.clear();
            found.push(candidate);
        } else if (score - best).abs() < f64::EPSILON {
            found.push(candidate);
        }
    }
    (best, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plural_and_case_are_equal() {
        assert_eq!(string_similarity("users", "USER"), 1.0);
        assert_eq!(string_similarity("categories", "Category"), 1.0);
        assert_eq!(string_similarity("address", "ADDRESS"), 1.0);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(string_similarity("orders", "invoice") < SIMILARITY_THRESHOLD);
        assert_eq!(string_similarity("", "x"), 0.0);
    }

    #[test]
    fn tokenizes_camel_case_and_separators() {
        assert_eq!(tokenize("userId"), vec!["user", "id"]);
        assert_eq!(tokenize("order_items-2"), vec!["order", "items", "2"]);
    }

    #[test]
    fn best_matches_keeps_ties() {
        let (score, found) = best_matches("user", ["USERS", "user", "ORDER"], 0.6);
        assert_eq!(score, 1.0);
        assert_eq!(found, vec!["USERS", "user"]);
    }
}
