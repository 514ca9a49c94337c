//! Identifier spelling variations.
//!
//! Live markup rarely spells an identifier exactly the way the recorded
//! step does: `userName` becomes `user_name`, `submit-btn` becomes
//! `submitBtn`, casing drifts. The candidate rules expand a value into its
//! plausible respellings and word tokens here.

use regex::Regex;

/// Semantic prefixes that commonly start all-lowercase identifiers.
/// Stripping one and re-capitalizing the remainder recovers camelCase
/// (`username` -> `userName`).
const COMMON_PREFIXES: &[&str] = &[
    "blue", "red", "green", "user", "admin", "display", "show", "hide", "input", "output",
    "form", "data", "get", "set", "main", "sub",
];

/// Generate the spelling variations of a value, original first.
///
/// Deterministic: a fixed generation sequence with first-seen
/// deduplication, so two calls on the same input always agree.
pub fn case_variations(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<String> = Vec::new();
    let push = |candidate: String, out: &mut Vec<String>| {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    };

    let lower = text.to_lowercase();
    let has_upper = text.chars().any(|c| c.is_uppercase());
    let all_upper = !text.chars().any(|c| c.is_lowercase());

    push(text.to_string(), &mut out);
    push(lower.clone(), &mut out);
    push(text.to_uppercase(), &mut out);
    push(capitalize(text), &mut out);

    if !has_upper && text.len() > 1 {
        // All-lowercase: guess where a camelCase hump could have been.
        for i in 3..7.min(text.len()) {
            let (head, tail) = text.split_at(i);
            push(format!("{}{}", head, capitalize(tail)), &mut out);
        }

        for prefix in COMMON_PREFIXES {
            if text.starts_with(prefix) && text.len() > prefix.len() {
                let rest = &text[prefix.len()..];
                push(format!("{}{}", prefix, capitalize(rest)), &mut out);
            }
        }
    } else if has_upper && !all_upper {
        push(to_snake_case(text), &mut out);
    }

    if text.contains('_') {
        push(separator_to_camel(text, '_'), &mut out);
    }

    if text.contains('-') {
        push(separator_to_camel(text, '-'), &mut out);
        push(text.replace('-', "_"), &mut out);
    }

    out
}

/// Split an identifier or text into word tokens on `_`, `-`, whitespace
/// and camelCase boundaries. Order of first appearance is preserved.
pub fn split_identifier(identifier: &str) -> Vec<String> {
    if identifier.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = Vec::new();
    let push = |part: &str, parts: &mut Vec<String>| {
        if !part.is_empty() && !parts.iter().any(|p| p == part) {
            parts.push(part.to_string());
        }
    };

    for chunk in identifier.split([' ', '\t', '_', '-']) {
        if chunk.is_empty() {
            continue;
        }

        let has_upper = chunk.chars().any(|c| c.is_uppercase());
        let all_upper = !chunk.chars().any(|c| c.is_lowercase());

        if has_upper && !all_upper {
            let head = Regex::new(r"^[a-z0-9]+").unwrap();
            if let Some(m) = head.find(chunk) {
                push(m.as_str(), &mut parts);
            }
            let humps = Regex::new(r"[A-Z][a-z0-9]*").unwrap();
            for m in humps.find_iter(chunk) {
                push(m.as_str(), &mut parts);
            }
        } else {
            push(chunk, &mut parts);
        }
    }

    parts
}

/// Word tokens usable in substring predicates: longer than two characters,
/// lowercased for case-insensitive comparison.
pub fn match_tokens(value: &str) -> Vec<String> {
    split_identifier(value)
        .into_iter()
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// First character uppercased, the rest lowercased.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// `userName` -> `user_name`.
fn to_snake_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if c.is_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `user_name` / `user-name` -> `userName`.
fn separator_to_camel(text: &str, separator: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut upper_next = false;
    for c in text.chars() {
        if c == separator {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_camel_to_snake() {
        let variations = case_variations("userName");
        assert!(variations.contains(&"user_name".to_string()));
        assert!(variations.contains(&"username".to_string()));
        assert!(variations.contains(&"USERNAME".to_string()));
        assert_eq!(variations[0], "userName");
    }

    #[test]
    fn test_snake_to_camel() {
        let variations = case_variations("user_name");
        assert!(variations.contains(&"userName".to_string()));
    }

    #[test]
    fn test_dash_trio() {
        let variations = case_variations("submit-btn");
        assert!(variations.contains(&"submitBtn".to_string()));
        assert!(variations.contains(&"submit_btn".to_string()));
    }

    #[test]
    fn test_prefix_recapitalization() {
        let variations = case_variations("username");
        assert!(variations.contains(&"userName".to_string()));

        let variations = case_variations("displaymode");
        assert!(variations.contains(&"displayMode".to_string()));
    }

    #[test]
    fn test_variations_are_idempotent() {
        for input in ["userName", "user_name", "submit-btn", "username", "X"] {
            let a: HashSet<String> = case_variations(input).into_iter().collect();
            let b: HashSet<String> = case_variations(input).into_iter().collect();
            assert_eq!(a, b, "variation set differs for {input}");
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(case_variations("").is_empty());
        assert!(split_identifier("").is_empty());
    }

    #[test]
    fn test_split_identifier() {
        assert_eq!(split_identifier("user_name"), vec!["user", "name"]);
        assert_eq!(split_identifier("submitBtn"), vec!["submit", "Btn"]);
        assert_eq!(
            split_identifier("main-nav link"),
            vec!["main", "nav", "link"]
        );
    }

    #[test]
    fn test_match_tokens_filters_short_words() {
        // "Btn" survives, "a"/"of" style short tokens do not.
        assert_eq!(match_tokens("submitBtn"), vec!["submit", "btn"]);
        assert_eq!(match_tokens("a_of_x"), Vec::<String>::new());
    }
}
