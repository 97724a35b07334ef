//! Keyword normalization and tokenization policy.
//!
//! A keyword string is split on whitespace and capped at
//! [`MAX_KEYWORDS`] tokens, keeping the first ones in input order. Each
//! token is trimmed, lowercased and truncated to [`MAX_KEYWORD_CHARS`]
//! characters. Neither cap is an error.

use crate::defaults::{MAX_KEYWORDS, MAX_KEYWORD_CHARS};

/// Split a keyword string into at most [`MAX_KEYWORDS`] tokens.
pub fn tokenize_keywords(input: &str) -> Vec<&str> {
    input.split_whitespace().take(MAX_KEYWORDS).collect()
}

/// Normalize one keyword. Returns `None` if nothing is left after trimming.
pub fn normalize_keyword(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized: String = trimmed
        .to_lowercase()
        .chars()
        .take(MAX_KEYWORD_CHARS)
        .collect();
    // Truncation can expose trailing whitespace from the original token.
    let normalized = normalized.trim_end();
    Some(normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_any_whitespace() {
        assert_eq!(
            tokenize_keywords("nlp  transformers\tattention\n"),
            vec!["nlp", "transformers", "attention"]
        );
    }

    #[test]
    fn test_tokenize_keeps_first_ten_in_order() {
        let input = (1..=12).map(|i| format!("k{}", i)).collect::<Vec<_>>().join(" ");
        let tokens = tokenize_keywords(&input);
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens.first(), Some(&"k1"));
        assert_eq!(tokens.last(), Some(&"k10"));
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize_keywords("").is_empty());
        assert!(tokenize_keywords("   ").is_empty());
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize_keyword("  NLP ").as_deref(), Some("nlp"));
    }

    #[test]
    fn test_normalize_truncates_to_fifteen_chars() {
        let normalized = normalize_keyword("internationalization").unwrap();
        assert_eq!(normalized, "internationaliz");
        assert_eq!(normalized.chars().count(), 15);
    }

    #[test]
    fn test_normalize_counts_characters_not_bytes() {
        let normalized = normalize_keyword("자연어처리자연어처리자연어처리자연어").unwrap();
        assert_eq!(normalized.chars().count(), 15);
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert_eq!(normalize_keyword(""), None);
        assert_eq!(normalize_keyword(" \t "), None);
    }

    #[test]
    fn test_every_token_fits_after_normalization() {
        let input = "a-very-long-keyword-indeed b c d e f g h i j k l m";
        for token in tokenize_keywords(input) {
            let normalized = normalize_keyword(token).unwrap();
            assert!(normalized.chars().count() <= MAX_KEYWORD_CHARS);
        }
    }
}
