//! Word extraction and normalization for pasted text.
//!
//! A token is a maximal run of ASCII letters, optionally continued by internal
//! apostrophes that are followed by more letters (`don't`, `o'clock`). Everything else
//! separates tokens: digits, whitespace, punctuation and non-ASCII characters.

use std::collections::HashSet;

use crate::error::{Result, WordbankError};

/// The raw token ceiling is this many times the configured token limit.
pub const RAW_TOKEN_CEILING_FACTOR: usize = 5;

/// Extract raw tokens from `text`, preserving case and order.
///
/// Scanning stops as soon as more than `RAW_TOKEN_CEILING_FACTOR * max_tokens` tokens
/// have been seen, so pathological input is rejected without being fully scanned.
///
/// # Errors
///
/// Returns `WordbankError::TooManyTokens` when the ceiling is crossed.
pub fn extract_tokens(text: &str, max_tokens: usize) -> Result<Vec<&str>> {
    let ceiling = max_tokens.saturating_mul(RAW_TOKEN_CEILING_FACTOR);
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_alphabetic() {
            i += 1;
            continue;
        }

        let start = i;
        i = skip_letters(bytes, i);
        while i + 1 < bytes.len() && bytes[i] == b'\'' && bytes[i + 1].is_ascii_alphabetic() {
            i = skip_letters(bytes, i + 1);
        }

        tokens.push(&text[start..i]);
        if tokens.len() > ceiling {
            return Err(WordbankError::TooManyTokens { limit: ceiling });
        }
    }

    Ok(tokens)
}

fn skip_letters(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    i
}

/// Lowercase, trim and deduplicate `tokens`, keeping first-seen order.
///
/// Blank entries are skipped. Once `limit` unique tokens are collected the rest of the
/// input is ignored.
pub fn normalize<I, S>(tokens: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for token in tokens {
        if out.len() >= limit {
            break;
        }
        let word = token.as_ref().trim().to_lowercase();
        if word.is_empty() || seen.contains(&word) {
            continue;
        }
        seen.insert(word.clone());
        out.push(word);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_letter_runs() {
        let tokens = extract_tokens("Hello, world! It's 9 o'clock.", 200).unwrap();
        assert_eq!(tokens, vec!["Hello", "world", "It's", "o'clock"]);
    }

    #[test]
    fn strips_surrounding_apostrophes_and_symbols() {
        let tokens = extract_tokens("'quoted' rock'n'roll dogs' --x-- abc123def", 200).unwrap();
        assert_eq!(tokens, vec!["quoted", "rock'n'roll", "dogs", "x", "abc", "def"]);
    }

    #[test]
    fn ignores_numbers_and_non_ascii() {
        let tokens = extract_tokens("123 4.56 café naïve", 200).unwrap();
        assert_eq!(tokens, vec!["caf", "na", "ve"]);
        assert!(extract_tokens("42 3.14 !!!", 200).unwrap().is_empty());
    }

    #[test]
    fn rejects_more_than_five_times_the_limit() {
        let text = "a ".repeat(11);
        assert!(matches!(
            extract_tokens(&text, 2),
            Err(WordbankError::TooManyTokens { limit: 10 })
        ));

        let text = "a ".repeat(10);
        assert_eq!(extract_tokens(&text, 2).unwrap().len(), 10);
    }

    #[test]
    fn normalize_folds_case_and_dedups() {
        assert_eq!(normalize(["Apple", "APPLE", "apple"], 200), vec!["apple"]);
        assert_eq!(
            normalize(["b", "A", "b", "c"], 200),
            vec!["b".to_string(), "a".into(), "c".into()]
        );
    }

    #[test]
    fn normalize_truncates_and_skips_blanks() {
        assert_eq!(normalize(["  ", "one", "", "Two", "three"], 2), vec!["one", "two"]);
        assert!(normalize(["x"], 0).is_empty());
    }
}
