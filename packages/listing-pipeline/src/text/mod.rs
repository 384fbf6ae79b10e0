//! Text canonicalization and tokenization.

pub mod normalize;
pub mod tokens;

pub use normalize::normalize;
pub use tokens::{is_stopword, token_set, tokenize, STOPWORDS};

/// Whole-phrase containment on normalized text.
///
/// Both sides must already be normalized. A phrase matches only on word
/// boundaries, so "pack" does not match inside "backpack".
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(phrase) {
        let start = from + pos;
        let end = start + phrase.len();
        let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let after_ok = end == haystack.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
        while from < haystack.len() && !haystack.is_char_boundary(from) {
            from += 1;
        }
        if from >= haystack.len() {
            break;
        }
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b >= 0x80
}
