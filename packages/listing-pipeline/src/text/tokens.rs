//! Tokenization of normalized text.

use std::collections::BTreeSet;

/// Words that carry no identity in titles or catalog names.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "for", "with", "in", "on", "to", "from", "by", "or", "new",
    "card", "cards", "tcg", "ccg", "&", "+", "-", "|",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Split already-normalized text into meaningful tokens.
///
/// Surrounding punctuation is trimmed (a leading `#` survives so numbered
/// variants stay recognisable) and stopwords are dropped. Order is preserved
/// and duplicates are kept.
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '#' || c == '\'' || c == '/'))
                .trim_end_matches(['#', '\'', '/'])
                .trim_start_matches(['\'', '/'])
        })
        .filter(|token| !token.is_empty() && !is_stopword(token))
        .map(String::from)
        .collect()
}

/// Distinct meaningful tokens, in sorted order.
pub fn token_set(normalized: &str) -> BTreeSet<String> {
    tokenize(normalized).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_removed() {
        assert_eq!(
            tokenize("wonders of first existence play bundle"),
            vec!["wonders", "first", "existence", "play", "bundle"]
        );
    }

    #[test]
    fn test_punctuation_trimmed() {
        assert_eq!(tokenize("(gorrash) foil! 12/99"), vec!["gorrash", "foil", "12/99"]);
        assert_eq!(tokenize("first #1"), vec!["first", "#1"]);
    }

    #[test]
    fn test_token_set_dedupes() {
        let set = token_set("foil foil gorrash");
        assert_eq!(set.len(), 2);
    }
}
