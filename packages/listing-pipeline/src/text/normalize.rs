//! Free-text canonicalization used by every matcher and classifier.

/// Canonicalize text for matching.
///
/// Lowercases, unifies apostrophe and quote glyphs, drops commas, colons and
/// semicolons, turns hyphens and dashes into spaces, collapses whitespace,
/// rewrites "of the" to "of" and strips a leading "the".
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut mapped = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            '\u{2019}' | '\u{2018}' | '\u{02BC}' | '\u{00B4}' | '`' => mapped.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{2033}' => mapped.push('"'),
            ',' | ':' | ';' => {}
            '-' | '\u{2010}' | '\u{2011}' | '\u{2013}' | '\u{2014}' => mapped.push(' '),
            _ => mapped.push(c),
        }
    }

    let mut words: Vec<&str> = Vec::new();
    for word in mapped.split_whitespace() {
        if word == "the" && words.last() == Some(&"of") {
            continue;
        }
        words.push(word);
    }

    let mut start = 0;
    while words.len() - start > 1 && words[start] == "the" {
        start += 1;
    }

    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_normalization() {
        assert_eq!(
            normalize("Wonders of the First: Existence, Play-Bundle"),
            "wonders of first existence play bundle"
        );
    }

    #[test]
    fn test_apostrophes_unified() {
        assert_eq!(normalize("Bathr\u{2019}al"), "bathr'al");
        assert_eq!(normalize("Bathr'al"), normalize("BATHR'AL"));
        assert_eq!(normalize("bathr'al"), normalize("Bathr'al"));
    }

    #[test]
    fn test_leading_the_stripped() {
        assert_eq!(normalize("The Great Wyrm"), "great wyrm");
        assert_eq!(normalize("the"), "the");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize("  Gorrash \t  Foil\n"), "gorrash foil");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_dashes_become_spaces() {
        assert_eq!(normalize("Formless\u{2014}Foil"), "formless foil");
    }

    proptest! {
        #[test]
        fn prop_idempotent(s in "\\PC{0,60}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_case_insensitive(s in "[a-zA-Z' ,:;-]{0,40}") {
            prop_assert_eq!(normalize(&s.to_uppercase()), normalize(&s.to_lowercase()));
        }
    }
}
