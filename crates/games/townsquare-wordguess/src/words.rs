use rand::seq::IndexedRandom;

/// Built-in words used when a session is created without a seed.
pub const WORDS: &[&str] = &[
    "avenue", "bakery", "bridge", "cafe", "carnival", "cobble", "courtyard", "ferry", "fountain",
    "garden", "harbor", "lantern", "library", "market", "meadow", "orchard", "parade", "pavilion",
    "plaza", "quarry", "river", "square", "steeple", "theater", "tower", "tram", "village",
    "windmill",
];

/// Fallback when the list yields nothing.
const FALLBACK_WORD: &str = "townsquare";

/// Draw a word at random from the built-in list.
pub fn random_word() -> &'static str {
    WORDS.choose(&mut rand::rng()).copied().unwrap_or(FALLBACK_WORD)
}

/// Normalize a candidate secret word: 3 to 24 ASCII letters, lowercased.
pub fn normalize_secret(raw: &str) -> Option<String> {
    let word = raw.trim();
    let len_ok = (3..=24).contains(&word.len());
    (len_ok && word.bytes().all(|b| b.is_ascii_alphabetic())).then(|| word.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_words_are_valid_secrets() {
        for word in WORDS {
            assert_eq!(normalize_secret(word).as_deref(), Some(*word));
        }
        assert!(normalize_secret(FALLBACK_WORD).is_some());
    }

    #[test]
    fn random_word_comes_from_list() {
        for _ in 0..20 {
            assert!(WORDS.contains(&random_word()));
        }
    }

    #[test]
    fn normalize_rejects_bad_words() {
        assert_eq!(normalize_secret("  Plaza "), Some("plaza".to_string()));
        assert_eq!(normalize_secret("ab"), None);
        assert_eq!(normalize_secret(&"a".repeat(25)), None);
        assert_eq!(normalize_secret("two words"), None);
        assert_eq!(normalize_secret("café"), None);
        assert_eq!(normalize_secret(""), None);
    }
}
