//! # Locale Tables
//!
//! Tabular constants backing the name, text and phone producers. Lists are
//! sorted so that a producer index maps to a stable, lexicographically
//! ordered value. The tables are passed into producers as constructor
//! inputs, so tests can inject small fixtures instead of the full lists.

mod en;
mod ru;

use crate::config::LocaleCode;

/// One locale's constant tables.
pub struct Locale {
    pub code: LocaleCode,
    /// Sorted first names.
    pub first_names: &'static [&'static str],
    /// Sorted last names.
    pub last_names: &'static [&'static str],
    /// Sorted lowercase words for the text producer.
    pub words: &'static [&'static str],
    /// Phone shape; every `#` is a digit slot.
    pub phone_pattern: &'static str,
}

/// Look up the built-in table set for a locale.
pub fn locale(code: LocaleCode) -> &'static Locale {
    match code {
        LocaleCode::En => &en::LOCALE,
        LocaleCode::Ru => &ru::LOCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(list: &[&str], what: &str) {
        for pair in list.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{} not strictly sorted: '{}' >= '{}'",
                what,
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_en_tables_sorted_and_nonempty() {
        let l = locale(LocaleCode::En);
        assert!(!l.first_names.is_empty());
        assert_sorted(l.first_names, "en first names");
        assert_sorted(l.last_names, "en last names");
        assert_sorted(l.words, "en words");
        assert!(l.phone_pattern.contains('#'));
    }

    #[test]
    fn test_ru_tables_sorted_and_nonempty() {
        let l = locale(LocaleCode::Ru);
        assert!(!l.first_names.is_empty());
        assert_sorted(l.first_names, "ru first names");
        assert_sorted(l.last_names, "ru last names");
        assert_sorted(l.words, "ru words");
        assert!(l.phone_pattern.contains('#'));
    }
}
