//! CLDR-style plural category selection, table-driven by locale family.

use std::fmt;

use super::base_language;

/// Grammatical number bucket used to pick a phrase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    /// Zero items (six-form languages).
    Zero,
    /// Singular.
    One,
    /// Dual.
    Two,
    /// Paucal.
    Few,
    /// Large counts.
    Many,
    /// Everything else; the form every locale has.
    Other,
}

impl PluralCategory {
    /// Every category, in CLDR order.
    pub const ALL: [Self; 6] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Few,
        Self::Many,
        Self::Other,
    ];

    /// Key suffix for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group of languages sharing one plural rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocaleFamily {
    /// `one` for exactly 1, `other` otherwise (English, German, ...).
    Simple,
    /// `one` / `few` / `many` by last one and two digits (Russian, Ukrainian, ...).
    Slavic,
    /// No grammatical number (Chinese, Japanese, Korean, ...).
    Cjk,
    /// Six forms with explicit ranges (Arabic).
    Semitic,
}

/// Base languages using the Slavic three-form rule.
const SLAVIC_LANGUAGES: &[&str] = &["ru", "uk", "be", "sr", "hr", "bs", "sh"];
/// Base languages without plural forms.
const CJK_LANGUAGES: &[&str] = &["zh", "ja", "ko", "vi", "th", "id", "ms", "lo", "my", "km"];
/// Base languages using the six-form rule.
const SEMITIC_LANGUAGES: &[&str] = &["ar"];

impl LocaleFamily {
    /// What: Classify a locale.
    ///
    /// Inputs:
    /// - `locale`: Any locale code; region subtags are ignored
    ///
    /// Output:
    /// - Family of the base language, `Simple` for unknown languages
    #[must_use]
    pub fn of(locale: &str) -> Self {
        let base = base_language(locale);
        let base = base.as_str();
        if SLAVIC_LANGUAGES.contains(&base) {
            Self::Slavic
        } else if CJK_LANGUAGES.contains(&base) {
            Self::Cjk
        } else if SEMITIC_LANGUAGES.contains(&base) {
            Self::Semitic
        } else {
            Self::Simple
        }
    }

    /// Category for `count` under this family's rule.
    #[must_use]
    pub const fn category(self, count: u64) -> PluralCategory {
        match self {
            Self::Simple => {
                if count == 1 {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }
            Self::Slavic => match (count % 10, count % 100) {
                (1, mod100) if mod100 != 11 => PluralCategory::One,
                (2..=4, mod100) if !matches!(mod100, 12..=14) => PluralCategory::Few,
                _ => PluralCategory::Many,
            },
            Self::Cjk => PluralCategory::Other,
            Self::Semitic => match count {
                0 => PluralCategory::Zero,
                1 => PluralCategory::One,
                2 => PluralCategory::Two,
                3..=10 => PluralCategory::Few,
                11..=99 => PluralCategory::Many,
                _ => PluralCategory::Other,
            },
        }
    }
}

/// What: Pick the plural category for a count in a locale.
///
/// Inputs:
/// - `locale`: Locale code
/// - `count`: Item count
///
/// Output:
/// - `PluralCategory` per the locale family's rule
#[must_use]
pub fn category_for(locale: &str, count: u64) -> PluralCategory {
    LocaleFamily::of(locale).category(count)
}

/// Lookup key for a category form: `"{base}_{category}"`.
#[must_use]
pub fn plural_key(base_key: &str, category: PluralCategory) -> String {
    format!("{base_key}_{category}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slavic_forms() {
        assert_eq!(category_for("ru", 1), PluralCategory::One);
        assert_eq!(category_for("ru", 2), PluralCategory::Few);
        assert_eq!(category_for("ru", 5), PluralCategory::Many);
        assert_eq!(category_for("ru", 21), PluralCategory::One);
        assert_eq!(category_for("ru", 25), PluralCategory::Many);
        assert_eq!(category_for("ru-RU", 11), PluralCategory::Many);
        assert_eq!(category_for("uk", 12), PluralCategory::Many);
        assert_eq!(category_for("uk", 22), PluralCategory::Few);
        assert_eq!(category_for("ru", 111), PluralCategory::Many);
        assert_eq!(category_for("ru", 0), PluralCategory::Many);
    }

    #[test]
    fn simple_forms() {
        assert_eq!(category_for("en", 1), PluralCategory::One);
        assert_eq!(category_for("en", 0), PluralCategory::Other);
        assert_eq!(category_for("en", 5), PluralCategory::Other);
        assert_eq!(category_for("xx-unknown", 1), PluralCategory::One);
    }

    #[test]
    fn cjk_always_other() {
        for count in [0, 1, 2, 5, 100] {
            assert_eq!(category_for("ja", count), PluralCategory::Other);
            assert_eq!(category_for("zh_CN", count), PluralCategory::Other);
        }
    }

    #[test]
    fn semitic_six_forms() {
        assert_eq!(category_for("ar", 0), PluralCategory::Zero);
        assert_eq!(category_for("ar", 1), PluralCategory::One);
        assert_eq!(category_for("ar", 2), PluralCategory::Two);
        assert_eq!(category_for("ar", 3), PluralCategory::Few);
        assert_eq!(category_for("ar", 10), PluralCategory::Few);
        assert_eq!(category_for("ar", 11), PluralCategory::Many);
        assert_eq!(category_for("ar", 99), PluralCategory::Many);
        assert_eq!(category_for("ar-EG", 100), PluralCategory::Other);
    }

    #[test]
    fn key_formatting() {
        assert_eq!(plural_key("items", PluralCategory::Few), "items_few");
        let suffixes: Vec<&str> = PluralCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(suffixes, ["zero", "one", "two", "few", "many", "other"]);
    }
}
