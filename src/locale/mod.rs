//! Locale code helpers plus the pure plural and direction rule engines.

mod detection;
pub mod plural;
pub mod rtl;

pub use detection::detect_system_locale;
pub use plural::{LocaleFamily, PluralCategory, category_for, plural_key};
pub use rtl::{Direction, detect_direction, is_rtl};

/// What: Extract the lowercase base language of a locale code.
///
/// Inputs:
/// - `locale`: Locale code such as `"pt-BR"`, `"zh_Hant_TW"` or `"EN"`
///
/// Output:
/// - Base language (`"pt"`, `"zh"`, `"en"`)
///
/// Details:
/// - Splits on `-` or `_` and drops everything after the first subtag.
#[must_use]
pub fn base_language(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// What: Validate locale code format.
///
/// Inputs:
/// - `locale`: Locale code to validate
///
/// Output:
/// - `true` if format looks valid, `false` otherwise
///
/// Details:
/// - Accepts `language[-script][-region]` shapes made of alphanumerics and hyphens
/// - Rejects empty codes, codes longer than 20 characters, leading/trailing or doubled hyphens
#[must_use]
pub fn is_valid_locale_format(locale: &str) -> bool {
    if locale.is_empty() || locale.len() > 20 {
        return false;
    }

    locale.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !locale.starts_with('-')
        && !locale.ends_with('-')
        && !locale.contains("--")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_language() {
        assert_eq!(base_language("pt-BR"), "pt");
        assert_eq!(base_language("zh_Hant_TW"), "zh");
        assert_eq!(base_language("EN"), "en");
        assert_eq!(base_language("ar"), "ar");
        assert_eq!(base_language(""), "");
    }

    #[test]
    fn test_is_valid_locale_format() {
        // Valid formats
        assert!(is_valid_locale_format("en-US"));
        assert!(is_valid_locale_format("zh-Hans-CN"));
        assert!(is_valid_locale_format("en"));
        assert!(is_valid_locale_format("xx-unknown"));

        // Invalid formats
        assert!(!is_valid_locale_format(""));
        assert!(!is_valid_locale_format("-en-US"));
        assert!(!is_valid_locale_format("en-US-"));
        assert!(!is_valid_locale_format("en--US"));
        assert!(!is_valid_locale_format("en US"));
        assert!(!is_valid_locale_format("../etc"));
        assert!(!is_valid_locale_format(&"x".repeat(21)));
    }
}
