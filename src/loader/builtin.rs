//! Hardcoded safety-net bundles used when every other acquisition path failed.

use std::sync::{Arc, LazyLock};

use crate::bundle::{Entries, TranslationBundle};
use crate::locale::base_language;

/// Version label carried by built-in bundles.
pub const BUILTIN_VERSION: &str = "builtin";

/// Critical English strings.
const EN_ENTRIES: &[(&str, &str)] = &[
    ("common.loading", "Loading..."),
    ("common.ok", "OK"),
    ("common.cancel", "Cancel"),
    ("common.retry", "Retry"),
    ("common.close", "Close"),
    ("common.back", "Back"),
    ("common.save", "Save"),
    ("common.yes", "Yes"),
    ("common.no", "No"),
    ("errors.generic", "Something went wrong"),
    ("errors.network", "Network connection problem"),
    ("errors.offline", "You are offline"),
];

/// Critical Russian strings.
const RU_ENTRIES: &[(&str, &str)] = &[
    ("common.loading", "Загрузка..."),
    ("common.ok", "ОК"),
    ("common.cancel", "Отмена"),
    ("common.retry", "Повторить"),
    ("common.close", "Закрыть"),
    ("common.back", "Назад"),
    ("common.save", "Сохранить"),
    ("common.yes", "Да"),
    ("common.no", "Нет"),
    ("errors.generic", "Что-то пошло не так"),
    ("errors.network", "Проблема с сетевым подключением"),
    ("errors.offline", "Нет подключения к сети"),
];

/// Build a built-in bundle from a static table.
fn build(locale: &str, table: &[(&str, &str)]) -> Arc<TranslationBundle> {
    let entries: Entries = table
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Arc::new(TranslationBundle::new(locale, entries, BUILTIN_VERSION, None))
}

/// English safety net.
static EN_BUNDLE: LazyLock<Arc<TranslationBundle>> = LazyLock::new(|| build("en", EN_ENTRIES));
/// Russian safety net.
static RU_BUNDLE: LazyLock<Arc<TranslationBundle>> = LazyLock::new(|| build("ru", RU_ENTRIES));

/// What: Pick the built-in bundle for a locale.
///
/// Inputs:
/// - `locale`: Requested locale
///
/// Output:
/// - Russian table for Russian, English for everything else; never empty
#[must_use]
pub fn builtin_bundle(locale: &str) -> Arc<TranslationBundle> {
    match base_language(locale).as_str() {
        "ru" => Arc::clone(&RU_BUNDLE),
        _ => Arc::clone(&EN_BUNDLE),
    }
}

/// True when the bundle is one of the built-in safety nets.
///
/// Compares identity, so a served bundle that happens to carry the same version
/// label or entries is never mistaken for a built-in.
#[must_use]
pub fn is_builtin(bundle: &TranslationBundle) -> bool {
    [&*EN_BUNDLE, &*RU_BUNDLE]
        .into_iter()
        .any(|builtin| std::ptr::eq(bundle, &**builtin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_locale_gets_a_non_empty_bundle() {
        for locale in ["en", "ru-RU", "xx-unknown", ""] {
            let bundle = builtin_bundle(locale);
            assert!(!bundle.is_empty());
            assert!(bundle.verify_checksum());
            assert!(is_builtin(&bundle));
        }
        assert_eq!(builtin_bundle("ru-RU").locale, "ru");
        assert_eq!(builtin_bundle("fr").locale, "en");
    }

    #[test]
    fn served_bundle_with_builtin_version_is_not_builtin() {
        let lookalike = TranslationBundle::new(
            "en",
            EN_BUNDLE.entries.clone(),
            BUILTIN_VERSION,
            Some("\"builtin\"".to_string()),
        );
        assert!(!is_builtin(&lookalike));
        assert!(is_builtin(&builtin_bundle("en")));
    }

    #[test]
    fn tables_cover_the_same_keys() {
        let en: Vec<&str> = EN_ENTRIES.iter().map(|(k, _)| *k).collect();
        let ru: Vec<&str> = RU_ENTRIES.iter().map(|(k, _)| *k).collect();
        assert_eq!(en, ru);
        assert!((10..=15).contains(&en.len()));
    }
}
