//! `get`, `plural`, `direction` and `is-rtl` subcommands.

use lexicache::locale::{detect_direction, is_rtl};
use lexicache::translator::Translator;

/// Print the translation of `key` in `locale`.
pub async fn handle_get(translator: &Translator, locale: &str, key: &str, default: Option<&str>) {
    translator.change_locale(locale).await;
    println!("{}", translator.get(key, default));
}

/// Print the plural form of `base_key` for `count` in `locale`.
pub async fn handle_plural(translator: &Translator, locale: &str, base_key: &str, count: u64) {
    translator.change_locale(locale).await;
    println!("{}", translator.plural(base_key, count, None));
}

/// Print `ltr` or `rtl` for a text.
pub fn handle_direction(text: &str) {
    println!("{}", detect_direction(text));
}

/// Print whether a locale is written right-to-left.
pub fn handle_is_rtl(locale: &str) {
    println!("{}", is_rtl(locale));
}
