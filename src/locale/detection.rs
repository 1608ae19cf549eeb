//! System locale detection for picking a default locale.

use std::env;

/// What: Detect the user's locale from environment variables.
///
/// Output:
/// - `Some(code)` such as `"de-DE"`, or `None` when nothing usable is set
///
/// Details:
/// - Checks `LC_ALL`, `LC_MESSAGES`, then `LANG`
/// - `C` and `POSIX` are treated as "no preference"
pub fn detect_system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| parse_locale_string(&value))
}

/// What: Normalise an environment locale string into a hyphenated code.
///
/// Inputs:
/// - `locale_str`: Value like `"de_DE.UTF-8"`, `"sr_RS@latin"`, `"en"`
///
/// Output:
/// - `"de-DE"`, `"sr-RS"`, `"en"`; `None` for empty, `C` or `POSIX`
///
/// Details:
/// - Drops the encoding (`.UTF-8`) and modifier (`@latin`) parts
/// - Language is lowercased, a two-letter region uppercased
fn parse_locale_string(locale_str: &str) -> Option<String> {
    let trimmed = locale_str.trim();
    let without_modifier = trimmed.split('@').next()?;
    let code = without_modifier.split('.').next()?;
    if code.is_empty() || code.eq_ignore_ascii_case("c") || code.eq_ignore_ascii_case("posix") {
        return None;
    }

    let mut parts = code.split(['_', '-']);
    let language = parts.next()?.to_ascii_lowercase();
    let rest: Vec<String> = parts
        .map(|p| {
            if p.len() == 2 {
                p.to_ascii_uppercase()
            } else {
                p.to_string()
            }
        })
        .collect();

    let normalized = if rest.is_empty() {
        language
    } else {
        format!("{language}-{}", rest.join("-"))
    };
    super::is_valid_locale_format(&normalized).then_some(normalized)
}
