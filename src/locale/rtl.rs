//! Text direction: static RTL language table and script-based detection.

use std::fmt;

use super::base_language;

/// Base languages written right-to-left.
const RTL_LANGUAGES: &[&str] = &[
    "ar", "arc", "ckb", "dv", "fa", "he", "iw", "ks", "ku", "ps", "sd", "syr", "ug", "ur", "yi",
];

/// Writing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left.
    Rtl,
}

impl Direction {
    /// `"ltr"` or `"rtl"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when the locale's base language is written right-to-left.
#[must_use]
pub fn is_rtl(locale: &str) -> bool {
    RTL_LANGUAGES.contains(&base_language(locale).as_str())
}

/// Hebrew, Arabic, Syriac, Thaana, NKo and the RTL presentation-form blocks.
const fn is_rtl_char(c: char) -> bool {
    matches!(
        c,
        '\u{0590}'..='\u{08FF}' | '\u{FB1D}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}'
    )
}

/// Basic Latin letters plus Latin-1 and Latin Extended letters.
const fn is_latin_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, '\u{00C0}'..='\u{00D6}' | '\u{00D8}'..='\u{00F6}' | '\u{00F8}'..='\u{024F}')
}

/// What: Guess the direction of a piece of text.
///
/// Inputs:
/// - `text`: Arbitrary text
///
/// Output:
/// - `Direction::Rtl` when RTL-script characters outnumber Latin letters, else `Ltr`
///
/// Details:
/// - Digits, punctuation and other scripts are ignored; ties and empty text are `Ltr`.
#[must_use]
pub fn detect_direction(text: &str) -> Direction {
    let (rtl, latin) = text.chars().fold((0usize, 0usize), |(rtl, latin), c| {
        if is_rtl_char(c) {
            (rtl + 1, latin)
        } else if is_latin_char(c) {
            (rtl, latin + 1)
        } else {
            (rtl, latin)
        }
    });
    if rtl > latin {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_membership() {
        assert!(is_rtl("ar"));
        assert!(is_rtl("he-IL"));
        assert!(is_rtl("fa_IR"));
        assert!(!is_rtl("en"));
        assert!(!is_rtl("ru"));
        assert!(!is_rtl(""));
    }

    #[test]
    fn text_detection() {
        assert_eq!(detect_direction("Hello World"), Direction::Ltr);
        assert_eq!(detect_direction("مرحبا بالعالم"), Direction::Rtl);
        assert_eq!(detect_direction("שלום עולם"), Direction::Rtl);
        assert_eq!(detect_direction(""), Direction::Ltr);
        assert_eq!(detect_direction("12345 !?"), Direction::Ltr);
        assert_eq!(detect_direction("Café مرحبا"), Direction::Rtl);
        assert_eq!(detect_direction("ab סב"), Direction::Ltr);
    }

    #[test]
    fn direction_strings() {
        assert_eq!(Direction::Rtl.to_string(), "rtl");
        assert_eq!(Direction::default().as_str(), "ltr");
    }
}
