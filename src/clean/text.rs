use std::sync::LazyLock;

use regex::Regex;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+[.,]?\d*)").unwrap());

const NULL_WORDS: &[&str] = &["", "none", "null", "nan"];

/// Fold fullwidth forms, odd spaces and curly quotes to ASCII.
pub fn fold(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{a0}' | '\u{2009}' | '\u{202f}' | '\u{3000}' => ' ',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{ff01}'..='\u{ff5e}' => char::from_u32(c as u32 - 0xfee0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Normalized cell text, or `None` for blank and null-like values.
pub fn to_str(v: Option<&str>) -> Option<String> {
    let s = fold(v?);
    let s = s.trim();
    if NULL_WORDS.contains(&s.to_lowercase().as_str()) {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn first_digits(v: Option<&str>) -> Option<String> {
    let s = to_str(v)?;
    DIGITS_RE.find(&s).map(|m| m.as_str().to_string())
}

/// First embedded integer; runs that overflow `i64` count as absent.
pub fn to_int_safe(v: Option<&str>) -> Option<i64> {
    first_digits(v)?.parse().ok()
}

/// First decimal-looking number, accepting `,` as the separator.
pub fn parse_decimal(v: Option<&str>) -> Option<f64> {
    let s = to_str(v)?;
    let caps = DECIMAL_RE.captures(&s)?;
    caps[1].replace(',', ".").parse().ok()
}

/// Join values with `"; "` after blanking the separators the loader splits on.
pub fn join_multi<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().replace([';', '|'], ","))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split on `|` when present, else on `;`; parts are trimmed, empties dropped.
pub fn split_multi(s: &str) -> Vec<String> {
    let sep = if s.contains('|') { '|' } else { ';' };
    s.split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_words() {
        for s in ["", "  ", "None", "null", "NaN", "\u{a0}none\u{a0}"] {
            assert_eq!(to_str(Some(s)), None, "{s:?}");
        }
        assert_eq!(to_str(None), None);
    }

    #[test]
    fn folds_fullwidth_and_spaces() {
        assert_eq!(to_str(Some("６.９\u{a0}kg")), Some("6.9 kg".into()));
        assert_eq!(to_str(Some("（Level 16）")), Some("(Level 16)".into()));
        assert_eq!(to_str(Some("\u{201c}Blaze\u{201d}")), Some("\"Blaze\"".into()));
        assert_eq!(to_str(Some("Farfetch\u{2019}d")), Some("Farfetch'd".into()));
    }

    #[test]
    fn ints() {
        assert_eq!(to_int_safe(Some("#0025")), Some(25));
        assert_eq!(to_int_safe(Some("no digits")), None);
        assert_eq!(to_int_safe(Some("99999999999999999999")), None);
    }

    #[test]
    fn decimals() {
        assert_eq!(parse_decimal(Some("6.9 kg (15.2 lbs)")), Some(6.9));
        assert_eq!(parse_decimal(Some("0,41 m")), Some(0.41));
        assert_eq!(parse_decimal(Some("12")), Some(12.0));
        assert_eq!(parse_decimal(Some("—")), None);
    }

    #[test]
    fn join_keeps_columns_aligned() {
        assert_eq!(join_multi(["a; b", "c|d", "e"]), "a, b; c,d; e");
        assert_eq!(join_multi(Vec::<String>::new()), "");
    }

    #[test]
    fn split_prefers_pipe() {
        assert_eq!(split_multi("a | b; c |"), ["a", "b; c"]);
        assert_eq!(split_multi(" 2; 3 ;"), ["2", "3"]);
        assert_eq!(split_multi("solo"), ["solo"]);
        assert!(split_multi("  ").is_empty());
    }
}
