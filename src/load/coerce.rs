//! Typed re-parsing of cleaned-CSV cells. Every function is total: bad input
//! becomes `None` or an empty collection.

use std::collections::BTreeMap;

use tracing::warn;

use crate::clean::effectiveness;
use crate::clean::evolution::extract_level;
use crate::clean::text::{first_digits, split_multi, to_str};
use crate::literal;

pub use crate::clean::text::to_str as to_null;

/// First digit run as an integer. Runs beyond `i64` become `None` with a warning.
pub fn to_int(v: Option<&str>) -> Option<i64> {
    let digits = first_digits(v)?;
    match digits.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Integer {} out of range, storing null", digits);
            None
        }
    }
}

pub fn to_level(v: Option<&str>) -> Option<i64> {
    extract_level(v)
}

/// Whole-cell float; `,` is accepted as the decimal separator.
pub fn to_float(v: Option<&str>) -> Option<f64> {
    to_str(v)?
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// `"Grass, Poison"` or a list literal → type names.
pub fn parse_tipos(v: Option<&str>) -> Vec<String> {
    let Some(s) = to_str(v) else {
        return Vec::new();
    };
    if let Some(items) = literal::parse_list(&s) {
        return items
            .iter()
            .filter_map(literal::scalar_text)
            .filter_map(|t| to_str(Some(&t)))
            .collect();
    }
    s.split(',')
        .filter_map(|t| to_str(Some(t)))
        .collect()
}

/// Multi-value cell split into parts; null-like parts stay as `None` so
/// parallel columns keep their positions.
pub fn split_cell(v: Option<&str>) -> Vec<Option<String>> {
    split_multi(v.unwrap_or_default())
        .iter()
        .map(|p| to_str(Some(p)))
        .collect()
}

/// Type → multiplier, dropping types whose multiplier doesn't parse.
pub fn parse_effectiveness(v: Option<&str>) -> BTreeMap<String, f64> {
    effectiveness::parse_effectiveness(v)
        .into_iter()
        .filter_map(|(k, m)| Some((k, m?)))
        .collect()
}
