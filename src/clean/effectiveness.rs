use std::collections::BTreeMap;

use serde_json::Value;

use super::text::to_str;
use crate::literal;

const FRACTIONS: &[(&str, f64)] = &[("½", 0.5), ("¼", 0.25), ("¾", 0.75)];

/// Damage multiplier from cell text: fraction glyphs or a decimal.
pub fn multiplier(text: &str) -> Option<f64> {
    let s = to_str(Some(text))?;
    if let Some((_, v)) = FRACTIONS.iter().find(|(glyph, _)| *glyph == s) {
        return Some(*v);
    }
    s.replace(',', ".").parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Multiplier from a parsed literal value.
pub fn multiplier_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => multiplier(s),
        _ => None,
    }
}

/// Parse an effectiveness cell into type → multiplier. Malformed input is empty.
pub fn parse_effectiveness(cell: Option<&str>) -> BTreeMap<String, Option<f64>> {
    to_str(cell)
        .and_then(|s| literal::parse_dict(&s))
        .map(|d| {
            d.iter()
                .map(|(k, v)| (k.clone(), multiplier_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Cleaned-CSV form of the effectiveness column: a JSON dictionary string.
pub fn clean_effectiveness(cell: Option<&str>) -> String {
    serde_json::to_string(&parse_effectiveness(cell)).unwrap_or_else(|_| "{}".to_string())
}
