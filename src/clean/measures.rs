use std::sync::LazyLock;

use regex::Regex;

use super::text::{parse_decimal, to_str};

static METRES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+[.,]?\d*)\s*m\b").unwrap());
static CENTIMETRES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+[.,]?\d*)\s*cm\b").unwrap());

/// Weight in kilograms. The unit marker is ignored.
pub fn weight_kg(v: Option<&str>) -> Option<f64> {
    parse_decimal(v)
}

/// Height in centimetres. Metres are scaled by 100; unit-less values are
/// taken as centimetres.
pub fn height_cm(v: Option<&str>) -> Option<f64> {
    let s = to_str(v)?;
    if let Some(caps) = METRES_RE.captures(&s) {
        let metres: f64 = caps[1].replace(',', ".").parse().ok()?;
        return Some(round2(metres * 100.0));
    }
    if let Some(caps) = CENTIMETRES_RE.captures(&s) {
        return caps[1].replace(',', ".").parse().ok();
    }
    parse_decimal(Some(&s))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
