//! Shared JSON parsing helpers.
//!
//! Exchange numbers may arrive as JSON strings (`"30000.5"`) or native numbers
//! (`30000.5`). Anything that is missing, non-numeric, or non-finite comes
//! back as `None` rather than a zero.

/// Parse a JSON value (string or number) as a finite `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    let parsed = if let Some(s) = v.as_str() {
        fast_float2::parse::<f64, _>(s.trim()).ok()
    } else {
        v.as_f64()
    };
    parsed.filter(|f| f.is_finite())
}

/// Parse a JSON value (string or number) as `u64`.
#[inline]
pub fn parse_str_u64(v: Option<&serde_json::Value>) -> Option<u64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_u64()
    }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_and_number() {
        let v = json!({"a": "1.5", "b": 2.25, "c": "abc", "d": null, "e": "NaN", "f": "inf"});
        assert_eq!(parse_f64_field(&v, "a"), Some(1.5));
        assert_eq!(parse_f64_field(&v, "b"), Some(2.25));
        assert_eq!(parse_f64_field(&v, "c"), None);
        assert_eq!(parse_f64_field(&v, "d"), None);
        assert_eq!(parse_f64_field(&v, "e"), None);
        assert_eq!(parse_f64_field(&v, "f"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
    }

    #[test]
    fn integers() {
        let v = json!({"t": 1672515782136u64, "s": "42", "x": "4.2"});
        assert_eq!(parse_str_u64(v.get("t")), Some(1672515782136));
        assert_eq!(parse_str_u64(v.get("s")), Some(42));
        assert_eq!(parse_str_u64(v.get("x")), None);
    }
}
