use serde::Serializer;
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// Special-float sentinels
// ---------------------------------------------------------------------------

/// JSON has no NaN / ±Infinity, so the converter writes them as strings.
pub const NAN_TOKEN: &str = "NaN";
pub const POS_INF_TOKEN: &str = "Infinity";
pub const NEG_INF_TOKEN: &str = "-Infinity";

/// Decode one JSON cell into an `f64`.
///
/// Numbers pass through, the sentinel strings become the matching IEEE value
/// and `null` (what most JSON writers emit for NaN) becomes NaN. Anything else
/// is not a number and yields `None`.
pub fn decode_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => decode_token(s),
        JsonValue::Null => Some(f64::NAN),
        _ => None,
    }
}

/// Map a sentinel token back to its floating-point value.
pub fn decode_token(s: &str) -> Option<f64> {
    match s.trim() {
        NAN_TOKEN => Some(f64::NAN),
        POS_INF_TOKEN | "+Infinity" => Some(f64::INFINITY),
        NEG_INF_TOKEN => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Inverse of [`decode_number`] for finite-or-not values.
pub fn encode_number(v: f64) -> JsonValue {
    if v.is_nan() {
        JsonValue::String(NAN_TOKEN.to_string())
    } else if v.is_infinite() {
        let token = if v > 0.0 { POS_INF_TOKEN } else { NEG_INF_TOKEN };
        JsonValue::String(token.to_string())
    } else {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// `serialize_with` helper: finite values as numbers, the rest as sentinels.
pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.is_nan() {
        serializer.serialize_str(NAN_TOKEN)
    } else if v.is_infinite() {
        serializer.serialize_str(if *v > 0.0 { POS_INF_TOKEN } else { NEG_INF_TOKEN })
    } else {
        serializer.serialize_f64(*v)
    }
}

/// `serialize_with` helper for optional cells.
pub fn serialize_opt<S: Serializer>(v: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => serialize(v, serializer),
        None => serializer.serialize_none(),
    }
}

/// Render a value with four decimals, spelling out the special values.
pub fn format_fixed4(v: f64) -> String {
    if v.is_nan() {
        NAN_TOKEN.to_string()
    } else if v.is_infinite() {
        if v > 0.0 { POS_INF_TOKEN } else { NEG_INF_TOKEN }.to_string()
    } else {
        format!("{v:.4}")
    }
}
