//! Aggregate statistics tables shown once a simulation finishes.
//!
//! The observed-stats endpoint serializes non-numeric floats as bare `NaN`
//! tokens, which is not valid JSON; the payload is fetched as text and
//! sanitized to `null` before parsing.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Placeholder rendered for a missing statistic value.
pub const MISSING_VALUE: &str = "-";

/// Render a statistic rounded to three decimals.
pub fn format_value(value: f64) -> String {
    format!("{value:.3}")
}

/// Render an optional statistic, missing values as [`MISSING_VALUE`].
pub fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING_VALUE.to_owned(), format_value)
}

/// Global distance statistics: measure name to value, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct DistanceStats {
    measures: Vec<(String, f64)>,
}

impl From<Map<String, Value>> for DistanceStats {
    fn from(map: Map<String, Value>) -> Self {
        // A non-numeric value is dropped rather than rendered as a number
        // the server never sent.
        let measures = map
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
            .collect();
        Self { measures }
    }
}

impl DistanceStats {
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn measures(&self) -> impl Iterator<Item = &str> {
        self.measures.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = String> + '_ {
        self.measures.iter().map(|(_, value)| format_value(*value))
    }
}

/// One beacon's observed statistics, property values in wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconRow {
    pub beacon_id: String,
    pub values: Vec<(String, Option<f64>)>,
}

#[derive(Debug, Deserialize)]
struct ObservedStatsDto {
    #[serde(rename = "rowMap")]
    row_map: Map<String, Value>,
}

/// Per-beacon observed statistics: beacon id to property map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedStats {
    rows: Vec<BeaconRow>,
}

impl ObservedStats {
    /// Parse the raw response text, sanitizing bare `NaN` tokens first.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let sanitized = sanitize_nan(text);
        let dto: ObservedStatsDto = serde_json::from_str(&sanitized)?;
        let rows = dto
            .row_map
            .into_iter()
            .map(|(beacon_id, record)| {
                let values = match record {
                    Value::Object(map) => map
                        .into_iter()
                        .map(|(property, value)| (property, value.as_f64()))
                        .collect(),
                    _ => Vec::new(),
                };
                BeaconRow { beacon_id, values }
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[BeaconRow] {
        &self.rows
    }

    /// Property names of the first beacon's record; these become the table
    /// header, after the beacon-id column.
    pub fn properties(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.values.iter().map(|(name, _)| name.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Replace bare `NaN` tokens with `null`, leaving string contents alone.
pub fn sanitize_nan(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'N' && bytes[i..].starts_with(b"NaN") {
            let boundary_before = i == 0 || !is_word_byte(bytes[i - 1]);
            let boundary_after = i + 3 >= bytes.len() || !is_word_byte(bytes[i + 3]);
            if boundary_before && boundary_after {
                out.extend_from_slice(b"null");
                i += 3;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8(out).expect("ASCII-only substitution keeps UTF-8 intact")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_to_three_decimals() {
        assert_eq!(format_value(1.23456), "1.235");
        assert_eq!(format_value(2.0), "2.000");
        assert_eq!(format_optional(None), "-");
        assert_eq!(format_optional(Some(0.5)), "0.500");
    }

    #[test]
    fn distance_stats_preserve_wire_order() {
        let stats: DistanceStats =
            serde_json::from_str(r#"{"max": 9.0, "avg": 1.23456, "min": 2}"#).expect("stats");
        let measures: Vec<&str> = stats.measures().collect();
        assert_eq!(measures, vec!["max", "avg", "min"]);
        let values: Vec<String> = stats.values().collect();
        assert_eq!(values, vec!["9.000", "1.235", "2.000"]);
    }

    #[test]
    fn non_numeric_distance_measures_are_dropped() {
        let stats: DistanceStats =
            serde_json::from_str(r#"{"min": 1.5, "note": "approximate", "max": 4.0}"#)
                .expect("stats");
        let measures: Vec<&str> = stats.measures().collect();
        assert_eq!(measures, vec!["min", "max"]);
        let values: Vec<String> = stats.values().collect();
        assert_eq!(values, vec!["1.500", "4.000"]);
    }

    #[test]
    fn nan_tokens_become_null() {
        let text = r#"{"rowMap": {"3": {"min": 1.0, "score": NaN, "max": 4.5}}}"#;
        let stats = ObservedStats::parse(text).expect("sanitized payload parses");
        let row = &stats.rows()[0];
        assert_eq!(row.beacon_id, "3");
        assert_eq!(row.values[1], ("score".to_owned(), None));
        assert_eq!(format_optional(row.values[1].1), "-");
    }

    #[test]
    fn nan_inside_strings_is_untouched() {
        let sanitized = sanitize_nan(r#"{"note": "NaN happens", "v": NaN}"#);
        assert_eq!(sanitized, r#"{"note": "NaN happens", "v": null}"#);
    }

    #[test]
    fn nan_like_identifiers_are_untouched() {
        assert_eq!(sanitize_nan(r#"{"x": NaNs}"#), r#"{"x": NaNs}"#);
        assert_eq!(sanitize_nan(r#"{"x": aNaN}"#), r#"{"x": aNaN}"#);
    }

    #[test]
    fn header_comes_from_first_record_in_wire_order() {
        let text = r#"{"rowMap": {"1": {"min": 0.0, "max": 2.0}, "2": {"max": 1.0, "min": 0.5}}}"#;
        let stats = ObservedStats::parse(text).expect("payload");
        assert_eq!(stats.properties(), vec!["min", "max"]);
        assert_eq!(stats.rows().len(), 2);
    }

    #[test]
    fn empty_row_map_renders_nothing() {
        let stats = ObservedStats::parse(r#"{"rowMap": {}}"#).expect("payload");
        assert!(stats.is_empty());
        assert!(stats.properties().is_empty());
    }
}
