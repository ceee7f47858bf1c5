//! Engagement Scoring
//!
//! Turns the raw reading telemetry reported by the feed client into a single
//! engagement score in `[0.0, 1.0]`. Telemetry arrives as loosely typed JSON, so
//! it is first normalised into a [`TelemetrySample`] with safe defaults.

use serde::Serialize;
use serde_json::{Map, Value};

/// Weight of the time-on-node factor.
pub const TIME_WEIGHT: f64 = 0.30;
/// Weight of the scroll factor.
pub const SCROLL_WEIGHT: f64 = 0.20;
/// Weight of the "go deeper" click factor.
pub const CLICK_WEIGHT: f64 = 0.30;
/// Weight of the per-section time factor.
pub const VARIANCE_WEIGHT: f64 = 0.20;

/// Time on a node after which the time factor saturates.
const FULL_ATTENTION_MS: f64 = 60_000.0;
/// Scroll events after which the scroll factor saturates.
const FULL_SCROLL_EVENTS: f64 = 10.0;
/// Contribution of a single "go deeper" click.
const CLICK_INCREMENT: f64 = 0.5;

/// Reading telemetry for the node the user is currently on.
///
/// All counters are non-negative and `sections_in_node` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetrySample {
    pub current_node_id: String,
    pub total_time_ms: u64,
    pub scroll_events: u64,
    pub deepen_clicks: u64,
    pub sections_in_node: u64,
    pub time_per_section_ms: u64,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            current_node_id: String::new(),
            total_time_ms: 0,
            scroll_events: 0,
            deepen_clicks: 0,
            sections_in_node: 1,
            time_per_section_ms: 0,
        }
    }
}

impl TelemetrySample {
    /// Builds a sample from arbitrary client JSON.
    ///
    /// Non-object input yields the defaults. Each field is looked up under the
    /// frontend key first and the short key second; values of the wrong type
    /// fall back to the default, negative values are clamped to zero and
    /// `sections_in_node` is raised to at least 1.
    pub fn sanitize(raw: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = raw else {
            return Self::default();
        };
        let defaults = Self::default();

        let current_node_id = match map.get("current_node_id") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Self {
            current_node_id,
            total_time_ms: field(map, &["total_time_on_node_ms", "total_time_ms"])
                .unwrap_or(defaults.total_time_ms),
            scroll_events: field(map, &["scroll_events"]).unwrap_or(defaults.scroll_events),
            deepen_clicks: field(map, &["go_deeper_clicks", "deepen_clicks"])
                .unwrap_or(defaults.deepen_clicks),
            sections_in_node: field(map, &["sections_in_current_node", "sections_in_node"])
                .unwrap_or(defaults.sections_in_node)
                .max(1),
            time_per_section_ms: field(map, &["time_per_section_ms"])
                .unwrap_or(defaults.time_per_section_ms),
        }
    }
}

/// Reads the first present key as a non-negative integer.
fn field(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    let value = keys.iter().find_map(|key| map.get(*key))?;
    coerce_non_negative(value)
}

/// Integer coercion used for telemetry counters. `None` means "use the default".
fn coerce_non_negative(value: &Value) -> Option<u64> {
    let signed: i128 = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u as i128
            } else if let Some(i) = n.as_i64() {
                i as i128
            } else {
                n.as_f64().filter(|f| f.is_finite())?.trunc() as i128
            }
        }
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i as i128,
                Err(_) => s.parse::<f64>().ok().filter(|f| f.is_finite())?.trunc() as i128,
            }
        }
        Value::Bool(b) => i128::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    Some(signed.clamp(0, u64::MAX as i128) as u64)
}

/// Computes the engagement score for a sample.
///
/// Weighted sum of four factors, each clamped to `[0, 1]`:
/// time on node (saturating at 60s), scroll events (saturating at 10),
/// "go deeper" clicks (0.5 each) and time on the current section relative to
/// the average section time. The result is clamped and rounded to 4 decimals.
pub fn score(sample: &TelemetrySample) -> f64 {
    let total_time = sample.total_time_ms as f64;

    let time_factor = (total_time / FULL_ATTENTION_MS).min(1.0);
    let scroll_factor = (sample.scroll_events as f64 / FULL_SCROLL_EVENTS).min(1.0);
    let click_factor = (sample.deepen_clicks as f64 * CLICK_INCREMENT).min(1.0);

    let variance_factor = if sample.total_time_ms > 0 && sample.sections_in_node > 0 {
        let expected_per_section = total_time / sample.sections_in_node as f64;
        if expected_per_section > 0.0 {
            (sample.time_per_section_ms as f64 / expected_per_section).min(1.0)
        } else {
            0.0
        }
    } else {
        0.0
    };

    let raw = TIME_WEIGHT * time_factor
        + SCROLL_WEIGHT * scroll_factor
        + CLICK_WEIGHT * click_factor
        + VARIANCE_WEIGHT * variance_factor;

    round4(raw.clamp(0.0, 1.0))
}

/// Sanitises raw telemetry and scores it in one step.
pub fn score_raw(raw: Option<&Value>) -> f64 {
    score(&TelemetrySample::sanitize(raw))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
