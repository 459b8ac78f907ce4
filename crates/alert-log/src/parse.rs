//! Behavior event parsing

use crate::record::{alert_type_label, reason_text, AlertRecord};
use crate::ParseError;
use alerting::BehaviorFlags;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// `behavior_output` value marking an event worth recording
pub const RISKY_OUTPUT: &str = "RISKY BEHAVIOR DETECTED";

/// Parse one behavior classification event into an alert record
pub fn parse_record(value: &Value) -> Result<AlertRecord, ParseError> {
    let event = value.as_object().ok_or(ParseError::NotAnObject)?;

    let behavior_output = event
        .get("behavior_output")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if behavior_output != RISKY_OUTPUT {
        return Err(ParseError::NotRisky(behavior_output.to_string()));
    }

    let timestamp = event
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("timestamp"))?;
    let (date, rest) = timestamp
        .split_once('T')
        .ok_or_else(|| ParseError::MalformedTimestamp(timestamp.to_string()))?;
    let time = rest.split('.').next().unwrap_or(rest);

    let category = event
        .get("behavior_category")
        .and_then(Value::as_object)
        .ok_or(ParseError::MissingField("behavior_category"))?;
    let flags = BehaviorFlags::new(
        flag(category, "is_drowsy"),
        flag(category, "is_yawning"),
        flag(category, "is_distracted"),
    );

    let confidence = (number(event, "behavior_confidence") * 100.0)
        .trunc()
        .clamp(0.0, 100.0) as u8;

    let details = format!(
        "MAR: {:.3}, EAR: {:.3}, Pitch: {:.1}°, Yaw: {:.1}°, Roll: {:.1}°",
        number(event, "mar"),
        number(event, "ear"),
        number(event, "pitch"),
        number(event, "yaw"),
        number(event, "roll"),
    );

    Ok(AlertRecord {
        date: date.to_string(),
        time: time.to_string(),
        alert_type: alert_type_label(&flags).to_string(),
        confidence,
        reason: format!("{} ({})", reason_text(&flags), details),
        behavior_output: behavior_output.to_string(),
    })
}

/// Parse a single line of a line-delimited log
pub fn parse_line(line: &str) -> Result<AlertRecord, ParseError> {
    let value: Value = serde_json::from_str(line)?;
    parse_record(&value)
}

/// Parse line-delimited JSON content, skipping lines that fail
pub fn parse_log_content(content: &str) -> Vec<AlertRecord> {
    let mut records = Vec::new();
    let mut parsed = 0usize;

    for line in content.lines().map(str::trim) {
        if !line.starts_with('{') {
            continue;
        }
        parsed += 1;

        match parse_line(line) {
            Ok(record) => records.push(record),
            Err(ParseError::NotRisky(_)) => {}
            Err(e) => warn!(error = %e, line, "skipping unparseable log line"),
        }
    }

    debug!(entries = parsed, risky = records.len(), "parsed log content");
    records
}

fn flag(category: &Map<String, Value>, key: &str) -> bool {
    category.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn number(event: &Map<String, Value>, key: &str) -> f64 {
    event.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DISTRACTED_LINE: &str = r#"{"timestamp": "2025-06-02T23:47:17.888789", "behavior_category": {"is_drowsy": false, "is_yawning": false, "is_distracted": true}, "behavior_output": "RISKY BEHAVIOR DETECTED", "mar": 0.5694, "ear": 1.0625, "pitch": 0.0, "yaw": 0.0, "roll": 0.0, "behavior_confidence": 0.7316}"#;

    #[test]
    fn test_parse_full_record() {
        let record = parse_line(DISTRACTED_LINE).unwrap();
        assert_eq!(record.date, "2025-06-02");
        assert_eq!(record.time, "23:47:17");
        assert_eq!(record.alert_type, "Distraction");
        assert_eq!(record.confidence, 73);
        assert_eq!(record.behavior_output, RISKY_OUTPUT);
        assert!(record.reason.starts_with("Driver is distracted (MAR: 0.569, EAR: "));
        assert!(record.reason.ends_with("Pitch: 0.0°, Yaw: 0.0°, Roll: 0.0°)"));
    }

    #[test]
    fn test_non_risky_record_discarded() {
        let value = json!({
            "timestamp": "2025-06-02T10:00:00",
            "behavior_category": {},
            "behavior_output": "SAFE DRIVING"
        });
        assert!(matches!(parse_record(&value), Err(ParseError::NotRisky(_))));
    }

    #[test]
    fn test_missing_metrics_default_to_zero() {
        let value = json!({
            "timestamp": "2025-06-02T10:00:00",
            "behavior_category": {"is_drowsy": true, "is_yawning": true},
            "behavior_output": RISKY_OUTPUT
        });
        let record = parse_record(&value).unwrap();
        assert_eq!(record.time, "10:00:00");
        assert_eq!(record.alert_type, "Drowsy & Yawning");
        assert_eq!(record.confidence, 0);
        assert!(record.reason.contains("MAR: 0.000"));
    }

    #[test]
    fn test_malformed_records() {
        let no_t = json!({
            "timestamp": "2025-06-02 10:00:00",
            "behavior_category": {},
            "behavior_output": RISKY_OUTPUT
        });
        assert!(matches!(parse_record(&no_t), Err(ParseError::MalformedTimestamp(_))));

        let no_category = json!({"timestamp": "2025-06-02T10:00:00", "behavior_output": RISKY_OUTPUT});
        assert!(matches!(
            parse_record(&no_category),
            Err(ParseError::MissingField("behavior_category"))
        ));

        assert!(matches!(parse_record(&json!("text")), Err(ParseError::NotAnObject)));
        assert!(matches!(parse_line("{not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_content_skips_bad_lines() {
        let content = format!("\n{DISTRACTED_LINE}\n{{broken\nplain text\n   \n{DISTRACTED_LINE}\n");
        let records = parse_log_content(&content);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_confidence_clamped() {
        let value = json!({
            "timestamp": "2025-06-02T10:00:00",
            "behavior_category": {"is_yawning": true},
            "behavior_output": RISKY_OUTPUT,
            "behavior_confidence": 1.7
        });
        assert_eq!(parse_record(&value).unwrap().confidence, 100);
    }
}
