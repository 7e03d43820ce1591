//! SSE frame encoding.

use chrono::Utc;
use serde::Serialize;

use super::RealtimeError;

/// Encode a named event with a JSON payload, using the current time in
/// milliseconds as the frame id.
pub fn format_event<T>(event: &str, payload: &T) -> Result<String, RealtimeError>
where
    T: Serialize + ?Sized,
{
    format_event_with_id(event, payload, Utc::now().timestamp_millis())
}

/// Encode a named event with an explicit frame id.
///
/// The payload is serialized compactly, so it never spans more than one
/// `data:` line.
pub fn format_event_with_id<T>(event: &str, payload: &T, id: i64) -> Result<String, RealtimeError>
where
    T: Serialize + ?Sized,
{
    let data = serde_json::to_string(payload)?;
    Ok(format!("event: {}\ndata: {}\nid: {}\n\n", event, data, id))
}

/// Comment frame written by the per-connection heartbeat.
pub fn heartbeat_frame() -> String {
    format!(":heartbeat {}\n\n", Utc::now().timestamp_millis())
}

/// Event names are written verbatim into the frame, so a line break would
/// let a caller forge extra fields.
pub fn validate_event_name(event: &str) -> Result<(), RealtimeError> {
    if event.trim().is_empty() || event.contains(['\n', '\r']) {
        return Err(RealtimeError::InvalidEventName(event.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_frame_layout() {
        let frame = format_event_with_id("ping", &json!({"n": 1}), 1700000000000).unwrap();
        assert_eq!(frame, "event: ping\ndata: {\"n\":1}\nid: 1700000000000\n\n");
    }

    #[test]
    fn test_event_frame_uses_current_millis() {
        let before = Utc::now().timestamp_millis();
        let frame = format_event("connected", &json!({})).unwrap();
        let after = Utc::now().timestamp_millis();

        let id: i64 = frame
            .lines()
            .find_map(|line| line.strip_prefix("id: "))
            .unwrap()
            .parse()
            .unwrap();
        assert!(id >= before && id <= after);
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn test_multiline_strings_stay_on_one_data_line() {
        let frame = format_event_with_id("note", &json!({"text": "a\nb"}), 1).unwrap();
        assert_eq!(frame.lines().filter(|l| l.starts_with("data: ")).count(), 1);
        assert!(frame.contains(r#"data: {"text":"a\nb"}"#));
    }

    #[test]
    fn test_heartbeat_is_comment_only() {
        let frame = heartbeat_frame();
        assert!(frame.starts_with(":heartbeat "));
        assert!(frame.ends_with("\n\n"));
        assert!(!frame.contains("event:"));
        assert!(!frame.contains("data:"));
        assert!(!frame.contains("id:"));
    }

    #[test]
    fn test_validate_event_name() {
        assert!(validate_event_name("participant_joined").is_ok());
        assert!(validate_event_name("").is_err());
        assert!(validate_event_name("   ").is_err());
        assert!(validate_event_name("x\ndata: forged").is_err());
        assert!(validate_event_name("x\r").is_err());
    }
}
