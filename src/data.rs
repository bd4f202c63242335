use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted webhook delivery. Field names are shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub key: String,
    pub path: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Stamps the event with the current time. The body is kept verbatim.
    pub fn new(key: &str, path: &str, body: &[u8]) -> Event {
        Event {
            key: key.to_owned(),
            path: path.to_owned(),
            body: String::from_utf8_lossy(body).into_owned(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_body_bytes_verbatim() {
        let raw = br#"{ "b":1,  "a" : [ 2 ] }"#;
        let event = Event::new("webhook-hook-1", "/hook", raw);
        assert_eq!(event.body.as_bytes(), raw);
        assert_eq!(event.path, "/hook");
    }

    #[test]
    fn serializes_with_stable_field_names() {
        let event = Event::new("webhook-a-1", "/a", b"{}");
        let value = serde_json::to_value(&event).unwrap();
        let obj = value.as_object().unwrap();
        let mut names: Vec<&str> = obj.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["body", "key", "path", "timestamp"]);
    }
}
