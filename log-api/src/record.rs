use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::store::ValidationError;

/// A log document as posted by a producer: any JSON object.
pub type RawLog = Map<String, Value>;

/// Keys the store owns; producer-supplied values for them are discarded.
const RESERVED_KEYS: [&str; 2] = ["id", "received_at"];

/// A log document admitted into the window, with its ingestion metadata.
///
/// `id`, `level`, `message` and `received_at` are always present. `source` is
/// only serialized when the producer sent one, and every other field the
/// producer sent is kept verbatim in `fields`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub level: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn has_level(&self, level: Option<&str>) -> bool {
        level.map_or(true, |level| self.level == level)
    }

    pub fn has_source(&self, source: Option<&str>) -> bool {
        source.map_or(true, |source| self.source.as_deref() == Some(source))
    }
}

/// A producer document that passed validation, not yet stamped by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingLog {
    pub level: String,
    pub message: String,
    pub source: Option<String>,
    pub fields: Map<String, Value>,
}

impl IncomingLog {
    /// Splits the required fields out of a raw document.
    ///
    /// `level` and `message` must be non-empty strings. A `source` that is not
    /// a string is left untouched among the extra fields, so it is preserved
    /// but never matches a source filter.
    pub fn from_raw(mut raw: RawLog) -> Result<Self, ValidationError> {
        let level = take_required(&mut raw, "level");
        let message = take_required(&mut raw, "message");
        let (Some(level), Some(message)) = (level, message) else {
            return Err(ValidationError::MissingRequiredFields);
        };

        let source = match raw.remove("source") {
            Some(Value::String(source)) => Some(source),
            Some(other) => {
                raw.insert("source".to_owned(), other);
                None
            }
            None => None,
        };

        for key in RESERVED_KEYS {
            raw.remove(key);
        }

        Ok(Self {
            level,
            message,
            source,
            fields: raw,
        })
    }

    pub(crate) fn into_record(self, id: String, received_at: OffsetDateTime) -> LogRecord {
        LogRecord {
            id,
            level: self.level,
            message: self.message,
            source: self.source,
            received_at,
            fields: self.fields,
        }
    }
}

fn take_required(raw: &mut RawLog, key: &str) -> Option<String> {
    match raw.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn raw(value: Value) -> RawLog {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn splits_required_and_extra_fields() {
        let incoming = IncomingLog::from_raw(raw(json!({
            "level": "info",
            "message": "user logged in",
            "source": "auth-service",
            "user_id": 42,
            "tags": ["a", "b"],
        })))
        .unwrap();

        assert_eq!(incoming.level, "info");
        assert_eq!(incoming.message, "user logged in");
        assert_eq!(incoming.source.as_deref(), Some("auth-service"));
        assert_eq!(incoming.fields.len(), 2);
        assert_eq!(incoming.fields["user_id"], json!(42));
    }

    #[test]
    fn rejects_missing_or_empty_required_fields() {
        for doc in [
            json!({"message": "x"}),
            json!({"level": "info"}),
            json!({"level": "", "message": "x"}),
            json!({"level": "info", "message": ""}),
            json!({"level": 3, "message": "x"}),
            json!({}),
        ] {
            assert_eq!(
                IncomingLog::from_raw(raw(doc.clone())),
                Err(ValidationError::MissingRequiredFields),
                "{doc}"
            );
        }
    }

    #[test]
    fn keeps_non_string_source_as_extra_field() {
        let incoming = IncomingLog::from_raw(raw(json!({
            "level": "warn",
            "message": "odd producer",
            "source": 7,
        })))
        .unwrap();

        assert_eq!(incoming.source, None);
        assert_eq!(incoming.fields["source"], json!(7));
    }

    #[test]
    fn drops_producer_supplied_metadata() {
        let record = IncomingLog::from_raw(raw(json!({
            "level": "info",
            "message": "hello",
            "id": "spoofed",
            "received_at": "yesterday",
        })))
        .unwrap()
        .into_record("abc123xyz".to_owned(), datetime!(2024-03-01 12:00 UTC));

        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["id"], json!("abc123xyz"));
        assert_eq!(doc["received_at"], json!("2024-03-01T12:00:00Z"));
        assert!(doc.get("source").is_none());
    }
}
