//! The persisted cache record

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last validated state of the registry listing
///
/// Stored on disk as `{"timestamp": <ms since epoch>, "etag": ..., "items": [...]}`.
/// Every field defaults, so a record from an older or partial file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// When the listing was last validated against the registry
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Validator from the last 200 response
    #[serde(default)]
    pub etag: Option<String>,
    /// Projected items, replaced only as a whole
    #[serde(default)]
    pub items: Vec<Value>,
}

impl CacheRecord {
    /// Record for a freshly downloaded listing
    pub fn fetched(etag: Option<String>, items: Vec<Value>) -> Self {
        Self {
            timestamp: Some(validated_now()),
            etag,
            items,
        }
    }

    /// Same etag and items, validated now (the 304 path)
    pub fn revalidated(&self) -> Self {
        Self {
            timestamp: Some(validated_now()),
            etag: self.etag.clone(),
            items: self.items.clone(),
        }
    }
}

/// Current time at the millisecond precision the record file keeps
fn validated_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_serializes_timestamp_as_millis() {
        let record = CacheRecord {
            timestamp: Some(Utc.timestamp_millis_opt(1_453_243_206_417).unwrap()),
            etag: Some("myEtag".to_string()),
            items: vec![json!("a"), json!("b")],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"timestamp": 1_453_243_206_417i64, "etag": "myEtag", "items": ["a", "b"]})
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let record: CacheRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, CacheRecord::default());
    }

    #[test]
    fn test_null_etag_and_timestamp() {
        let record: CacheRecord =
            serde_json::from_str(r#"{"timestamp": null, "etag": null, "items": ["x"]}"#).unwrap();
        assert!(record.timestamp.is_none());
        assert!(record.etag.is_none());
        assert_eq!(record.items, vec![json!("x")]);
    }

    #[test]
    fn test_revalidated_keeps_etag_and_items() {
        let old = CacheRecord {
            timestamp: Some(Utc.timestamp_millis_opt(1_000).unwrap()),
            etag: Some("myEtag".to_string()),
            items: vec![json!("a")],
        };
        let new = old.revalidated();
        assert_eq!(new.etag, old.etag);
        assert_eq!(new.items, old.items);
        assert!(new.timestamp > old.timestamp);
    }

    #[test]
    fn test_timestamp_survives_json_unchanged() {
        let record = CacheRecord::fetched(Some("myEtag".to_string()), vec![json!("a")]);
        let json = serde_json::to_string(&record).unwrap();
        let read_back: CacheRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(read_back, record);
    }
}
